//! Cart store with optimistic updates.
//!
//! User actions change the visible cart immediately; the durable write
//! happens afterwards on a background worker. The protocol has two phases:
//!
//! 1. **Tentative**: the mutation is applied to in-memory state and queued.
//! 2. **Confirmation**: the worker applies queued mutations to the storage
//!    engine one at a time. Each result replaces the confirmed snapshot.
//!
//! The visible cart is always the last confirmed snapshot with the
//! still-queued mutations replayed on top, so the two sides can never stay
//! apart. A failed write is dropped: the worker re-reads the durable cart
//! and the failure is reported through [`SyncStatus`].

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument, warn};

use desicart_core::{Cart, CartMutation, Product, ProductId, UserIdentity};

use crate::storage::StorageEngine;

/// Whether the visible cart matches durable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every mutation has been confirmed.
    Synced,
    /// Mutations are waiting for confirmation.
    Pending(usize),
    /// The most recent write failed and was rolled back.
    Failed { reason: String },
}

/// Snapshot of cart state as the UI sees it.
#[derive(Debug, Clone, Default)]
pub struct CartView {
    confirmed: Cart,
    pending: VecDeque<CartMutation>,
    last_error: Option<String>,
    is_open: bool,
}

impl CartView {
    fn new(confirmed: Cart) -> Self {
        Self {
            confirmed,
            ..Self::default()
        }
    }

    /// The visible cart: confirmed state plus pending mutations.
    #[must_use]
    pub fn cart(&self) -> Cart {
        let mut cart = self.confirmed.clone();
        for mutation in &self.pending {
            mutation.apply(&mut cart);
        }
        cart
    }

    /// The last cart the storage engine confirmed.
    #[must_use]
    pub const fn confirmed(&self) -> &Cart {
        &self.confirmed
    }

    /// Number of mutations awaiting confirmation.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Current sync status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        if !self.pending.is_empty() {
            return SyncStatus::Pending(self.pending.len());
        }
        match &self.last_error {
            Some(reason) => SyncStatus::Failed {
                reason: reason.clone(),
            },
            None => SyncStatus::Synced,
        }
    }

    /// Whether the cart view (drawer) is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    fn confirm(&mut self, cart: Cart) {
        self.pending.pop_front();
        self.confirmed = cart;
        self.last_error = None;
    }

    fn reject(&mut self, durable: Option<Cart>, reason: String) {
        self.pending.pop_front();
        if let Some(cart) = durable {
            self.confirmed = cart;
        }
        self.last_error = Some(reason);
    }
}

/// Optimistic cart for one user identity.
///
/// Dropping the store lets the worker finish queued writes and exit.
#[derive(Debug)]
pub struct CartStore {
    user: UserIdentity,
    state: Arc<watch::Sender<CartView>>,
    queue: mpsc::UnboundedSender<CartMutation>,
}

impl CartStore {
    /// Load the user's cart and start the confirmation worker.
    ///
    /// Must be called within a Tokio runtime.
    #[instrument(skip_all, fields(user_id = %user))]
    pub async fn open<E>(engine: Arc<E>, user: UserIdentity) -> Self
    where
        E: StorageEngine + 'static,
    {
        let initial = engine.get_cart(&user).await;
        debug!(lines = initial.len(), "Loaded cart");

        let (state, _) = watch::channel(CartView::new(initial));
        let state = Arc::new(state);
        let (queue, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(engine, user.clone(), Arc::clone(&state), rx));

        Self { user, state, queue }
    }

    /// The identity this cart belongs to.
    #[must_use]
    pub const fn user(&self) -> &UserIdentity {
        &self.user
    }

    /// Add one unit of `product`, open the cart view, and queue the write.
    ///
    /// Returns the tentative cart, which is visible before this returns.
    pub fn add(&self, product: &Product) -> Cart {
        self.submit(CartMutation::Add(product.clone()), true)
    }

    /// Set a line's quantity (`<= 0` removes it) and queue the write.
    ///
    /// Returns the tentative cart.
    pub fn set_quantity(&self, product_id: &ProductId, quantity: i64) -> Cart {
        self.submit(
            CartMutation::SetQuantity {
                product_id: product_id.clone(),
                quantity,
            },
            false,
        )
    }

    /// Remove a line entirely.
    pub fn remove(&self, product_id: &ProductId) -> Cart {
        self.set_quantity(product_id, 0)
    }

    fn submit(&self, mutation: CartMutation, open_view: bool) -> Cart {
        let mut visible = Cart::new();
        self.state.send_modify(|view| {
            // Queue under the state lock so pending order matches worker order
            if self.queue.send(mutation.clone()).is_ok() {
                view.pending.push_back(mutation);
            } else {
                warn!(user_id = %self.user, "Cart worker stopped, mutation not applied");
                view.last_error = Some("cart worker stopped".to_string());
            }
            if open_view {
                view.is_open = true;
            }
            visible = view.cart();
        });
        visible
    }

    /// Close the cart view.
    pub fn close_view(&self) {
        self.state.send_if_modified(|view| std::mem::replace(&mut view.is_open, false));
    }

    /// Current view snapshot.
    #[must_use]
    pub fn view(&self) -> CartView {
        self.state.borrow().clone()
    }

    /// The visible cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state.borrow().cart()
    }

    /// Subscribe to view changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.state.subscribe()
    }

    /// Wait until every queued mutation has been confirmed or rejected.
    pub async fn settled(&self) -> CartView {
        let mut rx = self.state.subscribe();
        let result = rx.wait_for(|view| view.pending.is_empty()).await;
        match result {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }
}

/// Apply queued mutations to the engine in order.
async fn run_worker<E: StorageEngine>(
    engine: Arc<E>,
    user: UserIdentity,
    state: Arc<watch::Sender<CartView>>,
    mut rx: mpsc::UnboundedReceiver<CartMutation>,
) {
    while let Some(mutation) = rx.recv().await {
        let result = match &mutation {
            CartMutation::Add(product) => engine.try_add_to_cart(&user, product).await,
            CartMutation::SetQuantity {
                product_id,
                quantity,
            } => {
                engine
                    .try_update_cart_quantity(&user, product_id, *quantity)
                    .await
            }
        };

        match result {
            Ok(cart) => {
                debug!(user_id = %user, product_id = %mutation.product_id(), "Cart write confirmed");
                state.send_modify(|view| view.confirm(cart));
            }
            Err(e) => {
                warn!(
                    user_id = %user,
                    product_id = %mutation.product_id(),
                    error = %e,
                    "Cart write failed, reverting to durable cart"
                );
                let durable = engine.try_get_cart(&user).await.ok();
                state.send_modify(|view| view.reject(durable, e.to_string()));
            }
        }
    }
    debug!(user_id = %user, "Cart worker stopped");
}
