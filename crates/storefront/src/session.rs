//! Session identity provider.
//!
//! Each installation gets one pseudo-anonymous [`UserIdentity`], created
//! lazily and persisted in the local key-value store. It partitions carts and
//! is not a credential.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, SeedableRng, TryRngCore};
use thiserror::Error;
use tracing::{info, warn};

use desicart_core::{IdError, UserIdentity};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Key of the persisted identity slot.
pub const IDENTITY_KEY: &str = "desicart_user_id";

/// Length of the random part of a fallback identity.
const FALLBACK_RANDOM_CHARS: usize = 9;

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity slot could not be read or written.
    #[error("identity storage error: {0}")]
    Storage(#[from] StorageError),

    /// A generated identity was rejected.
    #[error("invalid identity: {0}")]
    Invalid(#[from] IdError),
}

/// Hands out the installation's user identity.
#[derive(Debug)]
pub struct SessionIdentityProvider<S> {
    store: S,
    current: Mutex<Option<UserIdentity>>,
}

impl<S: KeyValueStore> SessionIdentityProvider<S> {
    /// Create a provider over the store holding the identity slot.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// Return the stored identity, creating and persisting one if needed.
    ///
    /// Every call on the same installation returns the same identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if the slot cannot be read or the new
    /// identity cannot be persisted.
    pub fn get_or_create_identity(&self) -> Result<UserIdentity, IdentityError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(identity) = current.as_ref() {
            return Ok(identity.clone());
        }

        let identity = match self.store.get(IDENTITY_KEY)? {
            Some(stored) => match UserIdentity::parse(&decode_slot(stored)) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(error = %e, "Stored identity is invalid, replacing it");
                    self.create()?
                }
            },
            None => self.create()?,
        };

        *current = Some(identity.clone());
        Ok(identity)
    }

    fn create(&self) -> Result<UserIdentity, IdentityError> {
        let identity = UserIdentity::parse(&generate_identity())?;
        let slot = serde_json::to_string(&identity).map_err(StorageError::from)?;
        self.store.put(IDENTITY_KEY, &slot)?;
        info!(user_id = %identity, "Created session identity");
        Ok(identity)
    }
}

/// The slot holds a JSON string; older installations stored the bare value.
fn decode_slot(stored: String) -> String {
    serde_json::from_str(&stored).unwrap_or(stored)
}

/// Generate a new identity string.
///
/// Prefers a UUID v4 drawn from the operating system's CSPRNG. Only if that
/// source fails does it fall back to a time-seeded pseudo-random string.
fn generate_identity() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(e) => {
            warn!(error = %e, "OS random source unavailable, using fallback identity");
            let now_millis = Utc::now().timestamp_millis();
            let mut rng = SmallRng::seed_from_u64(now_millis.unsigned_abs());
            fallback_identity(now_millis, &mut rng)
        }
    }
}

/// `user_` + random base-36 characters + base-36 timestamp.
fn fallback_identity(now_millis: i64, rng: &mut impl Rng) -> String {
    let random: String = (0..FALLBACK_RANDOM_CHARS)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .collect();
    format!("user_{random}{}", to_base36(now_millis.unsigned_abs()))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        #[allow(clippy::cast_possible_truncation)] // remainder is < 36
        let digit = (value % 36) as u32;
        if let Some(c) = char::from_digit(digit, 36) {
            digits.push(c);
        }
        value /= 36;
    }
    digits.iter().rev().collect()
}
