//! Identifier types for the wallet ledger.
//!
//! Owners and wallets are keyed by UUIDs; transactions and orders use ULIDs so that
//! their natural byte order is also their creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use ulid::{Generator, Ulid};

/// Next ULID from a process-wide monotonic generator.
///
/// Ids minted within the same millisecond still sort in minting order.
fn next_ulid() -> Ulid {
    static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();
    GENERATOR
        .get_or_init(|| Mutex::new(Generator::new()))
        .lock()
        .map_or_else(
            |_| Ulid::new(),
            |mut generator| generator.generate().unwrap_or_else(|_| Ulid::new()),
        )
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the 16 raw bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// Rebuild from 16 raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(bytes))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| IdError::InvalidUuid)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Ulid);

        impl $name {
            /// Wrap an existing ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Generate a new identifier stamped with the current time.
            #[must_use]
            pub fn generate() -> Self {
                Self(next_ulid())
            }

            /// Return the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> &Ulid {
                &self.0
            }

            /// Return the 16 raw bytes (big-endian, time-ordered).
            #[must_use]
            pub fn to_bytes(&self) -> [u8; 16] {
                self.0.to_bytes()
            }

            /// Rebuild from 16 raw bytes.
            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Ulid::from_bytes(bytes))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ulid::from_string(s)
                    .map(Self)
                    .map_err(|_| IdError::InvalidUlid)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

uuid_id! {
    /// The owner of a wallet and its credential (the authenticated user).
    OwnerId
}

uuid_id! {
    /// A wallet identifier.
    WalletId
}

ulid_id! {
    /// A transaction log entry identifier.
    ///
    /// For `Hold` entries this is also the reservation id handed to
    /// `capture`/`release`.
    TransactionId
}

ulid_id! {
    /// An order identifier.
    OrderId
}

/// Longest idempotency key accepted from a caller.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// A caller-supplied token that makes a mutating call safe to retry.
///
/// Keys are scoped per wallet and per transaction kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and wrap a key.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidIdempotencyKey` when the key is empty, longer than
    /// [`MAX_IDEMPOTENCY_KEY_LEN`], or contains control characters.
    pub fn new(key: impl Into<String>) -> Result<Self, IdError> {
        let key = key.into();
        if key.is_empty()
            || key.len() > MAX_IDEMPOTENCY_KEY_LEN
            || key.chars().any(char::is_control)
        {
            return Err(IdError::InvalidIdempotencyKey);
        }
        Ok(Self(key))
    }

    /// The key derived from a transaction id, used when the caller supplies none.
    #[must_use]
    pub fn from_transaction(id: &TransactionId) -> Self {
        Self(id.to_string())
    }

    /// The key derived from an order id; a reservation is keyed by its order.
    #[must_use]
    pub fn from_order(id: &OrderId) -> Self {
        Self(format!("order:{id}"))
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The idempotency key is empty, too long, or contains control characters.
    #[error("invalid idempotency key")]
    InvalidIdempotencyKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_id_parses_its_display_form() {
        let id = WalletId::generate();
        let parsed = WalletId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(format!("{id:?}").starts_with("WalletId("));
    }

    #[test]
    fn owner_id_rejects_garbage() {
        assert_eq!(OwnerId::from_str("not-a-uuid"), Err(IdError::InvalidUuid));
    }

    #[test]
    fn transaction_ids_sort_by_creation_time() {
        let first = TransactionId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TransactionId::generate();
        assert!(first.to_bytes() < second.to_bytes());
        assert_eq!(TransactionId::from_bytes(second.to_bytes()), second);
    }

    #[test]
    fn ids_minted_back_to_back_stay_ordered() {
        let ids: Vec<_> = (0..64).map(|_| TransactionId::generate()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn order_id_serializes_as_string() {
        let id = OrderId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn idempotency_key_validation() {
        assert!(IdempotencyKey::new("webhook-evt-42").is_ok());
        assert_eq!(IdempotencyKey::new(""), Err(IdError::InvalidIdempotencyKey));
        assert_eq!(
            IdempotencyKey::new("x".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1)),
            Err(IdError::InvalidIdempotencyKey)
        );
        assert_eq!(
            IdempotencyKey::new("bad\nkey"),
            Err(IdError::InvalidIdempotencyKey)
        );
    }

    #[test]
    fn order_key_is_prefixed() {
        let order = OrderId::generate();
        assert_eq!(
            IdempotencyKey::from_order(&order).as_str(),
            format!("order:{order}")
        );
    }
}
