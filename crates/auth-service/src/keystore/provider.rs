//! Keystore providers.
//!
//! The engines never build keys themselves: a [`KeystoreProvider`] hands out
//! one snapshot per verification or issuance call.

use super::Keystore;
use crate::errors::KeystoreError;
use std::sync::Arc;

/// Source of keystore snapshots.
///
/// Implementations must be cheap to call on every request (cache if the
/// underlying source is remote).
#[async_trait::async_trait]
pub trait KeystoreProvider: Send + Sync {
    /// Fetch the current keystore snapshot.
    async fn keystore(&self) -> Result<Arc<Keystore>, KeystoreError>;
}

/// Provider that always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticKeystoreProvider {
    keystore: Arc<Keystore>,
}

impl StaticKeystoreProvider {
    #[must_use]
    pub fn new(keystore: Keystore) -> Self {
        Self {
            keystore: Arc::new(keystore),
        }
    }
}

#[async_trait::async_trait]
impl KeystoreProvider for StaticKeystoreProvider {
    async fn keystore(&self) -> Result<Arc<Keystore>, KeystoreError> {
        Ok(Arc::clone(&self.keystore))
    }
}

/// Mock provider for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock keystore provider that counts fetches.
    pub struct MockKeystoreProvider {
        /// Snapshot to return.
        keystore: Arc<Keystore>,
        /// Number of calls made.
        call_count: AtomicUsize,
        /// Whether to return errors.
        return_error: bool,
    }

    impl MockKeystoreProvider {
        /// Create a mock that serves the given keystore.
        #[must_use]
        pub fn serving(keystore: Keystore) -> Self {
            Self {
                keystore: Arc::new(keystore),
                call_count: AtomicUsize::new(0),
                return_error: false,
            }
        }

        /// Create a mock that always fails.
        #[must_use]
        pub fn failing() -> Self {
            Self {
                keystore: Arc::new(Keystore::new()),
                call_count: AtomicUsize::new(0),
                return_error: true,
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl KeystoreProvider for MockKeystoreProvider {
        async fn keystore(&self) -> Result<Arc<Keystore>, KeystoreError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.return_error {
                return Err(KeystoreError::Unavailable(
                    "Mock keystore provider error".to_string(),
                ));
            }

            Ok(Arc::clone(&self.keystore))
        }
    }
}
