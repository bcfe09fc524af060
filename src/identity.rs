//! Address-derived voter identities.

use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::models::{Identity, IdentityId};
use crate::store::Store;

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Identity for `address`, created on first sighting.
    pub async fn resolve(&self, address: &str) -> Result<Identity, StoreError> {
        self.register(address).await.map(|(identity, _)| identity)
    }

    /// Like [`resolve`](Self::resolve), also reporting whether this call
    /// created the identity.
    pub async fn register(&self, address: &str) -> Result<(Identity, bool), StoreError> {
        if let Some(existing) = self.store.find_identity(address).await? {
            return Ok((existing, false));
        }

        let identity = Identity {
            id: IdentityId::generate(),
            address: address.to_string(),
            created_at: self.clock.now(),
        };
        match self.store.insert_identity(&identity).await {
            Ok(()) => {
                debug!(identity = %identity.id, "new identity");
                Ok((identity, true))
            }
            // lost the race on the address constraint: take the winner's row
            Err(StoreError::Conflict(_)) => {
                let winner = self.store.find_identity(address).await?.ok_or_else(|| {
                    StoreError::NotFound(format!("identity for {address} after conflict"))
                })?;
                Ok((winner, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Read-only lookup. Never creates an identity.
    pub async fn lookup(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        self.store.find_identity(address).await
    }
}
