//! Shared application state handed to the router.

use std::sync::Arc;

use crate::clock::Clock;
use crate::detail::PollDetails;
use crate::identity::IdentityResolver;
use crate::polls::PollCatalog;
use crate::store::Store;
use crate::voting::VotingCoordinator;

/// Shared handles for request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    pub identities: IdentityResolver,
    pub polls: PollCatalog,
    pub voting: VotingCoordinator,
    pub details: PollDetails,
    /// Proxies whose `X-Forwarded-For` entries are believed.
    pub trusted_proxy_hops: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, trusted_proxy_hops: usize) -> Self {
        Self {
            identities: IdentityResolver::new(store.clone(), clock.clone()),
            polls: PollCatalog::new(store.clone(), clock.clone()),
            voting: VotingCoordinator::new(store.clone(), clock.clone()),
            details: PollDetails::new(store, clock.clone()),
            clock,
            trusted_proxy_hops,
        }
    }
}
