//! solvelink discovery: connections to solver backends and what they offer.
//!
//! - [`Connection`]: one backend endpoint owning its transport
//! - [`ConnectionStore`]: ordered registry, passed explicitly to callers
//! - [`FeatureDiscovery`]: per-connection capability queries, federated
//!   listing, and first-match search over the store
//! - [`FeatureCache`]: memo of capability lists, invalidated via
//!   `features/changed`

mod cache;
mod connection;
mod discovery;
mod error;
mod routing;
mod store;

pub use cache::FeatureCache;
pub use connection::{Connection, ConnectionStatus};
pub use discovery::{ConnectionFeatures, FeatureDiscovery};
pub use error::{DiscoveryError, Result};
pub use routing::{capabilities_match, Rejection, Requirements, SearchOutcome};
pub use store::ConnectionStore;
