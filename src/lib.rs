//! Anonymous polls with one vote per address-derived identity.
//!
//! The engine lives in [`voting`], [`lifecycle`] and [`detail`]; storage is
//! behind the traits in [`store`]; [`routes`] exposes it over HTTP.

pub mod clock;
pub mod config;
pub mod db;
pub mod detail;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod pagination;
pub mod polls;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod voting;

pub use error::{PollError, StoreError, ValidationError};
pub use state::AppState;
pub use voting::{VoteOutcome, VoteResult};
