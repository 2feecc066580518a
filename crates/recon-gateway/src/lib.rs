//! HTTP API of the Recon query service: query, health, collections, metrics.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use router::build_router;
pub use server::GatewayServer;
