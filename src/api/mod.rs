//! HTTP surface of the service.
//!
//! `api_router()` returns a composable `Router`; `server` binds it to a
//! listener with a graceful-shutdown handle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{bind_and_start, start_server, ApiServer, ServerInfo};
pub use types::ApiContext;
