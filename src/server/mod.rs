//! HTTP server.
//!
//! - `router` - `/api/v1` route table
//! - `guard` - Token authentication and permission checks
//! - `features` - List query-string parsing
//! - `response` - JSON rendering and envelopes

pub mod extract;
pub mod features;
pub mod guard;
pub mod response;
mod router;
mod runtime;
mod state;


pub use router::router;
pub use runtime::serve;
pub use state::AppState;
