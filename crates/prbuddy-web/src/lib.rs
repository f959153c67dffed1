//! HTTP surface (spec §6) and CLI entrypoint for the PRBuddy agent.

pub mod error;
pub mod model;
pub mod routes;
pub mod server;
pub mod state;

pub use error::WebError;
pub use routes::router;
pub use server::{run_web_server, ServerError, ServerOptions};
pub use state::AppState;
