//! Gateway: session-aware reverse proxy between the browser and the
//! food-dispatch backend API.
//!
//! Lifecycle of a request:
//! 1. Strip the mount prefix to get the backend-relative path
//! 2. Forward allow-listed headers plus `Authorization: Bearer <session>`
//! 3. Call the backend once, redirects not followed
//! 4. Relay the response, scrubbing the token from session-creation bodies
//! 5. Set or clear the HTTP-only session cookie

pub mod error;
pub mod proxy;
pub mod server;
pub mod session;
pub mod state;
pub mod upstream;

pub use {
    error::{GatewayError, GatewayResult},
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
};
