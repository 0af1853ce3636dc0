//! The stable HTTP surface: an `axum` router over the store ports, using
//! an `AppState` + `Router<AppState>` + `(StatusCode, Json<Value>)` error
//! convention.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod validation;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
