pub mod aka;
pub mod api;
pub mod app_state;
pub mod config;
pub mod eap;
pub mod error;
pub mod health;
pub mod identity;
pub mod problem_details;
pub mod session_store;
pub mod supplier;
pub mod user_ctx;
pub mod vector;

pub use app_state::AppState;
pub use config::AkaConfig;
pub use error::AppError;
pub use session_store::{LockedUserCtx, SessionStore};
