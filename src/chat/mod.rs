use crate::state::AppState;
use axum::Router;

pub mod actor;
pub mod completion;
pub mod handlers;
pub mod history;
pub mod message;
pub mod relay;

pub fn router() -> Router<AppState> {
    handlers::chat_routes()
}
