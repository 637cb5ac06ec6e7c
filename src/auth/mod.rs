use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod cookie;
pub mod dto;
pub mod handlers;
pub mod jwt;
mod pages;
pub mod password;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
