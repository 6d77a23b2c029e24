pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod halls;
pub mod movies;
pub mod sessions;
pub mod stats;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(bookings::routes())
        .merge(catalog::routes())
        .merge(halls::routes())
        .merge(movies::routes())
        .merge(sessions::routes())
        .merge(stats::routes())
}
