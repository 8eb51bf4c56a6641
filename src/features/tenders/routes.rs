use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::tenders::handlers;
use crate::features::tenders::services::TenderService;

/// Protected tender routes (require JWT authentication)
pub fn routes(service: Arc<TenderService>) -> Router {
    Router::new()
        .route(
            "/api/tenders",
            get(handlers::list_tenders).post(handlers::create_tender),
        )
        .route(
            "/api/tenders/{tender_id}",
            get(handlers::get_tender)
                .put(handlers::update_tender)
                .delete(handlers::delete_tender),
        )
        .route("/api/tenders/{tender_id}/award", post(handlers::award_tender))
        .with_state(service)
}
