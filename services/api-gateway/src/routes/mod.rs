use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/health/detailed", get(detailed_health_check))
        .route("/items", get(list_items).post(create_item))
        .route("/attributes", get(list_attributes).post(create_attribute))
        .route("/boms", get(list_boms))
        .route("/boms/:id", get(get_bom))
        .route("/boms/:id/explode", post(explode_bom))
        .route("/boms/:id/readiness", post(check_bom_readiness))
        .route("/boms/:id/materials", get(materials_list))
        .route("/drafts/automate", post(automate_draft))
        .route("/drafts/validate", post(validate_draft_tree))
        .route("/drafts/explode", post(explode_draft))
        .route("/drafts/save", post(save_draft))
        .route("/codes/suggest", post(suggest_code))
}
