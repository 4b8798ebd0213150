//! Items, attributes and stored BOM documents.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use bomforge_models::{AttributeDefinition, BomDocument, BomSummary, Item, NewItem};
use bomforge_utils::{validate_code, validate_model, BomForgeError};

use crate::{middleware::ApiResult, AppState};

/// GET /api/v1/items
pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.store.get_items().await?))
}

/// POST /api/v1/items
pub async fn create_item(
    State(state): State<AppState>,
    Json(item): Json<NewItem>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    validate_code("code", &item.code)?;
    validate_model(&item)?;
    let item = state.store.create_item(item).await?;
    tracing::info!(item_code = %item.code, "Item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/v1/attributes
pub async fn list_attributes(State(state): State<AppState>) -> ApiResult<Json<Vec<AttributeDefinition>>> {
    Ok(Json(state.store.get_attributes().await?))
}

/// POST /api/v1/attributes
pub async fn create_attribute(
    State(state): State<AppState>,
    Json(attribute): Json<AttributeDefinition>,
) -> ApiResult<(StatusCode, Json<AttributeDefinition>)> {
    if attribute.name.trim().is_empty() {
        return Err(BomForgeError::validation("name", "Attribute name is required").into());
    }
    let attribute = state.store.create_attribute(attribute).await?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

/// GET /api/v1/boms
pub async fn list_boms(State(state): State<AppState>) -> ApiResult<Json<Vec<BomSummary>>> {
    Ok(Json(state.store.get_existing_boms().await?))
}

/// GET /api/v1/boms/:id
pub async fn get_bom(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<BomDocument>> {
    state
        .store
        .get_bom(id)
        .await?
        .map(Json)
        .ok_or_else(|| BomForgeError::not_found(format!("bom {}", id)).into())
}
