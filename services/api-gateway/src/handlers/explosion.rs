//! Quantity explosion, stock readiness and printed materials lists.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use bomforge_models::{BomNode, ReadinessReport, StockBalance};
use bomforge_utils::{
    check_readiness, validate_draft, BomBook, CatalogSnapshot, Explosion, ExplosionEngine, MaterialsReport,
    ReportFormat,
};

use crate::{middleware::ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ExplodeRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ReadinessRequest {
    pub quantity: Decimal,
    #[serde(default)]
    pub balances: Vec<StockBalance>,
    /// Location assumed for lines that name none.
    pub default_location: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MaterialsQuery {
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Deserialize)]
pub struct DraftExplodeRequest {
    pub draft: BomNode,
    pub quantity: Decimal,
}

async fn explode_stored(state: &AppState, id: Uuid, quantity: Decimal) -> ApiResult<Explosion> {
    let book = BomBook::load(state.store.as_ref()).await?;
    let explosion = ExplosionEngine::new(&book).explode(id, quantity)?;
    state.metrics.explosions.inc();
    tracing::info!(
        bom_code = %explosion.root_code,
        %quantity,
        rows = explosion.rows.len(),
        requirements = explosion.requirements.len(),
        "BOM exploded"
    );
    Ok(explosion)
}

/// POST /api/v1/boms/:id/explode
pub async fn explode_bom(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExplodeRequest>,
) -> ApiResult<Json<Explosion>> {
    Ok(Json(explode_stored(&state, id, request.quantity).await?))
}

/// POST /api/v1/boms/:id/readiness
pub async fn check_bom_readiness(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReadinessRequest>,
) -> ApiResult<Json<ReadinessReport>> {
    let explosion = explode_stored(&state, id, request.quantity).await?;
    let report = check_readiness(&explosion.requirements, &request.balances, request.default_location)?;
    if !report.ready {
        tracing::info!(bom_code = %explosion.root_code, shortages = report.shortages.len(), "Stock shortages found");
    }
    Ok(Json(report))
}

/// GET /api/v1/boms/:id/materials?quantity=&format=text|csv
pub async fn materials_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MaterialsQuery>,
) -> ApiResult<impl IntoResponse> {
    let quantity = query.quantity.unwrap_or(Decimal::ONE);
    let explosion = explode_stored(&state, id, quantity).await?;
    let catalog = CatalogSnapshot::load(state.store.as_ref()).await?;

    let body = MaterialsReport::new(&explosion)
        .with_catalog(&catalog)
        .render(query.format)?;
    Ok(([(header::CONTENT_TYPE, query.format.content_type())], body))
}

/// POST /api/v1/drafts/explode
///
/// Explodes an unsaved draft. Lines without a nested draft fall back to the
/// stored recipe of their item, when one exists.
pub async fn explode_draft(
    State(state): State<AppState>,
    Json(request): Json<DraftExplodeRequest>,
) -> ApiResult<Json<Explosion>> {
    validate_draft(&request.draft)?;
    let book = BomBook::load(state.store.as_ref()).await?;
    let explosion = ExplosionEngine::new(&book).explode_draft(&request.draft, request.quantity)?;
    state.metrics.explosions.inc();
    Ok(Json(explosion))
}
