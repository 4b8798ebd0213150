use std::collections::HashSet;

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use bomforge_models::VariantSelection;
use bomforge_utils::{CatalogSnapshot, CodeGenerator, VariantSelector};

use crate::{middleware::ApiResult, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFamily {
    Bom,
    Item,
    WorkOrder,
}

impl CodeFamily {
    fn label(&self) -> &'static str {
        match self {
            Self::Bom => "bom",
            Self::Item => "item",
            Self::WorkOrder => "work_order",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SuggestCodeRequest {
    pub family: CodeFamily,
    /// Item code the suggestion is anchored on.
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub selection: VariantSelection,
}

#[derive(Debug, Serialize)]
pub struct SuggestCodeResponse {
    pub family: CodeFamily,
    pub code: String,
}

/// POST /api/v1/codes/suggest
pub async fn suggest_code(
    State(state): State<AppState>,
    Json(request): Json<SuggestCodeRequest>,
) -> ApiResult<Json<SuggestCodeResponse>> {
    let catalog = CatalogSnapshot::load(state.store.as_ref()).await?;
    let codes = &state.config.codes;

    let (config, used) = match request.family {
        CodeFamily::Bom => (codes.bom.clone(), catalog.bom_codes()),
        CodeFamily::Item => (codes.item.clone(), catalog.item_codes()),
        // Work orders live outside the catalog.
        CodeFamily::WorkOrder => (codes.work_order.clone(), HashSet::new()),
    };

    let binding_order = catalog
        .item_by_code(&request.anchor)
        .map(|item| item.attribute_ids.clone())
        .unwrap_or_default();
    let selection = VariantSelector::new(&catalog).resolve_in_order(&request.selection, &binding_order);
    let code = CodeGenerator::new(config).suggest_now(&request.anchor, &selection, &used);

    state
        .metrics
        .codes_suggested
        .with_label_values(&[request.family.label()])
        .inc();
    Ok(Json(SuggestCodeResponse {
        family: request.family,
        code,
    }))
}
