//! Draft generation, checking and bottom-up saving.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use bomforge_models::{BomNode, DraftIssue, VariantSelection};
use bomforge_utils::{
    AutomationSettings, Automator, BomForgeError, CatalogSnapshot, CodeGenerator, PersistenceCoordinator, SaveReport,
};

use crate::{
    middleware::{ApiError, ApiResult},
    AppState,
};

/// Level source, first match wins: `profile`, `levels`, `patterns`, then the
/// configured default levels.
#[derive(Debug, Deserialize)]
pub struct AutomateRequest {
    pub root_item_code: String,
    #[serde(default)]
    pub selection: VariantSelection,
    pub profile: Option<String>,
    pub levels: Option<Vec<Vec<String>>>,
    pub patterns: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct DraftCheck {
    pub valid: bool,
    pub issues: Vec<DraftIssue>,
}

/// POST /api/v1/drafts/automate
pub async fn automate_draft(
    State(state): State<AppState>,
    Json(request): Json<AutomateRequest>,
) -> ApiResult<Json<BomNode>> {
    let automation = &state.config.automation;
    let catalog = CatalogSnapshot::load(state.store.as_ref()).await?;
    let codes = CodeGenerator::new(state.config.codes.bom.clone());
    let automator = Automator::new(&catalog, &codes, AutomationSettings::from(automation));

    let draft = if let Some(name) = &request.profile {
        let profile = automation
            .profile(name)
            .ok_or_else(|| BomForgeError::not_found(format!("automation profile '{}'", name)))?;
        automator.build_profile(&request.root_item_code, &request.selection, profile)?
    } else if let Some(levels) = &request.levels {
        automator.build_levels(&request.root_item_code, &request.selection, levels)?
    } else if let Some(patterns) = &request.patterns {
        automator.build(&request.root_item_code, &request.selection, patterns)?
    } else {
        automator.build_levels(&request.root_item_code, &request.selection, &automation.levels)?
    };

    state.metrics.drafts_automated.inc();
    tracing::info!(root_item_code = %request.root_item_code, nodes = draft.nodes().len(), "Draft generated");
    Ok(Json(draft))
}

/// POST /api/v1/drafts/validate
pub async fn validate_draft_tree(Json(draft): Json<BomNode>) -> Json<DraftCheck> {
    let issues = draft.validate_tree();
    Json(DraftCheck {
        valid: issues.is_empty(),
        issues,
    })
}

/// POST /api/v1/drafts/save
pub async fn save_draft(
    State(state): State<AppState>,
    Json(draft): Json<BomNode>,
) -> ApiResult<(StatusCode, Json<SaveReport>)> {
    let codes = CodeGenerator::new(state.config.codes.bom.clone());
    let settings = AutomationSettings::from(&state.config.automation);
    let coordinator = PersistenceCoordinator::new(state.store.as_ref(), &codes, &settings);

    match coordinator.save(&draft).await {
        Ok(report) => {
            state.metrics.draft_saves.with_label_values(&["saved"]).inc();
            Ok((StatusCode::CREATED, Json(report)))
        }
        Err(err) => {
            let outcome = match err {
                BomForgeError::PartialTreeSave { .. } => "partial",
                _ => "rejected",
            };
            state.metrics.draft_saves.with_label_values(&[outcome]).inc();
            Err(ApiError(err))
        }
    }
}
