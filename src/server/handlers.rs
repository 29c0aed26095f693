use std::{sync::Arc, time::Instant};

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::translator::{self, TranslationError};

use super::{
    AppState,
    models::{ErrorResponse, TranslateRequest, TranslateResponse},
};

pub async fn health_check(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "graphcypher",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "root_fields": app_state.schema.root_fields.len(),
    }))
}

/// Generated API catalogue as SDL text.
pub async fn schema_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        app_state.schema.print_sdl(),
    )
}

/// Translate an operation without executing it.
pub async fn translate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4();
    let options = app_state.config.translate_options(payload.max_depth);
    log::debug!(
        "[{}] Translate handler called for `{}`",
        request_id,
        payload.operation.root_field
    );

    match translator::translate_with_options(&app_state.schema, &payload.operation, &options) {
        Ok(translated) => {
            let elapsed = start_time.elapsed().as_secs_f64() * 1000.0;
            log::info!(
                "[{}] Translated `{}` in {:.3}ms",
                request_id,
                translated.root_field,
                elapsed
            );
            Ok(Json(TranslateResponse {
                root_field: translated.root_field,
                statements: translated.statements,
                response: translated.response,
                translation_time_ms: elapsed,
            }))
        }
        Err(err) => {
            log::warn!(
                "[{}] Translation of `{}` failed: {}",
                request_id,
                payload.operation.root_field,
                err
            );
            Err((status_for(&err), Json(ErrorResponse::from(&err))))
        }
    }
}

fn status_for(err: &TranslationError) -> StatusCode {
    match err {
        TranslationError::CardinalityViolation { .. } => StatusCode::CONFLICT,
        TranslationError::UnknownType { .. } => StatusCode::NOT_FOUND,
        TranslationError::Validation { .. } | TranslationError::UnknownField { .. } => {
            StatusCode::BAD_REQUEST
        }
    }
}
