use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use checker::{CheckJob, CheckOutcome, CheckRunner};
use store::{read_normalized_text, CheckMatchRow, CheckRequest, VerificationNote};

/// Request to run a plagiarism check over an uploaded document.
#[derive(Debug, Deserialize)]
pub struct CreateCheckRequest {
    /// Document to check; must belong to the caller.
    pub doc_id: u64,

    /// Caller identity as established by the upstream auth layer.
    pub requested_by: u64,

    /// Optional cap on the LSH candidate shortlist.
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

/// Query options for `GET /api/checks/{id}`.
#[derive(Debug, Deserialize)]
pub struct GetCheckQuery {
    /// Include a truncated normalized-text preview of the checked
    /// document.
    #[serde(default)]
    pub preview: bool,
}

/// Result row with its summary decoded for API consumers.
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub id: u64,
    pub check_id: u64,
    pub similarity: f64,
    pub report_path: Option<String>,
    pub summary: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Response from `GET /api/checks/{id}`.
#[derive(Debug, Serialize)]
pub struct CheckDetailResponse {
    pub check: CheckRequest,
    pub result: Option<ResultView>,
    /// Match rows ordered by descending match score.
    pub matches: Vec<CheckMatchRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_note: Option<VerificationNote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Run a check synchronously and return its outcome.
///
/// The pipeline is CPU-bound, so it runs on the blocking pool rather than
/// the async executor. A failed check still leaves its terminal `failed`
/// request row behind; this handler only maps the error kind onto an HTTP
/// status.
pub async fn create_check(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CreateCheckRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.doc_id == 0 {
        return Err(ServerError::BadRequest("doc_id must be positive".into()));
    }
    if request.requested_by == 0 {
        return Err(ServerError::BadRequest(
            "requested_by must be positive".into(),
        ));
    }

    let checker = state.checker.clone();
    let job = CheckJob {
        doc_id: request.doc_id,
        requested_by: request.requested_by,
        max_candidates: request.max_candidates,
        cancel: None,
    };

    let outcome: CheckOutcome = tokio::task::spawn_blocking(move || checker.run_check(&job))
        .await
        .map_err(|err| ServerError::Internal(format!("check task failed: {err}")))??;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Fetch a check with its result, matches and optional reviewer note.
pub async fn get_check(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<u64>,
    Query(query): Query<GetCheckQuery>,
) -> ServerResult<impl IntoResponse> {
    let check = state.store.get_check(id)?.ok_or(ServerError::NotFound)?;

    let result_row = state.store.result_for_check(id)?;
    let (result, matches, verification_note) = match result_row {
        Some(row) => {
            let matches = state.store.matches_for_result(row.id)?;
            let note = state.store.note_for_result(row.id)?;
            let summary = serde_json::from_str(&row.summary_json)
                .unwrap_or(serde_json::Value::Null);
            (
                Some(ResultView {
                    id: row.id,
                    check_id: row.check_id,
                    similarity: row.similarity,
                    report_path: row.report_path,
                    summary,
                    created_at: row.created_at,
                }),
                matches,
                note,
            )
        }
        None => (None, Vec::new(), None),
    };

    let preview = if query.preview {
        document_preview(&state, &check)
    } else {
        None
    };

    Ok(Json(CheckDetailResponse {
        check,
        result,
        matches,
        verification_note,
        preview,
    }))
}

/// Truncated normalized-text preview of the checked document. Preview
/// failures never fail the GET; the field is simply absent.
fn document_preview(state: &ServerState, check: &CheckRequest) -> Option<String> {
    let doc = state.store.get_user_document(check.doc_id).ok()??;
    let raw = read_normalized_text(&doc.path_text).ok()?;
    let normalized = normalize::normalize(&raw);
    Some(
        normalized
            .as_str()
            .chars()
            .take(state.config.preview_chars)
            .collect(),
    )
}
