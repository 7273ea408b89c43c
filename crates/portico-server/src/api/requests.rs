//! Access-request routes: filing, listing, and approver decisions.

use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use portico_auth::token::Claims;
use portico_auth::workflow::{Decision, FileRequestInput};
use portico_core::activity::ActivityLogger;
use portico_core::error::PorticoError;
use portico_core::models::access_request::{AccessRequest, Approver};
use portico_core::repository::AccessRequestFilter;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::AppState;
use crate::http::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(file).get(list))
        .route("/{id}/decision", post(decide))
}

#[derive(Debug, Deserialize)]
struct FileRequestBody {
    /// Defaults to the caller's own login email.
    email: Option<String>,
    module_id: u32,
}

/// File a request for module access on behalf of the session user.
/// POST /access-requests
async fn file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<FileRequestBody>,
) -> Result<Json<AccessRequest>, ApiError> {
    let email = body.email.unwrap_or_else(|| claims.username.clone());

    let request = state
        .workflow
        .file_request(FileRequestInput {
            email,
            contact_id: None,
            module_id: body.module_id,
            requester_name: claims.username.clone(),
        })
        .await?;

    state.activity.record(
        "access_request_filed",
        &json!({ "request_id": request.id, "module_id": body.module_id }),
        &request.requested_module.to_string(),
        &claims.username,
    );

    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    email: Option<String>,
    module_id: Option<u32>,
    status: Option<u8>,
}

/// List access requests, optionally filtered.
/// GET /access-requests
async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AccessRequest>>, ApiError> {
    let requests = state
        .workflow
        .list(AccessRequestFilter {
            email: params.email,
            module_id: params.module_id,
            status_code: params.status,
        })
        .await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    /// `approve` or `reject`.
    decision: String,
    /// Role to grant on approval; defaults to the portal's first
    /// privileged role.
    granted_role_id: Option<u32>,
}

/// Apply the caller's verdict to a pending request. The approver
/// identity comes from the verified session claims, never the body;
/// the workflow refuses callers without a privileged role on the
/// requested module.
/// POST /access-requests/{id}/decision
async fn decide(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<AccessRequest>, ApiError> {
    let decision = Decision::parse(&body.decision)?;

    let approver_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| PorticoError::InvalidCredential)?;

    let decided = state
        .workflow
        .decide(
            id,
            decision,
            Approver {
                id: approver_id,
                name: claims.username.clone(),
                email: claims.username.clone(),
            },
            body.granted_role_id,
        )
        .await?;

    state.activity.record(
        "access_request_decided",
        &json!({ "request_id": id, "decision": body.decision, "status": decided.status.code() }),
        &decided.requested_module.to_string(),
        &claims.username,
    );

    Ok(Json(decided))
}
