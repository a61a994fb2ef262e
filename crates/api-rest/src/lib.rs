//! # API REST
//!
//! REST API implementation for the regulation workflow.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, API-key auth)
//!
//! Uses `api-shared` for DTOs and shared utilities. The router lives here so the
//! workspace's `nir-run` binary and the standalone `nir-api-rest` binary serve the
//! same app.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::validate_api_key;
use api_shared::dto::{
    AdvanceStatusReq, ChangeSpecialtyReq, ClinicalHoldReq, ConfirmReadinessReq,
    CreateRegulationReq, DeadlineDecisionReq, HoldDeadlineReq, ListRegulationsRes,
    RegulationRes, RemoveRegulationReq, TeamSignalReq,
};
use api_shared::{HealthRes, HealthService};
use nir_core::validation::require_justification;
use nir_core::{
    apply_deadline_decision, list_records, pending_signals, CoreConfig, DeadlineDecision,
    DeadlineDialog, Initialised, RegulationError, RegulationService, ShardableUuid,
};
use nir_record::{Status, SupportType};

/// Application state for the REST API server.
///
/// Shared by all request handlers: the core configuration plus the optional API key
/// (no key configured means the API runs open).
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    api_key: Option<String>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, api_key: Option<String>) -> Self {
        Self { cfg, api_key }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_regulation,
        list_regulations,
        list_pending_signals,
        get_regulation,
        remove_regulation,
        advance_status,
        request_clinical_hold,
        set_hold_deadline,
        confirm_readiness,
        request_cancellation,
        request_relisting,
        change_specialty,
        deadline_decision,
    ),
    components(schemas(
        HealthRes,
        api_shared::dto::ActingAuthor,
        api_shared::dto::AuthorRegistrationDto,
        api_shared::dto::CreateRegulationReq,
        api_shared::dto::AdvanceStatusReq,
        api_shared::dto::ClinicalHoldReq,
        api_shared::dto::HoldDeadlineReq,
        api_shared::dto::ConfirmReadinessReq,
        api_shared::dto::TeamSignalReq,
        api_shared::dto::ChangeSpecialtyReq,
        api_shared::dto::RemoveRegulationReq,
        api_shared::dto::DeadlineDecisionReq,
        api_shared::dto::RegulationRes,
        api_shared::dto::ClinicalHoldRes,
        api_shared::dto::TeamSignalRes,
        api_shared::dto::ListRegulationsRes,
    ))
)]
struct ApiDoc;

/// Builds the REST router with all regulation endpoints.
///
/// Regulation routes sit behind the API-key middleware; `/health` and the Swagger
/// UI stay open.
pub fn router(state: AppState) -> Router {
    let regulation_routes = Router::new()
        .route("/regulations", post(create_regulation))
        .route("/regulations", get(list_regulations))
        .route("/regulations/signals", get(list_pending_signals))
        .route("/regulations/:id", get(get_regulation))
        .route("/regulations/:id", delete(remove_regulation))
        .route("/regulations/:id/status", post(advance_status))
        .route("/regulations/:id/hold", post(request_clinical_hold))
        .route("/regulations/:id/hold/deadline", post(set_hold_deadline))
        .route("/regulations/:id/confirm", post(confirm_readiness))
        .route("/regulations/:id/cancel-request", post(request_cancellation))
        .route("/regulations/:id/relist-request", post(request_relisting))
        .route("/regulations/:id/specialty", post(change_specialty))
        .route("/regulations/:id/deadline-decision", post(deadline_decision))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(regulation_routes)
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    if let Some(expected) = &state.api_key {
        let provided = request
            .headers()
            .get("x-api-key")
            .and_then(|value| value.to_str().ok());
        if let Err(err) = validate_api_key(expected, provided) {
            return Err((StatusCode::UNAUTHORIZED, err.to_string()));
        }
    }
    Ok(next.run(request).await)
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// Maps a workflow error onto an HTTP status.
///
/// Validation problems are the client's fault (400), missing records are 404,
/// state disagreements (illegal transition, wrong status, stale revision token,
/// missing hold) are 409, and anything touching storage is a 500 with the detail
/// kept out of the response body.
fn error_response(context: &'static str, err: RegulationError) -> (StatusCode, String) {
    let status = match &err {
        RegulationError::InvalidInput(_)
        | RegulationError::InvalidAuthorRegistration
        | RegulationError::ReservedAuthorTrailerKey
        | RegulationError::InvalidCareLocation
        | RegulationError::MissingCareLocation
        | RegulationError::ReservedCareLocationTrailerKey => StatusCode::BAD_REQUEST,
        RegulationError::NotFound(_) => StatusCode::NOT_FOUND,
        RegulationError::InvalidTransition { .. }
        | RegulationError::WrongStatus { .. }
        | RegulationError::RevisionConflict { .. }
        | RegulationError::HoldNotSet => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{context} error: {err:?}");
        (status, "Internal error".to_string())
    } else {
        (status, err.to_string())
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/regulations",
    request_body = CreateRegulationReq,
    responses(
        (status = 201, description = "Regulation request created", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn create_regulation(
    State(state): State<AppState>,
    Json(req): Json<CreateRegulationReq>,
) -> Result<(StatusCode, Json<RegulationRes>), (StatusCode, String)> {
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Create regulation", e))?;
    let patient_id = ShardableUuid::parse(&req.patient_id)
        .map_err(|e| error_response("Create regulation", e))?;
    let support_type = parse_support_type(&req.support_type)?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let (_, record) = RegulationService::new(state.cfg.clone())
        .initialise(&author, care_location, patient_id.uuid(), support_type)
        .map_err(|e| error_response("Create regulation", e))?;

    Ok((
        StatusCode::CREATED,
        Json(RegulationRes::from_record(&record, Utc::now())),
    ))
}

#[derive(serde::Deserialize, utoipa::IntoParams)]
struct ListParams {
    /// Include soft-deleted records.
    #[serde(default)]
    include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/regulations",
    params(ListParams),
    responses(
        (status = 200, description = "List of regulation requests", body = ListRegulationsRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_regulations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListRegulationsRes>, (StatusCode, String)> {
    let records = list_records(&state.cfg, params.include_inactive)
        .map_err(|e| error_response("List regulations", e))?;

    let now = Utc::now();
    Ok(Json(ListRegulationsRes {
        regulations: records
            .iter()
            .map(|record| RegulationRes::from_record(record, now))
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/regulations/signals",
    responses(
        (status = 200, description = "Records with pending team signals", body = ListRegulationsRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_pending_signals(
    State(state): State<AppState>,
) -> Result<Json<ListRegulationsRes>, (StatusCode, String)> {
    let records =
        pending_signals(&state.cfg).map_err(|e| error_response("List pending signals", e))?;

    let now = Utc::now();
    Ok(Json(ListRegulationsRes {
        regulations: records
            .iter()
            .map(|record| RegulationRes::from_record(record, now))
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/regulations/{id}",
    responses(
        (status = 200, description = "Regulation request", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn get_regulation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Get regulation")?;
    let record = service
        .load()
        .map_err(|e| error_response("Get regulation", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    delete,
    path = "/regulations/{id}",
    request_body = RemoveRegulationReq,
    responses(
        (status = 200, description = "Regulation request removed", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Stale revision token"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn remove_regulation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<RemoveRegulationReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Remove regulation")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Remove regulation", e))?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .soft_delete(&author, care_location, req.expected_revision)
        .map_err(|e| error_response("Remove regulation", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/status",
    request_body = AdvanceStatusReq,
    responses(
        (status = 200, description = "Status advanced", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal transition or stale revision token"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn advance_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<AdvanceStatusReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Advance status")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Advance status", e))?;
    let next = parse_status(&req.next_status)?;
    let denial_reason = match req.denial_reason.trim() {
        "" => None,
        reason => Some(
            require_justification("denial_reason", reason)
                .map_err(|e| error_response("Advance status", e))?,
        ),
    };
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .advance_status(
            &author,
            care_location,
            next,
            denial_reason,
            req.expected_revision,
        )
        .map_err(|e| error_response("Advance status", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/hold",
    request_body = ClinicalHoldReq,
    responses(
        (status = 200, description = "Clinical hold recorded", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Record not awaiting transfer"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn request_clinical_hold(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<ClinicalHoldReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Request clinical hold")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Request clinical hold", e))?;
    let reason = require_justification("reason", &req.reason)
        .map_err(|e| error_response("Request clinical hold", e))?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .request_clinical_hold(&author, care_location, reason, req.expected_revision)
        .map_err(|e| error_response("Request clinical hold", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/hold/deadline",
    request_body = HoldDeadlineReq,
    responses(
        (status = 200, description = "Hold deadline set", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "No clinical hold on the record"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn set_hold_deadline(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<HoldDeadlineReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Set hold deadline")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Set hold deadline", e))?;
    let deadline = parse_deadline(&req.deadline)?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .set_clinical_hold_deadline(&author, care_location, deadline, req.expected_revision)
        .map_err(|e| error_response("Set hold deadline", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/confirm",
    request_body = ConfirmReadinessReq,
    responses(
        (status = 200, description = "Transfer readiness confirmed", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Record not awaiting transfer"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn confirm_readiness(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<ConfirmReadinessReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Confirm readiness")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Confirm readiness", e))?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .confirm_readiness(&author, care_location, req.expected_revision)
        .map_err(|e| error_response("Confirm readiness", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/cancel-request",
    request_body = TeamSignalReq,
    responses(
        (status = 200, description = "Cancellation requested", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn request_cancellation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<TeamSignalReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Request cancellation")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Request cancellation", e))?;
    let reason = require_justification("reason", &req.reason)
        .map_err(|e| error_response("Request cancellation", e))?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .request_cancellation(&author, care_location, reason, req.expected_revision)
        .map_err(|e| error_response("Request cancellation", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/relist-request",
    request_body = TeamSignalReq,
    responses(
        (status = 200, description = "Relisting requested", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn request_relisting(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<TeamSignalReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Request relisting")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Request relisting", e))?;
    let reason = require_justification("reason", &req.reason)
        .map_err(|e| error_response("Request relisting", e))?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .request_relisting(&author, care_location, reason, req.expected_revision)
        .map_err(|e| error_response("Request relisting", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/specialty",
    request_body = ChangeSpecialtyReq,
    responses(
        (status = 200, description = "Specialty changed, workflow reset", body = RegulationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn change_specialty(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<ChangeSpecialtyReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Change specialty")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Change specialty", e))?;
    let new_type = parse_support_type(&req.new_support_type)?;
    let reason = require_justification("reason", &req.reason)
        .map_err(|e| error_response("Change specialty", e))?;
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = service
        .change_specialty(&author, care_location, new_type, reason, req.expected_revision)
        .map_err(|e| error_response("Change specialty", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/regulations/{id}/deadline-decision",
    request_body = DeadlineDecisionReq,
    responses(
        (status = 200, description = "Deadline decision applied", body = RegulationRes),
        (status = 400, description = "Bad request or deadline not expired"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Record state changed underneath the decision"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn deadline_decision(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<DeadlineDecisionReq>,
) -> Result<Json<RegulationRes>, (StatusCode, String)> {
    let service = regulation_service(&state, &id, "Deadline decision")?;
    let author = req
        .author
        .to_author()
        .map_err(|e| error_response("Deadline decision", e))?;

    let record = service
        .load()
        .map_err(|e| error_response("Deadline decision", e))?;
    DeadlineDialog::open(&record, Utc::now())
        .map_err(|e| error_response("Deadline decision", e))?;

    let decision = match req.decision.as_str() {
        "confirm_transfer" => DeadlineDecision::ConfirmTransfer,
        "request_relisting" => DeadlineDecision::RequestRelisting(
            require_justification("reason", &req.reason)
                .map_err(|e| error_response("Deadline decision", e))?,
        ),
        "request_cancellation" => DeadlineDecision::RequestCancellation(
            require_justification("reason", &req.reason)
                .map_err(|e| error_response("Deadline decision", e))?,
        ),
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown deadline decision: {other}"),
            ));
        }
    };
    let care_location = req.author.resolved_care_location(state.cfg.facility_name());

    let record = apply_deadline_decision(
        &service,
        &author,
        care_location,
        decision,
        req.expected_revision,
    )
    .map_err(|e| error_response("Deadline decision", e))?;
    Ok(Json(RegulationRes::from_record(&record, Utc::now())))
}

// ============================================================================
// HELPERS
// ============================================================================

fn regulation_service(
    state: &AppState,
    id: &str,
    context: &'static str,
) -> Result<RegulationService<Initialised>, (StatusCode, String)> {
    let uuid = ShardableUuid::parse(id).map_err(|e| error_response(context, e))?;
    Ok(RegulationService::with_id(state.cfg.clone(), uuid.uuid()))
}

fn parse_support_type(value: &str) -> Result<SupportType, (StatusCode, String)> {
    SupportType::from_str(value).map_err(|e| (StatusCode::BAD_REQUEST, e))
}

fn parse_status(value: &str) -> Result<Status, (StatusCode, String)> {
    Status::from_str(value).map_err(|e| (StatusCode::BAD_REQUEST, e))
}

fn parse_deadline(value: &str) -> Result<DateTime<Utc>, (StatusCode, String)> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("deadline is not a valid RFC 3339 timestamp: {e}"),
            )
        })
}
