//! API request handlers for the Lead Service

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{request::Parts, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use leads_common::{
    AddNoteInput, CreateLeadInput, Error, Identity, Lead, LeadId, LeadStatus, Time,
    UpdateStatusInput, UserProfile, UserRole,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};

use crate::{query::StatusSummary, service::LeadService};

/// Shared application state
pub struct AppState {
    pub service: LeadService,
    pub identity_header: HeaderName,
}

/// Verified identity of the caller, taken from the identity header.
/// A missing header means the anonymous caller.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(&state.identity_header)
            .and_then(|value| value.to_str().ok())
            .map(Identity::new)
            .unwrap_or_else(Identity::anonymous);

        Ok(Caller(identity))
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        let status = match kind {
            leads_common::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            leads_common::ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            leads_common::ErrorKind::Validation => StatusCode::BAD_REQUEST,
            leads_common::ErrorKind::Unavailable => {
                error!("Storage failure: {}", err);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        ApiError {
            status,
            kind: kind.as_str(),
            message: err.to_string(),
        }
    }
}

impl ApiError {
    fn malformed(message: String) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            kind: leads_common::ErrorKind::Validation.as_str(),
            message,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::malformed(rejection.body_text())
    }
}

/// JSON body whose parse failures are reported as validation errors
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Query string whose parse failures are reported as validation errors
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}

/// Response from lead creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadResponse {
    pub lead_id: LeadId,
}

/// Optional status filter for listings
#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub status: Option<LeadStatus>,
}

/// List of leads
#[derive(Debug, Serialize)]
pub struct LeadsListResponse {
    pub leads: Vec<Lead>,
    pub total: usize,
}

/// Single lead
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

/// Result of appending a note; `lead` is null when the lead does not exist
#[derive(Debug, Serialize)]
pub struct AddNoteResponse {
    pub lead: Option<Lead>,
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: StatusSummary,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CreatorResponse {
    pub creator: Identity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub created_time: Time,
    pub last_updated: Time,
}

/// Request to append a note
#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

/// Request to move a lead to another stage
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub new_status: LeadStatus,
}

/// Profile lookup; `profile` is null when none has been saved
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleBody {
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub is_admin: bool,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lead-service"
    }))
}

/// Create a new lead
pub async fn create_lead_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    JsonBody(payload): JsonBody<CreateLeadInput>,
) -> Result<(StatusCode, Json<CreateLeadResponse>), ApiError> {
    let lead_id = state.service.create_lead(&caller, payload).await?;

    info!("Created lead {} for {}", lead_id, caller);

    Ok((StatusCode::CREATED, Json(CreateLeadResponse { lead_id })))
}

/// List all leads, or the leads in one stage
pub async fn list_leads_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    QueryParams(query): QueryParams<ListLeadsQuery>,
) -> Result<Json<LeadsListResponse>, ApiError> {
    let leads = match query.status {
        Some(status) => state.service.get_leads_by_status(&caller, status).await?,
        None => state.service.get_all_leads(&caller).await?,
    };

    let total = leads.len();

    Ok(Json(LeadsListResponse { leads, total }))
}

/// Count all leads
pub async fn count_leads_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<TotalResponse>, ApiError> {
    let total = state.service.get_total_leads(&caller).await?;
    Ok(Json(TotalResponse { total }))
}

/// Count leads per stage
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = state.service.get_status_summary(&caller).await?;
    let total = summary.values().sum();
    Ok(Json(SummaryResponse { summary, total }))
}

/// Get a lead by ID
pub async fn get_lead_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadResponse>, ApiError> {
    let lead = state.service.get_lead(&caller, &LeadId::from(lead_id)).await?;
    Ok(Json(LeadResponse { lead }))
}

/// Get the identity that created a lead
pub async fn get_creator_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(lead_id): Path<String>,
) -> Result<Json<CreatorResponse>, ApiError> {
    let creator = state
        .service
        .get_lead_creator(&caller, &LeadId::from(lead_id))
        .await?;
    Ok(Json(CreatorResponse { creator }))
}

/// Get when a lead was created and last changed
pub async fn get_timeline_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(lead_id): Path<String>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let (created_time, last_updated) = state
        .service
        .get_lead_timeline(&caller, &LeadId::from(lead_id))
        .await?;
    Ok(Json(TimelineResponse {
        created_time,
        last_updated,
    }))
}

/// Append a note to a lead
pub async fn add_note_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(lead_id): Path<String>,
    JsonBody(payload): JsonBody<AddNoteRequest>,
) -> Result<Json<AddNoteResponse>, ApiError> {
    info!("Adding note to lead {}", lead_id);

    let lead = state
        .service
        .add_lead_note(
            &caller,
            AddNoteInput {
                lead_id: LeadId::from(lead_id),
                note: payload.note,
            },
        )
        .await?;

    Ok(Json(AddNoteResponse { lead }))
}

/// Move a lead to another stage
pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(lead_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateStatusRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .update_lead_status(
            &caller,
            UpdateStatusInput {
                lead_id: LeadId::from(lead_id),
                new_status: payload.new_status,
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get the caller's own profile
pub async fn get_own_profile_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.service.get_caller_user_profile(&caller).await?;
    Ok(Json(ProfileResponse { profile }))
}

/// Save the caller's own profile
pub async fn save_own_profile_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    JsonBody(profile): JsonBody<UserProfile>,
) -> Result<StatusCode, ApiError> {
    info!("Saving profile for {}", caller);

    state
        .service
        .save_caller_user_profile(&caller, profile)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get another caller's profile (admin only)
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(user): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .service
        .get_user_profile(&caller, &Identity::new(user))
        .await?;
    Ok(Json(ProfileResponse { profile }))
}

/// Get the caller's own role
pub async fn get_own_role_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<RoleBody>, ApiError> {
    let role = state.service.get_caller_user_role(&caller).await?;
    Ok(Json(RoleBody { role }))
}

/// Check whether the caller is an admin
pub async fn is_admin_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<AdminResponse>, ApiError> {
    let is_admin = state.service.is_caller_admin(&caller).await?;
    Ok(Json(AdminResponse { is_admin }))
}

/// Assign a role to any identity (admin only)
pub async fn assign_role_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(user): Path<String>,
    JsonBody(payload): JsonBody<RoleBody>,
) -> Result<StatusCode, ApiError> {
    info!("{} assigning role {} to {}", caller, payload.role, user);

    state
        .service
        .assign_caller_user_role(&caller, &Identity::new(user), payload.role)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
