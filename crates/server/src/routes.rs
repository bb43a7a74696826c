//! API route definitions

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use campusfix::mess::{AnalyticsScope, MessRatingDraft};
use campusfix::{
    IssueDraft, IssueStore, LifecycleEngine, LifecycleError, Priority, ProfileUpdate, Status,
    TransitionOutcome, User,
};

use crate::error::ApiError;

/// Shared application state
pub type AppState<S> = Arc<LifecycleEngine<S>>;

type ApiResult<T> = Result<T, ApiError>;

const LIST_CACHE_CONTROL: &str = "public, max-age=0, stale-while-revalidate=300";
const STATS_CACHE_CONTROL: &str = "public, max-age=0, stale-while-revalidate=60";

/// Create API routes
pub fn create_routes<S: IssueStore + 'static>(engine: Arc<LifecycleEngine<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/issues", get(list_issues::<S>).post(create_issue::<S>))
        .route("/issues/:id", delete(delete_issue::<S>))
        .route("/issues/:id/status", patch(change_status::<S>))
        .route("/issues/:id/comments", post(add_comment::<S>))
        .route("/issues/:id/rate", patch(rate_issue::<S>))
        .route("/stats", get(stats::<S>))
        .route("/mess/rate", post(rate_mess::<S>))
        .route("/mess/analytics", get(mess_analytics::<S>))
        .route("/users/me", get(me::<S>).put(update_me::<S>))
        .route("/users/all", get(all_students::<S>))
        .route("/users/request-hostel", post(request_hostel::<S>))
        .route("/users/:id/manage-hostel", post(manage_hostel::<S>))
        .with_state(engine)
}

/// Resolve `Authorization: Bearer <user-id>` to a user.
///
/// Token verification happens upstream; the bearer value is the user ID.
fn authenticate<S: IssueStore>(engine: &LifecycleEngine<S>, headers: &HeaderMap) -> ApiResult<User> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(LifecycleError::Unauthenticated)?;
    Ok(engine.resolve_caller(token)?)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "campusfix-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Body of `POST /issues`
///
/// Missing text fields arrive empty so the engine can name them.
#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_location: String,
    #[serde(default)]
    pub specific_location: String,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub image_data: Option<String>,
}

async fn create_issue<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
    Json(req): Json<CreateIssueRequest>,
) -> ApiResult<impl IntoResponse> {
    let caller = authenticate(&engine, &headers)?;
    let draft = IssueDraft {
        title: req.title,
        description: req.description,
        category: req.category,
        sub_location: req.sub_location,
        specific_location: req.specific_location,
        priority: req.priority.unwrap_or(Priority::Medium),
        image_data: req.image_data,
    };
    let view = engine.create_issue(draft, &caller)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// List the caller's visible issues (escalates stale ones first)
async fn list_issues<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let caller = authenticate(&engine, &headers)?;
    let views = engine.list_issues(&caller)?;
    Ok(([(header::CACHE_CONTROL, LIST_CACHE_CONTROL)], Json(views)))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Status,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub msg: String,
    pub from: Status,
    pub to: Status,
    pub trust_delta: Option<f64>,
    pub effective: bool,
}

impl From<TransitionOutcome> for StatusResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            msg: "Updated".to_string(),
            from: outcome.from,
            to: outcome.to,
            trust_delta: outcome.trust_delta,
            effective: outcome.effective,
        }
    }
}

async fn change_status<S: IssueStore>(
    State(engine): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let caller = authenticate(&engine, &headers)?;
    let outcome = engine.change_status(&id, req.status, &caller)?;
    Ok(Json(outcome.into()))
}

async fn delete_issue<S: IssueStore>(
    State(engine): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = authenticate(&engine, &headers)?;
    engine.delete_issue(&id, &caller)?;
    Ok(Json(serde_json::json!({ "msg": "Deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

async fn add_comment<S: IssueStore>(
    State(engine): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = authenticate(&engine, &headers)?;
    let comment = engine.add_comment(&id, &req.text, &caller)?;
    Ok(Json(serde_json::json!({ "msg": "Comment Added", "id": comment.id })))
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: u8,
    pub review: Option<String>,
}

async fn rate_issue<S: IssueStore>(
    State(engine): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = authenticate(&engine, &headers)?;
    engine.rate_issue(&id, req.rating, req.review, &caller)?;
    Ok(Json(serde_json::json!({ "msg": "Rated" })))
}

async fn stats<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let caller = authenticate(&engine, &headers)?;
    let stats = engine.stats(&caller)?;
    Ok(([(header::CACHE_CONTROL, STATS_CACHE_CONTROL)], Json(stats)))
}

async fn rate_mess<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
    Json(draft): Json<MessRatingDraft>,
) -> ApiResult<impl IntoResponse> {
    let caller = authenticate(&engine, &headers)?;
    let rating = engine.submit_mess_rating(draft, &caller)?;
    Ok((StatusCode::CREATED, Json(rating)))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub mess: Option<String>,
    #[serde(default)]
    pub scope: AnalyticsScope,
}

async fn mess_analytics<S: IssueStore>(
    State(engine): State<AppState<S>>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<impl IntoResponse> {
    let report = engine.mess_analytics(query.mess.as_deref(), query.scope)?;
    Ok(Json(report))
}

async fn me<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<User>> {
    Ok(Json(authenticate(&engine, &headers)?))
}

/// Edit the caller's own profile; absent fields are left as they are
async fn update_me<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let caller = authenticate(&engine, &headers)?;
    Ok(Json(engine.update_profile(&caller, update)?))
}

async fn all_students<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<User>>> {
    let caller = authenticate(&engine, &headers)?;
    Ok(Json(engine.list_students(&caller)?))
}

#[derive(Debug, Deserialize)]
pub struct HostelRequest {
    #[serde(default)]
    pub new_hostel: String,
}

async fn request_hostel<S: IssueStore>(
    State(engine): State<AppState<S>>,
    headers: HeaderMap,
    Json(req): Json<HostelRequest>,
) -> ApiResult<Json<User>> {
    let caller = authenticate(&engine, &headers)?;
    Ok(Json(engine.request_hostel_change(&caller, &req.new_hostel)?))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostelAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ManageHostelRequest {
    pub action: HostelAction,
}

async fn manage_hostel<S: IssueStore>(
    State(engine): State<AppState<S>>,
    Path(student_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ManageHostelRequest>,
) -> ApiResult<Json<User>> {
    let caller = authenticate(&engine, &headers)?;
    let approve = matches!(req.action, HostelAction::Approve);
    Ok(Json(engine.resolve_hostel_request(&caller, &student_id, approve)?))
}
