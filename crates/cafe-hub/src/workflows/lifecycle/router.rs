use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ActivityId, Actor, ActorRole, ParticipationRequestId, UserId, VendorApplicationId,
};
use super::intake::ParticipationRequestForm;
use super::projections::{ParticipationRequestBucket, StatusBucket, VendorApplicationBucket};
use super::repository::{
    NotificationPublisher, ParticipationRequestRepository, VendorApplicationRepository,
};
use super::service::LifecycleService;
use super::status::{LifecycleStatus, ParticipationRequestStatus, VendorApplicationStatus};
use super::validation::{GuestApplicationForm, ValidationErrors, VendorApplicationForm};
use crate::error::AppError;

/// Header carrying the authenticated user id, injected by the identity provider.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the actor role (`admin` or `member`); members are assumed when absent.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

type Shared<V, P, N> = Arc<LifecycleService<V, P, N>>;

/// Router builder exposing intake, transition, and admin projection endpoints.
pub fn lifecycle_router<V, P, N>(service: Shared<V, P, N>) -> Router
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/guest/market-applications",
            post(guest_submit_handler::<V, P, N>),
        )
        .route(
            "/api/v1/market-applications",
            post(member_submit_handler::<V, P, N>),
        )
        .route(
            "/api/v1/market-applications/:application_id",
            get(application_handler::<V, P, N>),
        )
        .route(
            "/api/v1/me/market-applications",
            get(own_applications_handler::<V, P, N>),
        )
        .route(
            "/api/v1/market-applications/:application_id/transitions",
            post(application_transition_handler::<V, P, N>),
        )
        .route(
            "/api/v1/activities/:activity_id/requests",
            post(participation_submit_handler::<V, P, N>),
        )
        .route(
            "/api/v1/participation-requests/:request_id",
            get(request_handler::<V, P, N>),
        )
        .route(
            "/api/v1/participation-requests/:request_id/transitions",
            post(request_transition_handler::<V, P, N>),
        )
        .route(
            "/api/v1/admin/market-applications",
            get(admin_applications_handler::<V, P, N>),
        )
        .route(
            "/api/v1/admin/market-applications/summary",
            get(admin_application_summary_handler::<V, P, N>),
        )
        .route(
            "/api/v1/admin/participation-requests",
            get(admin_requests_handler::<V, P, N>),
        )
        .route(
            "/api/v1/admin/participation-requests/summary",
            get(admin_request_summary_handler::<V, P, N>),
        )
        .route(
            "/api/v1/admin/activities/:activity_id/attendance",
            get(admin_attendance_handler::<V, P, N>),
        )
        .with_state(service)
}

/// Requested status change posted to a `/transitions` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionBody {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketQuery {
    #[serde(default)]
    pub bucket: Option<String>,
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let user_id = headers.get(ACTOR_ID_HEADER)?.to_str().ok()?.trim();
    if user_id.is_empty() {
        return None;
    }

    let role = match headers.get(ACTOR_ROLE_HEADER) {
        Some(value) => ActorRole::parse(value.to_str().ok()?)?,
        None => ActorRole::Member,
    };

    Some(Actor {
        user_id: UserId(user_id.to_string()),
        role,
    })
}

pub(crate) async fn guest_submit_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    payload: Result<Json<GuestApplicationForm>, JsonRejection>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let form = read_body(payload)?;
    let application = service.intake().submit_guest_application(form)?;

    let payload = json!({
        "success": true,
        "message": "application received",
        "data": {
            "id": application.id,
            "brandName": application.brand_name,
        },
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn member_submit_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    payload: Result<Json<VendorApplicationForm>, JsonRejection>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let form = read_body(payload)?;
    let application = service.intake().submit_member_application(form, &actor)?;
    Ok((StatusCode::CREATED, Json(application.view())).into_response())
}

pub(crate) async fn application_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let application = service.vendor_application(&VendorApplicationId(application_id))?;
    if !application.visible_to(&actor) {
        return Err(AppError::Forbidden);
    }
    Ok((StatusCode::OK, Json(application.view())).into_response())
}

/// The caller's own applications, newest first; dashboards show the head of the list.
pub(crate) async fn own_applications_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let applications = service.vendor_applications_of(&actor.user_id)?;
    let views: Vec<_> = applications.iter().map(|application| application.view()).collect();
    Ok((StatusCode::OK, Json(views)).into_response())
}

pub(crate) async fn application_transition_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    payload: Result<Json<TransitionBody>, JsonRejection>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let body = read_body(payload)?;
    let to = parse_status::<VendorApplicationStatus>(&body.status)?;

    let application = service
        .transition_vendor_application(
            &VendorApplicationId(application_id),
            to,
            body.note,
            &actor,
        )
        .await?;
    Ok((StatusCode::OK, Json(application.view())).into_response())
}

pub(crate) async fn participation_submit_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Path(activity_id): Path<String>,
    payload: Result<Json<ParticipationRequestForm>, JsonRejection>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let form = read_body(payload)?;
    let request = service
        .intake()
        .request_participation(ActivityId(activity_id), form, &actor)?;
    Ok((StatusCode::CREATED, Json(request.view())).into_response())
}

pub(crate) async fn request_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let request = service.participation_request(&ParticipationRequestId(request_id))?;
    if !request.visible_to(&actor) {
        return Err(AppError::Forbidden);
    }
    Ok((StatusCode::OK, Json(request.view())).into_response())
}

pub(crate) async fn request_transition_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    payload: Result<Json<TransitionBody>, JsonRejection>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = require_actor(&headers)?;
    let body = read_body(payload)?;
    let to = parse_status::<ParticipationRequestStatus>(&body.status)?;

    let request = service
        .transition_participation_request(
            &ParticipationRequestId(request_id),
            to,
            body.note,
            &actor,
        )
        .await?;
    Ok((StatusCode::OK, Json(request.view())).into_response())
}

pub(crate) async fn admin_applications_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Query(query): Query<BucketQuery>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    require_admin(&headers)?;
    let bucket = parse_bucket(query.bucket.as_deref(), VendorApplicationBucket::All)?;

    let applications = service.vendor_applications(bucket)?;
    let views: Vec<_> = applications.iter().map(|application| application.view()).collect();
    Ok((StatusCode::OK, Json(views)).into_response())
}

pub(crate) async fn admin_application_summary_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    require_admin(&headers)?;
    let summary = service.vendor_application_summary()?;
    Ok((StatusCode::OK, Json(summary)).into_response())
}

pub(crate) async fn admin_requests_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Query(query): Query<BucketQuery>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    require_admin(&headers)?;
    // the admin surface opens on the payment review tab
    let bucket = parse_bucket(
        query.bucket.as_deref(),
        ParticipationRequestBucket::PaymentSubmitted,
    )?;

    let requests = service.participation_requests(bucket)?;
    let views: Vec<_> = requests.iter().map(|request| request.view()).collect();
    Ok((StatusCode::OK, Json(views)).into_response())
}

pub(crate) async fn admin_request_summary_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    require_admin(&headers)?;
    let summary = service.participation_request_summary()?;
    Ok((StatusCode::OK, Json(summary)).into_response())
}

pub(crate) async fn admin_attendance_handler<V, P, N>(
    State(service): State<Shared<V, P, N>>,
    headers: HeaderMap,
    Path(activity_id): Path<String>,
) -> Result<Response, AppError>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    require_admin(&headers)?;
    let records = service.attendance(&ActivityId(activity_id))?;
    Ok((StatusCode::OK, Json(records)).into_response())
}

fn require_actor(headers: &HeaderMap) -> Result<Actor, AppError> {
    actor_from_headers(headers).ok_or(AppError::Unauthenticated)
}

fn require_admin(headers: &HeaderMap) -> Result<Actor, AppError> {
    let actor = require_actor(headers)?;
    if actor.is_admin() {
        Ok(actor)
    } else {
        Err(AppError::Forbidden)
    }
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationErrors::single("body", rejection.body_text()).into())
}

fn parse_status<S: LifecycleStatus>(raw: &str) -> Result<S, AppError> {
    S::parse(raw).ok_or_else(|| {
        ValidationErrors::single("status", format!("unknown status '{raw}'")).into()
    })
}

fn parse_bucket<B: StatusBucket>(raw: Option<&str>, default: B) -> Result<B, AppError> {
    match raw {
        None => Ok(default),
        Some(raw) => B::parse(raw).ok_or_else(|| {
            ValidationErrors::single("bucket", format!("unknown bucket '{raw}'")).into()
        }),
    }
}
