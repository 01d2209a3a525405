use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::lifecycle::domain::{
    ActivityId, Actor, Applicant, AttendanceRecord, MarketDay, ParticipationRequest,
    ParticipationRequestId, PaymentMethod, UserId, VendorApplication, VendorApplicationId,
};
use crate::workflows::lifecycle::executor::Clock;
use crate::workflows::lifecycle::memory::InMemoryLifecycleStore;
use crate::workflows::lifecycle::repository::{
    Notification, NotificationError, NotificationPublisher, ParticipationRequestRepository,
    ParticipationRequestWrite, RepositoryError, VendorApplicationRepository,
    VendorApplicationWrite,
};
use crate::workflows::lifecycle::retry::RetryPolicy;
use crate::workflows::lifecycle::service::LifecycleService;
use crate::workflows::lifecycle::status::{
    ParticipationRequestStatus, StatusFilter, VendorApplicationStatus,
};
use crate::workflows::lifecycle::validation::{GuestApplicationForm, VendorApplicationForm};
use crate::workflows::lifecycle::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

pub(super) type MemoryService =
    LifecycleService<InMemoryLifecycleStore, InMemoryLifecycleStore, MemoryNotifications>;

pub(super) const ACTIVITY: &str = "act-yoga-0112";

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn fixed_clock(now: DateTime<Utc>) -> Clock {
    Arc::new(move || now)
}

pub(super) fn admin() -> Actor {
    Actor::admin("admin-1")
}

pub(super) fn member() -> Actor {
    Actor::member("member-7")
}

pub(super) fn stranger() -> Actor {
    Actor::member("member-99")
}

pub(super) fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

pub(super) fn vendor_form() -> VendorApplicationForm {
    VendorApplicationForm {
        brand_name: "Kuzu Ceramics".to_string(),
        instagram: "https://instagram.com/kuzuceramics".to_string(),
        day27: true,
        day28: false,
        logo_url: "https://cdn.example.com/logos/kuzu.png".to_string(),
        description: "Hand thrown mugs, plates and small planters.".to_string(),
    }
}

pub(super) fn guest_form(email: &str) -> GuestApplicationForm {
    GuestApplicationForm {
        application: vendor_form(),
        guest_email: email.to_string(),
        guest_phone: "+90 532 000 11 22".to_string(),
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryLifecycleStore>,
    Arc<MemoryNotifications>,
) {
    build_service_at(at(1, 10))
}

pub(super) fn build_service_at(
    now: DateTime<Utc>,
) -> (
    MemoryService,
    Arc<InMemoryLifecycleStore>,
    Arc<MemoryNotifications>,
) {
    let store = Arc::new(InMemoryLifecycleStore::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = LifecycleService::with_clock(
        store.clone(),
        store.clone(),
        notifications.clone(),
        fast_retry(),
        fixed_clock(now),
    );
    (service, store, notifications)
}

/// Seeds a member-owned application directly in the given status.
pub(super) fn seed_application<V: VendorApplicationRepository + ?Sized>(
    store: &V,
    id: &str,
    status: VendorApplicationStatus,
    created_at: DateTime<Utc>,
) -> VendorApplication {
    let application = VendorApplication {
        id: VendorApplicationId(id.to_string()),
        applicant: Applicant::Member {
            user_id: member().user_id,
        },
        brand_name: "Kuzu Ceramics".to_string(),
        product_description: "Hand thrown mugs, plates and small planters.".to_string(),
        instagram: "https://instagram.com/kuzuceramics".to_string(),
        logo_url: "https://cdn.example.com/logos/kuzu.png".to_string(),
        participation_days: BTreeSet::from([MarketDay::December27]),
        status,
        admin_notes: None,
        created_at,
        payment_confirmed_at: None,
    };
    store.insert(application).expect("seed application")
}

/// Seeds a request owned by [`member`] directly in the given status.
pub(super) fn seed_request<P: ParticipationRequestRepository + ?Sized>(
    store: &P,
    id: &str,
    status: ParticipationRequestStatus,
) -> ParticipationRequest {
    let request = ParticipationRequest {
        id: ParticipationRequestId(id.to_string()),
        activity_id: ActivityId(ACTIVITY.to_string()),
        user_id: member().user_id,
        user_name: Some("Deniz Aydın".to_string()),
        payment_method: PaymentMethod::BankTransfer,
        status,
        admin_notes: None,
        created_at: at(1, 9),
        updated_at: at(1, 9),
    };
    store.insert(request).expect("seed request")
}

pub(super) fn attendance_for(
    store: &InMemoryLifecycleStore,
    user_id: &UserId,
) -> Option<AttendanceRecord> {
    ParticipationRequestRepository::attendance(
        store,
        &ActivityId(ACTIVITY.to_string()),
        user_id,
    )
    .expect("attendance lookup")
}

#[derive(Debug, Default)]
pub(super) struct MemoryNotifications {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifications;

impl NotificationPublisher for FailingNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
enum WriteFailure {
    #[default]
    Timeout,
    /// The write commits before the timeout is reported, as when a connection drops
    /// after commit.
    LostAck,
    /// The record disappears between fetch and write.
    Missing,
}

/// Store whose first `failures` writes fail in the configured way.
#[derive(Debug, Default)]
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryLifecycleStore,
    failures: AtomicU32,
    mode: WriteFailure,
}

impl FlakyStore {
    pub(super) fn failing_writes(failures: u32) -> Self {
        Self {
            inner: InMemoryLifecycleStore::default(),
            failures: AtomicU32::new(failures),
            mode: WriteFailure::Timeout,
        }
    }

    pub(super) fn losing_acks(failures: u32) -> Self {
        Self {
            mode: WriteFailure::LostAck,
            ..Self::failing_writes(failures)
        }
    }

    pub(super) fn missing_on_write(failures: u32) -> Self {
        Self {
            mode: WriteFailure::Missing,
            ..Self::failing_writes(failures)
        }
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl VendorApplicationRepository for FlakyStore {
    fn insert(
        &self,
        application: VendorApplication,
    ) -> Result<VendorApplication, RepositoryError> {
        VendorApplicationRepository::insert(&self.inner, application)
    }

    fn fetch(
        &self,
        id: &VendorApplicationId,
    ) -> Result<Option<VendorApplication>, RepositoryError> {
        VendorApplicationRepository::fetch(&self.inner, id)
    }

    fn list_by_status(
        &self,
        filter: StatusFilter<VendorApplicationStatus>,
    ) -> Result<Vec<VendorApplication>, RepositoryError> {
        VendorApplicationRepository::list_by_status(&self.inner, filter)
    }

    fn write(
        &self,
        id: &VendorApplicationId,
        write: VendorApplicationWrite,
    ) -> Result<VendorApplication, RepositoryError> {
        if self.take_failure() {
            return match self.mode {
                WriteFailure::Timeout => Err(RepositoryError::Timeout),
                WriteFailure::LostAck => {
                    VendorApplicationRepository::write(&self.inner, id, write)?;
                    Err(RepositoryError::Timeout)
                }
                WriteFailure::Missing => Err(RepositoryError::NotFound),
            };
        }
        VendorApplicationRepository::write(&self.inner, id, write)
    }
}

impl ParticipationRequestRepository for FlakyStore {
    fn insert(
        &self,
        request: ParticipationRequest,
    ) -> Result<ParticipationRequest, RepositoryError> {
        ParticipationRequestRepository::insert(&self.inner, request)
    }

    fn fetch(
        &self,
        id: &ParticipationRequestId,
    ) -> Result<Option<ParticipationRequest>, RepositoryError> {
        ParticipationRequestRepository::fetch(&self.inner, id)
    }

    fn list_by_status(
        &self,
        filter: StatusFilter<ParticipationRequestStatus>,
    ) -> Result<Vec<ParticipationRequest>, RepositoryError> {
        ParticipationRequestRepository::list_by_status(&self.inner, filter)
    }

    fn write(
        &self,
        id: &ParticipationRequestId,
        write: ParticipationRequestWrite,
    ) -> Result<ParticipationRequest, RepositoryError> {
        if self.take_failure() {
            return match self.mode {
                WriteFailure::Timeout => Err(RepositoryError::Timeout),
                WriteFailure::LostAck => {
                    ParticipationRequestRepository::write(&self.inner, id, write)?;
                    Err(RepositoryError::Timeout)
                }
                WriteFailure::Missing => Err(RepositoryError::NotFound),
            };
        }
        ParticipationRequestRepository::write(&self.inner, id, write)
    }

    fn attendance(
        &self,
        activity_id: &ActivityId,
        user_id: &UserId,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        ParticipationRequestRepository::attendance(&self.inner, activity_id, user_id)
    }

    fn attendance_for_activity(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        self.inner.attendance_for_activity(activity_id)
    }
}

pub(super) struct UnavailableStore;

impl VendorApplicationRepository for UnavailableStore {
    fn insert(
        &self,
        _application: VendorApplication,
    ) -> Result<VendorApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _id: &VendorApplicationId,
    ) -> Result<Option<VendorApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_status(
        &self,
        _filter: StatusFilter<VendorApplicationStatus>,
    ) -> Result<Vec<VendorApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write(
        &self,
        _id: &VendorApplicationId,
        _write: VendorApplicationWrite,
    ) -> Result<VendorApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl ParticipationRequestRepository for UnavailableStore {
    fn insert(
        &self,
        _request: ParticipationRequest,
    ) -> Result<ParticipationRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _id: &ParticipationRequestId,
    ) -> Result<Option<ParticipationRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_status(
        &self,
        _filter: StatusFilter<ParticipationRequestStatus>,
    ) -> Result<Vec<ParticipationRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write(
        &self,
        _id: &ParticipationRequestId,
        _write: ParticipationRequestWrite,
    ) -> Result<ParticipationRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn attendance(
        &self,
        _activity_id: &ActivityId,
        _user_id: &UserId,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn attendance_for_activity(
        &self,
        _activity_id: &ActivityId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    actor: Option<&Actor>,
    body: &Value,
) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.user_id.0.as_str())
            .header(
                ACTOR_ROLE_HEADER,
                if actor.is_admin() { "admin" } else { "member" },
            );
    }
    builder
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serialize body"),
        ))
        .expect("request")
}

pub(super) fn get_request(uri: &str, actor: Option<&Actor>) -> Request<axum::body::Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.user_id.0.as_str())
            .header(
                ACTOR_ROLE_HEADER,
                if actor.is_admin() { "admin" } else { "member" },
            );
    }
    builder
        .body(axum::body::Body::empty())
        .expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
