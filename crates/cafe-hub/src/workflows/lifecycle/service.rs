use std::sync::Arc;

use super::domain::{
    ActivityId, Actor, AttendanceRecord, ParticipationRequest, ParticipationRequestId, UserId,
    VendorApplication, VendorApplicationId,
};
use super::executor::{Clock, TransitionError, TransitionExecutor};
use super::intake::IntakeService;
use super::projections::{
    participation_request_summary, participation_requests_in_bucket,
    vendor_application_summary, vendor_applications_in_bucket, ParticipationRequestBucket,
    StatusSummary, VendorApplicationBucket,
};
use super::repository::{
    NotificationPublisher, ParticipationRequestRepository, RepositoryError,
    VendorApplicationRepository,
};
use super::retry::RetryPolicy;
use super::status::{ParticipationRequestStatus, VendorApplicationStatus};

/// Service composing intake, the transition executor, and the read-side projections over
/// one pair of repositories.
pub struct LifecycleService<V, P, N> {
    applications: Arc<V>,
    requests: Arc<P>,
    intake: IntakeService<V, P, N>,
    executor: TransitionExecutor<V, P>,
    retry: RetryPolicy,
}

impl<V, P, N> LifecycleService<V, P, N>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        applications: Arc<V>,
        requests: Arc<P>,
        notifications: Arc<N>,
        retry: RetryPolicy,
    ) -> Self {
        let intake = IntakeService::new(applications.clone(), requests.clone(), notifications);
        let executor = TransitionExecutor::new(applications.clone(), requests.clone());
        Self::from_parts(applications, requests, intake, executor, retry)
    }

    pub fn with_clock(
        applications: Arc<V>,
        requests: Arc<P>,
        notifications: Arc<N>,
        retry: RetryPolicy,
        clock: Clock,
    ) -> Self {
        let intake = IntakeService::with_clock(
            applications.clone(),
            requests.clone(),
            notifications,
            clock.clone(),
        );
        let executor =
            TransitionExecutor::with_clock(applications.clone(), requests.clone(), clock);
        Self::from_parts(applications, requests, intake, executor, retry)
    }

    fn from_parts(
        applications: Arc<V>,
        requests: Arc<P>,
        intake: IntakeService<V, P, N>,
        executor: TransitionExecutor<V, P>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            applications,
            requests,
            intake,
            executor,
            retry,
        }
    }

    pub fn intake(&self) -> &IntakeService<V, P, N> {
        &self.intake
    }

    pub fn executor(&self) -> &TransitionExecutor<V, P> {
        &self.executor
    }

    /// Runs the transition under the retry policy.
    ///
    /// A timed-out write may still have committed. When the next attempt finds the
    /// application already in `to`, that state is returned instead of a refusal.
    pub async fn transition_vendor_application(
        &self,
        id: &VendorApplicationId,
        to: VendorApplicationStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<VendorApplication, TransitionError> {
        let mut interrupted = false;
        self.retry
            .run("vendor application transition", || {
                let outcome = self
                    .executor
                    .transition_vendor_application(id, to, note.clone(), actor);
                settle(&mut interrupted, outcome, || {
                    self.applications
                        .fetch(id)
                        .ok()
                        .flatten()
                        .filter(|application| application.status == to)
                })
            })
            .await
    }

    pub async fn transition_participation_request(
        &self,
        id: &ParticipationRequestId,
        to: ParticipationRequestStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<ParticipationRequest, TransitionError> {
        let mut interrupted = false;
        self.retry
            .run("participation request transition", || {
                let outcome = self
                    .executor
                    .transition_participation_request(id, to, note.clone(), actor);
                settle(&mut interrupted, outcome, || {
                    self.requests
                        .fetch(id)
                        .ok()
                        .flatten()
                        .filter(|request| request.status == to)
                })
            })
            .await
    }

    pub fn vendor_application(
        &self,
        id: &VendorApplicationId,
    ) -> Result<VendorApplication, RepositoryError> {
        self.applications.fetch(id)?.ok_or(RepositoryError::NotFound)
    }

    pub fn participation_request(
        &self,
        id: &ParticipationRequestId,
    ) -> Result<ParticipationRequest, RepositoryError> {
        self.requests.fetch(id)?.ok_or(RepositoryError::NotFound)
    }

    /// Applications submitted by `owner`, newest first.
    pub fn vendor_applications_of(
        &self,
        owner: &UserId,
    ) -> Result<Vec<VendorApplication>, RepositoryError> {
        self.applications.list_for_owner(owner)
    }

    pub fn vendor_applications(
        &self,
        bucket: VendorApplicationBucket,
    ) -> Result<Vec<VendorApplication>, RepositoryError> {
        vendor_applications_in_bucket(self.applications.as_ref(), bucket)
    }

    pub fn participation_requests(
        &self,
        bucket: ParticipationRequestBucket,
    ) -> Result<Vec<ParticipationRequest>, RepositoryError> {
        participation_requests_in_bucket(self.requests.as_ref(), bucket)
    }

    pub fn vendor_application_summary(&self) -> Result<StatusSummary, RepositoryError> {
        vendor_application_summary(self.applications.as_ref())
    }

    pub fn participation_request_summary(&self) -> Result<StatusSummary, RepositoryError> {
        participation_request_summary(self.requests.as_ref())
    }

    pub fn attendance(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        self.requests.attendance_for_activity(activity_id)
    }
}

/// Turns the refusal of a replayed attempt into success once an earlier attempt of the
/// same call timed out and the store shows the requested status.
fn settle<T>(
    interrupted: &mut bool,
    outcome: Result<T, TransitionError>,
    applied: impl FnOnce() -> Option<T>,
) -> Result<T, TransitionError> {
    match outcome {
        Err(err) if err.is_transient() => {
            *interrupted = true;
            Err(err)
        }
        Err(err) if *interrupted && err.is_already_applied() => applied().ok_or(err),
        other => other,
    }
}
