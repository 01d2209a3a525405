use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    ActivityId, Actor, Applicant, ParticipationRequest, ParticipationRequestId, PaymentMethod,
    VendorApplication, VendorApplicationId,
};
use super::executor::{system_clock, Clock};
use super::repository::{
    Notification, NotificationPublisher, ParticipationRequestRepository, RepositoryError,
    VendorApplicationRepository,
};
use super::status::{ParticipationRequestStatus, VendorApplicationStatus};
use super::validation::{
    validate_guest_form, validate_vendor_form, GuestApplicationForm, ValidationErrors,
    VendorApplicationForm,
};

/// Body of a member's request to join a paid activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipationRequestForm {
    pub user_name: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Applicant-facing creation of applications and requests.
///
/// New entities always start in their initial status; every later change goes through
/// the transition executor.
pub struct IntakeService<V, P, N> {
    applications: Arc<V>,
    requests: Arc<P>,
    notifications: Arc<N>,
    sequence: AtomicU64,
    clock: Clock,
}

impl<V, P, N> IntakeService<V, P, N>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(applications: Arc<V>, requests: Arc<P>, notifications: Arc<N>) -> Self {
        Self::with_clock(applications, requests, notifications, system_clock())
    }

    pub fn with_clock(
        applications: Arc<V>,
        requests: Arc<P>,
        notifications: Arc<N>,
        clock: Clock,
    ) -> Self {
        Self {
            applications,
            requests,
            notifications,
            sequence: AtomicU64::new(1),
            clock,
        }
    }

    pub fn submit_guest_application(
        &self,
        form: GuestApplicationForm,
    ) -> Result<VendorApplication, IntakeError> {
        validate_guest_form(&form)?;

        let GuestApplicationForm {
            application,
            guest_email,
            guest_phone,
        } = form;
        let applicant = Applicant::Guest {
            email: guest_email.trim().to_ascii_lowercase(),
            phone: guest_phone.trim().to_string(),
        };

        self.store_application(applicant, application)
    }

    pub fn submit_member_application(
        &self,
        form: VendorApplicationForm,
        actor: &Actor,
    ) -> Result<VendorApplication, IntakeError> {
        validate_vendor_form(&form)?;

        let applicant = Applicant::Member {
            user_id: actor.user_id.clone(),
        };
        self.store_application(applicant, form)
    }

    pub fn request_participation(
        &self,
        activity_id: ActivityId,
        form: ParticipationRequestForm,
        actor: &Actor,
    ) -> Result<ParticipationRequest, IntakeError> {
        if activity_id.0.trim().is_empty() {
            return Err(ValidationErrors::single("activityId", "activity is required").into());
        }

        let now = (self.clock)();
        let request = ParticipationRequest {
            id: ParticipationRequestId(format!("req-{:06}", self.next_sequence())),
            activity_id,
            user_id: actor.user_id.clone(),
            user_name: form
                .user_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            payment_method: form.payment_method,
            status: ParticipationRequestStatus::PendingPayment,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.requests.insert(request)?;
        info!(
            request = %stored.id,
            activity = %stored.activity_id,
            user = %stored.user_id,
            "participation request received"
        );

        let mut details = BTreeMap::new();
        details.insert("request_id".to_string(), stored.id.0.clone());
        details.insert("activity_id".to_string(), stored.activity_id.0.clone());
        self.notify(Notification {
            template: "participation_request_received".to_string(),
            recipient: stored.user_id.0.clone(),
            details,
        });

        Ok(stored)
    }

    fn store_application(
        &self,
        applicant: Applicant,
        form: VendorApplicationForm,
    ) -> Result<VendorApplication, IntakeError> {
        let participation_days = form.market_days();
        let VendorApplicationForm {
            brand_name,
            instagram,
            logo_url,
            description,
            ..
        } = form;

        let application = VendorApplication {
            id: VendorApplicationId(format!("mkt-{:06}", self.next_sequence())),
            applicant,
            brand_name: brand_name.trim().to_string(),
            product_description: description.trim().to_string(),
            instagram: instagram.trim().to_string(),
            logo_url: logo_url.trim().to_string(),
            participation_days,
            status: VendorApplicationStatus::Pending,
            admin_notes: None,
            created_at: (self.clock)(),
            payment_confirmed_at: None,
        };

        let stored = self.applications.insert(application)?;
        info!(
            application = %stored.id,
            guest = stored.applicant.is_guest(),
            "vendor application received"
        );

        let recipient = match &stored.applicant {
            Applicant::Guest { email, .. } => email.clone(),
            Applicant::Member { user_id } => user_id.0.clone(),
        };
        let mut details = BTreeMap::new();
        details.insert("application_id".to_string(), stored.id.0.clone());
        details.insert("brand_name".to_string(), stored.brand_name.clone());
        self.notify(Notification {
            template: "market_application_received".to_string(),
            recipient,
            details,
        });

        Ok(stored)
    }

    /// Runs after the insert is visible; failures never undo the submission.
    fn notify(&self, notification: Notification) {
        let template = notification.template.clone();
        if let Err(err) = self.notifications.publish(notification) {
            warn!(%template, error = %err, "notification dispatch failed");
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

/// Error raised by applicant-facing intake.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
