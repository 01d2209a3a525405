use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ActivityId, AttendanceRecord, ParticipationRequest, ParticipationRequestId, UserId,
    VendorApplication, VendorApplicationId,
};
use super::status::{ParticipationRequestStatus, StatusFilter, VendorApplicationStatus};

/// Conditional status write for a vendor application.
///
/// The store applies it only while the stored status still equals `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorApplicationWrite {
    pub expected: VendorApplicationStatus,
    pub status: VendorApplicationStatus,
    pub payment_confirmed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

/// Conditional status write for a participation request, carrying its attendance side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipationRequestWrite {
    pub expected: ParticipationRequestStatus,
    pub status: ParticipationRequestStatus,
    pub updated_at: DateTime<Utc>,
    pub attendance: AttendanceEffect,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceEffect {
    Keep,
    /// Insert unless a record for the pair already exists.
    Upsert(AttendanceRecord),
    /// Delete the record for the pair if present.
    Remove {
        activity_id: ActivityId,
        user_id: UserId,
    },
}

/// Persistence boundary for vendor applications.
pub trait VendorApplicationRepository: Send + Sync {
    fn insert(&self, application: VendorApplication)
        -> Result<VendorApplication, RepositoryError>;
    fn fetch(&self, id: &VendorApplicationId)
        -> Result<Option<VendorApplication>, RepositoryError>;
    /// Newest `created_at` first.
    fn list_by_status(
        &self,
        filter: StatusFilter<VendorApplicationStatus>,
    ) -> Result<Vec<VendorApplication>, RepositoryError>;
    fn write(
        &self,
        id: &VendorApplicationId,
        write: VendorApplicationWrite,
    ) -> Result<VendorApplication, RepositoryError>;

    /// Member-owned applications of `owner`, newest `created_at` first.
    fn list_for_owner(&self, owner: &UserId) -> Result<Vec<VendorApplication>, RepositoryError> {
        let mut applications = self.list_by_status(StatusFilter::All)?;
        applications.retain(|application| application.applicant.owner() == Some(owner));
        Ok(applications)
    }
}

/// Persistence boundary for participation requests and their attendance records.
pub trait ParticipationRequestRepository: Send + Sync {
    fn insert(
        &self,
        request: ParticipationRequest,
    ) -> Result<ParticipationRequest, RepositoryError>;
    fn fetch(
        &self,
        id: &ParticipationRequestId,
    ) -> Result<Option<ParticipationRequest>, RepositoryError>;
    /// Newest `created_at` first.
    fn list_by_status(
        &self,
        filter: StatusFilter<ParticipationRequestStatus>,
    ) -> Result<Vec<ParticipationRequest>, RepositoryError>;
    /// Status write and attendance effect become visible together or not at all.
    fn write(
        &self,
        id: &ParticipationRequestId,
        write: ParticipationRequestWrite,
    ) -> Result<ParticipationRequest, RepositoryError>;
    fn attendance(
        &self,
        activity_id: &ActivityId,
        user_id: &UserId,
    ) -> Result<Option<AttendanceRecord>, RepositoryError>;
    fn attendance_for_activity(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(ConflictKind),
    #[error("store timed out")]
    Timeout,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateId,
    DuplicateGuestEmail,
    OpenRequestExists,
    /// The stored status moved on since the caller validated the transition.
    StaleStatus { found: String },
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::DuplicateId => write!(f, "record already exists"),
            ConflictKind::DuplicateGuestEmail => {
                write!(f, "an application with this e-mail already exists")
            }
            ConflictKind::OpenRequestExists => {
                write!(f, "an open request for this activity already exists")
            }
            ConflictKind::StaleStatus { found } => {
                write!(f, "status changed concurrently (now {found})")
            }
        }
    }
}

/// Outbound notification hook (e-mail or SMS adapters live outside this crate).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
