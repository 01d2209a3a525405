use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    Actor, AttendanceRecord, ParticipationRequest, ParticipationRequestId, UserId,
    VendorApplication, VendorApplicationId,
};
use super::repository::{
    AttendanceEffect, ConflictKind, ParticipationRequestRepository, ParticipationRequestWrite,
    RepositoryError, VendorApplicationRepository, VendorApplicationWrite,
};
use super::status::{
    EdgePermission, LifecycleStatus, ParticipationRequestStatus, VendorApplicationStatus,
};

/// Source of "now" for timestamps stamped by transitions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub(crate) fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    VendorApplication,
    ParticipationRequest,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::VendorApplication => f.write_str("vendor application"),
            EntityKind::ParticipationRequest => f.write_str("participation request"),
        }
    }
}

/// A requested status change for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionCommand {
    VendorApplication {
        id: VendorApplicationId,
        to: VendorApplicationStatus,
        note: Option<String>,
    },
    ParticipationRequest {
        id: ParticipationRequestId,
        to: ParticipationRequestStatus,
        note: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    VendorApplication(VendorApplication),
    ParticipationRequest(ParticipationRequest),
}

/// Error raised when a transition is refused or cannot be persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("{actor} may not move {kind} {id} to {to}")]
    Unauthorized {
        kind: EntityKind,
        id: String,
        actor: UserId,
        to: &'static str,
    },
    #[error("{kind} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        kind: EntityKind,
        id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error("{kind} {id}: {reason}")]
    Conflict {
        kind: EntityKind,
        id: String,
        reason: ConflictKind,
    },
    #[error("store temporarily unavailable: {0}")]
    Transient(String),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl TransitionError {
    /// Safe to retry unmodified.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransitionError::Transient(_))
    }

    /// The entity already sits in the requested status.
    pub fn is_already_applied(&self) -> bool {
        matches!(self, TransitionError::InvalidTransition { from, to, .. } if from == to)
    }

    fn from_repository(kind: EntityKind, id: &str, error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => TransitionError::NotFound {
                kind,
                id: id.to_string(),
            },
            RepositoryError::Conflict(reason) => TransitionError::Conflict {
                kind,
                id: id.to_string(),
                reason,
            },
            RepositoryError::Timeout => TransitionError::Transient("store timed out".to_string()),
            RepositoryError::Unavailable(detail) => TransitionError::Transient(detail),
        }
    }

    fn from_write(kind: EntityKind, id: &str, error: RepositoryError) -> Self {
        match error {
            // records are never deleted, so a miss right after a successful fetch is a broken store
            RepositoryError::NotFound => {
                TransitionError::Unexpected(format!("{kind} {id} vanished during write"))
            }
            other => Self::from_repository(kind, id, other),
        }
    }
}

/// The only path through which an application or request status may change.
pub struct TransitionExecutor<V, P> {
    applications: Arc<V>,
    requests: Arc<P>,
    clock: Clock,
}

impl<V, P> TransitionExecutor<V, P>
where
    V: VendorApplicationRepository + 'static,
    P: ParticipationRequestRepository + 'static,
{
    pub fn new(applications: Arc<V>, requests: Arc<P>) -> Self {
        Self::with_clock(applications, requests, system_clock())
    }

    pub fn with_clock(applications: Arc<V>, requests: Arc<P>, clock: Clock) -> Self {
        Self {
            applications,
            requests,
            clock,
        }
    }

    pub fn transition(
        &self,
        command: TransitionCommand,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        match command {
            TransitionCommand::VendorApplication { id, to, note } => self
                .transition_vendor_application(&id, to, note, actor)
                .map(TransitionOutcome::VendorApplication),
            TransitionCommand::ParticipationRequest { id, to, note } => self
                .transition_participation_request(&id, to, note, actor)
                .map(TransitionOutcome::ParticipationRequest),
        }
    }

    pub fn transition_vendor_application(
        &self,
        id: &VendorApplicationId,
        to: VendorApplicationStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<VendorApplication, TransitionError> {
        const KIND: EntityKind = EntityKind::VendorApplication;
        let note = clean_note(note);

        let current = self
            .applications
            .fetch(id)
            .map_err(|err| TransitionError::from_repository(KIND, &id.0, err))?
            .ok_or_else(|| TransitionError::NotFound {
                kind: KIND,
                id: id.0.clone(),
            })?;

        check_edge(
            KIND,
            &id.0,
            current.status,
            to,
            actor,
            current.applicant.owner(),
            note.is_some(),
        )?;

        let payment_confirmed_at = if to == VendorApplicationStatus::Completed {
            Some(self.now().max(current.created_at))
        } else {
            current.payment_confirmed_at
        };

        let write = VendorApplicationWrite {
            expected: current.status,
            status: to,
            payment_confirmed_at,
            admin_notes: note.or(current.admin_notes),
        };

        let updated = self
            .applications
            .write(id, write)
            .map_err(|err| refused(TransitionError::from_write(KIND, &id.0, err)))?;

        info!(
            application = %id,
            from = current.status.label(),
            to = to.label(),
            actor = %actor.user_id,
            "vendor application transitioned"
        );
        Ok(updated)
    }

    pub fn transition_participation_request(
        &self,
        id: &ParticipationRequestId,
        to: ParticipationRequestStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<ParticipationRequest, TransitionError> {
        const KIND: EntityKind = EntityKind::ParticipationRequest;
        let note = clean_note(note);

        let current = self
            .requests
            .fetch(id)
            .map_err(|err| TransitionError::from_repository(KIND, &id.0, err))?
            .ok_or_else(|| TransitionError::NotFound {
                kind: KIND,
                id: id.0.clone(),
            })?;

        check_edge(
            KIND,
            &id.0,
            current.status,
            to,
            actor,
            Some(&current.user_id),
            note.is_some(),
        )?;

        let attendance = if to == ParticipationRequestStatus::Approved {
            AttendanceEffect::Upsert(AttendanceRecord {
                activity_id: current.activity_id.clone(),
                user_id: current.user_id.clone(),
                user_name: current.attendance_name(),
                attended: false,
            })
        } else if to.removes_attendance() {
            AttendanceEffect::Remove {
                activity_id: current.activity_id.clone(),
                user_id: current.user_id.clone(),
            }
        } else {
            AttendanceEffect::Keep
        };

        let write = ParticipationRequestWrite {
            expected: current.status,
            status: to,
            updated_at: self.now().max(current.updated_at),
            attendance,
            admin_notes: note.or(current.admin_notes),
        };

        let updated = self
            .requests
            .write(id, write)
            .map_err(|err| refused(TransitionError::from_write(KIND, &id.0, err)))?;

        info!(
            request = %id,
            activity = %updated.activity_id,
            from = current.status.label(),
            to = to.label(),
            actor = %actor.user_id,
            "participation request transitioned"
        );
        Ok(updated)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/// Gate non-owners, validate the edge against the table, then check the actor against the
/// edge permission.
fn check_edge<S: LifecycleStatus>(
    kind: EntityKind,
    id: &str,
    from: S,
    to: S,
    actor: &Actor,
    owner: Option<&UserId>,
    carries_note: bool,
) -> Result<EdgePermission, TransitionError> {
    let unauthorized = || {
        refused(TransitionError::Unauthorized {
            kind,
            id: id.to_string(),
            actor: actor.user_id.clone(),
            to: to.label(),
        })
    };

    // actors who cannot read the entity learn nothing about its current status
    if !actor.is_admin() && !actor.owns(owner) {
        return Err(unauthorized());
    }

    let Some(permission) = from.edge(to) else {
        return Err(refused(TransitionError::InvalidTransition {
            kind,
            id: id.to_string(),
            from: from.label(),
            to: to.label(),
        }));
    };

    // notes are an admin annotation even on applicant edges
    let allowed = actor.is_admin()
        || (permission == EdgePermission::ApplicantOrAdmin && !carries_note);

    if allowed {
        Ok(permission)
    } else {
        Err(unauthorized())
    }
}

/// Blank notes are dropped so they never overwrite an existing annotation.
fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty())
}

fn refused(error: TransitionError) -> TransitionError {
    warn!(%error, "transition refused");
    error
}
