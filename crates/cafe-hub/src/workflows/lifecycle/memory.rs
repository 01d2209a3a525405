use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    ActivityId, AttendanceRecord, ParticipationRequest, ParticipationRequestId, UserId,
    VendorApplication, VendorApplicationId,
};
use super::repository::{
    AttendanceEffect, ConflictKind, ParticipationRequestRepository, ParticipationRequestWrite,
    RepositoryError, VendorApplicationRepository, VendorApplicationWrite,
};
use super::status::{
    LifecycleStatus, ParticipationRequestStatus, StatusFilter, VendorApplicationStatus,
};

#[derive(Debug, Default)]
struct StoreState {
    applications: BTreeMap<VendorApplicationId, VendorApplication>,
    requests: BTreeMap<ParticipationRequestId, ParticipationRequest>,
    attendance: BTreeMap<(ActivityId, UserId), AttendanceRecord>,
}

/// Process-local store implementing both repositories.
///
/// One lock guards every table, so a status write and its attendance effect are applied
/// together and writes to the same entity are serialized.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLifecycleStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryLifecycleStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    /// Total attendance records across every activity.
    pub fn attendance_len(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.attendance.len())
    }
}

fn newest_first<T>(records: &mut [T], sort_key: impl Fn(&T) -> (DateTime<Utc>, String)) {
    records.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
}

fn stale<S: LifecycleStatus>(found: S) -> RepositoryError {
    RepositoryError::Conflict(ConflictKind::StaleStatus {
        found: found.label().to_string(),
    })
}

impl VendorApplicationRepository for InMemoryLifecycleStore {
    fn insert(
        &self,
        application: VendorApplication,
    ) -> Result<VendorApplication, RepositoryError> {
        let mut state = self.lock()?;
        if state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict(ConflictKind::DuplicateId));
        }

        if let Some(email) = application.applicant.guest_email() {
            let duplicate = state.applications.values().any(|existing| {
                existing
                    .applicant
                    .guest_email()
                    .is_some_and(|other| other.eq_ignore_ascii_case(email))
            });
            if duplicate {
                return Err(RepositoryError::Conflict(ConflictKind::DuplicateGuestEmail));
            }
        }

        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(
        &self,
        id: &VendorApplicationId,
    ) -> Result<Option<VendorApplication>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn list_by_status(
        &self,
        filter: StatusFilter<VendorApplicationStatus>,
    ) -> Result<Vec<VendorApplication>, RepositoryError> {
        let state = self.lock()?;
        let mut applications: Vec<VendorApplication> = state
            .applications
            .values()
            .filter(|application| filter.matches(application.status))
            .cloned()
            .collect();
        newest_first(&mut applications, |application| {
            (application.created_at, application.id.0.clone())
        });
        Ok(applications)
    }

    fn write(
        &self,
        id: &VendorApplicationId,
        write: VendorApplicationWrite,
    ) -> Result<VendorApplication, RepositoryError> {
        let mut state = self.lock()?;
        let application = state
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;

        if application.status != write.expected {
            return Err(stale(application.status));
        }

        application.status = write.status;
        application.payment_confirmed_at = write.payment_confirmed_at;
        application.admin_notes = write.admin_notes;
        Ok(application.clone())
    }
}

impl ParticipationRequestRepository for InMemoryLifecycleStore {
    fn insert(
        &self,
        request: ParticipationRequest,
    ) -> Result<ParticipationRequest, RepositoryError> {
        let mut state = self.lock()?;
        if state.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict(ConflictKind::DuplicateId));
        }

        let open_request_exists = state.requests.values().any(|existing| {
            existing.activity_id == request.activity_id
                && existing.user_id == request.user_id
                && existing.status.is_open()
        });
        if open_request_exists {
            return Err(RepositoryError::Conflict(ConflictKind::OpenRequestExists));
        }

        state.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(
        &self,
        id: &ParticipationRequestId,
    ) -> Result<Option<ParticipationRequest>, RepositoryError> {
        Ok(self.lock()?.requests.get(id).cloned())
    }

    fn list_by_status(
        &self,
        filter: StatusFilter<ParticipationRequestStatus>,
    ) -> Result<Vec<ParticipationRequest>, RepositoryError> {
        let state = self.lock()?;
        let mut requests: Vec<ParticipationRequest> = state
            .requests
            .values()
            .filter(|request| filter.matches(request.status))
            .cloned()
            .collect();
        newest_first(&mut requests, |request| {
            (request.created_at, request.id.0.clone())
        });
        Ok(requests)
    }

    fn write(
        &self,
        id: &ParticipationRequestId,
        write: ParticipationRequestWrite,
    ) -> Result<ParticipationRequest, RepositoryError> {
        let mut state = self.lock()?;
        let StoreState {
            requests,
            attendance,
            ..
        } = &mut *state;

        let request = requests.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if request.status != write.expected {
            return Err(stale(request.status));
        }

        match write.attendance {
            AttendanceEffect::Keep => {}
            AttendanceEffect::Upsert(record) => {
                attendance
                    .entry((record.activity_id.clone(), record.user_id.clone()))
                    .or_insert(record);
            }
            AttendanceEffect::Remove {
                activity_id,
                user_id,
            } => {
                attendance.remove(&(activity_id, user_id));
            }
        }

        request.status = write.status;
        request.updated_at = write.updated_at;
        request.admin_notes = write.admin_notes;
        Ok(request.clone())
    }

    fn attendance(
        &self,
        activity_id: &ActivityId,
        user_id: &UserId,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .attendance
            .get(&(activity_id.clone(), user_id.clone()))
            .cloned())
    }

    fn attendance_for_activity(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .attendance
            .values()
            .filter(|record| record.activity_id == *activity_id)
            .cloned()
            .collect())
    }
}
