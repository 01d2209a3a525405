//! Status lifecycle for market vendor applications and activity participation requests.
//!
//! Every status change flows through [`TransitionExecutor`], which checks the edge table in
//! [`status`], authorizes the actor, and persists the write together with its attendance
//! effect through a compare-and-set on the repository. Intake creates records in their
//! initial status; projections derive the admin tabs and counts from stored statuses.

pub mod domain;
pub mod executor;
pub mod intake;
pub mod memory;
pub mod projections;
pub mod repository;
pub mod retry;
pub mod router;
pub mod service;
pub mod status;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ActivityId, Actor, ActorRole, Applicant, AttendanceRecord, MarketDay, ParticipationRequest,
    ParticipationRequestId, ParticipationRequestView, PaymentMethod, UserId, VendorApplication,
    VendorApplicationId, VendorApplicationView,
};
pub use executor::{
    Clock, EntityKind, TransitionCommand, TransitionError, TransitionExecutor, TransitionOutcome,
};
pub use intake::{IntakeError, IntakeService, ParticipationRequestForm};
pub use memory::InMemoryLifecycleStore;
pub use projections::{
    ParticipationRequestBucket, StatusBucket, StatusSummary, VendorApplicationBucket,
};
pub use repository::{
    AttendanceEffect, ConflictKind, Notification, NotificationError, NotificationPublisher,
    ParticipationRequestRepository, ParticipationRequestWrite, RepositoryError,
    VendorApplicationRepository, VendorApplicationWrite,
};
pub use retry::RetryPolicy;
pub use router::{lifecycle_router, TransitionBody, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use service::LifecycleService;
pub use status::{
    EdgePermission, LifecycleStatus, ParticipationRequestStatus, StatusFilter,
    VendorApplicationStatus,
};
pub use validation::{
    FieldError, GuestApplicationForm, ValidationErrors, VendorApplicationForm,
};
