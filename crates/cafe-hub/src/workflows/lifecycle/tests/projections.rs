use super::common::*;
use crate::workflows::lifecycle::domain::{ActivityId, ParticipationRequestId};
use crate::workflows::lifecycle::projections::{
    ParticipationRequestBucket, VendorApplicationBucket,
};
use crate::workflows::lifecycle::status::{ParticipationRequestStatus, VendorApplicationStatus};

#[test]
fn vendor_summary_counts_statuses_and_tabs() {
    let (service, store, _) = build_service();
    seed_application(store.as_ref(), "mkt-1", VendorApplicationStatus::Pending, at(1, 8));
    seed_application(
        store.as_ref(),
        "mkt-2",
        VendorApplicationStatus::ApprovedWaitingPayment,
        at(1, 9),
    );
    seed_application(
        store.as_ref(),
        "mkt-3",
        VendorApplicationStatus::PaymentSubmitted,
        at(1, 10),
    );
    seed_application(store.as_ref(), "mkt-4", VendorApplicationStatus::Rejected, at(1, 11));

    let summary = service.vendor_application_summary().expect("summary");
    assert_eq!(summary.total, 4);
    assert_eq!(summary.bucket_count("payment"), 2);
    assert_eq!(summary.bucket_count("completed"), 0);
    assert_eq!(summary.status_count("approved_waiting_payment"), 1);
    assert_eq!(summary.status_count("rejected"), 1);
}

#[test]
fn bucket_listing_is_newest_first() {
    let (service, store, _) = build_service();
    seed_application(
        store.as_ref(),
        "mkt-old",
        VendorApplicationStatus::ApprovedWaitingPayment,
        at(1, 8),
    );
    seed_application(store.as_ref(), "mkt-pending", VendorApplicationStatus::Pending, at(1, 9));
    seed_application(
        store.as_ref(),
        "mkt-new",
        VendorApplicationStatus::PaymentSubmitted,
        at(2, 8),
    );

    let ids: Vec<String> = service
        .vendor_applications(VendorApplicationBucket::Payment)
        .expect("list")
        .into_iter()
        .map(|application| application.id.0)
        .collect();
    assert_eq!(ids, vec!["mkt-new", "mkt-old"]);

    let everything = service
        .vendor_applications(VendorApplicationBucket::All)
        .expect("list");
    assert_eq!(everything.len(), 3);
}

#[test]
fn projections_follow_transitions() {
    let (service, store, _) = build_service();
    seed_request(store.as_ref(), "req-1", ParticipationRequestStatus::PaymentSubmitted);

    let before = service.participation_request_summary().expect("summary");
    assert_eq!(before.bucket_count("payment_submitted"), 1);

    service
        .executor()
        .transition_participation_request(
            &ParticipationRequestId("req-1".to_string()),
            ParticipationRequestStatus::Approved,
            None,
            &admin(),
        )
        .expect("approve");

    let after = service.participation_request_summary().expect("summary");
    assert_eq!(after.bucket_count("payment_submitted"), 0);
    assert_eq!(after.bucket_count("approved"), 1);
    assert_eq!(
        service
            .participation_requests(ParticipationRequestBucket::Approved)
            .expect("list")
            .len(),
        1
    );
    assert_eq!(
        service
            .attendance(&ActivityId(ACTIVITY.to_string()))
            .expect("attendance")
            .len(),
        1
    );
}
