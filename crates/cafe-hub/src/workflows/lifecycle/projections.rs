//! Read-side aggregations for the admin dashboards. Computed at read time and never used
//! to validate transitions.

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{ParticipationRequest, VendorApplication};
use super::repository::{
    ParticipationRequestRepository, RepositoryError, VendorApplicationRepository,
};
use super::status::{
    LifecycleStatus, ParticipationRequestStatus, StatusFilter, VendorApplicationStatus,
};

/// Dashboard tab grouping one or more raw statuses.
pub trait StatusBucket: Copy + Sized + 'static {
    type Status: LifecycleStatus;

    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    /// Raw statuses in the bucket; empty means every status.
    fn statuses(self) -> &'static [Self::Status];

    fn contains(self, status: Self::Status) -> bool {
        let statuses = self.statuses();
        statuses.is_empty() || statuses.contains(&status)
    }

    fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|bucket| bucket.label().eq_ignore_ascii_case(needle))
    }

    /// Narrowest repository scan that still covers the bucket.
    fn scan_filter(self) -> StatusFilter<Self::Status> {
        match self.statuses() {
            [single] => StatusFilter::Only(*single),
            _ => StatusFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorApplicationBucket {
    All,
    Pending,
    Payment,
    Completed,
    Rejected,
}

impl StatusBucket for VendorApplicationBucket {
    type Status = VendorApplicationStatus;

    const ALL: &'static [Self] = &[
        Self::All,
        Self::Pending,
        Self::Payment,
        Self::Completed,
        Self::Rejected,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Payment => "payment",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    fn statuses(self) -> &'static [VendorApplicationStatus] {
        match self {
            Self::All => &[],
            Self::Pending => &[VendorApplicationStatus::Pending],
            Self::Payment => &[
                VendorApplicationStatus::ApprovedWaitingPayment,
                VendorApplicationStatus::PaymentSubmitted,
            ],
            Self::Completed => &[VendorApplicationStatus::Completed],
            Self::Rejected => &[VendorApplicationStatus::Rejected],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRequestBucket {
    All,
    PaymentSubmitted,
    Pending,
    Approved,
    Rejected,
}

impl StatusBucket for ParticipationRequestBucket {
    type Status = ParticipationRequestStatus;

    const ALL: &'static [Self] = &[
        Self::All,
        Self::PaymentSubmitted,
        Self::Pending,
        Self::Approved,
        Self::Rejected,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::PaymentSubmitted => "payment_submitted",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn statuses(self) -> &'static [ParticipationRequestStatus] {
        match self {
            Self::All => &[],
            Self::PaymentSubmitted => &[ParticipationRequestStatus::PaymentSubmitted],
            Self::Pending => &[ParticipationRequestStatus::PendingPayment],
            Self::Approved => &[ParticipationRequestStatus::Approved],
            Self::Rejected => &[
                ParticipationRequestStatus::Rejected,
                ParticipationRequestStatus::Cancelled,
            ],
        }
    }
}

/// Counts per raw status and per dashboard bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_bucket: BTreeMap<&'static str, usize>,
}

impl StatusSummary {
    pub fn tally<B, I>(statuses: I) -> Self
    where
        B: StatusBucket,
        I: IntoIterator<Item = B::Status>,
    {
        let mut by_status: BTreeMap<&'static str, usize> = <B::Status as LifecycleStatus>::ALL
            .iter()
            .map(|status| (status.label(), 0))
            .collect();
        let mut by_bucket: BTreeMap<&'static str, usize> =
            B::ALL.iter().map(|bucket| (bucket.label(), 0)).collect();
        let mut total = 0;

        for status in statuses {
            total += 1;
            *by_status.entry(status.label()).or_default() += 1;
            for bucket in B::ALL.iter().filter(|bucket| bucket.contains(status)) {
                *by_bucket.entry(bucket.label()).or_default() += 1;
            }
        }

        Self {
            total,
            by_status,
            by_bucket,
        }
    }

    pub fn status_count(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or_default()
    }

    pub fn bucket_count(&self, bucket: &str) -> usize {
        self.by_bucket.get(bucket).copied().unwrap_or_default()
    }
}

pub fn vendor_application_summary<V>(repository: &V) -> Result<StatusSummary, RepositoryError>
where
    V: VendorApplicationRepository + ?Sized,
{
    let applications = repository.list_by_status(StatusFilter::All)?;
    Ok(StatusSummary::tally::<VendorApplicationBucket, _>(
        applications.iter().map(|application| application.status),
    ))
}

pub fn vendor_applications_in_bucket<V>(
    repository: &V,
    bucket: VendorApplicationBucket,
) -> Result<Vec<VendorApplication>, RepositoryError>
where
    V: VendorApplicationRepository + ?Sized,
{
    let mut applications = repository.list_by_status(bucket.scan_filter())?;
    applications.retain(|application| bucket.contains(application.status));
    Ok(applications)
}

pub fn participation_request_summary<P>(repository: &P) -> Result<StatusSummary, RepositoryError>
where
    P: ParticipationRequestRepository + ?Sized,
{
    let requests = repository.list_by_status(StatusFilter::All)?;
    Ok(StatusSummary::tally::<ParticipationRequestBucket, _>(
        requests.iter().map(|request| request.status),
    ))
}

pub fn participation_requests_in_bucket<P>(
    repository: &P,
    bucket: ParticipationRequestBucket,
) -> Result<Vec<ParticipationRequest>, RepositoryError>
where
    P: ParticipationRequestRepository + ?Sized,
{
    let mut requests = repository.list_by_status(bucket.scan_filter())?;
    requests.retain(|request| bucket.contains(request.status));
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_bucket_groups_both_payment_statuses() {
        let bucket = VendorApplicationBucket::Payment;
        assert!(bucket.contains(VendorApplicationStatus::ApprovedWaitingPayment));
        assert!(bucket.contains(VendorApplicationStatus::PaymentSubmitted));
        assert!(!bucket.contains(VendorApplicationStatus::Completed));
        assert_eq!(bucket.scan_filter(), StatusFilter::All);
        assert_eq!(
            VendorApplicationBucket::Completed.scan_filter(),
            StatusFilter::Only(VendorApplicationStatus::Completed)
        );
    }

    #[test]
    fn rejected_tab_groups_rejected_and_cancelled_requests() {
        let summary = StatusSummary::tally::<ParticipationRequestBucket, _>([
            ParticipationRequestStatus::Rejected,
            ParticipationRequestStatus::Cancelled,
            ParticipationRequestStatus::Approved,
            ParticipationRequestStatus::PaymentSubmitted,
        ]);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.bucket_count("all"), 4);
        assert_eq!(summary.bucket_count("rejected"), 2);
        assert_eq!(summary.bucket_count("pending"), 0);
        assert_eq!(summary.status_count("cancelled"), 1);
        assert_eq!(summary.status_count("pending_payment"), 0);
    }

    #[test]
    fn bucket_labels_parse_case_insensitively() {
        assert_eq!(
            VendorApplicationBucket::parse("Payment"),
            Some(VendorApplicationBucket::Payment)
        );
        assert_eq!(
            ParticipationRequestBucket::parse("payment_submitted"),
            Some(ParticipationRequestBucket::PaymentSubmitted)
        );
        assert!(ParticipationRequestBucket::parse("completed").is_none());
    }
}
