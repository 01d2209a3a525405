//! Status vocabularies and transition tables shared by every surface that moves an
//! application or request through its lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who may invoke a given edge. Administrators may invoke every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePermission {
    AdminOnly,
    ApplicantOrAdmin,
}

/// Closed status enumeration with a transition table.
pub trait LifecycleStatus: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn display_label(self) -> &'static str;

    /// Permission for the `self -> target` edge, or `None` if the edge does not exist.
    fn edge(self, target: Self) -> Option<EdgePermission>;

    fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.label().eq_ignore_ascii_case(needle))
    }

    fn targets(self) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|target| self.edge(*target).is_some())
            .collect()
    }

    fn is_terminal(self) -> bool {
        self.targets().is_empty()
    }
}

/// Market vendor application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorApplicationStatus {
    Pending,
    ApprovedWaitingPayment,
    PaymentSubmitted,
    Completed,
    Rejected,
}

impl LifecycleStatus for VendorApplicationStatus {
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::ApprovedWaitingPayment,
        Self::PaymentSubmitted,
        Self::Completed,
        Self::Rejected,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ApprovedWaitingPayment => "approved_waiting_payment",
            Self::PaymentSubmitted => "payment_submitted",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    fn display_label(self) -> &'static str {
        match self {
            Self::Pending => "Değerlendirmede",
            Self::ApprovedWaitingPayment => "Ödeme Bekleniyor",
            Self::PaymentSubmitted => "Ödeme Bildirimi Alındı",
            Self::Completed => "Tamamlandı",
            Self::Rejected => "Reddedildi",
        }
    }

    fn edge(self, target: Self) -> Option<EdgePermission> {
        use VendorApplicationStatus::*;

        match (self, target) {
            (Pending, ApprovedWaitingPayment) | (Pending, Rejected) => {
                Some(EdgePermission::AdminOnly)
            }
            (ApprovedWaitingPayment, PaymentSubmitted) => Some(EdgePermission::ApplicantOrAdmin),
            (PaymentSubmitted, ApprovedWaitingPayment) | (PaymentSubmitted, Completed) => {
                Some(EdgePermission::AdminOnly)
            }
            // reset escape hatch
            (Completed, Pending) | (Rejected, Pending) => Some(EdgePermission::AdminOnly),
            _ => None,
        }
    }
}

/// Paid activity participation request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRequestStatus {
    PendingPayment,
    PaymentSubmitted,
    Approved,
    Rejected,
    Cancelled,
}

impl ParticipationRequestStatus {
    /// Statuses that must have no attendance record once written.
    pub const fn removes_attendance(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// An open request blocks a second request for the same activity and member.
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl LifecycleStatus for ParticipationRequestStatus {
    const ALL: &'static [Self] = &[
        Self::PendingPayment,
        Self::PaymentSubmitted,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::PaymentSubmitted => "payment_submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    fn display_label(self) -> &'static str {
        match self {
            Self::PendingPayment => "Ödeme Bekleniyor",
            Self::PaymentSubmitted => "Ödeme Bildirimi",
            Self::Approved => "Onaylandı",
            Self::Rejected => "Reddedildi",
            Self::Cancelled => "İptal Edildi",
        }
    }

    fn edge(self, target: Self) -> Option<EdgePermission> {
        use ParticipationRequestStatus::*;

        match (self, target) {
            (PendingPayment, PaymentSubmitted) | (PendingPayment, Cancelled) => {
                Some(EdgePermission::ApplicantOrAdmin)
            }
            (PaymentSubmitted, PendingPayment) | (PaymentSubmitted, Approved) => {
                Some(EdgePermission::AdminOnly)
            }
            _ => None,
        }
    }
}

impl fmt::Display for VendorApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ParticipationRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Either every status or a single one, as accepted by repository scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S: LifecycleStatus> StatusFilter<S> {
    pub fn matches(&self, status: S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(expected) => *expected == status,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Some(StatusFilter::All);
        }
        S::parse(raw).map(StatusFilter::Only)
    }
}
