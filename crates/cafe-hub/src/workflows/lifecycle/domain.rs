use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{LifecycleStatus, ParticipationRequestStatus, VendorApplicationStatus};

/// Identifier wrapper for market vendor applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VendorApplicationId(pub String);

/// Identifier wrapper for activity participation requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipationRequestId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(pub String);

/// Stable user id handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

macro_rules! display_inner {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_inner!(VendorApplicationId, ParticipationRequestId, ActivityId, UserId);

/// Role flag supplied by the identity provider and trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Member,
}

impl ActorRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "member" | "user" => Some(Self::Member),
            _ => None,
        }
    }
}

/// Authenticated identity attempting an operation. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: ActorRole,
}

impl Actor {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: ActorRole::Admin,
        }
    }

    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: ActorRole::Member,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    pub fn owns(&self, owner: Option<&UserId>) -> bool {
        owner.is_some_and(|owner| *owner == self.user_id)
    }
}

/// Market days a vendor can apply for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarketDay {
    #[serde(rename = "day27")]
    December27,
    #[serde(rename = "day28")]
    December28,
}

impl MarketDay {
    pub const fn label(self) -> &'static str {
        match self {
            MarketDay::December27 => "27 Aralık",
            MarketDay::December28 => "28 Aralık",
        }
    }

    pub fn from_flags(day27: bool, day28: bool) -> BTreeSet<MarketDay> {
        let mut days = BTreeSet::new();
        if day27 {
            days.insert(MarketDay::December27);
        }
        if day28 {
            days.insert(MarketDay::December28);
        }
        days
    }
}

/// Who submitted a vendor application. Guests carry contact fields instead of an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Applicant {
    Member { user_id: UserId },
    Guest { email: String, phone: String },
}

impl Applicant {
    pub fn owner(&self) -> Option<&UserId> {
        match self {
            Applicant::Member { user_id } => Some(user_id),
            Applicant::Guest { .. } => None,
        }
    }

    pub fn guest_email(&self) -> Option<&str> {
        match self {
            Applicant::Guest { email, .. } => Some(email.as_str()),
            Applicant::Member { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Applicant::Guest { .. })
    }

    pub fn guest_phone(&self) -> Option<&str> {
        match self {
            Applicant::Guest { phone, .. } => Some(phone.as_str()),
            Applicant::Member { .. } => None,
        }
    }
}

/// Seasonal market stall application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorApplication {
    pub id: VendorApplicationId,
    pub applicant: Applicant,
    pub brand_name: String,
    pub product_description: String,
    pub instagram: String,
    pub logo_url: String,
    pub participation_days: BTreeSet<MarketDay>,
    pub status: VendorApplicationStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payment_confirmed_at: Option<DateTime<Utc>>,
}

impl VendorApplication {
    /// Admins see every application; members only their own.
    pub fn visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin() || actor.owns(self.applicant.owner())
    }

    pub fn view(&self) -> VendorApplicationView {
        VendorApplicationView {
            id: self.id.clone(),
            brand_name: self.brand_name.clone(),
            product_description: self.product_description.clone(),
            owner: self.applicant.owner().cloned(),
            is_guest: self.applicant.is_guest(),
            guest_email: self.applicant.guest_email().map(str::to_string),
            guest_phone: self.applicant.guest_phone().map(str::to_string),
            participation_days: self
                .participation_days
                .iter()
                .map(|day| day.label())
                .collect(),
            instagram: self.instagram.clone(),
            logo_url: self.logo_url.clone(),
            status: self.status.label(),
            status_label: self.status.display_label(),
            admin_notes: self.admin_notes.clone(),
            created_at: self.created_at,
            payment_confirmed_at: self.payment_confirmed_at,
        }
    }
}

/// Request to attend a paid activity; payment is an attested bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRequest {
    pub id: ParticipationRequestId,
    pub activity_id: ActivityId,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: ParticipationRequestStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParticipationRequest {
    pub fn visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin() || actor.user_id == self.user_id
    }

    /// Display name copied onto the attendance record when the request is approved.
    pub fn attendance_name(&self) -> String {
        self.user_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_MEMBER_NAME)
            .to_string()
    }

    pub fn view(&self) -> ParticipationRequestView {
        ParticipationRequestView {
            id: self.id.clone(),
            activity_id: self.activity_id.clone(),
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            payment_method: self.payment_method,
            status: self.status.label(),
            status_label: self.status.display_label(),
            admin_notes: self.admin_notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub(crate) const UNKNOWN_MEMBER_NAME: &str = "Bilinmeyen";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
}

/// Dependent fact that a member is registered for an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub activity_id: ActivityId,
    pub user_id: UserId,
    pub user_name: String,
    pub attended: bool,
}

/// Public shape of a vendor application returned by the API.
///
/// Guest contact fields only reach admins: guest applications have no owner, so no
/// member passes `visible_to` for them.
#[derive(Debug, Clone, Serialize)]
pub struct VendorApplicationView {
    pub id: VendorApplicationId,
    pub brand_name: String,
    pub product_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
    pub is_guest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_phone: Option<String>,
    pub participation_days: Vec<&'static str>,
    pub instagram: String,
    pub logo_url: String,
    pub status: &'static str,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipationRequestView {
    pub id: ParticipationRequestId,
    pub activity_id: ActivityId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: &'static str,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
