use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::MarketDay;

const MIN_BRAND_NAME_CHARS: usize = 2;
const MIN_DESCRIPTION_CHARS: usize = 20;
const MIN_PHONE_CHARS: usize = 10;

/// Single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field-level failure of a submission, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|error| error.field.as_str()).collect()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields().join(", ");
        write!(f, "invalid fields: {fields}")
    }
}

impl std::error::Error for ValidationErrors {}

/// Vendor form fields shared by member and guest submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorApplicationForm {
    pub brand_name: String,
    pub instagram: String,
    pub day27: bool,
    pub day28: bool,
    pub logo_url: String,
    pub description: String,
}

impl VendorApplicationForm {
    pub fn market_days(&self) -> BTreeSet<MarketDay> {
        MarketDay::from_flags(self.day27, self.day28)
    }
}

/// Unauthenticated submission: the vendor form plus contact fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestApplicationForm {
    #[serde(flatten)]
    pub application: VendorApplicationForm,
    pub guest_email: String,
    pub guest_phone: String,
}

pub(crate) fn validate_vendor_form(form: &VendorApplicationForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    collect_vendor_errors(form, &mut errors);
    errors.into_result()
}

pub(crate) fn validate_guest_form(form: &GuestApplicationForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    collect_vendor_errors(&form.application, &mut errors);

    if !is_plausible_email(&form.guest_email) {
        errors.push("guestEmail", "enter a valid e-mail address");
    }
    if char_count(&form.guest_phone) < MIN_PHONE_CHARS {
        errors.push("guestPhone", "enter a valid phone number");
    }

    errors.into_result()
}

fn collect_vendor_errors(form: &VendorApplicationForm, errors: &mut ValidationErrors) {
    if char_count(&form.brand_name) < MIN_BRAND_NAME_CHARS {
        errors.push(
            "brandName",
            format!("brand name must be at least {MIN_BRAND_NAME_CHARS} characters"),
        );
    }
    if form.instagram.trim().is_empty() {
        errors.push("instagram", "instagram link is required");
    }
    if form.logo_url.trim().is_empty() {
        errors.push("logoUrl", "a logo upload is required");
    }
    if char_count(&form.description) < MIN_DESCRIPTION_CHARS {
        errors.push(
            "description",
            format!("describe your products in at least {MIN_DESCRIPTION_CHARS} characters"),
        );
    }
    // reported on the last day checkbox, where form clients render it
    if !form.day27 && !form.day28 {
        errors.push("day28", "select at least one market day");
    }
}

fn char_count(value: &str) -> usize {
    value.trim().chars().count()
}

fn is_plausible_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor_form() -> VendorApplicationForm {
        VendorApplicationForm {
            brand_name: "Kar Tanesi Atölye".to_string(),
            instagram: "https://instagram.com/kartanesi".to_string(),
            day27: true,
            day28: false,
            logo_url: "market-logos/kartanesi.png".to_string(),
            description: "El yapımı seramik süsler ve mumlar".to_string(),
        }
    }

    #[test]
    fn accepts_complete_vendor_form() {
        assert!(validate_vendor_form(&vendor_form()).is_ok());
    }

    #[test]
    fn reports_every_invalid_field() {
        let form = VendorApplicationForm {
            brand_name: "K".to_string(),
            instagram: "  ".to_string(),
            day27: false,
            day28: false,
            logo_url: String::new(),
            description: "too short".to_string(),
        };

        let errors = validate_vendor_form(&form).expect_err("form is invalid");
        assert_eq!(
            errors.fields(),
            vec!["brandName", "instagram", "logoUrl", "description", "day28"]
        );
    }

    #[test]
    fn guest_form_requires_contact_fields() {
        let form = GuestApplicationForm {
            application: vendor_form(),
            guest_email: "not-an-email".to_string(),
            guest_phone: "555".to_string(),
        };

        let errors = validate_guest_form(&form).expect_err("contact fields invalid");
        assert_eq!(errors.fields(), vec!["guestEmail", "guestPhone"]);
    }

    #[test]
    fn email_check_rejects_obvious_garbage() {
        assert!(is_plausible_email("vendor@example.com"));
        assert!(is_plausible_email(" vendor@mail.example.org "));
        assert!(!is_plausible_email("vendor@example"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("a@b@example.com"));
        assert!(!is_plausible_email("vendor @example.com"));
        assert!(!is_plausible_email("vendor@example."));
    }

    #[test]
    fn guest_form_deserializes_from_camel_case_payload() {
        let form: GuestApplicationForm = serde_json::from_value(serde_json::json!({
            "brandName": "Kar Tanesi",
            "instagram": "@kartanesi",
            "day27": false,
            "day28": true,
            "logoUrl": "logo.png",
            "description": "El yapımı seramik süsler ve mumlar",
            "guestEmail": "vendor@example.com",
            "guestPhone": "05551234567"
        }))
        .expect("payload parses");

        assert_eq!(form.application.brand_name, "Kar Tanesi");
        assert_eq!(
            form.application.market_days().into_iter().collect::<Vec<_>>(),
            vec![MarketDay::December28]
        );
        assert!(validate_guest_form(&form).is_ok());
    }
}
