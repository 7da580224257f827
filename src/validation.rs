//! Field-level constraints for stored records.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

pub const CATEGORY_NAME_MAX_LEN: usize = 100;
pub const CONTACT_NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 100;
pub const PHONE_MAX_LEN: usize = 17;

/// Optional `+`, optional country code `1`, then 9 to 15 digits.
pub const PHONE_PATTERN: &str = r"^\+?1?\d{9,15}$";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PHONE_PATTERN).expect("valid phone regex"));

static EMAIL_USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(?:[-!#$%&'*+/=?^_`{}|~0-9A-Z]+(?:\.[-!#$%&'*+/=?^_`{}|~0-9A-Z]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f!#-\[\]-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")$"#,
    )
    .expect("valid email user regex")
});

static EMAIL_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z0-9-]{2,63}$")
        .expect("valid email domain regex")
});

static EMAIL_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[([A-F0-9:.]+)\]$").expect("valid email literal regex")
});

/// Longest address accepted before any pattern matching is attempted.
const EMAIL_ABSOLUTE_MAX_LEN: usize = 320;

const EMAIL_DOMAIN_ALLOWLIST: &[&str] = &["localhost"];

/// Validator for the schema-level field rules.
pub struct Validator;

impl Validator {
    /// Lengths are counted in characters, not bytes.
    pub fn validate_max_length(value: &str, max: usize) -> Result<(), ValidationError> {
        if value.chars().count() > max {
            return Err(ValidationError::TooLong(max));
        }
        Ok(())
    }

    /// Validate the shape of an email address.
    pub fn validate_email(value: &str) -> Result<(), ValidationError> {
        if value.is_empty() || value.len() > EMAIL_ABSOLUTE_MAX_LEN {
            return Err(ValidationError::InvalidEmail);
        }
        let (user, domain) = value
            .rsplit_once('@')
            .ok_or(ValidationError::InvalidEmail)?;

        if !EMAIL_USER_RE.is_match(user) {
            return Err(ValidationError::InvalidEmail);
        }
        if EMAIL_DOMAIN_ALLOWLIST
            .iter()
            .any(|allowed| domain.eq_ignore_ascii_case(allowed))
        {
            return Ok(());
        }
        if Self::is_valid_email_domain(domain) {
            return Ok(());
        }
        Err(ValidationError::InvalidEmail)
    }

    fn is_valid_email_domain(domain: &str) -> bool {
        if EMAIL_DOMAIN_RE.is_match(domain) {
            // the TLD may contain '-' but not end with it
            return !domain.ends_with('-');
        }
        EMAIL_LITERAL_RE
            .captures(domain)
            .and_then(|caps| caps.get(1))
            .is_some_and(|ip| ip.as_str().parse::<IpAddr>().is_ok())
    }

    /// Validate a phone number against [`PHONE_PATTERN`].
    pub fn validate_phone_format(value: &str) -> Result<(), ValidationError> {
        if !PHONE_RE.is_match(value) {
            return Err(ValidationError::InvalidPhoneFormat);
        }
        Ok(())
    }

    /// Schema checks for a category name.
    pub fn category_name(name: &str) -> Vec<Result<(), ValidationError>> {
        vec![Self::validate_max_length(name, CATEGORY_NAME_MAX_LEN)]
    }

    /// Schema checks for a contact name. Blankness is a transfer concern.
    pub fn contact_name(name: &str) -> Vec<Result<(), ValidationError>> {
        vec![Self::validate_max_length(name, CONTACT_NAME_MAX_LEN)]
    }

    /// Schema checks for a non-empty email.
    pub fn contact_email(email: &str) -> Vec<Result<(), ValidationError>> {
        vec![
            Self::validate_max_length(email, EMAIL_MAX_LEN),
            Self::validate_email(email),
        ]
    }

    /// Schema checks for a non-empty phone number.
    pub fn contact_phone(phone: &str) -> Vec<Result<(), ValidationError>> {
        vec![
            Self::validate_max_length(phone, PHONE_MAX_LEN),
            Self::validate_phone_format(phone),
        ]
    }
}
