//! Request payloads and response shapes exchanged with API callers.
//!
//! Payload fields are tri-state: absent, explicit `null`, or a value. Absent
//! fields are left untouched on update; `null` is only meaningful for
//! `category`, where it detaches the contact.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FieldErrors, ValidationError};
use crate::models::{Category, ContactRow};
use crate::validation::Validator;

/// How a payload is applied to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    /// `PUT`: required fields must be present.
    Replace,
    /// `PATCH`: every field is optional.
    Partial,
}

impl WriteMode {
    fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Distinguishes a missing key (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<i64>>,
}

/// Validated category fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryChanges {
    pub name: Option<String>,
}

/// Validated contact fields. `None` means "leave unchanged";
/// `category: Some(None)` detaches the contact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<Option<i64>>,
}

impl ContactChanges {
    pub fn is_empty(&self) -> bool {
        self == &ContactChanges::default()
    }
}

/// Resolve one text field. Surrounding whitespace is trimmed before any check.
fn text_field(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<Option<String>>,
    required: bool,
) -> Option<String> {
    match value {
        None => {
            if required {
                errors.add(field, ValidationError::Required);
            }
            None
        }
        Some(None) => {
            errors.add(field, ValidationError::Null);
            None
        }
        Some(Some(s)) => Some(s.trim().to_string()),
    }
}

impl CategoryPayload {
    pub fn validate(self, mode: WriteMode) -> Result<CategoryChanges, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = text_field(&mut errors, "name", self.name, mode.requires_all());
        if let Some(name) = &name {
            errors.check("name", Validator::category_name(name));
        }

        errors.into_result(CategoryChanges { name })
    }
}

impl ContactPayload {
    /// The category id this payload points the contact at, if any.
    pub fn category_reference(&self) -> Option<i64> {
        self.category.flatten()
    }

    /// Apply schema rules and then the stricter transfer rules.
    ///
    /// A field only reaches its transfer rule once it passes every schema
    /// rule, so each field reports errors from one stage at most.
    pub fn validate(self, mode: WriteMode) -> Result<ContactChanges, FieldErrors> {
        self.validate_with(mode, FieldErrors::new())
    }

    /// [`validate`](Self::validate), reporting `errors` found by checks made
    /// elsewhere (such as the category lookup) in the same report.
    pub fn validate_with(
        self,
        mode: WriteMode,
        mut errors: FieldErrors,
    ) -> Result<ContactChanges, FieldErrors> {

        let name = text_field(&mut errors, "name", self.name, mode.requires_all());
        if let Some(name) = &name {
            if name.is_empty() {
                errors.add("name", ValidationError::Blank);
            } else {
                errors.check("name", Validator::contact_name(name));
            }
        }

        let email = text_field(&mut errors, "email", self.email, false);
        if let Some(email) = email.as_deref().filter(|e| !e.is_empty()) {
            errors.check("email", Validator::contact_email(email));
        }

        let phone = text_field(&mut errors, "phone", self.phone, false);
        if let Some(phone) = phone.as_deref().filter(|p| !p.is_empty()) {
            errors.check("phone", Validator::contact_phone(phone));
            if !errors.has("phone") {
                errors.check("phone", [validate_phone_digits(phone)]);
            }
        }

        let address = text_field(&mut errors, "address", self.address, false);

        errors.into_result(ContactChanges {
            name,
            email,
            phone,
            address,
            category: self.category,
        })
    }
}

/// Transfer-level phone rule: digits only.
///
/// Stricter than [`crate::validation::PHONE_PATTERN`], which admits a leading
/// `+`. Both rules are kept, so `+123456789012` is rejected here.
pub fn validate_phone_digits(phone: &str) -> Result<(), ValidationError> {
    if !phone.is_empty() && !phone.chars().all(char::is_numeric) {
        return Err(ValidationError::PhoneNotDigits);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
        }
    }
}

/// A contact as seen by API callers, with the read-only `category_name`.
#[derive(Debug, Clone, Serialize)]
pub struct ContactResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub category: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ContactRow> for ContactResponse {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            category: row.category_id,
            category_name: row.category_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
