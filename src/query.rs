//! Contact list query parameters: filters, search terms and ordering.

use serde::Deserialize;

use crate::db::{format_timestamp, parse_timestamp};
use crate::error::{FieldErrors, ValidationError};

/// Raw query string of `GET /contacts`.
#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    /// Category id.
    pub category: Option<String>,
    /// Category name, matched exactly.
    pub category_name: Option<String>,
    pub created_at: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Columns a contact list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Name,
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(OrderField::Name),
            "created_at" => Some(OrderField::CreatedAt),
            "updated_at" => Some(OrderField::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            OrderField::Name => "c.name",
            OrderField::CreatedAt => "c.created_at",
            OrderField::UpdatedAt => "c.updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: OrderField,
    pub descending: bool,
}

/// Newest first.
pub const DEFAULT_ORDERING: OrderTerm = OrderTerm {
    field: OrderField::CreatedAt,
    descending: true,
};

/// A parsed contact list request. All filters combine with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactFilter {
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    /// Canonical timestamp text, comparable to stored values.
    pub created_at: Option<String>,
    pub search_terms: Vec<String>,
    pub ordering: Vec<OrderTerm>,
}

impl Default for ContactFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            category_name: None,
            created_at: None,
            search_terms: Vec::new(),
            ordering: vec![DEFAULT_ORDERING],
        }
    }
}

impl ContactListQuery {
    pub fn into_filter(self) -> Result<ContactFilter, FieldErrors> {
        let mut errors = FieldErrors::new();

        let category_id = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("category", ValidationError::InvalidInteger);
                    None
                }
            },
        };

        let created_at = match self.created_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_timestamp(raw) {
                Some(ts) => Some(format_timestamp(ts)),
                None => {
                    errors.add("created_at", ValidationError::InvalidDateTime);
                    None
                }
            },
        };

        let search_terms = self
            .search
            .as_deref()
            .map(split_search_terms)
            .unwrap_or_default();

        let ordering = self
            .ordering
            .as_deref()
            .map(parse_ordering)
            .unwrap_or_else(|| vec![DEFAULT_ORDERING]);

        errors.into_result(ContactFilter {
            category_id,
            category_name: self.category_name,
            created_at,
            search_terms,
            ordering,
        })
    }
}

/// Split a search string on whitespace and commas, lowercased to match
/// [`search_text`]. NUL bytes are dropped.
pub fn split_search_terms(search: &str) -> Vec<String> {
    search
        .replace('\0', "")
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// The stored search column: searchable fields lowercased, one per line.
/// Terms never contain whitespace, so a term cannot span two fields.
pub fn search_text(name: &str, email: &str, phone: &str) -> String {
    format!("{name}\n{email}\n{phone}").to_lowercase()
}

/// Parse `name,-created_at` style ordering. Unknown fields are dropped and an
/// ordering with no usable field falls back to [`DEFAULT_ORDERING`].
pub fn parse_ordering(ordering: &str) -> Vec<OrderTerm> {
    let terms: Vec<OrderTerm> = ordering
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (descending, name) = match term.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, term),
            };
            OrderField::parse(name).map(|field| OrderTerm { field, descending })
        })
        .collect();

    if terms.is_empty() {
        vec![DEFAULT_ORDERING]
    } else {
        terms
    }
}

/// Escape `LIKE` wildcards so a term matches literally (escape char `\`).
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
