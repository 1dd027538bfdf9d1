//! # Web API Request Handlers
//!
//! Handlers grouped by API area, plus the pagination and input checks they
//! share.

pub mod adapters;
pub mod admin;
pub mod auth;
pub mod datasets;
pub mod health;
pub mod reports;
pub mod root;
pub mod runs;
pub mod tasks;
pub mod users;
pub mod webhooks;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::web::errors::ApiError;

/// Pagination block of list responses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Validated `page`/`per_page` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    /// `page >= 1`, `1 <= per_page <= 200`; defaults 1 and 20
    pub fn from_query(page: Option<i64>, per_page: Option<i64>) -> Result<Self, ApiError> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page < 1 {
            return Err(ApiError::bad_request("page must be >= 1"));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(ApiError::bad_request(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(Self { page, per_page })
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta {
            page: self.page,
            per_page: self.per_page,
            total,
        }
    }
}

/// Trimmed value whose length (in chars) lies in `min..=max`
pub(crate) fn require_text(field: &str, value: &str, min: usize, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(ApiError::bad_request(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_range(field: &str, value: i32, min: i32, max: i32) -> Result<i32, ApiError> {
    if value < min || value > max {
        return Err(ApiError::bad_request(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(value)
}

/// Minimal address shape check: `local@domain.tld`, no whitespace
pub(crate) fn require_email(value: &str) -> Result<String, ApiError> {
    let email = value.trim();
    let valid = email.len() <= 120
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !valid {
        return Err(ApiError::bad_request("email is not a valid email address"));
    }
    Ok(email.to_string())
}

/// Each tag trimmed to 1..=50 characters
pub(crate) fn require_tags(tags: Option<Vec<String>>) -> Result<Option<Vec<String>>, ApiError> {
    tags.map(|tags| {
        tags.iter()
            .map(|tag| require_text("tag", tag, 1, 50))
            .collect::<Result<Vec<_>, _>>()
    })
    .transpose()
}
