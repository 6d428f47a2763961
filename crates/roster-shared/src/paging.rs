//! Page and filter arithmetic for the admin user list.
//!
//! Shared so the server-rendered page, the JSON endpoint and the terminal
//! client agree on page numbers and filter values.

use crate::models::NO_CLASS_VALUE;

/// Rows per page of the admin user list.
pub const PAGE_SIZE: i64 = 50;

/// Parses a 1-based page number. Missing, non-numeric and zero values all mean page 1.
pub fn clamp_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .map(|p| p.clamp(1, u32::MAX as i64) as u32)
        .unwrap_or(1)
}

pub fn page_offset(page: u32) -> i64 {
    (page.max(1) as i64 - 1) * PAGE_SIZE
}

pub fn total_pages(total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (total + PAGE_SIZE - 1) / PAGE_SIZE
}

/// Class constraint of the user list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassFilter {
    #[default]
    Any,
    Unassigned,
    Class(String),
}

impl ClassFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Any,
            Some(NO_CLASS_VALUE) => Self::Unassigned,
            Some(class) => Self::Class(class.to_string()),
        }
    }

    /// Value used in the `class` query parameter; empty for no constraint.
    pub fn as_query_value(&self) -> &str {
        match self {
            Self::Any => "",
            Self::Unassigned => NO_CLASS_VALUE,
            Self::Class(class) => class,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}
