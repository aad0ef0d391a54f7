use serde::{Deserialize, Serialize};

use crate::pagination::{PageQuery, DEFAULT_PAGE_SIZE};

/// `?search=&page=&page_size=` shared by the admin lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
}

impl ListQuery {
    pub fn paging(&self) -> PageQuery {
        PageQuery {
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email_confirmed: bool,
    #[serde(default)]
    pub lockout_enabled: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub lockout_end: Option<time::OffsetDateTime>,
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LockRequest {
    #[serde(default)]
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportActionRequest {
    pub action: String,
}
