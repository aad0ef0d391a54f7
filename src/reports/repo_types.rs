use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportTarget {
    Recipe,
    Comment,
    Rating,
    User,
}

impl ReportTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recipe => "Recipe",
            Self::Comment => "Comment",
            Self::Rating => "Rating",
            Self::User => "User",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Recipe, Self::Comment, Self::Rating, Self::User]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Resolved => "Resolved",
            Self::Dismissed => "Dismissed",
        }
    }

    /// `None` for "All" or anything unrecognised.
    pub fn parse_filter(s: &str) -> Option<Self> {
        [Self::Pending, Self::Resolved, Self::Dismissed]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reporter_name: Option<String>,
    pub target_type: String,
    pub target_id: Uuid,
    pub reason: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    pub resolved_by: Option<Uuid>,
    pub resolver_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing() {
        assert_eq!(ReportTarget::parse("recipe"), Some(ReportTarget::Recipe));
        assert_eq!(ReportTarget::parse("Blog"), None);
        assert_eq!(ReportStatus::parse_filter("pending"), Some(ReportStatus::Pending));
        assert_eq!(ReportStatus::parse_filter("All"), None);
    }
}
