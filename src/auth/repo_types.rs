use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Access level stored in `users.role` and carried in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Moderator, Role::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Moderator => "Moderator",
            Role::Admin => "Admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub name: Option<String>,
    pub role: String,
    pub avatar_url: Option<String>,
    pub dietary_preferences: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub phone_number: Option<String>,
    pub email_confirmed: bool,
    pub lockout_enabled: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub lockout_end: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or_default()
    }

    pub fn is_locked_out(&self, now: OffsetDateTime) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub name: Option<&'a str>,
    pub role: Role,
    pub email_confirmed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            username: "a".into(),
            password_hash: "x".into(),
            name: None,
            role: "Moderator".into(),
            avatar_url: None,
            dietary_preferences: None,
            dietary_restrictions: None,
            phone_number: None,
            email_confirmed: false,
            lockout_enabled: true,
            lockout_end: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" Moderator "), Some(Role::Moderator));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(user().role(), Role::Moderator);
    }

    #[test]
    fn lockout_requires_future_end_and_flag() {
        let now = OffsetDateTime::now_utc();
        let mut u = user();
        assert!(!u.is_locked_out(now));
        u.lockout_end = Some(now + Duration::days(1));
        assert!(u.is_locked_out(now));
        u.lockout_enabled = false;
        assert!(!u.is_locked_out(now));
        u.lockout_enabled = true;
        u.lockout_end = Some(now - Duration::minutes(1));
        assert!(!u.is_locked_out(now));
    }

    #[test]
    fn password_hash_not_serialized() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
