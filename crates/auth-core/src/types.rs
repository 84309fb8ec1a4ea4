//! Core types for the auth subsystem

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role. Closed set; authorization checks match exhaustively on these
/// variants rather than on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_MOD")]
    Mod,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// Wire/storage name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Mod => "ROLE_MOD",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        match name {
            "ROLE_USER" => Some(Role::User),
            "ROLE_MOD" => Some(Role::Mod),
            "ROLE_ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image_url: Option<String>,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Record handed to the store when persisting a new user. The password is
/// already hashed by the time this exists.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub image_url: Option<String>,
    pub roles: Vec<Role>,
}

/// Server-side refresh credential. Opaque to clients; one row per active
/// session, rotated on every successful refresh.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: String,
    pub expiry_date: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }
}

/// Resolved identity for the current request. Built by the authorization
/// gate from a verified access token plus a fresh role lookup, passed
/// explicitly into whatever needs it and dropped at request end.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.iter().any(|r| self.roles.contains(r))
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal {
            user_id: user.id.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [Role::User, Role::Mod, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("ROLE_SUPERUSER"), None);
    }

    #[test]
    fn role_serializes_to_wire_name() {
        let json = serde_json::to_string(&vec![Role::User, Role::Mod]).unwrap();
        assert_eq!(json, r#"["ROLE_USER","ROLE_MOD"]"#);
    }

    #[test]
    fn principal_role_intersection() {
        let principal = Principal {
            user_id: "id".into(),
            username: "alice".into(),
            roles: vec![Role::User],
        };
        assert!(principal.has_any_role(&[Role::User, Role::Admin]));
        assert!(!principal.has_any_role(&[Role::Mod, Role::Admin]));
        assert!(!principal.has_any_role(&[]));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: "id".into(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            image_url: None,
            roles: vec![Role::User],
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
