// 👤 User Entity - Login + Role
//
// Users are provisioned by the seeding procedure only; there is no
// self-registration path.

use serde::{Deserialize, Serialize};

// ============================================================================
// ROLE
// ============================================================================

/// Access role carried in the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Configures stations and assigns incharges
    Admin,

    /// Field agent marking voters during house visits
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Agent => "AGENT",
        }
    }

    /// Parse the persisted role string. Unknown values are rejected rather
    /// than defaulted - a user row with a bad role is a provisioning bug.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "AGENT" => Some(Role::Agent),
            _ => None,
        }
    }
}

// ============================================================================
// USER
// ============================================================================

/// User record as persisted. `password_hash` is an argon2id PHC string and
/// never leaves the server.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn new(username: &str, password_hash: &str, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("AGENT"), Some(Role::Agent));
        assert_eq!(Role::parse(Role::Admin.as_str()), Some(Role::Admin));
        assert_eq!(Role::parse("SUPERVISOR"), None);
        assert_eq!(Role::parse("admin"), None);
    }
}
