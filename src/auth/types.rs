use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Highest precedence first.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Moderator, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// The role mirrored into `users.role` for a set of held role names.
    /// Unknown names are ignored; no roles at all falls back to `user`.
    pub fn primary<'a>(names: impl IntoIterator<Item = &'a str>) -> Role {
        names
            .into_iter()
            .filter_map(|name| Role::try_from(name).ok())
            .max()
            .unwrap_or(Role::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

pub trait RequiredRole {
    fn required() -> Role;
}

pub struct UserRole;

impl RequiredRole for UserRole {
    fn required() -> Role {
        Role::User
    }
}

pub struct ModeratorRole;

impl RequiredRole for ModeratorRole {
    fn required() -> Role {
        Role::Moderator
    }
}

pub struct AdminRole;

impl RequiredRole for AdminRole {
    fn required() -> Role {
        Role::Admin
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Refresh,
}

/// What the caller asks to be signed. Timestamps are added by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub sub: String,
    pub email: String,
    pub role: String,
}

impl ClaimSet {
    pub fn new(user_id: &Uuid, email: &str, role: &str) -> Self {
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }
}

/// Signed token payload. Access tokens carry no `t`; refresh tokens carry
/// `t: "refresh"`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    pub iat: u64,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<TokenType>,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.t == Some(TokenType::Refresh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    Bearer,
    Session,
}

/// The caller of one request. `role_claim` is whatever a token said at issue
/// time and is never used for authorization; session identities carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub role_claim: Option<String>,
    pub source: IdentitySource,
    /// Set when resolving slid the session forward.
    pub renewal: Option<SessionRenewal>,
}

/// Session cookie to send back with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRenewal {
    pub token: String,
    pub max_age_secs: u64,
}

#[derive(Debug)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::{AdminRole, Claims, ModeratorRole, RequiredRole, Role, TokenType, UserRole};

    #[test]
    fn role_string_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::try_from(role.as_str()), Ok(role));
        }
        assert!(Role::try_from("manager").is_err());
        assert!(Role::try_from("Admin").is_err());
    }

    #[test]
    fn required_role_markers_map_to_expected_role() {
        assert_eq!(UserRole::required(), Role::User);
        assert_eq!(ModeratorRole::required(), Role::Moderator);
        assert_eq!(AdminRole::required(), Role::Admin);
    }

    #[test]
    fn primary_role_follows_precedence() {
        assert_eq!(Role::primary(["user", "admin", "moderator"]), Role::Admin);
        assert_eq!(Role::primary(["user", "moderator"]), Role::Moderator);
        assert_eq!(Role::primary(["support"]), Role::User);
        assert_eq!(Role::primary(Vec::<&str>::new()), Role::User);
    }

    #[test]
    fn access_claims_omit_discriminator() {
        let claims = Claims {
            sub: "u".into(),
            email: "a@b.c".into(),
            role: "user".into(),
            iat: 1,
            exp: 2,
            t: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("t").is_none());

        let refresh = Claims {
            t: Some(TokenType::Refresh),
            ..claims
        };
        let json = serde_json::to_value(&refresh).unwrap();
        assert_eq!(json["t"], "refresh");
        assert!(refresh.is_refresh());
    }
}
