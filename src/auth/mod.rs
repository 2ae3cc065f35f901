pub mod clock;
pub mod cookies;
pub mod credentials;
pub mod guards;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod session;
pub mod taxonomy;
mod types;

pub use types::{
    AdminRole, ClaimSet, Claims, Identity, IdentitySource, ModeratorRole, RequiredRole, Role,
    SessionRenewal, TokenBundle, TokenType, UserRole,
};
