pub mod base;
pub mod base_traits;
mod context;
pub mod error;
pub mod permission_dao;
pub mod role_dao;
pub mod session_dao;
pub mod user_dao;

pub use base::DaoBase;
pub use base_traits::{
    HasCreatedAtColumn, HasIdActiveModel, TimestampedActiveModel, UpdatableActiveModel,
};
pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use permission_dao::PermissionDao;
pub use role_dao::RoleDao;
pub use session_dao::{NewSession, SessionDao};
pub use user_dao::UserDao;
