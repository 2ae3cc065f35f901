pub mod auth_service;
pub mod context;
pub mod rbac_service;
pub mod user_service;

pub use context::ServiceContext;
