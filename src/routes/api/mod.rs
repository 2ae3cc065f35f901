pub mod admin;
pub mod auth;
pub mod backoffice;
pub mod me;
mod router;

pub use router::router;
