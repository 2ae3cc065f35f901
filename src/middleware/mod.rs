mod identity_headers;
mod json_error;
mod panic;
mod session_cookie;

pub use identity_headers::{
    USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLE_HEADER, set_identity_headers,
    strip_identity_headers,
};
pub use json_error::json_error_middleware;
pub use panic::catch_panic_layer;
pub use session_cookie::{
    RenewalSlot, SessionCookieSettings, offer_renewal, renew_session_cookie,
};
