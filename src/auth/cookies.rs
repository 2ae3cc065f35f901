use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// httpOnly, `SameSite=Lax`, path `/`.
pub fn auth_cookie(name: &str, value: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(
            i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Empty value with `Max-Age=0`. Sent whether or not the request carried the
/// cookie.
pub fn removal_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Missing and empty cookies are both `None`.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};
    use axum_extra::extract::cookie::SameSite;

    use super::{auth_cookie, read_cookie, removal_cookie};

    #[test]
    fn auth_cookies_are_http_only_lax_root_scoped() {
        let cookie = auth_cookie("access_token", "abc".into(), 900, true);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age().map(|age| age.whole_seconds()), Some(900));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie("session_token", false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age().map(|age| age.whole_seconds()), Some(0));
        let header = cookie.to_string();
        assert!(header.starts_with("session_token=;"), "{header}");
        assert!(header.contains("Max-Age=0"), "{header}");
    }

    #[test]
    fn reads_named_cookie_only() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_token=s3cr3t; access_token="),
        );
        assert_eq!(read_cookie(&headers, "session_token").as_deref(), Some("s3cr3t"));
        assert_eq!(read_cookie(&headers, "access_token"), None);
        assert_eq!(read_cookie(&headers, "refresh_token"), None);
    }
}
