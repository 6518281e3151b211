//! Session cookie helpers.

use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::SessionConfig;

/// Builds the session cookie for `session_id`.
#[must_use]
pub fn session_cookie(config: &SessionConfig, session_id: &str) -> Cookie<'static> {
    let max_age = Duration::seconds(i64::try_from(config.max_age.as_secs()).unwrap_or(i64::MAX));

    Cookie::build((config.cookie_name.clone(), session_id.to_string()))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Reads the session id from the request cookies.
#[must_use]
pub fn session_id(jar: &CookieJar, config: &SessionConfig) -> Option<String> {
    jar.get(&config.cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Adds the session cookie to the jar.
#[must_use]
pub fn with_session(jar: CookieJar, config: &SessionConfig, session_id: &str) -> CookieJar {
    jar.add(session_cookie(config, session_id))
}

/// Adds a removal cookie for the session to the jar.
#[must_use]
pub fn without_session(jar: CookieJar, config: &SessionConfig) -> CookieJar {
    jar.remove(
        Cookie::build((config.cookie_name.clone(), ""))
            .path("/")
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let config = SessionConfig {
            secure: true,
            ..SessionConfig::default()
        };
        let cookie = session_cookie(&config, "sid-1");
        assert_eq!(cookie.name(), "pagesaver.sid");
        assert_eq!(cookie.value(), "sid-1");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));
    }

    #[test]
    fn test_session_id_from_headers() {
        let config = SessionConfig::default();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; pagesaver.sid=abc"),
        );
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_id(&jar, &config).as_deref(), Some("abc"));

        let empty = CookieJar::new();
        assert!(session_id(&empty, &config).is_none());
    }
}
