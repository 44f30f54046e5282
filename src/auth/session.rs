//! Session context: the one place that reads or writes the bearer token cookie.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;
use time::Duration;

/// Cookie holding the access token issued by the shortener API
pub const SESSION_COOKIE: &str = "access_token";

/// How long the browser should keep the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifetime {
    /// Dropped when the browser closes ("remember me" unchecked)
    Browser,
    /// Kept for the given number of days ("remember me" checked)
    Persistent { days: i64 },
}

impl SessionLifetime {
    pub fn from_remember_me(remember: bool, ttl_days: i64) -> Self {
        if remember {
            SessionLifetime::Persistent { days: ttl_days }
        } else {
            SessionLifetime::Browser
        }
    }
}

/// Current session as seen by a request
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    token: Option<String>,
}

impl SessionContext {
    pub fn from_jar(jar: &CookieJar) -> Self {
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|value| !value.is_empty());
        Self { token }
    }

    /// Bearer token, if the visitor has one
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.token.is_some()
    }

    /// Store a freshly issued token and return the jar carrying the new cookie
    pub fn set(
        &mut self,
        jar: CookieJar,
        token: &str,
        lifetime: SessionLifetime,
        secure: bool,
    ) -> CookieJar {
        self.token = Some(token.to_string());

        let mut cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax);

        if let SessionLifetime::Persistent { days } = lifetime {
            cookie = cookie.max_age(Duration::days(days));
        }

        jar.add(cookie)
    }

    /// Forget the token and return the jar carrying the removal cookie
    pub fn clear(&mut self, jar: CookieJar) -> CookieJar {
        self.token = None;
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state).await?;
        Ok(Self::from_jar(&jar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn jar_with(cookie_header: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_reads_token_from_cookie() {
        let session = SessionContext::from_jar(&jar_with("theme=dark; access_token=abc.def"));

        assert_eq!(session.token(), Some("abc.def"));
        assert!(session.is_present());
    }

    #[test]
    fn test_missing_or_blank_token_is_absent() {
        assert!(!SessionContext::from_jar(&CookieJar::new()).is_present());
        assert!(!SessionContext::from_jar(&jar_with("access_token=")).is_present());
    }

    #[test]
    fn test_remember_me_sets_max_age() {
        let mut session = SessionContext::default();
        let jar = session.set(
            CookieJar::new(),
            "tok",
            SessionLifetime::from_remember_me(true, 7),
            true,
        );

        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(session.token(), Some("tok"));
    }

    #[test]
    fn test_without_remember_me_cookie_lives_for_browser_session() {
        let mut session = SessionContext::default();
        let jar = session.set(
            CookieJar::new(),
            "tok",
            SessionLifetime::from_remember_me(false, 7),
            false,
        );

        assert_eq!(jar.get(SESSION_COOKIE).unwrap().max_age(), None);
    }

    #[test]
    fn test_clear_drops_token() {
        let jar = jar_with("access_token=abc");
        let mut session = SessionContext::from_jar(&jar);

        let jar = session.clear(jar);

        assert!(!session.is_present());
        assert!(jar.get(SESSION_COOKIE).is_none());
    }
}
