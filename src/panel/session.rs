//! Panel login session carried between the two panel calls.

use std::fmt;

use http::HeaderValue;

use crate::config::SESSION_COOKIE_NAME;

/// Authenticated panel session, scoped to a single relay request.
///
/// Holds the session cookie issued by `/login`. The value is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    cookie_value: String,
}

impl Session {
    /// Pick the session cookie out of a response's `Set-Cookie` headers.
    ///
    /// Returns `None` when the panel issued no (non-empty) session cookie. If the
    /// cookie is set more than once the last value wins.
    pub fn from_set_cookie<'a, I>(headers: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a HeaderValue>,
    {
        headers
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_session_cookie)
            .last()
            .map(|cookie_value| Self { cookie_value })
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE_NAME, self.cookie_value)
    }
}

fn parse_session_cookie(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?;
    let (name, value) = pair.split_once('=')?;

    if name.trim() != SESSION_COOKIE_NAME {
        return None;
    }

    let value = value.trim().trim_matches('"');
    if value.is_empty() {
        return None;
    }

    Some(value.to_string())
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookie", &format_args!("{}=<redacted>", SESSION_COOKIE_NAME))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<HeaderValue> {
        values
            .iter()
            .map(|v| HeaderValue::from_str(v).unwrap())
            .collect()
    }

    #[test]
    fn test_session_from_set_cookie() {
        let values = headers(&[
            "lang=en-US; Path=/",
            "3x-ui=MTcwMDAwMDAwMHxEdi1CQkFFQ180SUFBUkFCRUFBQV9; Path=/; Max-Age=3600; HttpOnly",
        ]);

        let session = Session::from_set_cookie(&values).unwrap();
        assert_eq!(
            session.cookie_header(),
            "3x-ui=MTcwMDAwMDAwMHxEdi1CQkFFQ180SUFBUkFCRUFBQV9"
        );
    }

    #[test]
    fn test_session_missing_cookie() {
        let values = headers(&["lang=en-US; Path=/"]);
        assert!(Session::from_set_cookie(&values).is_none());
        assert!(Session::from_set_cookie(&Vec::<HeaderValue>::new()).is_none());
    }

    #[test]
    fn test_session_ignores_cleared_cookie() {
        let values = headers(&["3x-ui=; Path=/; Max-Age=0"]);
        assert!(Session::from_set_cookie(&values).is_none());

        let values = headers(&["3x-ui=; Max-Age=0", "3x-ui=fresh; Path=/"]);
        let session = Session::from_set_cookie(&values).unwrap();
        assert_eq!(session.cookie_header(), "3x-ui=fresh");
    }

    #[test]
    fn test_session_debug_redacts_value() {
        let values = headers(&["3x-ui=topsecret; Path=/"]);
        let session = Session::from_set_cookie(&values).unwrap();
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("3x-ui=<redacted>"));
    }
}
