use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderValue};

/// Cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "token";

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(axum::http::header::COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k.trim() == name { return Some(v.trim().to_string()); }
            }
        }
    }
    None
}

fn attributes(secure: bool) -> &'static str {
    if secure { "HttpOnly; Secure; SameSite=Strict; Path=/" } else { "HttpOnly; SameSite=Strict; Path=/" }
}

pub(crate) fn set_session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!("{}={}; Max-Age={}; {}", SESSION_COOKIE, token, max_age_secs, attributes(secure)))
}

pub(crate) fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        SESSION_COOKIE,
        attributes(secure)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_named_cookie_among_others() {
        let mut h = HeaderMap::new();
        h.insert("cookie", HeaderValue::from_static("theme=dark; token=abc.def.ghi; lang=en"));
        assert_eq!(parse_cookie(&h, SESSION_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(parse_cookie(&h, "missing"), None);
    }

    #[test]
    fn prefix_names_do_not_match() {
        let mut h = HeaderMap::new();
        h.insert("cookie", HeaderValue::from_static("xtoken=nope"));
        assert_eq!(parse_cookie(&h, SESSION_COOKIE), None);
    }

    #[test]
    fn secure_flag_follows_policy() {
        let on = set_session_cookie("t", 60, true).expect("header");
        let off = set_session_cookie("t", 60, false).expect("header");
        assert!(on.to_str().unwrap_or_default().contains("Secure"));
        assert!(!off.to_str().unwrap_or_default().contains("Secure"));
        assert!(on.to_str().unwrap_or_default().starts_with("token=t; Max-Age=60"));
    }
}
