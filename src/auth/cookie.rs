use axum::http::{header, HeaderMap};

pub const REFRESH_COOKIE: &str = "refreshToken";
/// 7 days in seconds.
pub const REFRESH_COOKIE_MAX_AGE: u64 = 7 * 24 * 60 * 60;
const COOKIE_PATH: &str = "/api/auth";

pub fn refresh_cookie(token: &str) -> String {
    format!(
        "{REFRESH_COOKIE}={token}; Path={COOKIE_PATH}; HttpOnly; Secure; SameSite=Strict; Max-Age={REFRESH_COOKIE_MAX_AGE}"
    )
}

/// Expired cookie that makes the browser drop the refresh token.
pub fn clear_refresh_cookie() -> String {
    format!("{REFRESH_COOKIE}=; Path={COOKIE_PATH}; HttpOnly; Secure; SameSite=Strict; Max-Age=0")
}

/// Refresh token sent by the client, if any. Blank values count as missing.
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn refresh_cookie_is_locked_down() {
        let cookie = refresh_cookie("abc.def.ghi");
        assert!(cookie.starts_with("refreshToken=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn clearing_cookie_expires_it() {
        let cookie = clear_refresh_cookie();
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn reads_refresh_token_among_other_cookies() {
        let h = headers("theme=dark; refreshToken=tok.en.value; lang=pt");
        assert_eq!(read_refresh_cookie(&h).as_deref(), Some("tok.en.value"));
    }

    #[test]
    fn missing_or_blank_cookie_is_none() {
        assert_eq!(read_refresh_cookie(&HeaderMap::new()), None);
        assert_eq!(read_refresh_cookie(&headers("theme=dark")), None);
        assert_eq!(read_refresh_cookie(&headers("refreshToken=")), None);
        assert_eq!(read_refresh_cookie(&headers("refreshToken=   ")), None);
    }
}
