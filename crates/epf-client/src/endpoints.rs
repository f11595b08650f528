//! EPF endpoint paths and URL builders
//!
//! All paths hang off a fixed base (`/ws/resources` on the production host).

/// Production base URL of the EPF web service
pub const DEFAULT_BASE_URL: &str = "https://epfws.usps.gov/ws/resources";

pub const LOGIN: &str = "/epf/login";
pub const LOGOUT: &str = "/epf/logout";
pub const VERSION: &str = "/epf/version";
pub const LIST_FILES: &str = "/download/list";
pub const DOWNLOAD_FILE: &str = "/download/file";
pub const DOWNLOAD_EPF: &str = "/download/epf";
pub const SET_STATUS: &str = "/download/status";

/// Join a base URL and an endpoint path
pub fn url(base_url: &str, endpoint: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(
            url("https://epfws.usps.gov/ws/resources/", LOGIN),
            "https://epfws.usps.gov/ws/resources/epf/login"
        );
        assert_eq!(url("http://127.0.0.1:8080", LIST_FILES), "http://127.0.0.1:8080/download/list");
    }
}
