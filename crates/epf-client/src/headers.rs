//! Response header parsing
//!
//! The rotating session keys come back as `User-Logonkey` and `User-Tokenkey`
//! response headers. Both transfer modes read them through [`HeaderParams`],
//! and streamed downloads also persist the block to a `.header` file next to
//! the payload.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

/// Header carrying the session identifier for the next call
pub const LOGON_KEY_HEADER: &str = "User-Logonkey";

/// Header carrying the single-use token for the next call
pub const TOKEN_KEY_HEADER: &str = "User-Tokenkey";

/// Parsed response header block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderParams {
    /// First line of the block, e.g. `HTTP/1.1 200 OK`
    pub status_line: Option<String>,
    fields: Vec<(String, String)>,
}

impl HeaderParams {
    /// Parse a raw header block (`Name: value` lines, CRLF or LF separated)
    ///
    /// When the block holds several responses (an interim `100 Continue`
    /// followed by the real one) only the last response's fields are kept.
    pub fn parse(raw: &str) -> Self {
        let mut params = Self::default();

        for line in raw.lines().map(|l| l.trim_end_matches('\r')) {
            if line.is_empty() {
                continue;
            }

            if line.starts_with("HTTP/") {
                params.status_line = Some(line.to_string());
                params.fields.clear();
                continue;
            }

            if let Some((name, value)) = line.split_once(": ") {
                params.fields.push((name.to_string(), value.trim().to_string()));
            }
        }

        params
    }

    /// Build from a live response, restoring the wire capitalisation of names
    pub fn from_response(status: StatusCode, headers: &HeaderMap) -> Self {
        let fields = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (canonical_name(name.as_str()), v.trim().to_string()))
            })
            .collect();

        Self {
            status_line: Some(format!("HTTP/1.1 {}", status)),
            fields,
        }
    }

    /// Look up a header by its exact name; the last occurrence wins
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn logon_key(&self) -> Option<&str> {
        self.get(LOGON_KEY_HEADER).filter(|v| !v.is_empty())
    }

    pub fn token_key(&self) -> Option<&str> {
        self.get(TOKEN_KEY_HEADER).filter(|v| !v.is_empty())
    }

    /// Render back to a CRLF header block
    pub fn to_raw(&self) -> String {
        let mut raw = String::new();
        if let Some(ref status) = self.status_line {
            raw.push_str(status);
            raw.push_str("\r\n");
        }
        for (name, value) in &self.fields {
            raw.push_str(name);
            raw.push_str(": ");
            raw.push_str(value);
            raw.push_str("\r\n");
        }
        raw
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// `user-tokenkey` -> `User-Tokenkey`
///
/// The HTTP layer lowercases names; the service documents them in
/// dash-separated title case.
pub fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
