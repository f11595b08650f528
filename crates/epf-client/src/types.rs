//! EPF request and response types

use crate::headers::HeaderParams;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// File status: newly available
pub const STATUS_NEW: &str = "N";

/// File status: download started
pub const STATUS_STARTED: &str = "S";

/// File status: download completed
pub const STATUS_COMPLETED: &str = "C";

/// JSON body of a buffered EPF response
///
/// `response == "success"` is the only success signal the service gives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpfResponse {
    #[serde(default)]
    pub response: String,

    /// Service-provided message(s); a string or a list of strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Value>,

    /// Every other field of the body (`fileList`, `version`, ...)
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl EpfResponse {
    pub fn is_success(&self) -> bool {
        self.response == "success"
    }

    /// Flatten `messages` into one line, `Unknown` when the service sent none
    pub fn messages_text(&self) -> String {
        match self.messages {
            Some(Value::String(ref s)) if !s.is_empty() => s.clone(),
            Some(Value::Array(ref items)) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
            Some(Value::Null) | None => "Unknown".to_string(),
            Some(ref other) => {
                let text = other.to_string();
                if text.is_empty() || text == "\"\"" || text == "[]" {
                    "Unknown".to_string()
                } else {
                    text
                }
            },
        }
    }

    /// Stand-in body for responses that did not carry JSON
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            response: "failed".to_string(),
            messages: Some(Value::String(message.into())),
            data: Map::new(),
        }
    }
}

/// A buffered call's full result
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub http_status: u16,
    pub headers: HeaderParams,
    pub body: EpfResponse,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        self.body.is_success()
    }
}

/// One entry of a `/download/list` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(rename = "fileid", deserialize_with = "string_or_number")]
    pub file_id: String,

    #[serde(rename = "filepath")]
    pub file_path: String,

    #[serde(default)]
    pub status: String,

    /// Fulfilled timestamp as reported by the service
    #[serde(rename = "fulfilled", default)]
    pub fulfilled: String,
}

impl FileDescriptor {
    /// Parse `fulfilled`; `None` if the service sent something unrecognised
    pub fn fulfilled_at(&self) -> Option<NaiveDateTime> {
        parse_fulfilled(&self.fulfilled)
    }

    /// Last path segment of `file_path`
    pub fn file_name(&self) -> &str {
        file_name_of(&self.file_path)
    }
}

/// Filters for `/download/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListFilesRequest {
    #[serde(rename = "productcode")]
    pub product_code: String,

    #[serde(rename = "productid")]
    pub product_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled: Option<String>,
}

impl ListFilesRequest {
    pub fn new(product_code: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            product_code: product_code.into(),
            product_id: product_id.into(),
            status: None,
            fulfilled: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_fulfilled(mut self, fulfilled: impl Into<String>) -> Self {
        self.fulfilled = Some(fulfilled.into()).filter(|s: &String| !s.is_empty());
        self
    }
}

/// A file saved by a streamed download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    pub file_id: String,
    /// Local path of the payload
    pub file_path: PathBuf,
    /// Local path of the saved response headers
    pub header_path: PathBuf,
    pub file_size: u64,
    /// SHA-256 of what was received (not checked against the service)
    pub sha256: String,
}

/// Result of [`crate::EpfClient::download_newest_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded {
        file: FileDescriptor,
        download: DownloadResult,
    },
    /// The listing had no candidate; an expected, recoverable outcome
    NoFileToDownload,
}

/// Pick the descriptor with the strictly greatest fulfilled timestamp
///
/// Ties keep the earlier entry; descriptors with unparseable timestamps are
/// never selected.
pub fn newest_file(files: &[FileDescriptor]) -> Option<&FileDescriptor> {
    let mut newest: Option<(&FileDescriptor, NaiveDateTime)> = None;

    for file in files {
        let Some(at) = file.fulfilled_at() else {
            continue;
        };
        match newest {
            Some((_, best)) if at <= best => {},
            _ => newest = Some((file, at)),
        }
    }

    newest.map(|(file, _)| file)
}

pub(crate) fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn parse_fulfilled(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(id: &str, fulfilled: &str) -> FileDescriptor {
        FileDescriptor {
            file_id: id.to_string(),
            file_path: format!("/AIS/ctystatenatl_{}.tar", id),
            status: STATUS_NEW.to_string(),
            fulfilled: fulfilled.to_string(),
        }
    }

    #[test]
    fn test_newest_file_picks_max_timestamp() {
        let files = vec![
            descriptor("1", "2024-01-05"),
            descriptor("2", "2024-03-01 08:00:00"),
            descriptor("3", "2024-02-28"),
        ];
        assert_eq!(newest_file(&files).unwrap().file_id, "2");
    }

    #[test]
    fn test_newest_file_empty_list() {
        assert!(newest_file(&[]).is_none());
    }

    #[test]
    fn test_newest_file_tie_keeps_first() {
        let files = vec![descriptor("a", "2024-01-01"), descriptor("b", "2024-01-01")];
        assert_eq!(newest_file(&files).unwrap().file_id, "a");
    }

    #[test]
    fn test_newest_file_skips_unparseable() {
        let files = vec![descriptor("bad", "soon"), descriptor("ok", "2020-06-30")];
        assert_eq!(newest_file(&files).unwrap().file_id, "ok");

        let only_bad = vec![descriptor("bad", "")];
        assert!(newest_file(&only_bad).is_none());
    }

    #[test]
    fn test_fulfilled_formats() {
        assert!(descriptor("x", "2024-05-01T10:00:00Z").fulfilled_at().is_some());
        assert!(descriptor("x", "2024-05-01T10:00:00").fulfilled_at().is_some());
        assert!(descriptor("x", "2024-05-01 10:00:00").fulfilled_at().is_some());
        assert!(descriptor("x", "05/01/2024").fulfilled_at().is_none());
    }

    #[test]
    fn test_descriptor_deserializes_numeric_id() {
        let file: FileDescriptor = serde_json::from_value(json!({
            "fileid": 4821,
            "filepath": "/ais/ctystatenatl.tar",
            "status": "N",
            "fulfilled": "2024-05-01"
        }))
        .unwrap();
        assert_eq!(file.file_id, "4821");
        assert_eq!(file.file_name(), "ctystatenatl.tar");
    }

    #[test]
    fn test_list_request_omits_empty_filters() {
        let request = ListFilesRequest::new("AIS", "CS215N").with_status("N").with_fulfilled("");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"productcode": "AIS", "productid": "CS215N", "status": "N"}));
    }

    #[test]
    fn test_messages_text() {
        let body: EpfResponse =
            serde_json::from_value(json!({"response": "error", "messages": "Invalid login"}))
                .unwrap();
        assert!(!body.is_success());
        assert_eq!(body.messages_text(), "Invalid login");

        let body: EpfResponse =
            serde_json::from_value(json!({"response": "error", "messages": ["a", "b"]})).unwrap();
        assert_eq!(body.messages_text(), "a; b");

        let body: EpfResponse = serde_json::from_value(json!({"response": "error"})).unwrap();
        assert_eq!(body.messages_text(), "Unknown");
    }

    #[test]
    fn test_response_keeps_extra_fields() {
        let body: EpfResponse =
            serde_json::from_value(json!({"response": "success", "version": "1.04.2"})).unwrap();
        assert!(body.is_success());
        assert_eq!(body.data["version"], "1.04.2");
    }
}
