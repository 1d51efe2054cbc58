use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::utils::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub reason: &'static str,
}

pub const OK: Status = Status { code: 200, reason: "OK" };
pub const BAD_REQUEST: Status = Status { code: 400, reason: "Bad Request" };
pub const NOT_FOUND: Status = Status { code: 404, reason: "Not Found" };
pub const TOO_MANY_REQUESTS: Status = Status { code: 429, reason: "Too Many Requests" };
pub const INTERNAL_SERVER_ERROR: Status = Status { code: 500, reason: "Internal Server Error" };
pub const SERVICE_UNAVAILABLE: Status = Status { code: 503, reason: "Service Unavailable" };

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone)]
pub struct Response {
    pub version: String,
    pub status: Status,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            version: "HTTP/1.0".into(),
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn set_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn json(status: Status, value: &serde_json::Value) -> Self {
        Self::new(status)
            .set_header("Content-Type", CONTENT_TYPE_JSON)
            .with_body(value.to_string())
    }

    pub fn html(status: Status, page: impl Into<Vec<u8>>) -> Self {
        Self::new(status)
            .set_header("Content-Type", CONTENT_TYPE_HTML)
            .with_body(page)
    }

    pub fn to_bytes(&self, is_head: bool) -> Vec<u8> {
        let mut buffer = String::new();

        let _ = write!(
            buffer,
            "{} {} {}\r\n",
            self.version, self.status.code, self.status.reason
        );

        let _ = write!(buffer, "Date: {}\r\n", time::http_date());
        let _ = write!(buffer, "Server: matrix-server/{}\r\n", env!("CARGO_PKG_VERSION"));
        let _ = write!(buffer, "Connection: close\r\n");
        let _ = write!(buffer, "Content-Length: {}\r\n", self.body.len());

        if !self.headers.keys().any(|k| k.eq_ignore_ascii_case("Content-Type")) {
            let _ = write!(buffer, "Content-Type: {}\r\n", CONTENT_TYPE_TEXT);
        }

        for (key, value) in &self.headers {
            let key_lower = key.to_ascii_lowercase();
            if ["content-length", "connection", "date", "server"].contains(&key_lower.as_str()) {
                continue;
            }
            let _ = write!(buffer, "{}: {}\r\n", key, value);
        }

        buffer.push_str("\r\n");

        let mut response_bytes = buffer.into_bytes();
        if !is_head {
            response_bytes.extend_from_slice(&self.body);
        }

        response_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_headers_and_body() {
        let resp = Response::new(OK)
            .set_header("Content-Type", CONTENT_TYPE_HTML)
            .with_body("<p>hi</p>");
        let text = String::from_utf8(resp.to_bytes(false)).unwrap();

        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>hi</p>"));
    }

    #[test]
    fn head_keeps_length_but_drops_body() {
        let resp = Response::new(OK).with_body("12345");
        let text = String::from_utf8(resp.to_bytes(true)).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn reserved_headers_are_not_duplicated() {
        let resp = Response::new(OK).set_header("Connection", "keep-alive");
        let text = String::from_utf8(resp.to_bytes(false)).unwrap();
        assert_eq!(text.matches("Connection:").count(), 1);
        assert!(text.contains("Content-Type: text/plain"));
    }

    #[test]
    fn json_helper_sets_content_type() {
        let resp = Response::json(BAD_REQUEST, &serde_json::json!({"error": "nope"}));
        assert_eq!(resp.status, BAD_REQUEST);
        assert_eq!(resp.headers.get("Content-Type").map(String::as_str), Some(CONTENT_TYPE_JSON));
        assert_eq!(resp.body, br#"{"error":"nope"}"#);
    }
}
