use std::io::{BufRead, BufReader, Read};

use url::form_urlencoded;

use crate::errors::ServerError;

const MAX_HEADERS: usize = 100;
/// Upper bound on the request line plus headers.
pub const MAX_REQUEST_BYTES: u64 = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    HEAD,
    Unsupported(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::Unsupported(m) => m,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Decoded `key=value` pairs in the order they appeared.
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    /// Reads the request head only. Bodies are never consumed since every
    /// route is GET or HEAD.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self, ServerError> {
        let mut reader = BufReader::new(reader.take(MAX_REQUEST_BYTES));
        let mut consumed = 0usize;

        let request_line = read_head_line(&mut reader, &mut consumed)?;
        let request_line = request_line.trim();

        if request_line.is_empty() {
            return Err(ServerError::BadRequest("Empty request line".into()));
        }

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(ServerError::BadRequest(format!(
                "Malformed request line: '{}'", request_line
            )));
        }

        let method = match parts[0] {
            "GET" => HttpMethod::GET,
            "HEAD" => HttpMethod::HEAD,
            other => HttpMethod::Unsupported(other.to_string()),
        };

        let version = parts[2];
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ServerError::BadRequest(format!(
                "Only HTTP/1.0 and HTTP/1.1 are supported (got '{}')", version
            )));
        }

        let (path, query) = split_target(parts[1]);

        let mut header_count = 0;
        loop {
            let line = read_head_line(&mut reader, &mut consumed)?;
            if line.is_empty() {
                break; // EOF
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break; // End of headers
            }

            if header_count >= MAX_HEADERS {
                return Err(ServerError::BadRequest("Too many headers".into()));
            }
            if !line.contains(':') {
                return Err(ServerError::BadRequest(format!(
                    "Invalid header format: '{}'", line
                )));
            }
            header_count += 1;
        }

        Ok(HttpRequest { method, path, query })
    }
}

/// One line of the request head. A line cut off by the byte budget is rejected;
/// one cut off by EOF is returned as is.
fn read_head_line<R: BufRead>(reader: &mut R, consumed: &mut usize) -> Result<String, ServerError> {
    let mut line = String::new();
    *consumed += reader.read_line(&mut line)?;

    if !line.ends_with('\n') && *consumed as u64 >= MAX_REQUEST_BYTES {
        return Err(ServerError::BadRequest(format!(
            "Request head exceeds {} bytes", MAX_REQUEST_BYTES
        )));
    }
    Ok(line)
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let path = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());
    let query = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    (path, query)
}
