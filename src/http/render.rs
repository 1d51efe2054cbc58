//! HTML and JSON bodies for the compute and table endpoints.

use std::fmt::Write as _;

use serde_json::json;

use crate::compute::{Summary, TableRow};
use crate::errors::ServerError;
use super::response::{Response, Status, OK};
use super::server::status_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Html,
    Json,
}

impl Format {
    /// `None` means the parameter was absent.
    pub fn parse(raw: Option<&str>) -> Result<Self, ServerError> {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("html") => Ok(Format::Html),
            Some("json") => Ok(Format::Json),
            Some(other) => Err(ServerError::BadRequest(format!(
                "Unknown format '{}', expected 'html' or 'json'", other
            ))),
        }
    }
}

pub fn matrix_result(format: Format, summary: &Summary, elapsed_ms: u64, checksum: Option<&str>) -> Response {
    match format {
        Format::Json => {
            let mut body = json!(summary);
            body["elapsed_ms"] = json!(elapsed_ms);
            if let Some(sum) = checksum {
                body["checksum"] = json!(sum);
            }
            Response::json(OK, &body)
        }
        Format::Html => {
            let mut page = String::from("<html><body>");
            page.push_str("<h3>Matrix multiplication completed successfully!</h3>");
            let _ = write!(page, "<p>Input dimension: {}</p>", summary.dimension);
            let _ = write!(page, "<p>First element of result matrix: {}</p>", summary.first_element);
            let _ = write!(page, "<p>Last element of result matrix: {}</p>", summary.last_element);
            if let Some(sum) = checksum {
                let _ = write!(page, "<p>SHA-256 of result matrix: {}</p>", sum);
            }
            page.push_str("</body></html>");
            Response::html(OK, page)
        }
    }
}

pub fn table(format: Format, rows: &[TableRow]) -> Response {
    match format {
        Format::Json => Response::json(OK, &json!({ "rows": rows.len(), "values": rows })),
        Format::Html => {
            let mut page = String::new();
            page.push_str("<html>\n");
            page.push_str("<head><title>Random Table</title></head>\n");
            page.push_str("<body>\n");
            page.push_str("<h1>Generated Table with Random Values</h1>\n");
            page.push_str("<table border='1'>\n");
            page.push_str("<tr><th>#</th><th>Random Value</th></tr>\n");
            for row in rows {
                let _ = writeln!(page, "<tr><td>{}</td><td>{}</td></tr>", row.index, row.value);
            }
            page.push_str("</table>\n</body>\n</html>\n");
            Response::html(OK, page)
        }
    }
}

/// Error page in the requested format, with the status the error maps to.
pub fn error(format: Format, err: &ServerError) -> Response {
    let status: Status = status_for(err);
    let message = match err {
        ServerError::BadRequest(msg) | ServerError::Internal(msg) => msg.clone(),
        other => other.to_string(),
    };

    match format {
        Format::Json => Response::json(status, &json!({ "error": message })),
        Format::Html => Response::html(
            status,
            format!("<html><body><h3>{}</h3></body></html>", escape_html(&message)),
        ),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
