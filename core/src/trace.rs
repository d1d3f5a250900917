//! Wire trace formatting for debug mode.
//!
//! Lines are built here and emitted by the client on the `devflow::wire`
//! target. The `Authorization` header value is always replaced; bodies are
//! traced verbatim.

use crate::http::{HttpMethod, HttpResponse};

pub const TARGET: &str = "devflow::wire";
pub const REDACTED: &str = "[REDACTED]";

/// Header value as it may appear in a trace.
pub fn header_value<'a>(name: &str, value: &'a str) -> &'a str {
    if name.eq_ignore_ascii_case("authorization") {
        REDACTED
    } else {
        value
    }
}

/// Request line followed by one line per outgoing header.
pub fn request_lines<'a, I>(method: HttpMethod, url: &str, headers: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut lines = vec![format!("> {method} {url}")];
    lines.extend(
        headers
            .into_iter()
            .map(|(name, value)| format!("> {name}: {}", header_value(name, value))),
    );
    lines
}

pub fn response_line(response: &HttpResponse) -> String {
    format!("< {}", response.status_line())
}

pub fn body_line(direction: char, body: &[u8]) -> String {
    format!("{direction} {}", String::from_utf8_lossy(body))
}
