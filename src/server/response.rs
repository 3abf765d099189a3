use smallvec::SmallVec;
use std::io::{self, Write};

/// Value of the `Server` header on every response built by [`Response::new`].
pub const SERVER_ID: &str = concat!("yahs/", env!("CARGO_PKG_VERSION"));

/// Most responses carry only a handful of headers.
pub const MAX_INLINE_HEADERS: usize = 8;

/// Response header storage, kept in insertion order.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Canonical reason phrase for `status`, or `"Unknown"` when it has none.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}

/// An HTTP response destined for the client.
///
/// Content-Length is never stored; [`Response::write_to`] computes it from the
/// body and drops any value a handler set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Reason phrase on the status line
    pub status_message: String,
    /// Headers in insertion order
    pub headers: HeaderVec,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// `200 OK`, `text/html`, empty body.
    #[must_use]
    pub fn new() -> Self {
        let mut headers = HeaderVec::new();
        headers.push(("Server".to_string(), SERVER_ID.to_string()));
        headers.push(("Content-Type".to_string(), "text/html".to_string()));
        Self {
            status: 200,
            status_message: status_reason(200).to_string(),
            headers,
            body: Vec::new(),
        }
    }

    /// Default response with the given status and its standard reason phrase.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self::new().status(status, status_reason(status))
    }

    /// `200 OK` with `body`.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::new().body(body)
    }

    /// `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self::with_status(204)
    }

    /// Set status code and reason phrase.
    #[must_use]
    pub fn status(mut self, status: u16, message: impl Into<String>) -> Self {
        self.status = status;
        self.status_message = message.into();
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder form of [`Response::set_header`].
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Add or replace a header; names compare ignoring ASCII case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to the wire format: status line, headers with a computed
    /// Content-Length, blank line, raw body.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.status_message);
        for (name, value) in self
            .headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("content-length"))
        {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("Content-Length: ");
        head.push_str(&self.body.len().to_string());
        head.push_str("\r\n\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    /// Write the serialized response and flush.
    ///
    /// # Errors
    ///
    /// Propagates socket write failures.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.to_bytes())?;
        out.flush()
    }
}

/// Built-in `400 Bad Request` page.
#[must_use]
pub fn bad_request() -> Response {
    Response::with_status(400)
        .body("<h1>400 Bad Request</h1><p>The server could not support your request</p>")
}

/// Built-in `404 Not Found` page.
#[must_use]
pub fn not_found() -> Response {
    Response::with_status(404).body(
        "<h1>404 Not Found</h1><p>The server could not find a resource matching your request :(</p>",
    )
}

/// Built-in `500 Internal Server Error` page.
#[must_use]
pub fn internal_error() -> Response {
    Response::with_status(500)
        .body("<h1>500 Internal Server Error</h1><p>The request handler failed</p>")
}
