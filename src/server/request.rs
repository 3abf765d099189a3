//! Incremental HTTP/1.1 request parsing.
//!
//! A [`RequestReader`] pulls fixed-size chunks off any [`Read`] stream until the
//! blank line that ends the header block, then keeps reading until the body
//! declared by `Content-Length` is complete. Only `Content-Length` framing is
//! understood; chunked transfer-encoding is not.

use crate::config::BodyOverflowPolicy;
use crate::error::ParseError;
use http::Method;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Read};
use tracing::{debug, warn};

/// Size of each read issued against the connection.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Upper bound on the up-front allocation for a declared body.
const MAX_BODY_PREALLOC: usize = 1 << 20;

/// Query string parameters. Repeated keys accumulate, bare keys map to `""`.
pub type QueryParams = HashMap<String, Vec<String>>;

/// A fully read HTTP request.
///
/// Built once by [`RequestReader::read`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request method token
    pub method: Method,
    /// Request path with the query string removed
    pub path: String,
    /// Protocol version from the request line (`HTTP/1.1` when absent)
    pub version: String,
    /// Header names exactly as sent; a repeated name keeps its last value
    pub headers: HashMap<String, String>,
    /// Parsed query string
    pub query: QueryParams,
    /// Body bytes, present only when a Content-Length was declared and read
    pub body: Option<Vec<u8>>,
    /// Peer address of the connection
    pub remote_addr: String,
}

impl Request {
    /// Header value by exact (case-sensitive) name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of a query parameter, in order of appearance.
    #[must_use]
    pub fn query_values(&self, name: &str) -> &[String] {
        self.query.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }
}

/// Reads one request off a byte stream.
#[derive(Debug, Clone, Copy)]
pub struct RequestReader {
    chunk_size: usize,
    overflow: BodyOverflowPolicy,
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new(BodyOverflowPolicy::default())
    }
}

impl RequestReader {
    #[must_use]
    pub fn new(overflow: BodyOverflowPolicy) -> Self {
        Self {
            chunk_size: READ_CHUNK_SIZE,
            overflow,
        }
    }

    /// Override the read size. Zero is treated as one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Read a complete request from `stream`.
    ///
    /// Returns `Ok(None)` when the peer closes the connection before a header
    /// block was completed.
    ///
    /// # Errors
    ///
    /// [`ParseError::Malformed`] for an unusable request line or a missing
    /// Content-Length on POST/PUT, [`ParseError::BodyOverflow`] when the body is
    /// longer than declared under [`BodyOverflowPolicy::Reject`], and
    /// [`ParseError::TruncatedBody`] or [`ParseError::Io`] for transport faults.
    pub fn read<R: Read>(
        &self,
        stream: &mut R,
        remote_addr: &str,
    ) -> Result<Option<Request>, ParseError> {
        let mut buf: Vec<u8> = Vec::with_capacity(self.chunk_size);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut line_start = 0;

        let body_start = loop {
            if let Some(end) = scan_for_blank_line(&buf, &mut line_start) {
                break end;
            }
            let n = read_chunk(stream, &mut chunk)?;
            if n == 0 {
                if !buf.is_empty() {
                    debug!(
                        remote_addr = %remote_addr,
                        buffered_bytes = buf.len(),
                        "Connection closed before header block completed"
                    );
                }
                return Ok(None);
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..body_start]);
        let mut lines = head.split('\n').map(|l| l.trim_end_matches('\r'));

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let method_token = parts
            .next()
            .ok_or_else(|| ParseError::malformed("empty request line"))?;
        let target = parts
            .next()
            .ok_or_else(|| ParseError::malformed("request line has no target"))?;
        let version = parts.next().unwrap_or("HTTP/1.1").to_string();
        let method = Method::from_bytes(method_token.as_bytes())
            .map_err(|_| ParseError::malformed(format!("invalid method token '{method_token}'")))?;

        let (path, raw_query) = split_target(target);
        let query = parse_query(raw_query);
        let headers = parse_headers(lines);

        debug!(
            method = %method,
            path = %path,
            header_count = headers.len(),
            query_param_count = query.len(),
            "Request head parsed"
        );

        let mut request = Request {
            method,
            path: path.to_string(),
            version,
            headers,
            query,
            body: None,
            remote_addr: remote_addr.to_string(),
        };

        let declared = match declared_length(&request.headers)? {
            Some(n) => n,
            None if requires_length(&request.method) => {
                return Err(ParseError::malformed(format!(
                    "{} request without Content-Length",
                    request.method
                )));
            }
            None => return Ok(Some(request)),
        };

        let mut body = buf.split_off(body_start);
        body.reserve(declared.saturating_sub(body.len()).min(MAX_BODY_PREALLOC));
        while body.len() < declared {
            let n = read_chunk(stream, &mut chunk)?;
            if n == 0 {
                return Err(ParseError::TruncatedBody {
                    declared,
                    received: body.len(),
                });
            }
            body.extend_from_slice(&chunk[..n]);
        }

        if body.len() > declared {
            match self.overflow {
                BodyOverflowPolicy::Reject => {
                    return Err(ParseError::BodyOverflow {
                        declared,
                        received: body.len(),
                    });
                }
                BodyOverflowPolicy::Truncate => {
                    warn!(
                        method = %request.method,
                        path = %request.path,
                        declared,
                        received = body.len(),
                        "Received more data than Content-Length, truncating body"
                    );
                    body.truncate(declared);
                }
            }
        }

        debug!(body_bytes = body.len(), "Request body read");
        request.body = Some(body);
        Ok(Some(request))
    }
}

/// Split a request target into its path and raw query string at the first `?`.
#[must_use]
pub fn split_target(target: &str) -> (&str, &str) {
    target.split_once('?').unwrap_or((target, ""))
}

/// Parse a query string permissively.
///
/// Repeated keys accumulate their values in order and a key without `=` maps to
/// an empty value. A leading `/?` or `?` left over from the target is ignored.
#[must_use]
pub fn parse_query(raw: &str) -> QueryParams {
    let raw = raw
        .strip_prefix("/?")
        .or_else(|| raw.strip_prefix('?'))
        .unwrap_or(raw);
    let mut query = QueryParams::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        query
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    query
}

/// Parse header lines on the first `": "`. Lines without it are skipped; the
/// first empty line ends the block.
fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        match line.split_once(": ") {
            Some((name, value)) => {
                headers.insert(name.to_string(), value.to_string());
            }
            None => debug!(line = %line, "Skipping malformed header line"),
        }
    }
    headers
}

/// Content-Length, looked up ignoring case. Every spelling present must agree;
/// conflicting values make the body framing ambiguous.
fn declared_length(headers: &HashMap<String, String>) -> Result<Option<usize>, ParseError> {
    let mut declared = None;
    for (name, value) in headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("content-length"))
    {
        let length = value
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::malformed(format!("invalid {name} '{value}'")))?;
        match declared {
            Some(previous) if previous != length => {
                return Err(ParseError::malformed(format!(
                    "conflicting Content-Length headers: {previous} and {length}"
                )));
            }
            _ => declared = Some(length),
        }
    }
    Ok(declared)
}

fn requires_length(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT
}

/// Advance over complete lines starting at `line_start`; returns the offset just
/// past the first blank line (empty, or a lone `\r`).
fn scan_for_blank_line(buf: &[u8], line_start: &mut usize) -> Option<usize> {
    while let Some(pos) = buf[*line_start..].iter().position(|&b| b == b'\n') {
        let end = *line_start + pos;
        let line = &buf[*line_start..end];
        *line_start = end + 1;
        if line.is_empty() || line == b"\r" {
            return Some(end + 1);
        }
    }
    None
}

fn read_chunk<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
