//! HTTP/1.1 request composition.

use std::fmt;

use crate::core::constants::{HTTP_VERSION, USER_AGENT};

/// Request methods the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `HEAD`
    Head,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Token as it appears on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds one request in wire form.
///
/// ```text
/// METHOD SP PATH SP HTTP/1.1 CRLF
/// Host: <host> CRLF
/// User-Agent: Tidewire-HttpClient/1.0 CRLF
/// Accept: */* CRLF
/// Connection: close CRLF
/// [caller headers, CRLF-terminated]
/// [Content-Length: <n> CRLF]     (only with a body)
/// CRLF
/// [body]
/// ```
///
/// Nothing is validated: path, host and headers are emitted as given apart
/// from line-ending normalization.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    path: String,
    host: String,
    headers: String,
    body: Vec<u8>,
}

impl RequestBuilder {
    /// Start a request for `path` on `host`.
    pub fn new(method: Method, path: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            host: host.into(),
            headers: String::new(),
            body: Vec::new(),
        }
    }

    /// Extra header lines, newline separated. Appends to earlier calls.
    pub fn headers(mut self, headers: &str) -> Self {
        self.headers.push_str(&normalize_headers(headers));
        self
    }

    /// Request body. An empty body omits `Content-Length`.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Method of the request.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Wire bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: */*\r\nConnection: close\r\n",
            self.method, self.path, HTTP_VERSION, self.host, USER_AGENT
        );
        head.push_str(&self.headers);
        if !self.body.is_empty() {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        head.push_str("\r\n");

        let mut wire = head.into_bytes();
        wire.extend_from_slice(&self.body);
        wire
    }

    /// Wire text, with a non-UTF-8 body replaced lossily.
    pub fn build_string(&self) -> String {
        String::from_utf8_lossy(&self.build()).into_owned()
    }
}

/// Convert bare `\n` to `\r\n` and terminate the block with `\r\n`.
///
/// Empty input stays empty.
pub fn normalize_headers(headers: &str) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(headers.len() + 8);
    let mut prev = '\0';
    for ch in headers.chars() {
        if ch == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(ch);
        prev = ch;
    }
    if !out.ends_with("\r\n") {
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_wire_format() {
        let wire = RequestBuilder::new(Method::Get, "/", "example.org").build_string();
        assert_eq!(
            wire,
            "GET / HTTP/1.1\r\n\
             Host: example.org\r\n\
             User-Agent: Tidewire-HttpClient/1.0\r\n\
             Accept: */*\r\n\
             Connection: close\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_body_adds_content_length() {
        let wire = RequestBuilder::new(Method::Post, "/submit", "h")
            .headers("Content-Type: text/plain")
            .body("hello")
            .build_string();
        assert!(wire.starts_with("POST /submit HTTP/1.1\r\n"));
        assert!(wire.contains("Content-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello"));
        assert!(wire.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_empty_body_has_no_content_length() {
        let wire = RequestBuilder::new(Method::Put, "/x", "h").body("").build_string();
        assert!(!wire.contains("Content-Length"));
        assert!(wire.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn test_header_normalization() {
        assert_eq!(normalize_headers(""), "");
        assert_eq!(normalize_headers("A: 1"), "A: 1\r\n");
        assert_eq!(normalize_headers("A: 1\nB: 2"), "A: 1\r\nB: 2\r\n");
        assert_eq!(normalize_headers("A: 1\r\nB: 2\n"), "A: 1\r\nB: 2\r\n");
        assert_eq!(normalize_headers("A: 1\r\n"), "A: 1\r\n");
    }

    #[test]
    fn test_methods_on_request_line() {
        for (method, token) in [
            (Method::Get, "GET"),
            (Method::Post, "POST"),
            (Method::Head, "HEAD"),
            (Method::Put, "PUT"),
            (Method::Delete, "DELETE"),
        ] {
            let wire = RequestBuilder::new(method, "/p", "h").build_string();
            assert!(wire.starts_with(&format!("{token} /p HTTP/1.1\r\n")));
        }
    }

    #[test]
    fn test_binary_body_kept_verbatim() {
        let body = hex::decode("00ff10").unwrap();
        let wire = RequestBuilder::new(Method::Post, "/b", "h").body(body.clone()).build();
        assert!(wire.ends_with(&body));
    }
}
