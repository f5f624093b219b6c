//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `FeedClient` builds `HttpRequest`
//! values and parses `HttpResponse` values; a `Transport` (see
//! `crate::transport`) performs the round-trip. Bodies come in two profiles:
//! JSON text, or a list of multipart form parts for attachment uploads.

use std::path::PathBuf;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One field of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    /// A local file, read by the transport when the body is encoded.
    File {
        path: PathBuf,
        file_name: String,
        content_type: String,
    },
}

impl FormPart {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: PartValue::Text(value.into()),
        }
    }
}

/// Request payload, tagged by encoding profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    /// `application/json` text.
    Json(String),
    /// `multipart/form-data`; the transport chooses the boundary.
    Multipart(Vec<FormPart>),
}

impl HttpBody {
    pub fn as_json(&self) -> Option<&str> {
        match self {
            HttpBody::Json(s) => Some(s),
            HttpBody::Multipart(_) => None,
        }
    }

    pub fn parts(&self) -> Option<&[FormPart]> {
        match self {
            HttpBody::Json(_) => None,
            HttpBody::Multipart(parts) => Some(parts),
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport`, or by hand in tests, then handed to
/// `FeedClient::parse_*`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
