//! Executes `HttpRequest` values against the network.
//!
//! `Transport` is the one I/O seam of the crate: stores and tests hand it a
//! request and get back a response or a `TransportError`. Non-2xx statuses
//! are data, not errors; interpreting them is `FeedClient`'s job.

use std::time::Duration;

use crate::error::TransportError;
use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse, PartValue};

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.path.as_str();
        let result = match (request.method, &request.body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &request.headers).call(),
            (method, body) => {
                let builder = match method {
                    HttpMethod::Post => self.agent.post(url),
                    _ => self.agent.put(url),
                };
                let builder = with_headers(builder, &request.headers);
                match body {
                    None => builder.send_empty(),
                    Some(HttpBody::Json(json)) => builder.send(json.as_bytes()),
                    Some(HttpBody::Multipart(parts)) => {
                        let boundary = format!("----feed-{}", uuid::Uuid::new_v4().simple());
                        let bytes = encode_multipart(parts, &boundary)
                            .map_err(|e| TransportError(format!("reading attachment: {e}")))?;
                        builder
                            .content_type(format!("multipart/form-data; boundary={boundary}"))
                            .send(&bytes[..])
                    }
                }
            }
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;
        tracing::debug!(method = request.method.as_str(), url, status, "request finished");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Serialize form parts as a `multipart/form-data` body. File parts are read
/// from disk here.
pub fn encode_multipart(parts: &[FormPart], boundary: &str) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match &part.value {
            PartValue::Text(text) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                );
                out.extend_from_slice(text.as_bytes());
            }
            PartValue::File {
                path,
                file_name,
                content_type,
            } => {
                let data = std::fs::read(path)?;
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {content_type}\r\n\r\n",
                        part.name,
                        file_name.replace('"', "")
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(&data);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(out)
}
