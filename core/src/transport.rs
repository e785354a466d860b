//! The request-sending collaborator.
//!
//! `Transport` executes one `HttpRequest` and reports either a response
//! (any status) or a `TransportError` when nothing came back. Retry and
//! completion delivery live in [`crate::dispatch`].

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes HTTP requests on behalf of the dispatcher.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Blocking `ureq` agent driven from tokio's blocking pool.
///
/// Status codes are never treated as errors so 4xx/5xx bodies reach the
/// envelope parser.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute_blocking(&agent, request))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?
    }
}

fn execute_blocking(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let url = req.url();
    let result = match req.method {
        HttpMethod::Get => with_headers(agent.get(&url), &req.headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(&url), &req.headers).call(),
        HttpMethod::Post => send_body(with_headers(agent.post(&url), &req.headers), req.body),
        HttpMethod::Put => send_body(with_headers(agent.put(&url), &req.headers), req.body),
    };
    let mut response = result.map_err(map_ureq_error)?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let bytes = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| TransportError::IncompleteBody(e.to_string()))?;
    let body = String::from_utf8_lossy(&bytes).into_owned();

    Ok(HttpResponse { status, headers, body })
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) => TransportError::Io(e.to_string()),
        e @ (ureq::Error::BadUri(_)
        | ureq::Error::Http(_)
        | ureq::Error::RequireHttpsOnly(_)
        | ureq::Error::InvalidProxyUrl) => TransportError::InvalidRequest(e.to_string()),
        other => TransportError::Connect(other.to_string()),
    }
}
