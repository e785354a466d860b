//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `ScenarioClient` builds
//! `HttpRequest` values without touching the network, and a `Transport`
//! executes them. The raw `HttpResponse` is what API callbacks receive;
//! envelope interpretation is left to the caller.

use std::fmt;

use serde_json::{json, Value};

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

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL without the query string. Query pairs are
/// kept unencoded in `query` and rendered by [`HttpRequest::url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Full URL including the percent-encoded query string.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Render the response the way a browser HTTP client hands it over:
    /// `{ "status": .., "data": <body> }`. The business envelope then sits
    /// one level down, under `data`. A body that is not JSON becomes a
    /// JSON string.
    pub fn to_value(&self) -> Value {
        let data = self
            .json()
            .unwrap_or_else(|_| Value::String(self.body.clone()));
        json!({ "status": self.status, "data": data })
    }
}

impl From<HttpResponse> for Value {
    fn from(response: HttpResponse) -> Self {
        response.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn url_without_query_is_path() {
        assert_eq!(get("http://h/scenario/list").url(), "http://h/scenario/list");
    }

    #[test]
    fn url_encodes_query_pairs() {
        let mut req = get("http://h/xiaozhi/learning-record/statistics");
        req.query = vec![
            ("agentId".to_string(), "a 1".to_string()),
            ("childName".to_string(), "小明".to_string()),
        ];
        assert_eq!(
            req.url(),
            "http://h/xiaozhi/learning-record/statistics?agentId=a%201&childName=%E5%B0%8F%E6%98%8E"
        );
    }

    #[test]
    fn to_value_wraps_json_body_under_data() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: r#"{"code":0,"msg":"success","data":7}"#.to_string(),
        };
        let value = response.to_value();
        assert_eq!(value["status"], 200);
        assert_eq!(value["data"]["code"], 0);
        assert_eq!(value["data"]["data"], 7);
    }

    #[test]
    fn to_value_keeps_non_json_body_as_string() {
        let response = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(response.to_value()["data"], "Bad Gateway");
    }

    #[test]
    fn method_display() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
