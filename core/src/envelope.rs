//! Business envelope normalization.
//!
//! # Overview
//! The backend wraps every payload as `{ "code", "msg", "data" }`. Depending
//! on how the response was obtained the envelope is either the value itself
//! or sits one level down under `data` (the transport-shaped value produced
//! by [`HttpResponse::to_value`](crate::HttpResponse::to_value)). These
//! helpers find the envelope at either depth and expose one success/failure
//! contract over it.
//!
//! A value without `code` at either depth is passed through as if it were
//! the envelope. `is_api_success` then reports failure because `code` is
//! missing.

use std::future::Future;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::error::ApiError;

/// Message used when neither the envelope nor the caller provides one.
pub const DEFAULT_ERROR_MESSAGE: &str = "request failed";

static NULL: Value = Value::Null;

/// One-shot completion callback handed to callback-style API calls.
pub type Completion<R> = Box<dyn FnOnce(R) + Send>;

/// Locate the business envelope.
///
/// Returns the value itself when it carries `code`, else the inner `data`
/// object when that carries `code`, else the value unchanged. Absent or
/// falsy input yields `None`.
pub fn extract_business_data(response: Option<&Value>) -> Option<&Value> {
    let response = response.filter(|v| !is_falsy(v))?;
    if response.get("code").is_some() {
        return Some(response);
    }
    if let Some(inner) = response.get("data").filter(|d| !is_falsy(d)) {
        if inner.get("code").is_some() {
            return Some(inner);
        }
    }
    Some(response)
}

/// True iff the envelope exists and its `code` is numerically zero.
pub fn is_api_success(response: Option<&Value>) -> bool {
    extract_business_data(response)
        .and_then(|envelope| envelope.get("code"))
        .and_then(Value::as_f64)
        == Some(0.0)
}

/// The envelope's `msg`, else `default_msg`, else [`DEFAULT_ERROR_MESSAGE`].
pub fn get_error_message(response: Option<&Value>, default_msg: Option<&str>) -> String {
    let fallback = default_msg.unwrap_or(DEFAULT_ERROR_MESSAGE);
    let msg = extract_business_data(response).and_then(|envelope| envelope.get("msg"));
    match msg {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(other) if !is_falsy(other) => other.to_string(),
        _ => fallback.to_string(),
    }
}

/// The envelope's `data`. `None` when no envelope was found; JSON `null`
/// when the envelope has no `data` field.
pub fn get_business_data(response: Option<&Value>) -> Option<&Value> {
    extract_business_data(response).map(|envelope| envelope.get("data").unwrap_or(&NULL))
}

/// Build a one-shot completion handler that splits on business success.
///
/// On success `on_success(data, raw)` runs; otherwise `on_error(message, raw)`
/// with the extracted message or `default_error_msg`.
pub fn create_api_callback<R, S, E>(
    on_success: S,
    on_error: E,
    default_error_msg: Option<&str>,
) -> impl FnOnce(R)
where
    R: Into<Value>,
    S: FnOnce(Value, &Value),
    E: FnOnce(String, &Value),
{
    let default_error_msg = default_error_msg.map(str::to_owned);
    move |response: R| {
        let raw: Value = response.into();
        if is_api_success(Some(&raw)) {
            let data = get_business_data(Some(&raw)).cloned().unwrap_or(Value::Null);
            on_success(data, &raw);
        } else {
            let message = get_error_message(Some(&raw), default_error_msg.as_deref());
            on_error(message, &raw);
        }
    }
}

/// Adapt a callback-based call into a future.
///
/// `api_call` receives the completion callback and must invoke it at most
/// once. The future resolves with the extracted `data` on business success
/// and rejects with [`ApiError::Business`] otherwise. If the callback is
/// dropped without being invoked the future rejects with
/// [`ApiError::Abandoned`].
pub fn create_api_promise<R, F, O>(api_call: F) -> impl Future<Output = Result<Value, ApiError>>
where
    R: Into<Value> + Send + 'static,
    F: FnOnce(Completion<R>) -> O,
{
    let (tx, rx) = oneshot::channel::<Value>();
    let _ = api_call(Box::new(move |response: R| {
        let _ = tx.send(response.into());
    }));
    async move {
        let raw = rx.await.map_err(|_| {
            ApiLogger::error("completion dropped without a response", &Value::Null);
            ApiError::Abandoned
        })?;
        settle(&raw)
    }
}

fn settle(raw: &Value) -> Result<Value, ApiError> {
    if is_api_success(Some(raw)) {
        return Ok(get_business_data(Some(raw)).cloned().unwrap_or(Value::Null));
    }
    let message = get_error_message(Some(raw), None);
    ApiLogger::warn(&message, raw);
    Err(ApiError::Business { message })
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Tagged API logging under the `api` target.
pub struct ApiLogger;

impl ApiLogger {
    pub fn log(message: &str, data: &Value) {
        info!(target: "api", %data, "[API] {message}");
    }

    pub fn warn(message: &str, data: &Value) {
        warn!(target: "api", %data, "[API Warning] {message}");
    }

    pub fn error(message: &str, data: &Value) {
        error!(target: "api", %data, "[API Error] {message}");
    }
}
