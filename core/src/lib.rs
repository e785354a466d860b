//! Client core for the scenario console of the device/agent manager.
//!
//! # Overview
//! Builds `HttpRequest` values for the scenario, scenario-step,
//! step-template and learning-record endpoints, dispatches them through a
//! pluggable `Transport` with bounded retry, and normalizes the backend's
//! `{code, msg, data}` envelope. A small router models the console's route
//! table and its token-gated navigation guard.
//!
//! # Design
//! - `ScenarioClient` is stateless: `build_*` produces requests, `parse_*`
//!   consumes responses, and no I/O happens in between (host-does-IO).
//! - `ScenarioApi` adds dispatch: each call spawns a task and hands the raw
//!   response to a callback. Envelope interpretation stays with the caller,
//!   via `create_api_callback` or `create_api_promise`.
//! - Network failures are retried with exponential backoff up to a fixed
//!   attempt count; they never loop forever.

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod http;
pub mod router;
pub mod storage;
pub mod transport;
pub mod types;

pub use api::{ApiHandle, ScenarioApi};
pub use client::ScenarioClient;
pub use config::ConsoleConfig;
pub use dispatch::{DispatchStats, Dispatcher, RetryPolicy};
pub use envelope::{
    create_api_callback, create_api_promise, extract_business_data, get_business_data, get_error_message,
    is_api_success, ApiLogger, Completion, DEFAULT_ERROR_MESSAGE,
};
pub use error::{ApiError, ConfigError, RouterError, StorageError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use router::{default_routes, Navigation, Resolved, RouteDescriptor, RouteMeta, Router};
pub use storage::{FileStorage, MemoryStorage, TokenStorage, TOKEN_KEY};
pub use transport::{Transport, UreqTransport};
pub use types::{LearningRecord, ListParams, PageData, Scenario, ScenarioStep, StepTemplate, ToggleScenario};
