//! Console route table and the auth navigation guard.
//!
//! # Design
//! Routes are declared once in [`default_routes`] and never change. The
//! router keeps only the current location. Before each navigation the
//! guard checks whether the target route name is on the protected list;
//! if so and no token is stored, navigation is redirected to the login
//! route with the requested full path in the `redirect` query parameter.
//! Navigating to the location that is already active is a no-op.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::ConsoleConfig;
use crate::error::RouterError;
use crate::storage::{TokenStorage, TOKEN_KEY};

/// Route names that require a stored token.
pub const PROTECTED_ROUTES: &[&str] = &["home", "RoleConfig", "DeviceManagement", "UserManagement", "ModelConfig"];

/// Name of the route unauthenticated users are sent to.
pub const LOGIN_ROUTE: &str = "login";

/// Query parameter carrying the post-login destination.
pub const REDIRECT_QUERY: &str = "redirect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub title: String,
}

/// A statically declared route. `component` names the view loaded lazily
/// when the route is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    pub component: String,
    pub meta: Option<RouteMeta>,
}

impl RouteDescriptor {
    fn new(path: &str, name: &str, component: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            component: component.to_string(),
            meta: None,
        }
    }

    fn auth(mut self, title: &str) -> Self {
        self.meta = Some(RouteMeta {
            requires_auth: true,
            title: title.to_string(),
        });
        self
    }
}

/// The console's route table.
pub fn default_routes() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("/", "welcome", "login"),
        RouteDescriptor::new("/role-config", "RoleConfig", "roleConfig"),
        RouteDescriptor::new("/voice-print", "VoicePrint", "VoicePrint"),
        RouteDescriptor::new("/login", "login", "login"),
        RouteDescriptor::new("/home", "home", "home"),
        RouteDescriptor::new("/register", "Register", "register"),
        RouteDescriptor::new("/retrieve-password", "RetrievePassword", "retrievePassword"),
        RouteDescriptor::new("/device-management", "DeviceManagement", "DeviceManagement"),
        RouteDescriptor::new("/user-management", "UserManagement", "UserManagement"),
        RouteDescriptor::new("/model-config", "ModelConfig", "ModelConfig"),
        RouteDescriptor::new("/params-management", "ParamsManagement", "ParamsManagement").auth("参数管理"),
        RouteDescriptor::new("/server-side-management", "ServerSideManager", "ServerSideManager").auth("服务端管理"),
        RouteDescriptor::new("/ota-management", "OtaManagement", "OtaManagement").auth("OTA管理"),
        RouteDescriptor::new("/dict-management", "DictManagement", "DictManagement"),
        RouteDescriptor::new("/provider-management", "ProviderManagement", "ProviderManagement"),
        RouteDescriptor::new("/scenario-config", "ScenarioConfig", "ScenarioConfig").auth("场景配置"),
        RouteDescriptor::new("/scenario-create", "ScenarioCreate", "ScenarioCreate").auth("创建场景"),
        RouteDescriptor::new("/scenario-edit/:id", "ScenarioEdit", "ScenarioEdit").auth("编辑场景"),
        RouteDescriptor::new("/scenario-steps/:id", "ScenarioStepConfig", "ScenarioStepConfig").auth("步骤配置"),
        RouteDescriptor::new("/learning-record-management", "LearningRecordManagement", "LearningRecordManagement")
            .auth("学习记录管理"),
    ]
}

/// A location matched against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub name: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub component: String,
    pub meta: Option<RouteMeta>,
}

impl Resolved {
    /// Path plus encoded query string.
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        format!("{}?{}", self.path, encode_query(&self.query))
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Outcome of [`Router::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The target was entered as requested.
    Navigated(Resolved),
    /// The guard sent the user to the login route instead.
    Redirected(Resolved),
    /// The target is already the active location; nothing changed.
    Duplicate,
}

enum Segment {
    Static(String),
    Param(String),
}

struct CompiledRoute {
    descriptor: RouteDescriptor,
    segments: Vec<Segment>,
}

impl CompiledRoute {
    fn compile(descriptor: RouteDescriptor) -> Self {
        let segments = split_path(&descriptor.path)
            .map(|s| match s.strip_prefix(':') {
                Some(param) => Segment::Param(param.to_string()),
                None => Segment::Static(s.to_string()),
            })
            .collect();
        Self { descriptor, segments }
    }

    fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), decode(part));
                }
            }
        }
        Some(params)
    }

    fn fill(&self, params: &BTreeMap<String, String>) -> Option<String> {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Static(s) => path.push_str(s),
                Segment::Param(name) => path.push_str(&urlencoding::encode(params.get(name)?)),
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Some(path)
    }

    fn resolve(&self, path: String, params: BTreeMap<String, String>, query: Vec<(String, String)>) -> Resolved {
        Resolved {
            name: self.descriptor.name.clone(),
            path,
            params,
            query,
            component: self.descriptor.component.clone(),
            meta: self.descriptor.meta.clone(),
        }
    }
}

/// Client-side router with a token-gated guard.
pub struct Router<S> {
    routes: Vec<CompiledRoute>,
    protected: Vec<String>,
    base: String,
    storage: S,
    current: Option<Resolved>,
}

impl<S: TokenStorage> Router<S> {
    /// Router over [`default_routes`] guarding [`PROTECTED_ROUTES`].
    pub fn new(storage: S, base: &str) -> Self {
        Self::with_routes(
            default_routes(),
            PROTECTED_ROUTES.iter().map(|s| s.to_string()).collect(),
            storage,
            base,
        )
    }

    /// Router over [`default_routes`] under the configured public path.
    pub fn from_config(storage: S, config: &ConsoleConfig) -> Self {
        Self::new(storage, &config.public_path)
    }

    pub fn with_routes(routes: Vec<RouteDescriptor>, protected: Vec<String>, storage: S, base: &str) -> Self {
        Self {
            routes: routes.into_iter().map(CompiledRoute::compile).collect(),
            protected,
            base: base.trim_end_matches('/').to_string(),
            storage,
            current: None,
        }
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().map(|r| &r.descriptor)
    }

    pub fn current(&self) -> Option<&Resolved> {
        self.current.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Match a location such as `/scenario-edit/7?tab=steps`. A leading
    /// base path is stripped first.
    pub fn resolve(&self, location: &str) -> Result<Resolved, RouterError> {
        let (path, query) = match location.split_once('?') {
            Some((p, q)) => (p, parse_query(q)),
            None => (location, Vec::new()),
        };
        let path = self.strip_base(path);
        let path = if path.is_empty() { "/" } else { path };
        self.routes
            .iter()
            .find_map(|route| route.matches(path).map(|params| (route, params)))
            .map(|(route, params)| route.resolve(normalize(path), params, query))
            .ok_or_else(|| RouterError::NotFound(location.to_string()))
    }

    /// Build a location from a route name and its path parameters.
    pub fn resolve_named(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
        query: Vec<(String, String)>,
    ) -> Result<Resolved, RouterError> {
        let route = self
            .routes
            .iter()
            .find(|r| r.descriptor.name == name)
            .ok_or_else(|| RouterError::UnknownRouteName(name.to_string()))?;
        let path = route
            .fill(params)
            .ok_or_else(|| RouterError::NotFound(route.descriptor.path.clone()))?;
        Ok(route.resolve(path, params.clone(), query))
    }

    /// Navigate to `location`, applying the guard.
    pub fn push(&mut self, location: &str) -> Result<Navigation, RouterError> {
        let target = self.resolve(location)?;
        self.navigate(target)
    }

    /// Navigate to a named route, applying the guard.
    pub fn push_named(&mut self, name: &str, params: &BTreeMap<String, String>) -> Result<Navigation, RouterError> {
        let target = self.resolve_named(name, params, Vec::new())?;
        self.navigate(target)
    }

    fn navigate(&mut self, target: Resolved) -> Result<Navigation, RouterError> {
        let (dest, redirected) = match self.guard(&target)? {
            Some(login) => (login, true),
            None => (target, false),
        };
        if self.current.as_ref().map(Resolved::full_path) == Some(dest.full_path()) {
            debug!(path = %dest.full_path(), "duplicate navigation ignored");
            return Ok(Navigation::Duplicate);
        }
        self.current = Some(dest.clone());
        Ok(if redirected {
            Navigation::Redirected(dest)
        } else {
            Navigation::Navigated(dest)
        })
    }

    /// `Some(login)` when `to` is protected and no token is stored.
    fn guard(&self, to: &Resolved) -> Result<Option<Resolved>, RouterError> {
        if !self.protected.iter().any(|name| *name == to.name) {
            return Ok(None);
        }
        if self.storage.get_item(TOKEN_KEY).is_some_and(|t| !t.is_empty()) {
            return Ok(None);
        }
        info!(route = %to.name, path = %to.full_path(), "no token, redirecting to login");
        let query = vec![(REDIRECT_QUERY.to_string(), to.full_path())];
        self.resolve_named(LOGIN_ROUTE, &BTreeMap::new(), query).map(Some)
    }

    fn strip_base<'a>(&self, path: &'a str) -> &'a str {
        if self.base.is_empty() {
            return path;
        }
        match path.strip_prefix(self.base.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn normalize(path: &str) -> String {
    let joined = split_path(path).collect::<Vec<_>>().join("/");
    format!("/{joined}")
}

fn decode(s: &str) -> String {
    urlencoding::decode(s).map(|c| c.into_owned()).unwrap_or_else(|_| s.to_string())
}

fn parse_query(q: &str) -> Vec<(String, String)> {
    q.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
