//! Building a router from a declarative description.
//!
//! The configuration mirrors the tree: a router holds routes, groups and
//! domains, and every level names the middleware it wants. Handlers and
//! middleware are referenced by name and resolved through a [`Registry`]
//! when the tree is built; a name that is not registered is an error.
//!
//! ```rust
//! use hostrouter::config::{Registry, RouterConfig};
//! use hostrouter::middleware::Recover;
//! use hyper::{Body, Request, Response};
//!
//! async fn list_users(_: Request<Body>) -> hyper::Result<Response<Body>> {
//!     Ok(Response::new(Body::from("[]")))
//! }
//!
//! let config = RouterConfig::from_json(r#"{
//!     "before": ["recover"],
//!     "groups": [{
//!         "prefix": "/users",
//!         "routes": [{ "method": "GET", "path": "", "handler": "list_users" }]
//!     }],
//!     "domains": [{
//!         "hosts": ["status.example.com"],
//!         "routes": [{ "path": "/", "text": "ok" }]
//!     }]
//! }"#).unwrap();
//!
//! let registry = Registry::new()
//!     .handler("list_users", list_users)
//!     .middleware("recover", Recover);
//!
//! let router = config.build(&registry).unwrap();
//! ```
//!
//! Instead of a named handler, a route may serve a fixed body. When several
//! are given, the first present one of `handler`, `html`, `json`, `css`,
//! `xml` and `text` is used.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::middleware::Middleware;
use crate::router::{Domain, Group, Handler, Route, Router};

/// Named handlers and middleware available to a configuration.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    middleware: HashMap<String, Arc<dyn Middleware>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(mut self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Registers a middleware. The same instance is shared by every level
    /// that names it.
    pub fn middleware(mut self, name: impl Into<String>, middleware: impl Middleware + 'static) -> Self {
        self.middleware.insert(name.into(), Arc::new(middleware));
        self
    }

    fn lookup_handler(&self, name: &str) -> Result<Arc<dyn Handler>, Error> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownHandler(name.to_owned()))
    }

    fn lookup_middleware(&self, name: &str) -> Result<Arc<dyn Middleware>, Error> {
        self.middleware
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownMiddleware(name.to_owned()))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        let mut middleware: Vec<_> = self.middleware.keys().collect();
        handlers.sort();
        middleware.sort();

        f.debug_struct("Registry")
            .field("handlers", &handlers)
            .field("middleware", &middleware)
            .finish()
    }
}

/// Root of a declarative routing tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    pub prefix: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub routes: Vec<RouteConfig>,
    pub groups: Vec<GroupConfig>,
    pub domains: Vec<DomainConfig>,
}

/// Host-scoped routes and groups.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Host patterns; each entry may be a comma separated list.
    pub hosts: Vec<String>,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub routes: Vec<RouteConfig>,
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GroupConfig {
    pub prefix: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub routes: Vec<RouteConfig>,
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// HTTP method; empty for any method.
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of a handler in the [`Registry`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// A fixed response body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Html(String),
    Json(String),
    Css(String),
    Xml(String),
    Text(String),
}

impl Content {
    fn content_type(&self) -> &'static str {
        match self {
            Content::Html(_) => "text/html; charset=utf-8",
            Content::Json(_) => "application/json",
            Content::Css(_) => "text/css; charset=utf-8",
            Content::Xml(_) => "application/xml; charset=utf-8",
            Content::Text(_) => "text/plain; charset=utf-8",
        }
    }

    fn into_handler(self) -> impl Handler {
        let content_type = HeaderValue::from_static(self.content_type());
        let body = match self {
            Content::Html(body)
            | Content::Json(body)
            | Content::Css(body)
            | Content::Xml(body)
            | Content::Text(body) => body,
        };

        move |_: Request<Body>| {
            let mut res = Response::new(Body::from(body.clone()));
            res.headers_mut().insert(CONTENT_TYPE, content_type.clone());
            async move { Ok::<_, hyper::Error>(res) }
        }
    }
}

/// What a configured route answers with.
enum Responder {
    Named(Arc<dyn Handler>),
    Static(Content),
}

impl RouteConfig {
    fn responder(&self, registry: &Registry) -> Result<Option<Responder>, Error> {
        if let Some(name) = &self.handler {
            return registry.lookup_handler(name).map(Responder::Named).map(Some);
        }

        let content = if let Some(html) = &self.html {
            Content::Html(html.clone())
        } else if let Some(json) = &self.json {
            Content::Json(serde_json::to_string(json)?)
        } else if let Some(css) = &self.css {
            Content::Css(css.clone())
        } else if let Some(xml) = &self.xml {
            Content::Xml(xml.clone())
        } else if let Some(text) = &self.text {
            Content::Text(text.clone())
        } else {
            return Ok(None);
        };

        Ok(Some(Responder::Static(content)))
    }

    fn build(&self, registry: &Registry) -> Result<Route, Error> {
        let mut route = Route::new().path(self.path.as_str());

        if !self.method.is_empty() {
            let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
                .map_err(|_| Error::InvalidMethod(self.method.clone()))?;
            route = route.method(method);
        }

        if let Some(name) = &self.name {
            route = route.name(name.as_str());
        }

        route = match self.responder(registry)? {
            Some(Responder::Named(handler)) => route.shared_handler(handler),
            Some(Responder::Static(content)) => route.handler(content.into_handler()),
            None => {
                let label = self.name.clone().unwrap_or_else(|| self.path.clone());
                return Err(Error::MissingHandler(label));
            }
        };

        for name in &self.before {
            route = route.before(registry.lookup_middleware(name)?);
        }
        for name in &self.after {
            route = route.after(registry.lookup_middleware(name)?);
        }

        Ok(route)
    }
}

impl GroupConfig {
    fn build(&self, registry: &Registry) -> Result<Group, Error> {
        let mut group = Group::new(self.prefix.as_str());

        for name in &self.before {
            group = group.before(registry.lookup_middleware(name)?);
        }
        for name in &self.after {
            group = group.after(registry.lookup_middleware(name)?);
        }
        for route in &self.routes {
            group = group.route(route.build(registry)?);
        }
        for nested in &self.groups {
            group = group.group(nested.build(registry)?);
        }

        Ok(group)
    }
}

impl DomainConfig {
    fn build(&self, registry: &Registry) -> Result<Domain, Error> {
        let mut domain = Domain::default().hosts(self.hosts.iter().map(String::as_str));

        for name in &self.before {
            domain = domain.before(registry.lookup_middleware(name)?);
        }
        for name in &self.after {
            domain = domain.after(registry.lookup_middleware(name)?);
        }
        for route in &self.routes {
            domain = domain.route(route.build(registry)?);
        }
        for group in &self.groups {
            domain = domain.group(group.build(registry)?);
        }

        Ok(domain)
    }
}

impl RouterConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the routing tree, resolving every name through `registry`.
    ///
    /// The resulting [`Router`] is the same tree the equivalent builder calls
    /// would produce.
    pub fn build(&self, registry: &Registry) -> Result<Router, Error> {
        let mut router = Router::new().prefix(self.prefix.as_str());

        for name in &self.before {
            router = router.before(registry.lookup_middleware(name)?);
        }
        for name in &self.after {
            router = router.after(registry.lookup_middleware(name)?);
        }
        for route in &self.routes {
            router = router.route(route.build(registry)?);
        }
        for group in &self.groups {
            router = router.group(group.build(registry)?);
        }
        for domain in &self.domains {
            router = router.domain(domain.build(registry)?);
        }

        debug!(
            routes = self.routes.len(),
            groups = self.groups.len(),
            domains = self.domains.len(),
            "router assembled from configuration"
        );

        Ok(router)
    }
}
