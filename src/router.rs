//! [`Router`](crate::Router) and the tree it is built from.
//!
//! Routes are organized in a tree: the router holds routes, groups and
//! domains; a [`Domain`] holds routes and groups that are only reachable for
//! matching `Host` headers; a [`Group`] holds routes and nested groups under a
//! shared path prefix. Every level carries its own before/after middleware.
//!
//! ```rust,no_run
//! use hostrouter::{Domain, Group, Route, RequestExt, Router};
//! use hyper::{Body, Request, Response};
//!
//! async fn index(_: Request<Body>) -> hyper::Result<Response<Body>> {
//!     Ok(Response::new("Hello, World!".into()))
//! }
//!
//! async fn user(req: Request<Body>) -> hyper::Result<Response<Body>> {
//!     let id = req.param("id").unwrap_or_default().to_owned();
//!     Ok(Response::new(format!("user {}", id).into()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new()
//!         .get("/", index)
//!         .group(Group::new("/users").route(Route::get("/:id", user)))
//!         .domain(Domain::new("*.example.com").route(Route::get("/", index)));
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(router.into_service()?)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! Prefixes are joined as plain text, from the router down to the route: a
//! route `/:id` inside a group `/users` inside a router with prefix `/api`
//! answers `/api/users/:id`.
//!
//! Inside a router, domain or group, direct routes are tried before nested
//! groups, and everything is tried in the order it was added. The first route
//! whose method and pattern both match wins.
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use hyper::{Body, Method, Request, Response};

use crate::dispatch::{Dispatcher, MakeRouterService};
use crate::error::Error;
use crate::middleware::{Layers, Middleware};

/// The future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, hyper::Result<Response<Body>>>;

/// Represents a HTTP handler function.
/// This trait is implemented for asynchronous functions that take a `Request` and return a
/// `Result<Response<Body>, hyper::Error>`
/// ```rust
/// # use hostrouter::Handler;
/// # use hyper::{Request, Response, Body};
/// async fn hello(_: Request<Body>) -> Result<Response<Body>, hyper::Error> {
///     Ok(Response::new(Body::empty()))
/// }
///
/// let handler: Box<dyn Handler> = Box::new(hello);
/// ```
pub trait Handler: Send + Sync {
    fn handle(&self, req: Request<Body>) -> HandlerFuture;
}

impl<F, R> Handler for F
where
    F: Fn(Request<Body>) -> R + Send + Sync,
    R: Future<Output = Result<Response<Body>, hyper::Error>> + Send + 'static,
{
    fn handle(&self, req: Request<Body>) -> HandlerFuture {
        Box::pin(self(req))
    }
}

/// A method and path pattern bound to a handler.
///
/// See [`path`](crate::path) for the pattern syntax. A route without a method
/// answers every method.
#[derive(Default)]
pub struct Route {
    pub(crate) method: Option<Method>,
    pub(crate) path: String,
    // derived from `path` whenever it is set
    param_names: Vec<String>,
    pub(crate) name: Option<String>,
    pub(crate) handler: Option<Arc<dyn Handler>>,
    pub(crate) layers: Layers,
}

impl Route {
    /// An empty route: any method, empty path and no handler yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A route for `path` at the specified method.
    /// ```rust
    /// use hostrouter::Route;
    /// use hyper::{Request, Response, Body, Method};
    ///
    /// async fn teapot(_: Request<Body>) -> hyper::Result<Response<Body>> {
    ///     Ok(Response::new(Body::from("I am a teapot!")))
    /// }
    ///
    /// let route = Route::handle(Method::GET, "/teapot", teapot);
    /// ```
    pub fn handle(method: Method, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::new().method(method).path(path).handler(handler)
    }

    /// A route answering every method.
    pub fn any(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::new().path(path).handler(handler)
    }

    /// A route for `GET` requests
    pub fn get(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::GET, path, handler)
    }

    /// A route for `HEAD` requests
    pub fn head(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::HEAD, path, handler)
    }

    /// A route for `OPTIONS` requests
    pub fn options(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::OPTIONS, path, handler)
    }

    /// A route for `POST` requests
    pub fn post(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::POST, path, handler)
    }

    /// A route for `PUT` requests
    pub fn put(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::PUT, path, handler)
    }

    /// A route for `PATCH` requests
    pub fn patch(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::PATCH, path, handler)
    }

    /// A route for `DELETE` requests
    pub fn delete(path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::handle(Method::DELETE, path, handler)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Answer every method.
    pub fn any_method(mut self) -> Self {
        self.method = None;
        self
    }

    /// The route's own pattern, appended to the prefixes of its ancestors.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self.param_names = crate::path::param_names(&self.path)
            .into_iter()
            .map(str::to_owned)
            .collect();
        self
    }

    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub(crate) fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// A display name, reported by [`Match::name`](crate::dispatch::Match::name).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn before(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.before.push(Arc::new(middleware));
        self
    }

    pub fn after(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.after.push(Arc::new(middleware));
        self
    }

    /// Names of the parameters declared in the route's own path, without
    /// those of its ancestors' prefixes. The full list of a built route is
    /// [`Pattern::param_names`](crate::path::Pattern::param_names).
    /// ```rust
    /// use hostrouter::Route;
    ///
    /// let route = Route::new().path("/:owner/:repo/*rest");
    /// assert_eq!(route.param_names(), vec!["owner", "repo", "rest"]);
    ///
    /// assert!(Route::new().path("/files/**").param_names().is_empty());
    /// assert_eq!(Route::new().path("/:a").path("/:b").param_names(), vec!["b"]);
    /// ```
    pub fn param_names(&self) -> Vec<&str> {
        self.param_names.iter().map(String::as_str).collect()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("handler", &self.handler.is_some())
            .field("layers", &self.layers)
            .finish()
    }
}

/// Routes and nested groups sharing a path prefix and middleware.
#[derive(Debug, Default)]
pub struct Group {
    pub(crate) prefix: String,
    pub(crate) routes: Vec<Route>,
    pub(crate) groups: Vec<Group>,
    pub(crate) layers: Layers,
}

impl Group {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Nests `group` below this one.
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn before(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.before.push(Arc::new(middleware));
        self
    }

    pub fn after(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.after.push(Arc::new(middleware));
        self
    }
}

/// Routes and groups served only for requests whose `Host` matches.
///
/// See [`host`](crate::host) for the host pattern syntax.
/// ```rust
/// use hostrouter::{Domain, Route};
/// use hyper::{Body, Request, Response};
///
/// async fn index(_: Request<Body>) -> hyper::Result<Response<Body>> {
///     Ok(Response::new(Body::from("api")))
/// }
///
/// let api = Domain::new("api.example.com, api.example.org")
///     .host("*.api.example.com")
///     .route(Route::get("/", index));
/// ```
#[derive(Debug, Default)]
pub struct Domain {
    pub(crate) hosts: Vec<String>,
    pub(crate) routes: Vec<Route>,
    pub(crate) groups: Vec<Group>,
    pub(crate) layers: Layers,
}

impl Domain {
    pub fn new(host: impl Into<String>) -> Self {
        Self::default().host(host)
    }

    /// Adds another host pattern. A pattern may be a comma separated list.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into());
        self
    }

    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn before(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.before.push(Arc::new(middleware));
        self
    }

    pub fn after(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.after.push(Arc::new(middleware));
        self
    }
}

/// Router dispatches requests to different handlers via configurable routes.
#[derive(Default)]
pub struct Router {
    pub(crate) prefix: String,
    pub(crate) routes: Vec<Route>,
    pub(crate) groups: Vec<Group>,
    pub(crate) domains: Vec<Domain>,
    pub(crate) layers: Layers,
    pub(crate) not_found: Option<Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix applied to every route in the tree, domains included.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    /// Middleware run before everything else, for every matched route.
    pub fn before(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.before.push(Arc::new(middleware));
        self
    }

    /// Middleware run after everything else, for every matched route.
    pub fn after(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.after.push(Arc::new(middleware));
        self
    }

    /// Configurable handler which is called when no matching route is
    /// found. No middleware runs around it. Without one, the router answers
    /// with an empty `404 Not Found`.
    pub fn not_found(mut self, handler: impl Handler + 'static) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Insert a top-level route for a specific path at the specified method.
    /// ```rust
    /// use hostrouter::Router;
    /// use hyper::{Request, Response, Body, Method};
    ///
    /// let router = Router::new()
    ///     .handle("/teapot", Method::GET, |_: Request<Body>| async {
    ///         Ok::<_, hyper::Error>(Response::new(Body::from("I am a teapot!")))
    ///     });
    /// ```
    pub fn handle(self, path: impl Into<String>, method: Method, handler: impl Handler + 'static) -> Self {
        self.route(Route::handle(method, path, handler))
    }

    /// Register a handler for `GET` requests
    pub fn get(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::GET, handler)
    }

    /// Register a handler for `HEAD` requests
    pub fn head(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::HEAD, handler)
    }

    /// Register a handler for `OPTIONS` requests
    pub fn options(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::OPTIONS, handler)
    }

    /// Register a handler for `POST` requests
    pub fn post(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::POST, handler)
    }

    /// Register a handler for `PUT` requests
    pub fn put(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::PUT, handler)
    }

    /// Register a handler for `PATCH` requests
    pub fn patch(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::PATCH, handler)
    }

    /// Register a handler for `DELETE` requests
    pub fn delete(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handle(path, Method::DELETE, handler)
    }

    /// Freezes the tree into a [`Dispatcher`].
    ///
    /// Every route pattern is joined with its prefixes and compiled here, so a
    /// malformed pattern or a route without a handler is reported before any
    /// request is served.
    /// ```rust
    /// use hostrouter::Router;
    /// use hyper::{Request, Response, Body, Method};
    ///
    /// async fn home(_: Request<Body>) -> hyper::Result<Response<Body>> {
    ///     Ok(Response::new(Body::from("Welcome!")))
    /// }
    ///
    /// let dispatcher = Router::new().get("/home", home).build().unwrap();
    ///
    /// let found = dispatcher.lookup(&Method::GET, None, "/home").unwrap();
    /// assert!(found.params().is_empty());
    ///
    /// assert!(Router::new().get("/:a/:a", home).build().is_err());
    /// ```
    pub fn build(self) -> Result<Dispatcher, Error> {
        Dispatcher::new(self)
    }

    /// Builds the router and converts it into a `Service` which you can serve directly with `Hyper`.
    /// ```rust,no_run
    /// # use hostrouter::Router;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// // Our router...
    /// let router = Router::new();
    ///
    /// // Convert it into a service...
    /// let service = router.into_service()?;
    ///
    /// // Serve with hyper
    /// hyper::Server::bind(&([127, 0, 0, 1], 3030).into())
    ///     .serve(service)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_service(self) -> Result<MakeRouterService, Error> {
        Ok(self.build()?.into_service())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .field("groups", &self.groups)
            .field("domains", &self.domains)
            .field("layers", &self.layers)
            .field("not_found", &self.not_found.is_some())
            .finish()
    }
}
