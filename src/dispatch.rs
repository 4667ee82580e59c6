//! The frozen routing tree and request dispatch.
//!
//! [`Router::build`](crate::Router::build) flattens every subtree into the
//! order it is searched in: direct routes first, then groups depth-first, all
//! in registration order. Each compiled route keeps its full pattern and the
//! middleware of every ancestor between the router and itself.
//!
//! A request is dispatched in up to three steps:
//!
//! 1. Domains are tested against the request host in registration order. The
//!    host is the `Host` header, or the URI authority when there is no header
//!    (HTTP/2 requests carry `:authority` instead).
//! 2. The first domain that matches has its own routes searched.
//! 3. If no domain matched, or the matching domain has no route for the
//!    request, the router's own routes and groups are searched.
//!
//! The first route whose method and pattern match wins. When nothing matches,
//! no middleware or handler runs and the answer is `404 Not Found` (or the
//! router's [`not_found`](crate::Router::not_found) handler).
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{future, ready};
use hyper::service::Service;
use hyper::{header, Body, Method, Request, Response, StatusCode};
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::host::HostSet;
use crate::middleware::{compose, Layers};
use crate::params::Params;
use crate::path::Pattern;
use crate::router::{Group, Handler, HandlerFuture, Route, Router};

/// A route with its prefixes applied and its ancestors' middleware resolved.
struct Endpoint {
    method: Option<Method>,
    pattern: Pattern,
    name: Option<String>,
    handler: Arc<dyn Handler>,
    // domain, groups outer to inner, then the route itself
    tiers: Vec<Arc<Layers>>,
}

impl Endpoint {
    fn compile(prefix: &str, route: Route, ancestors: &[Arc<Layers>]) -> Result<Self, Error> {
        let full = format!("{}{}", prefix, route.path);
        let pattern = Pattern::parse(&full).map_err(|source| Error::Pattern {
            pattern: full.clone(),
            source,
        })?;

        let handler = match route.handler {
            Some(handler) => handler,
            None => return Err(Error::MissingHandler(route.name.unwrap_or(full))),
        };

        let mut tiers = Vec::with_capacity(ancestors.len() + 1);
        tiers.extend_from_slice(ancestors);
        tiers.push(Arc::new(route.layers));

        Ok(Self {
            method: route.method,
            pattern,
            name: route.name,
            handler,
            tiers,
        })
    }

    fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("name", &self.name)
            .field("tiers", &self.tiers)
            .finish()
    }
}

// Appends `routes`, then every group depth-first, in search order.
fn flatten(
    prefix: &str,
    routes: Vec<Route>,
    groups: Vec<Group>,
    ancestors: &[Arc<Layers>],
    out: &mut Vec<Endpoint>,
) -> Result<(), Error> {
    for route in routes {
        out.push(Endpoint::compile(prefix, route, ancestors)?);
    }

    for group in groups {
        let prefix = format!("{}{}", prefix, group.prefix);
        let mut ancestors = ancestors.to_vec();
        ancestors.push(Arc::new(group.layers));
        flatten(&prefix, group.routes, group.groups, &ancestors, out)?;
    }

    Ok(())
}

#[derive(Debug)]
struct DomainTable {
    hosts: HostSet,
    endpoints: Vec<Endpoint>,
}

/// The result of a successful [`Dispatcher::lookup`].
pub struct Match<'a> {
    endpoint: &'a Endpoint,
    params: Params,
}

impl<'a> Match<'a> {
    /// The fully-qualified pattern of the matched route.
    pub fn pattern(&self) -> &'a str {
        self.endpoint.pattern.as_str()
    }

    pub fn name(&self) -> Option<&'a str> {
        self.endpoint.name.as_deref()
    }

    /// The method the route was declared with, `None` for any method.
    pub fn method(&self) -> Option<&'a Method> {
        self.endpoint.method.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn into_params(self) -> Params {
        self.params
    }
}

impl fmt::Debug for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("pattern", &self.pattern())
            .field("name", &self.name())
            .field("params", &self.params)
            .finish()
    }
}

fn find<'a>(endpoints: &'a [Endpoint], method: &Method, path: &str) -> Option<Match<'a>> {
    endpoints
        .iter()
        .filter(|endpoint| endpoint.accepts(method))
        .find_map(|endpoint| {
            endpoint
                .pattern
                .matches(path)
                .map(|params| Match { endpoint, params })
        })
}

/// An immutable routing tree, ready to serve requests from any number of tasks.
pub struct Dispatcher {
    global: Arc<Layers>,
    domains: Vec<DomainTable>,
    endpoints: Vec<Endpoint>,
    not_found: Option<Arc<dyn Handler>>,
}

impl Dispatcher {
    pub(crate) fn new(router: Router) -> Result<Self, Error> {
        let Router {
            prefix,
            routes,
            groups,
            domains,
            layers,
            not_found,
        } = router;

        let mut tables = Vec::with_capacity(domains.len());
        for domain in domains {
            let hosts = HostSet::new(domain.hosts.as_slice());
            if hosts.is_empty() {
                warn!(patterns = ?domain.hosts, "domain has no usable host pattern and will never match");
            }

            let mut endpoints = Vec::new();
            let ancestors = [Arc::new(domain.layers)];
            flatten(&prefix, domain.routes, domain.groups, &ancestors, &mut endpoints)?;
            tables.push(DomainTable { hosts, endpoints });
        }

        let mut endpoints = Vec::new();
        flatten(&prefix, routes, groups, &[], &mut endpoints)?;

        debug!(
            routes = endpoints.len(),
            domains = tables.len(),
            domain_routes = tables.iter().map(|t| t.endpoints.len()).sum::<usize>(),
            "routing tree built"
        );

        Ok(Self {
            global: Arc::new(layers),
            domains: tables,
            endpoints,
            not_found,
        })
    }

    /// Finds the route for a request without running anything.
    ///
    /// `host` is the value of the `Host` header; `None` or an empty host never
    /// selects a domain.
    pub fn lookup(&self, method: &Method, host: Option<&str>, path: &str) -> Option<Match<'_>> {
        if let Some(host) = host.filter(|host| !host.is_empty()) {
            if let Some((i, table)) = self
                .domains
                .iter()
                .enumerate()
                .find(|(_, table)| table.hosts.matches(host))
            {
                trace!(host, domain = i, "host matched domain");
                if let Some(found) = find(&table.endpoints, method, path) {
                    return Some(found);
                }
            }
        }

        find(&self.endpoints, method, path)
    }

    /// Builds the handler for a match: the route handler wrapped in the
    /// middleware of the router, the route's ancestors and the route itself.
    pub fn handler_for(&self, found: &Match<'_>) -> Arc<dyn Handler> {
        let mut tiers: Vec<&Layers> = Vec::with_capacity(found.endpoint.tiers.len() + 1);
        tiers.push(&self.global);
        tiers.extend(found.endpoint.tiers.iter().map(|tier| &**tier));
        compose(&tiers, found.endpoint.handler.clone())
    }

    /// An asynchronous function from a `Request` to a `Response`. You will generally not need to use
    /// this function directly, and instead use
    /// [`Router::into_service`](crate::Router::into_service). However, it may be useful when
    /// incorporating the router into a larger service.
    /// ```rust,no_run
    /// # use hostrouter::Router;
    /// # use hyper::service::{make_service_fn, service_fn};
    /// # use hyper::{Request, Body, Server};
    /// # use std::convert::Infallible;
    /// # use std::sync::Arc;
    ///
    /// # async fn run() {
    /// let dispatcher = Arc::new(Router::new().build().unwrap());
    ///
    /// let make_svc = make_service_fn(move |_| {
    ///     let dispatcher = dispatcher.clone();
    ///     async move {
    ///         Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
    ///             let dispatcher = dispatcher.clone();
    ///             async move { dispatcher.serve(req).await }
    ///         }))
    ///     }
    /// });
    ///
    /// let server = Server::bind(&([127, 0, 0, 1], 3000).into())
    ///     .serve(make_svc)
    ///     .await;
    /// # }
    /// ```
    pub fn serve(&self, mut req: Request<Body>) -> ResponseFut {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|host| host.to_str().ok())
            .or_else(|| req.uri().authority().map(|authority| authority.as_str()));

        let found = self.lookup(req.method(), host, req.uri().path());

        match found {
            Some(found) => {
                debug!(
                    method = %req.method(),
                    path = req.uri().path(),
                    route = found.pattern(),
                    "matched route"
                );
                let handler = self.handler_for(&found);
                req.extensions_mut().insert(found.into_params());
                ResponseFutKind::Boxed(handler.handle(req)).into()
            }
            None => {
                debug!(method = %req.method(), path = req.uri().path(), "no route matched");
                match self.not_found {
                    Some(ref handler) => ResponseFutKind::Boxed(handler.handle(req)).into(),
                    None => ResponseFutKind::NotFound.into(),
                }
            }
        }
    }

    /// Converts the `Dispatcher` into a `Service` which you can serve directly with `Hyper`.
    pub fn into_service(self) -> MakeRouterService {
        MakeRouterService(RouterService::new(self))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("global", &self.global)
            .field("domains", &self.domains)
            .field("endpoints", &self.endpoints)
            .field("not_found", &self.not_found.is_some())
            .finish()
    }
}

#[doc(hidden)]
pub struct MakeRouterService(RouterService);

impl<T> Service<T> for MakeRouterService {
    type Response = RouterService;
    type Error = hyper::Error;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        let service = self.0.clone();
        future::ok(service)
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct RouterService(Arc<Dispatcher>);

impl RouterService {
    fn new(dispatcher: Dispatcher) -> Self {
        RouterService(Arc::new(dispatcher))
    }
}

impl Service<Request<Body>> for RouterService {
    type Response = Response<Body>;
    type Error = hyper::Error;
    type Future = ResponseFut;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.0.serve(req)
    }
}

pub struct ResponseFut {
    kind: ResponseFutKind,
}

impl From<ResponseFutKind> for ResponseFut {
    fn from(kind: ResponseFutKind) -> Self {
        Self { kind }
    }
}

enum ResponseFutKind {
    Boxed(HandlerFuture),
    NotFound,
}

impl Future for ResponseFut {
    type Output = hyper::Result<Response<Body>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let ready = match self.kind {
            ResponseFutKind::Boxed(ref mut fut) => ready!(fut.as_mut().poll(cx)),
            ResponseFutKind::NotFound => {
                let mut res = Response::new(Body::empty());
                *res.status_mut() = StatusCode::NOT_FOUND;
                Ok(res)
            }
        };

        Poll::Ready(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Domain;

    async fn ok(_: Request<Body>) -> hyper::Result<Response<Body>> {
        Ok(Response::new(Body::empty()))
    }

    #[test]
    fn flattens_routes_before_groups() {
        let dispatcher = Router::new()
            .group(
                Group::new("/a")
                    .group(Group::new("/deep").route(Route::get("/x", ok)))
                    .route(Route::get("/x", ok)),
            )
            .route(Route::get("/top", ok))
            .build()
            .unwrap();

        let patterns: Vec<_> = dispatcher
            .endpoints
            .iter()
            .map(|e| e.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["/top", "/a/x", "/a/deep/x"]);
        assert_eq!(dispatcher.endpoints[2].tiers.len(), 3);
    }

    #[test]
    fn prefixes_join_textually() {
        let dispatcher = Router::new()
            .prefix("/api")
            .group(Group::new("/v").route(Route::get("1/items", ok)))
            .domain(Domain::new("example.com").route(Route::get("/d", ok)))
            .build()
            .unwrap();

        assert_eq!(dispatcher.endpoints[0].pattern.as_str(), "/api/v1/items");
        assert_eq!(dispatcher.domains[0].endpoints[0].pattern.as_str(), "/api/d");
    }

    #[test]
    fn reports_the_offending_pattern() {
        let err = Router::new()
            .group(Group::new("/files").route(Route::get("/*rest/x", ok)))
            .build()
            .unwrap_err();

        match err {
            Error::Pattern { pattern, .. } => assert_eq!(pattern, "/files/*rest/x"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn duplicate_names_across_prefixes_are_rejected() {
        let err = Router::new()
            .group(Group::new("/users/:id").route(Route::get("/posts/:id", ok)))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn routes_need_a_handler() {
        let err = Router::new()
            .route(Route::new().path("/x").name("orphan"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingHandler(ref name) if name == "orphan"));
    }

    #[tokio::test]
    async fn unmatched_requests_get_404() {
        let dispatcher = Router::new().get("/", ok).build().unwrap();
        let req = Request::builder().uri("/missing").body(Body::empty()).unwrap();
        let res = dispatcher.serve(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
