//! Middleware and the order in which it runs.
//!
//! A [`Middleware`] turns a handler into another handler. It may do work
//! before and after calling the handler it wraps, or answer the request itself
//! and never call it at all, which aborts the rest of the chain.
//!
//! Every level of the routing tree (router, domain, group, route) carries a
//! list of *before* and a list of *after* middleware. For a matched route the
//! chain always runs in this order:
//! ```ignore
//!  router.before → domain.before → group₁.before → … → groupₙ.before → route.before
//!      → handler
//!  → route.after → groupₙ.after → … → group₁.after → domain.after → router.after
//! ```
//! Within one list, the first middleware added runs first. After-middleware
//! are nested around the handler so that the code they run once `next` has
//! returned executes in the order shown; a before-middleware that answers the
//! request on its own keeps every inner before-middleware, the handler and all
//! after-middleware from running.
//!
//! The easiest way to write one is [`from_fn`]:
//! ```rust
//! use hostrouter::middleware::{from_fn, Next};
//! use hostrouter::Router;
//! use hyper::{Body, Request, Response, StatusCode};
//!
//! let require_token = from_fn(|req: Request<Body>, next: Next| async move {
//!     if req.headers().contains_key("x-token") {
//!         next.run(req).await
//!     } else {
//!         let mut res = Response::new(Body::empty());
//!         *res.status_mut() = StatusCode::UNAUTHORIZED;
//!         Ok(res)
//!     }
//! });
//!
//! let router = Router::new().before(require_token);
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use hyper::{Body, Request, Response, StatusCode};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::router::Handler;

/// Wraps a handler, producing a new handler.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        (**self).wrap(next)
    }
}

impl<M: Middleware + ?Sized> Middleware for Box<M> {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        (**self).wrap(next)
    }
}

/// The rest of the chain, handed to middleware created with [`from_fn`].
#[derive(Clone)]
pub struct Next {
    inner: Arc<dyn Handler>,
}

impl Next {
    /// Runs the remaining middleware and the route handler.
    pub async fn run(self, req: Request<Body>) -> hyper::Result<Response<Body>> {
        self.inner.handle(req).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Creates a middleware from an async function taking the request and [`Next`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = hyper::Result<Response<Body>>> + Send + 'static,
{
    FromFn { f: Arc::new(f) }
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F> {
    f: Arc<F>,
}

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = hyper::Result<Response<Body>>> + Send + 'static,
{
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        let f = self.f.clone();
        Arc::new(move |req: Request<Body>| {
            let next = Next {
                inner: next.clone(),
            };
            f(req, next)
        })
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Creates a middleware from a plain `(Handler) -> Handler` function.
/// ```rust
/// use std::sync::Arc;
/// use hostrouter::middleware::wrap_fn;
/// use hostrouter::Handler;
/// use hyper::{Body, Request};
///
/// let passthrough = wrap_fn(|next: Arc<dyn Handler>| -> Arc<dyn Handler> {
///     Arc::new(move |req: Request<Body>| next.handle(req))
/// });
/// ```
pub fn wrap_fn<F>(f: F) -> WrapFn<F>
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync + 'static,
{
    WrapFn { f }
}

/// Middleware returned by [`wrap_fn`].
pub struct WrapFn<F> {
    f: F,
}

impl<F> Middleware for WrapFn<F>
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync + 'static,
{
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        (self.f)(next)
    }
}

impl<F> fmt::Debug for WrapFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapFn").finish_non_exhaustive()
    }
}

/// The before and after lists attached to one level of the tree.
#[derive(Clone, Default)]
pub(crate) struct Layers {
    pub(crate) before: Vec<Arc<dyn Middleware>>,
    pub(crate) after: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for Layers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layers")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Builds the handler for a matched route.
///
/// `tiers` runs from the outermost level (the router) to the route itself.
pub(crate) fn compose(tiers: &[&Layers], handler: Arc<dyn Handler>) -> Arc<dyn Handler> {
    // innermost first: the route's first after-middleware sits right around the handler
    let handler = tiers
        .iter()
        .rev()
        .flat_map(|tier| tier.after.iter())
        .fold(handler, |next, middleware| middleware.wrap(next));

    tiers
        .iter()
        .rev()
        .flat_map(|tier| tier.before.iter().rev())
        .fold(handler, |next, middleware| middleware.wrap(next))
}

/// Turns a panic anywhere further down the chain into a `500 Internal Server Error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

impl Middleware for Recover {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(move |req: Request<Body>| {
            let next = next.clone();
            AssertUnwindSafe(async move { next.handle(req).await })
                .catch_unwind()
                .map(|result| {
                    result.unwrap_or_else(|panic| {
                        let message = panic
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                            .unwrap_or("unknown panic");
                        error!(panic = message, "handler panicked");

                        let mut res = Response::new(Body::empty());
                        *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                        Ok(res)
                    })
                })
        })
    }
}

/// Runs the rest of the chain inside a `request` span and logs how it ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(move |req: Request<Body>| {
            let span = info_span!("request", method = %req.method(), path = %req.uri().path());
            let next = next.clone();
            let start = Instant::now();

            async move {
                let res = next.handle(req).await;
                match &res {
                    Ok(res) => debug!(
                        status = res.status().as_u16(),
                        elapsed_us = (start.elapsed().as_micros() as u64),
                        "request finished"
                    ),
                    Err(err) => warn!(error = %err, "request failed"),
                }
                res
            }
            .instrument(span)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn before(log: &Log, name: &'static str) -> Arc<dyn Middleware> {
        let log = log.clone();
        Arc::new(from_fn(move |req, next: Next| {
            log.lock().unwrap().push(name.to_owned());
            next.run(req)
        }))
    }

    fn after(log: &Log, name: &'static str) -> Arc<dyn Middleware> {
        let log = log.clone();
        Arc::new(from_fn(move |req, next: Next| {
            let log = log.clone();
            async move {
                let res = next.run(req).await;
                log.lock().unwrap().push(name.to_owned());
                res
            }
        }))
    }

    fn abort(log: &Log, name: &'static str) -> Arc<dyn Middleware> {
        let log = log.clone();
        Arc::new(from_fn(move |_req, _next: Next| {
            log.lock().unwrap().push(name.to_owned());
            async {
                let mut res = Response::new(Body::empty());
                *res.status_mut() = StatusCode::FORBIDDEN;
                Ok::<_, hyper::Error>(res)
            }
        }))
    }

    fn handler(log: &Log) -> Arc<dyn Handler> {
        let log = log.clone();
        Arc::new(move |_req: Request<Body>| {
            log.lock().unwrap().push("handler".to_owned());
            async { Ok::<_, hyper::Error>(Response::new(Body::empty())) }
        })
    }

    fn tier(before: Vec<Arc<dyn Middleware>>, after: Vec<Arc<dyn Middleware>>) -> Layers {
        Layers { before, after }
    }

    fn taken(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[tokio::test]
    async fn tiers_run_outer_to_inner_then_back_out() {
        let log = Log::default();
        let global = tier(
            vec![before(&log, "g1"), before(&log, "g2")],
            vec![after(&log, "ga1"), after(&log, "ga2")],
        );
        let group = tier(vec![before(&log, "grp")], vec![after(&log, "grpa")]);
        let route = tier(vec![before(&log, "r")], vec![after(&log, "ra")]);

        let chain = compose(&[&global, &group, &route], handler(&log));
        let res = chain.handle(Request::new(Body::empty())).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            taken(&log),
            vec!["g1", "g2", "grp", "r", "handler", "ra", "grpa", "ga1", "ga2"]
        );
    }

    #[tokio::test]
    async fn aborting_before_skips_everything_inside() {
        let log = Log::default();
        let global = tier(vec![before(&log, "g")], vec![after(&log, "ga")]);
        let group = tier(vec![abort(&log, "deny")], vec![after(&log, "grpa")]);
        let route = tier(vec![before(&log, "r")], vec![]);

        let chain = compose(&[&global, &group, &route], handler(&log));
        let res = chain.handle(Request::new(Body::empty())).await.unwrap();

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(taken(&log), vec!["g", "deny"]);
    }

    #[tokio::test]
    async fn outer_layers_unwind_around_an_abort() {
        let log = Log::default();
        let outer = {
            let log = log.clone();
            Arc::new(from_fn(move |req, next: Next| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push("enter".to_owned());
                    let res = next.run(req).await;
                    log.lock().unwrap().push("leave".to_owned());
                    res
                }
            })) as Arc<dyn Middleware>
        };
        let global = tier(vec![outer], vec![]);
        let route = tier(vec![abort(&log, "deny")], vec![]);

        let chain = compose(&[&global, &route], handler(&log));
        chain.handle(Request::new(Body::empty())).await.unwrap();

        assert_eq!(taken(&log), vec!["enter", "deny", "leave"]);
    }

    #[tokio::test]
    async fn empty_chain_is_the_handler() {
        let log = Log::default();
        let chain = compose(&[&Layers::default()], handler(&log));
        chain.handle(Request::new(Body::empty())).await.unwrap();
        assert_eq!(taken(&log), vec!["handler"]);
    }

    #[tokio::test]
    async fn recover_turns_panics_into_500() {
        let panicking: Arc<dyn Handler> = Arc::new(|_req: Request<Body>| async {
            if true {
                panic!("boom");
            }
            Ok::<_, hyper::Error>(Response::new(Body::empty()))
        });

        let chain = Recover.wrap(panicking);
        let res = chain.handle(Request::new(Body::empty())).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn trace_passes_responses_through() {
        let log = Log::default();
        let chain = Trace.wrap(handler(&log));
        let res = chain.handle(Request::new(Body::empty())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(taken(&log), vec!["handler"]);
    }
}
