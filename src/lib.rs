//! # HostRouter
//!
//! HostRouter is an HTTP request router for [hyper](https://hyper.rs/) that organizes routes in a
//! tree of prefixed groups and host-based domains, and runs middleware around every matched route
//! in a fixed, predictable order.
//!
//! ## Features
//!
//! **First registered, first matched:** Routes are tried in the order they were added. Inside a
//! group or domain, its own routes come before its nested groups. The first route whose method and
//! pattern match the request handles it; there are no specificity rules to learn.
//!
//! **Parameters in your routing pattern:** Give a path segment a name and the router delivers the
//! value to you. Parameters may be optional, and the last one may capture the rest of the path.
//!
//! **Groups:** Routes that share a prefix and middleware go into a [`Group`]. Groups nest to any
//! depth and their prefixes are joined as plain text.
//!
//! **Domains:** Does your server serve multiple hosts or sub-domains? Put their routes into a
//! [`Domain`] with host patterns such as `*.example.com`, `example.com:8080` or `[::1]:8080`.
//!
//! **Ordered middleware:** Every level of the tree has *before* and *after* middleware, and the
//! chain always runs router → domain → groups → route → handler → route → groups → domain → router.
//! See [`middleware`] for the details.
//!
//! **Fail fast:** [`Router::build`] validates every pattern once. After that, the tree is immutable
//! and can be shared by any number of tasks without locking.
//!
//! ## Usage
//!
//! Here is a simple example:
//!
//! ```rust,no_run
//! use hostrouter::{Group, RequestExt, Route, Router};
//! use hyper::{Body, Request, Response};
//!
//! async fn index(_: Request<Body>) -> hyper::Result<Response<Body>> {
//!     Ok(Response::new("Hello, World!".into()))
//! }
//!
//! async fn hello(req: Request<Body>) -> hyper::Result<Response<Body>> {
//!     let user = req.param("user").unwrap_or("stranger").to_owned();
//!     Ok(Response::new(format!("Hello, {}", user).into()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new()
//!         .get("/", index)
//!         .group(Group::new("/hello").route(Route::get("/:user", hello)));
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(router.into_service()?)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Named parameters
//!
//! `:user` is a *named parameter*. The values are accessible via [`RequestExt::param`], or as a
//! whole via `req.extensions().get::<Params>()`.
//!
//! Named parameters only match a single, non-empty path segment:
//!
//! ```ignore
//! Pattern: /user/:user
//!
//!  /user/gordon              match
//!  /user/you                 match
//!  /user/gordon/profile      no match
//!  /user/                    no match
//! ```
//!
//! ### Optional parameters
//!
//! `:name?` matches a segment if there is one. A parameter that did not take part in the match is
//! absent from [`Params`], which is different from being empty:
//!
//! ```ignore
//! Pattern: /articles/:category/:id?
//!
//!  /articles/tech            match: category="tech"
//!  /articles/tech/123        match: category="tech", id="123"
//!  /articles                 no match
//! ```
//!
//! ### Catch-All parameters
//!
//! `*name` (or `:name...`) captures the rest of the path. It must be the last segment:
//!
//! ```ignore
//! Pattern: /src/*filepath
//!
//!  /src/somefile.go          match: filepath="somefile.go"
//!  /src/subdir/somefile.go   match: filepath="subdir/somefile.go"
//!  /src/                     no match
//! ```
//!
//! A bare `*` (or `**`) at the end captures nothing and matches everything below the prefix in front of it,
//! and the patterns `/*` and `/**` match every path.
//!
//! ### Not Found Handler
//!
//! When no route matches, no middleware runs and the router answers `404 Not Found`. You can use
//! another handler for those requests with [`Router::not_found`]:
//!
//! ```rust
//! use hostrouter::Router;
//! use hyper::{Body, Request, Response, StatusCode};
//!
//! async fn missing(_: Request<Body>) -> hyper::Result<Response<Body>> {
//!     let mut res = Response::new(Body::from("nothing here"));
//!     *res.status_mut() = StatusCode::NOT_FOUND;
//!     Ok(res)
//! }
//!
//! let router = Router::new().not_found(missing);
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod middleware;
pub mod params;
pub mod path;

#[doc(hidden)]
pub mod router;

#[doc(inline)]
pub use router::{Domain, Group, Handler, HandlerFuture, Route, Router};

#[doc(inline)]
pub use dispatch::{Dispatcher, Match};

#[doc(inline)]
pub use error::{Error, PatternError};

#[doc(inline)]
pub use middleware::Middleware;

#[doc(inline)]
pub use params::{Params, RequestExt};

// test the code examples in README.md
#[cfg(doctest)]
mod test_readme {
  macro_rules! doc_comment {
    ($x:expr) => {
        #[doc = $x]
        extern {}
    };
  }

  doc_comment!(include_str!("../README.md"));
}
