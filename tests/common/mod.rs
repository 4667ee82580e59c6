#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hostrouter::middleware::{from_fn, Next};
use hostrouter::{Handler, Middleware};
use hyper::{header, Body, Method, Request, Response, StatusCode};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

/// Records `name` on the way in.
pub fn before(log: &Log, name: &'static str) -> impl Middleware {
    let log = log.clone();
    from_fn(move |req, next: Next| {
        log.lock().unwrap().push(name.to_owned());
        next.run(req)
    })
}

/// Records `name` once the inner chain has answered.
pub fn after(log: &Log, name: &'static str) -> impl Middleware {
    let log = log.clone();
    from_fn(move |req, next: Next| {
        let log = log.clone();
        async move {
            let res = next.run(req).await;
            log.lock().unwrap().push(name.to_owned());
            res
        }
    })
}

/// Records `name` and answers `403 Forbidden` without calling the rest of the chain.
pub fn deny(log: &Log, name: &'static str) -> impl Middleware {
    let log = log.clone();
    from_fn(move |_req, _next: Next| {
        log.lock().unwrap().push(name.to_owned());
        async {
            let mut res = Response::new(Body::from("denied"));
            *res.status_mut() = StatusCode::FORBIDDEN;
            Ok::<_, hyper::Error>(res)
        }
    })
}

/// Records `name` and answers with it as the body.
pub fn recording(log: &Log, name: &'static str) -> impl Handler {
    let log = log.clone();
    move |_: Request<Body>| {
        log.lock().unwrap().push(name.to_owned());
        async move { Ok::<_, hyper::Error>(Response::new(Body::from(name))) }
    }
}

/// Answers with `body`.
pub fn text(body: &'static str) -> impl Handler {
    move |_: Request<Body>| async move { Ok::<_, hyper::Error>(Response::new(Body::from(body))) }
}

pub fn request(method: Method, host: Option<&str>, path: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(host) = host {
        builder = builder.header(header::HOST, host);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get(host: Option<&str>, path: &str) -> Request<Body> {
    request(Method::GET, host, path)
}

pub async fn read(res: Response<Body>) -> (StatusCode, String) {
    let status = res.status();
    let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
