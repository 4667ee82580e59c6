use std::net::SocketAddr;

use hostrouter::middleware::{from_fn, Next, Recover, Trace};
use hostrouter::{Domain, Group, RequestExt, Route, Router};
use hyper::header::HeaderValue;
use hyper::{Body, Request, Response, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn index(_: Request<Body>) -> hyper::Result<Response<Body>> {
    Ok(Response::new("Hello, World!".into()))
}

async fn hello(req: Request<Body>) -> hyper::Result<Response<Body>> {
    let name = req.param("name").unwrap_or("stranger").to_owned();
    Ok(Response::new(format!("Hello, {}!", name).into()))
}

async fn tenant(req: Request<Body>) -> hyper::Result<Response<Body>> {
    let host = req
        .headers()
        .get(hyper::header::HOST)
        .and_then(|host| host.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    Ok(Response::new(format!("Welcome to {}", host).into()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hello=info,hostrouter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let powered_by = from_fn(|req: Request<Body>, next: Next| async move {
        let mut res = next.run(req).await?;
        res.headers_mut()
            .insert("x-powered-by", HeaderValue::from_static("hostrouter"));
        Ok::<_, hyper::Error>(res)
    });

    let router = Router::new()
        .before(Trace)
        .before(Recover)
        .after(powered_by)
        .get("/", index)
        .group(Group::new("/hello").route(Route::get("/:name?", hello)))
        .domain(Domain::new("*.localhost:*").route(Route::get("/", tenant)));

    let addr: SocketAddr = ([127, 0, 0, 1], 3000).into();
    tracing::info!(%addr, "listening");

    Server::bind(&addr).serve(router.into_service()?).await?;
    Ok(())
}
