mod common;

use common::*;
use hostrouter::middleware::{from_fn, Next, Recover};
use hostrouter::{Domain, Group, RequestExt, Route, Router};
use hyper::{Body, Request, Response, StatusCode};

fn full_tree(log: &Log) -> Router {
    Router::new()
        .before(before(log, "global.before1"))
        .before(before(log, "global.before2"))
        .after(after(log, "global.after1"))
        .after(after(log, "global.after2"))
        .domain(
            Domain::new("example.com")
                .before(before(log, "domain.before1"))
                .before(before(log, "domain.before2"))
                .after(after(log, "domain.after1"))
                .after(after(log, "domain.after2"))
                .group(
                    Group::new("/api")
                        .before(before(log, "group.before"))
                        .after(after(log, "group.after"))
                        .route(
                            Route::get("/users", recording(log, "handler"))
                                .before(before(log, "route.before"))
                                .after(after(log, "route.after")),
                        ),
                )
                .route(Route::get("/direct", recording(log, "handler"))),
        )
        .route(Route::get("/plain", recording(log, "handler")))
}

#[tokio::test]
async fn every_tier_runs_in_order_around_the_handler() {
    let log = Log::default();
    let dispatcher = full_tree(&log).build().unwrap();

    let res = dispatcher
        .serve(get(Some("example.com"), "/api/users"))
        .await
        .unwrap();

    assert_eq!(read(res).await, (StatusCode::OK, "handler".to_owned()));
    assert_eq!(
        take(&log),
        vec![
            "global.before1",
            "global.before2",
            "domain.before1",
            "domain.before2",
            "group.before",
            "route.before",
            "handler",
            "route.after",
            "group.after",
            "domain.after1",
            "domain.after2",
            "global.after1",
            "global.after2",
        ]
    );
}

#[tokio::test]
async fn domain_routes_skip_sibling_group_middleware() {
    let log = Log::default();
    let dispatcher = full_tree(&log).build().unwrap();

    dispatcher
        .serve(get(Some("example.com"), "/direct"))
        .await
        .unwrap();

    assert_eq!(
        take(&log),
        vec![
            "global.before1",
            "global.before2",
            "domain.before1",
            "domain.before2",
            "handler",
            "domain.after1",
            "domain.after2",
            "global.after1",
            "global.after2",
        ]
    );
}

#[tokio::test]
async fn router_routes_only_get_global_middleware() {
    let log = Log::default();
    let dispatcher = full_tree(&log).build().unwrap();

    dispatcher.serve(get(None, "/plain")).await.unwrap();

    assert_eq!(
        take(&log),
        vec![
            "global.before1",
            "global.before2",
            "handler",
            "global.after1",
            "global.after2",
        ]
    );
}

#[tokio::test]
async fn chain_is_rebuilt_identically_per_request() {
    let log = Log::default();
    let dispatcher = full_tree(&log).build().unwrap();

    for _ in 0..3 {
        dispatcher
            .serve(get(Some("example.com"), "/api/users"))
            .await
            .unwrap();
        let entries = take(&log);
        assert_eq!(entries.len(), 13);
        assert_eq!(entries.iter().filter(|e| *e == "handler").count(), 1);
    }
}

#[tokio::test]
async fn unmatched_requests_run_no_middleware() {
    let log = Log::default();
    let dispatcher = full_tree(&log).build().unwrap();

    let res = dispatcher
        .serve(get(Some("example.com"), "/nowhere"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(take(&log).is_empty());
}

#[tokio::test]
async fn abort_in_domain_tier_stops_everything_inside() {
    let log = Log::default();
    let dispatcher = Router::new()
        .before(before(&log, "global.before"))
        .after(after(&log, "global.after"))
        .domain(
            Domain::new("example.com")
                .before(deny(&log, "domain.deny"))
                .before(before(&log, "domain.before"))
                .after(after(&log, "domain.after"))
                .route(
                    Route::get("/", recording(&log, "handler"))
                        .before(before(&log, "route.before"))
                        .after(after(&log, "route.after")),
                ),
        )
        .build()
        .unwrap();

    let res = dispatcher
        .serve(get(Some("example.com"), "/"))
        .await
        .unwrap();

    assert_eq!(read(res).await, (StatusCode::FORBIDDEN, "denied".to_owned()));
    assert_eq!(take(&log), vec!["global.before", "domain.deny"]);
}

#[tokio::test]
async fn abort_in_after_tier_keeps_outer_layers_unwinding() {
    let log = Log::default();
    let dispatcher = Router::new()
        .after(after(&log, "global.after"))
        .route(
            Route::get("/", recording(&log, "handler"))
                .after(after(&log, "route.after"))
                .after(deny(&log, "route.deny")),
        )
        .build()
        .unwrap();

    let res = dispatcher.serve(get(None, "/")).await.unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(take(&log), vec!["route.deny", "global.after"]);
}

#[tokio::test]
async fn shared_middleware_instance_serves_every_level() {
    let log = Log::default();
    let shared = std::sync::Arc::new(before(&log, "shared"));

    let dispatcher = Router::new()
        .before(shared.clone())
        .group(
            Group::new("/g")
                .before(shared.clone())
                .route(Route::get("/x", recording(&log, "handler")).before(shared)),
        )
        .build()
        .unwrap();

    dispatcher.serve(get(None, "/g/x")).await.unwrap();
    assert_eq!(take(&log), vec!["shared", "shared", "shared", "handler"]);
}

#[tokio::test]
async fn middleware_sees_route_parameters() {
    let check = from_fn(|req: Request<Body>, next: Next| async move {
        if req.param("id") == Some("0") {
            let mut res = Response::new(Body::from("zero"));
            *res.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(res);
        }
        next.run(req).await
    });

    let dispatcher = Router::new()
        .group(
            Group::new("/items")
                .before(check)
                .route(Route::get("/:id", text("item"))),
        )
        .build()
        .unwrap();

    let res = dispatcher.serve(get(None, "/items/0")).await.unwrap();
    assert_eq!(read(res).await, (StatusCode::BAD_REQUEST, "zero".to_owned()));

    let res = dispatcher.serve(get(None, "/items/7")).await.unwrap();
    assert_eq!(read(res).await, (StatusCode::OK, "item".to_owned()));
}

#[tokio::test]
async fn recover_converts_panics_into_500() {
    async fn explode(_: Request<Body>) -> hyper::Result<Response<Body>> {
        panic!("handler exploded")
    }

    let dispatcher = Router::new()
        .before(Recover)
        .get("/boom", explode)
        .get("/fine", text("fine"))
        .build()
        .unwrap();

    let res = dispatcher.serve(get(None, "/boom")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let res = dispatcher.serve(get(None, "/fine")).await.unwrap();
    assert_eq!(read(res).await, (StatusCode::OK, "fine".to_owned()));
}
