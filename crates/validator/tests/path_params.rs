use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use micro_validator::param::{body, field, path, ObjectSchema};
use micro_validator::{
    handler_fn, Decorator, Json, ParameterValidator, PathParams, RequestContext, RequestHandler, ResponseBody, Valid,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A minimal host: routes by path template and method, then hands the request to the handler.
struct App {
    router: matchit::Router<Vec<(Method, Box<dyn RequestHandler>)>>,
}

impl App {
    fn new() -> Self {
        Self { router: matchit::Router::new() }
    }

    fn route(mut self, template: &str, method: Method, handler: impl RequestHandler + 'static) -> Self {
        self.router.insert(template, vec![(method, Box::new(handler) as Box<dyn RequestHandler>)]).unwrap();
        self
    }

    async fn send(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri).body(Bytes::from(body.to_string())).unwrap();
        let (parts, body) = request.into_parts();

        let matched = self.router.at(parts.uri.path()).unwrap();
        let params = PathParams::from(matched.params);
        let (_, handler) = matched.value.iter().find(|(m, _)| *m == parts.method).unwrap();

        let req = RequestContext::new(&parts, &params, body);
        let response = handler.invoke(&req).await.unwrap();
        into_json(response).await
    }
}

async fn into_json(response: Response<ResponseBody>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[derive(Deserialize)]
struct User {
    name: String,
    address: String,
}

#[derive(Deserialize)]
struct PutUser {
    user_id: i64,
    user: User,
}

async fn put_user(Valid(args): Valid<PutUser>) -> Json<Value> {
    Json(json!({"user_id": args.user_id, "name": args.user.name, "address": args.user.address}))
}

#[derive(Deserialize)]
struct GreaterThan {
    user_id: i64,
}

async fn greater_than(Valid(args): Valid<GreaterThan>) -> Json<Value> {
    Json(json!({"user_id": args.user_id}))
}

fn user_schema() -> ObjectSchema {
    ObjectSchema::builder("User").field(field("name").string()).field(field("address").string()).build().unwrap()
}

fn app() -> App {
    let put_user = ParameterValidator::builder()
        .param(path("user_id").integer())
        .param(body("user").object(user_schema()))
        .build()
        .unwrap()
        .decorate(handler_fn(put_user));

    let greater_than = ParameterValidator::builder()
        .param(path("user_id").integer().gt(10))
        .build()
        .unwrap()
        .decorate(handler_fn(greater_than));

    App::new().route("/users/{user_id}", Method::PUT, put_user).route("/greater_than/{user_id}", Method::POST, greater_than)
}

#[tokio::test]
async fn test_path_params() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let app = app();
    let body = json!({"name": "nick", "address": "seoul"});

    let cases = [
        ("/users/1", StatusCode::OK, json!({"user_id": 1, "name": "nick", "address": "seoul"})),
        (
            "/users/first",
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "detail": [
                    {
                        "type": "int_parsing",
                        "loc": ["path", "user_id"],
                        "msg": "Input should be a valid integer, unable to parse string as an integer",
                        "input": "first",
                        "url": "https://errors.pydantic.dev/2.1.2/v/int_parsing",
                    }
                ]
            }),
        ),
    ];

    for (path, expected_status, expected_response) in cases {
        let (status, response) = app.send(Method::PUT, path, body.clone()).await;
        assert_eq!(status, expected_status, "{path}");
        assert_eq!(response, expected_response, "{path}");
    }
}

#[tokio::test]
async fn test_greater_than_path_params() {
    let app = app();

    let cases = [
        ("/greater_than/100", StatusCode::OK, json!({"user_id": 100})),
        (
            "/greater_than/1",
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "detail": [
                    {
                        "type": "greater_than",
                        "ctx": {"gt": 10},
                        "input": "1",
                        "loc": ["path", "user_id"],
                        "msg": "Input should be greater than 10",
                        "url": "https://errors.pydantic.dev/2.1.2/v/greater_than",
                    }
                ]
            }),
        ),
    ];

    for (path, expected_status, expected_response) in cases {
        let (status, response) = app.send(Method::POST, path, json!({})).await;
        assert_eq!(status, expected_status, "{path}");
        assert_eq!(response, expected_response, "{path}");
    }
}

#[tokio::test]
async fn test_body_and_path_errors_are_both_reported() {
    let app = app();

    let (status, response) = app.send(Method::PUT, "/users/first", json!({"name": 7})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let detail = response["detail"].as_array().unwrap();
    let summary = detail.iter().map(|e| (e["type"].clone(), e["loc"].clone(), e["input"].clone())).collect::<Vec<_>>();
    assert_eq!(
        summary,
        [
            (json!("int_parsing"), json!(["path", "user_id"]), json!("first")),
            (json!("string_type"), json!(["body", "name"]), json!(7)),
            (json!("missing"), json!(["body", "address"]), json!({"name": 7})),
        ]
    );
}

#[tokio::test]
async fn test_handler_never_runs_on_rejection() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let handler = ParameterValidator::builder()
        .param(path("user_id").integer().gt(10))
        .build()
        .unwrap()
        .decorate(handler_fn(move |Valid(args): Valid<GreaterThan>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({"user_id": args.user_id}))
            }
        }));
    let app = App::new().route("/greater_than/{user_id}", Method::POST, handler);

    let (status, _) = app.send(Method::POST, "/greater_than/1", json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = app.send(Method::POST, "/greater_than/abc", json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let (status, _) = app.send(Method::POST, "/greater_than/11", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejections_are_byte_identical() {
    let validator = ParameterValidator::builder()
        .param(path("user_id").integer().gt(10))
        .param(body("user").object(user_schema()))
        .build()
        .unwrap();
    let handler = validator.decorate(handler_fn(put_user));

    let parts = Request::builder().method(Method::PUT).uri("/users/3").body(()).unwrap().into_parts().0;
    let params: PathParams = [("user_id", "3")].into_iter().collect();

    let mut bodies = vec![];
    for _ in 0..3 {
        let req = RequestContext::new(&parts, &params, Bytes::from_static(br#"{"address":1}"#));
        let response = handler.invoke(&req).await.unwrap();
        bodies.push(response.into_body().collect().await.unwrap().to_bytes());
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    let first: Value = serde_json::from_slice(&bodies[0]).unwrap();
    assert_eq!(first["detail"].as_array().unwrap().len(), 3);
    assert_eq!(first["detail"][0]["input"], json!("3"));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_validator() {
    let app = app();

    let requests = (0..32).map(|i| {
        let app = &app;
        async move {
            let uri = format!("/greater_than/{i}");
            let (status, response) = app.send(Method::POST, &uri, json!({})).await;
            (i, status, response)
        }
    });

    for (i, status, response) in futures::future::join_all(requests).await {
        if i > 10 {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(response, json!({"user_id": i}));
        } else {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(response["detail"][0]["input"], json!(i.to_string()));
        }
    }
}
