//! In-process stand-in for a Prometheus server, used by the unit tests.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::{Arc, Mutex};

pub const BAD_QUERY: &str = "sum(";

#[derive(Clone, Default)]
pub struct MockResponses {
    pub query: Value,
    pub query_range: Value,
    pub metrics: String,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<MockResponses>,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

pub struct MockPrometheus {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockPrometheus {
    pub fn start(responses: MockResponses) -> Self {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responses: Arc::new(responses),
            requests: requests.clone(),
        };

        std::thread::spawn(move || {
            tokio_test::block_on(async move {
                let app = Router::new()
                    .route("/api/v1/query", get(api_handler))
                    .route("/api/v1/query_range", get(api_handler))
                    .route("/metrics", get(metrics_handler))
                    .with_state(state);
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            })
        });

        Self {
            endpoint: format!("http://{}", addr),
            requests,
        }
    }

    pub fn metrics_url(&self) -> String {
        format!("{}/metrics", self.endpoint)
    }

    /// Query-string parameters of every API request seen so far.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }
}

async fn api_handler(
    State(state): State<MockState>,
    uri: axum::http::Uri,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(params.clone());

    if params.get("query").map(String::as_str) == Some(BAD_QUERY) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "1:5: parse error: unclosed left parenthesis"
            })),
        );
    }

    let data = if uri.path().ends_with("query_range") {
        state.responses.query_range.clone()
    } else {
        state.responses.query.clone()
    };
    (StatusCode::OK, Json(json!({ "status": "success", "data": data })))
}

async fn metrics_handler(State(state): State<MockState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.responses.metrics.clone(),
    )
}

/// An address nothing listens on.
pub fn dead_endpoint() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn labels(job: &str, instance: &str, name: &str) -> Value {
    json!({ "__name__": name, "job": job, "instance": instance })
}

/// `series` pairs a label object with `(seconds, value)` samples.
pub fn matrix(series: Vec<(Value, Vec<(f64, &str)>)>) -> Value {
    let result: Vec<Value> = series
        .into_iter()
        .map(|(metric, values)| {
            let values: Vec<Value> = values.into_iter().map(|(t, v)| json!([t, v])).collect();
            json!({ "metric": metric, "values": values })
        })
        .collect();
    json!({ "resultType": "matrix", "result": result })
}

pub fn vector(series: Vec<(Value, (f64, &str))>) -> Value {
    let result: Vec<Value> = series
        .into_iter()
        .map(|(metric, (t, v))| json!({ "metric": metric, "value": [t, v] }))
        .collect();
    json!({ "resultType": "vector", "result": result })
}

pub fn scalar(t: f64, v: &str) -> Value {
    json!({ "resultType": "scalar", "result": [t, v] })
}
