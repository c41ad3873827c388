use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

type Handler = dyn Fn(&str, &Value) -> Result<Value, String> + Send + Sync;
type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

#[derive(Clone)]
struct NodeState {
    calls: CallLog,
    handler: Arc<Handler>,
}

/// JSON-RPC node on a local port. Every call is recorded and answered by the
/// handler: `Ok` becomes the `result`, `Err` a node error object.
pub struct FakeNode {
    pub url: String,
    calls: CallLog,
}

impl FakeNode {
    pub async fn start<H>(handler: H) -> Self
    where
        H: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let state = NodeState {
            calls: calls.clone(),
            handler: Arc::new(handler),
        };
        let app = Router::new().route("/", post(rpc)).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, calls }
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Params of every call to `method`, in order.
    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

async fn rpc(State(state): State<NodeState>, Json(request): Json<Value>) -> Json<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    state.calls.lock().unwrap().push((method.clone(), params.clone()));

    let id = request["id"].clone();
    let body = match (state.handler)(&method, &params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(message) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": message }
        }),
    };
    Json(body)
}
