use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use virtual_doctor::services::llm_provider::{ADVICE_PERSONA, DIAGNOSIS_PERSONA};

pub type Requests = Arc<Mutex<Vec<Value>>>;

/// Stand-in for Ollama's `/api/chat`: replies by persona.
pub struct FakeOllama {
    pub url: String,
    pub requests: Requests,
}

pub async fn spawn_fake_ollama(diagnosis: &'static str) -> FakeOllama {
    let requests: Requests = Arc::default();
    let app = Router::new()
        .route(
            "/api/chat",
            post(move |State(seen): State<Requests>, Json(body): Json<Value>| async move {
                let system = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
                seen.lock().unwrap().push(body);
                let content = if system == DIAGNOSIS_PERSONA {
                    diagnosis.to_string()
                } else if system == ADVICE_PERSONA {
                    "Take it with food and avoid alcohol.".to_string()
                } else {
                    "Drink water and rest.".to_string()
                };
                Json(json!({
                    "model": "llama2",
                    "message": {"role": "assistant", "content": content},
                    "done": true
                }))
            }),
        )
        .with_state(requests.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeOllama {
        url: format!("http://{addr}"),
        requests,
    }
}
