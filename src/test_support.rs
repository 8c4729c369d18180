//! Test helpers: A one-shot axum server for the blocking clients.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::sync::oneshot;

/// What the server saw.
#[derive(Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }
}

/// Server that answers exactly one request, then stops listening.
pub struct OneShotServer {
    pub url: String,
    handle: JoinHandle<RecordedRequest>,
}

impl OneShotServer {
    /// Block until the request has been answered.
    pub fn request(self) -> RecordedRequest {
        self.handle.join().expect("server thread panicked")
    }
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Option<oneshot::Sender<RecordedRequest>>>>,
}

async fn respond(
    State(canned): State<Canned>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method,
        uri,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    if let Some(tx) = canned.seen.lock().expect("lock").take() {
        let _ = tx.send(recorded);
    }
    (
        canned.status,
        [(CONTENT_TYPE, "application/json"), (CONNECTION, "close")],
        canned.body,
    )
        .into_response()
}

/// Serve one `status` response with a JSON `body` on an ephemeral port.
pub fn serve_once(status: u16, body: &str) -> OneShotServer {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("nonblocking");
    let url = format!("http://{}", listener.local_addr().expect("addr"));

    let (tx, rx) = oneshot::channel();
    let canned = Canned {
        status: StatusCode::from_u16(status).expect("status"),
        body: body.to_string(),
        seen: Arc::new(Mutex::new(Some(tx))),
    };

    let handle = std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
            let app = Router::new().fallback(respond).with_state(canned);

            let slot = Arc::new(Mutex::new(None));
            let shutdown = {
                let slot = Arc::clone(&slot);
                async move {
                    if let Ok(recorded) = rx.await {
                        *slot.lock().expect("lock") = Some(recorded);
                    }
                }
            };
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
                .expect("serve");

            let recorded = slot.lock().expect("lock").take();
            recorded.expect("no request recorded")
        })
    });

    OneShotServer { url, handle }
}
