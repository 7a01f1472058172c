use std::sync::Arc;
use std::time::Duration;

use api_lib::adapters::{InMemoryDocumentStore, InMemoryIdentityProvider};
use api_lib::config::Config;
use api_lib::web::{api_router, state::AppState};
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use countdown_core::feed::FeedState;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// A running app over in-memory adapters. The store is shared with the app
/// so tests can seed documents directly.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: InMemoryDocumentStore,
}

/// Build a test `Config` with defaults only.
pub fn test_config() -> Config {
    Config::from_lookup(|_| None).expect("default config should parse")
}

pub async fn build_test_app() -> TestApp {
    let store = InMemoryDocumentStore::new();
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryIdentityProvider::new()),
        None,
        Arc::new(test_config()),
    )
    .await
    .expect("study feed should start");
    let state = Arc::new(state);

    TestApp {
        router: api_router(state.clone()),
        state,
        store,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should not fail")
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, format!("session={}", session));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        session: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, format!("session={}", session));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Signs in a guest and returns the session id from the cookie.
    pub async fn sign_in_guest(&self, display_name: &str) -> (String, serde_json::Value) {
        let response = self
            .post_json(
                "/auth/guest",
                serde_json::json!({ "displayName": display_name }),
                None,
            )
            .await;
        let session = session_from_response(&response).expect("guest login should set a cookie");
        (session, body_json(response).await)
    }

    /// Waits until the study feed publishes a state matching `ready`.
    pub async fn wait_for_feed<F>(&self, ready: F) -> FeedState
    where
        F: FnMut(&FeedState) -> bool,
    {
        let mut feed = self.state.feed.clone();
        let state = tokio::time::timeout(Duration::from_secs(2), feed.wait_for(ready))
            .await
            .expect("study feed did not update in time")
            .expect("study feed closed");
        state.clone()
    }
}

pub fn session_from_response(response: &Response<Body>) -> Option<String> {
    let cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = cookie.split(';').next()?;
    let value = pair.strip_prefix("session=")?;
    (!value.is_empty()).then(|| value.to_string())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
