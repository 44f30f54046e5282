#[cfg(test)]
pub mod helpers {
    use axum::{
        body::Body,
        extract::{Request, State},
        http::Request as HttpRequest,
        middleware::{self, Next},
        response::Response,
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    use crate::client::ApiClient;
    use crate::config::Settings;
    use crate::AppState;

    type Hits = Arc<Mutex<Vec<String>>>;

    /// Stand-in for the shortener API, served on an ephemeral local port.
    ///
    /// Every request is recorded as `"METHOD /path?query"` so tests can assert
    /// exactly which upstream calls a page made.
    pub struct StubApi {
        pub base_url: String,
        hits: Hits,
    }

    impl StubApi {
        pub async fn spawn(routes: Router) -> Self {
            let hits: Hits = Arc::new(Mutex::new(Vec::new()));
            let app = routes.layer(middleware::from_fn_with_state(hits.clone(), record_hit));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind stub API listener");
            let addr = listener.local_addr().expect("Stub API has no local address");

            tokio::spawn(async move {
                axum::serve(listener, app).await.ok();
            });

            Self {
                base_url: format!("http://{}", addr),
                hits,
            }
        }

        /// Recorded requests, oldest first
        pub fn hits(&self) -> Vec<String> {
            self.hits.lock().expect("hits lock poisoned").clone()
        }

        /// Number of recorded requests whose path starts with `path`
        pub fn hit_count(&self, path: &str) -> usize {
            self.hits()
                .iter()
                .filter(|hit| {
                    hit.split_once(' ')
                        .map(|(_, uri)| uri.starts_with(path))
                        .unwrap_or(false)
                })
                .count()
        }
    }

    async fn record_hit(State(hits): State<Hits>, request: Request, next: Next) -> Response {
        let uri = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        hits.lock()
            .expect("hits lock poisoned")
            .push(format!("{} {}", request.method(), uri));
        next.run(request).await
    }

    /// Settings pointing at a stub API, independent of the process environment
    pub fn test_settings(api_base_url: &str) -> Settings {
        Settings {
            app_name: "Linkdesk".to_string(),
            version: "0.0.0-test".to_string(),
            debug: true,
            host: "127.0.0.1".to_string(),
            port: 0,
            api_base_url: api_base_url.to_string(),
            api_timeout_secs: 5,
            public_base_url: "https://go.example.com".to_string(),
            session_cookie_secure: false,
            session_ttl_days: 7,
        }
    }

    pub fn test_state(stub: &StubApi) -> AppState {
        let settings = test_settings(&stub.base_url);
        let client = ApiClient::new(&settings.api_base_url, settings.api_timeout())
            .expect("Failed to build API client");
        AppState::new(settings, client)
    }

    /// Full dashboard router backed by the stub
    pub fn test_app(stub: &StubApi) -> Router {
        crate::web::router(test_state(stub))
    }

    pub fn sample_dashboard() -> Value {
        json!({
            "message": "Welcome back, Ada!",
            "email": "ada@example.com",
            "organizations": [
                {"id": 1, "name": "Acme Corp", "slug": "acme", "role": "admin", "joined_at": "2024-01-15T09:00:00Z"},
                {"id": 2, "name": "Globex", "slug": "globex", "role": "editor", "joined_at": "2024-03-10T09:00:00Z"}
            ]
        })
    }

    pub fn sample_urls() -> Value {
        json!([
            {"id": 11, "original_url": "https://example.com/spring-sale", "slug": "promo", "clicks": 120, "created_at": "2024-05-01T10:00:00Z"},
            {"id": 12, "original_url": "https://example.com/docs", "slug": "docs", "clicks": 3, "created_at": "2024-05-02T10:00:00Z"}
        ])
    }

    /// GET request carrying a session cookie
    pub fn get_with_session(uri: &str, token: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri(uri)
            .header("cookie", format!("access_token={}", token))
            .body(Body::empty())
            .expect("Failed to build request")
    }

    /// Form POST, optionally carrying a session cookie
    pub fn post_form(uri: &str, token: Option<&str>, form: &str) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header("cookie", format!("access_token={}", token));
        }
        builder
            .body(Body::from(form.to_string()))
            .expect("Failed to build request")
    }

    pub async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn location(response: &Response) -> &str {
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }
}
