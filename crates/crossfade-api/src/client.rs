//! Typed client for the station backend.
//!
//! Thin wrapper over `reqwest` speaking the backend's REST surface: user
//! records, station and binding CRUD, the stream queue, and the party
//! endpoint. Every authenticated call carries the same Basic header the
//! proxy injects into rewritten game requests, so the backend sees one
//! identity either way.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::AUTHORIZATION;
use reqwest::{Response, StatusCode};
use serde::Deserialize;

use crossfade_core::{Binding, Party, Station, User};

use crate::credentials::Credentials;
use crate::error::{ApiError, Result};

/// Error envelope the backend attaches to refusals.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Answer to a party update.
#[derive(Debug, Deserialize)]
struct PartyResponse {
    leader: String,
}

/// Client for the station backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    root: String,
    credentials: Credentials,
}

impl ApiClient {
    /// Creates a client for the given backend root and account.
    pub fn new(root: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("Crossfade/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            root: root.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Registers a fresh account; the only unauthenticated call.
    pub async fn register(root: &str) -> Result<Credentials> {
        let root = root.trim_end_matches('/');
        let http = reqwest::Client::builder()
            .user_agent(format!("Crossfade/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let response = http.post(format!("{root}/users")).send().await?;
        if response.status() != StatusCode::OK {
            return Err(backend_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// The backend root URL (no trailing slash).
    pub fn api_root(&self) -> &str {
        &self.root
    }

    /// The local account id.
    pub fn account_id(&self) -> &str {
        &self.credentials.id
    }

    /// The `Authorization` header value for this account.
    ///
    /// Exposed so the proxy can stamp rewritten requests with the same
    /// identity this client uses.
    pub fn auth_header(&self) -> String {
        let token = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.id, self.credentials.secret
        ));
        format!("Basic {token}")
    }

    /// Canonical URL of a user's station resource.
    pub fn station_url(&self, user: &str, station: &str) -> String {
        format!("{}/users/{user}/stations/{station}", self.root)
    }

    /// Fetches a user record; `@me` resolves to the local account.
    pub async fn get_user(&self, id: &str) -> Result<User> {
        let response = self
            .http
            .get(format!("{}/users/{id}", self.root))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(backend_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Creates or replaces one of the local account's stations.
    pub async fn create_station(&self, station: &Station) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/users/@me/stations/{}", self.root, station.id))
            .header(AUTHORIZATION, self.auth_header())
            .json(station)
            .send()
            .await?;

        expect_no_content(response).await
    }

    /// Deletes one of the local account's stations.
    pub async fn delete_station(&self, station_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/users/@me/stations/{station_id}", self.root))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        expect_no_content(response).await
    }

    /// Appends a source to a stream station's queue.
    pub async fn queue_source(&self, station_id: &str, source: &str) -> Result<()> {
        let response = self
            .http
            .put(format!(
                "{}/users/@me/stations/{station_id}/queue",
                self.root
            ))
            .header(AUTHORIZATION, self.auth_header())
            .json(&serde_json::json!({ "source": source }))
            .send()
            .await?;

        expect_no_content(response).await
    }

    /// Creates or replaces one of the local account's bindings.
    pub async fn create_binding(&self, binding: &Binding) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/users/@me/bindings/{}", self.root, binding.id))
            .header(AUTHORIZATION, self.auth_header())
            .json(binding)
            .send()
            .await?;

        expect_no_content(response).await
    }

    /// Deletes one of the local account's bindings.
    pub async fn delete_binding(&self, binding_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/users/@me/bindings/{binding_id}", self.root))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        expect_no_content(response).await
    }

    /// Pushes the current party to the backend.
    ///
    /// Returns `None` when the backend disabled the party (204) and the
    /// authoritative leader id otherwise.
    pub async fn set_party(&self, party: &Party) -> Result<Option<String>> {
        let response = self
            .http
            .post(format!("{}/users/@me/party", self.root))
            .header(AUTHORIZATION, self.auth_header())
            .json(party)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::OK => {
                let answer: PartyResponse = response.json().await?;
                Ok(Some(answer.leader))
            }
            _ => Err(backend_error(response).await),
        }
    }
}

/// Maps a refusal to [`ApiError::Backend`], preferring the backend's error
/// envelope over a bare status code.
async fn backend_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorResponse>().await {
        Ok(envelope) => envelope.error,
        Err(_) => format!("status code {status}"),
    };

    ApiError::Backend { status, message }
}

async fn expect_no_content(response: Response) -> Result<()> {
    if response.status() != StatusCode::NO_CONTENT {
        return Err(backend_error(response).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{delete, get, post, put};
    use axum::{Json, Router};
    use crossfade_core::StationKind;

    use super::*;

    fn test_credentials() -> Credentials {
        Credentials {
            id: "9f86d081884c7d659a2feaa0c55ad015".to_string(),
            secret: "hunter2".to_string(),
        }
    }

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn auth_header_is_basic() {
        let client = ApiClient::new("http://localhost:1", test_credentials()).unwrap();
        let expected = format!(
            "Basic {}",
            STANDARD.encode("9f86d081884c7d659a2feaa0c55ad015:hunter2")
        );
        assert_eq!(client.auth_header(), expected);
    }

    #[test]
    fn root_is_normalized() {
        let client = ApiClient::new("http://backend/", test_credentials()).unwrap();
        assert_eq!(client.api_root(), "http://backend");
        assert_eq!(
            client.station_url("u1", "lofi"),
            "http://backend/users/u1/stations/lofi"
        );
    }

    #[tokio::test]
    async fn get_user_sends_auth_and_parses() {
        let app = Router::new().route(
            "/users/{id}",
            get(|Path(id): Path<String>, headers: HeaderMap| async move {
                assert_eq!(id, "@me");
                let auth = headers.get("authorization").unwrap().to_str().unwrap();
                assert!(auth.starts_with("Basic "));
                Json(serde_json::json!({
                    "stations": {
                        "lofi": {"id": "lofi", "type": "stream", "source": ""}
                    },
                    "bindings": {}
                }))
            }),
        );
        let root = spawn_backend(app).await;

        let client = ApiClient::new(&root, test_credentials()).unwrap();
        let user = client.get_user("@me").await.unwrap();
        assert_eq!(user.stations["lofi"].kind, StationKind::Stream);
    }

    #[tokio::test]
    async fn backend_refusal_surfaces_error_envelope() {
        let app = Router::new().route(
            "/users/{id}",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": "no such user"})),
                )
            }),
        );
        let root = spawn_backend(app).await;

        let client = ApiClient::new(&root, test_credentials()).unwrap();
        match client.get_user("missing").await {
            Err(ApiError::Backend { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such user");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_station_puts_wire_shape() {
        let app = Router::new().route(
            "/users/@me/stations/{id}",
            put(|Path(id): Path<String>, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(id, "beats");
                assert_eq!(body["type"], "static");
                assert_eq!(body["source"], "D:/music");
                StatusCode::NO_CONTENT
            }),
        );
        let root = spawn_backend(app).await;

        let client = ApiClient::new(&root, test_credentials()).unwrap();
        let station = Station {
            id: "beats".to_string(),
            kind: StationKind::Static,
            source: "D:/music".to_string(),
        };
        client.create_station(&station).await.unwrap();
    }

    #[tokio::test]
    async fn queue_source_wraps_body() {
        let app = Router::new().route(
            "/users/@me/stations/{id}/queue",
            put(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body, serde_json::json!({"source": "song.mp3"}));
                StatusCode::NO_CONTENT
            }),
        );
        let root = spawn_backend(app).await;

        let client = ApiClient::new(&root, test_credentials()).unwrap();
        client.queue_source("lofi", "song.mp3").await.unwrap();
    }

    #[tokio::test]
    async fn delete_binding_accepts_plain_refusal() {
        let app = Router::new().route(
            "/users/@me/bindings/{id}",
            delete(|| async { StatusCode::FORBIDDEN }),
        );
        let root = spawn_backend(app).await;

        let client = ApiClient::new(&root, test_credentials()).unwrap();
        match client.delete_binding("DGeVaWdcXtfpbAaP").await {
            Err(ApiError::Backend { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "status code 403");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn set_party_distinguishes_outcomes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/users/@me/party",
            post(move |Json(body): Json<serde_json::Value>| {
                let calls = counter.clone();
                async move {
                    assert_eq!(body["match"], "5f6c2b8e9a1d4e0f8b7a6c5d4e3f2a1b");
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => StatusCode::NO_CONTENT.into_response(),
                        _ => (
                            StatusCode::OK,
                            Json(serde_json::json!({"leader": "abc123"})),
                        )
                            .into_response(),
                    }
                }
            }),
        );
        let root = spawn_backend(app).await;

        let client = ApiClient::new(&root, test_credentials()).unwrap();
        let party = Party {
            id: "V2:a3bf4f1b2b0b822cd15d6c15b0f00a08".to_string(),
            match_id: "5f6c2b8e9a1d4e0f8b7a6c5d4e3f2a1b".to_string(),
            session: "0a1b2c3d4e5f60718293a4b5c6d7e8f9".to_string(),
            leader: true,
        };

        assert_eq!(client.set_party(&party).await.unwrap(), None);
        assert_eq!(
            client.set_party(&party).await.unwrap(),
            Some("abc123".to_string())
        );
    }

    #[tokio::test]
    async fn register_returns_credentials() {
        let app = Router::new().route(
            "/users",
            post(|| async {
                Json(serde_json::json!({"id": "new-id", "secret": "new-secret"}))
            }),
        );
        let root = spawn_backend(app).await;

        let creds = ApiClient::register(&root).await.unwrap();
        assert_eq!(creds.id, "new-id");
        assert_eq!(creds.secret, "new-secret");
    }
}
