//! HTTP handler that redirects radio manifest requests.
//!
//! Requests for `/{station-id}/master.blurl` on the intercepted CDN host
//! are rewritten to the backend station URL recorded for that id, with
//! the account's Basic credentials attached. Everything else passes
//! through untouched. CONNECTs to the blocked telemetry host are refused
//! outright so the client falls back to local playback state.

use hudsucker::{
    hyper::{Request, Response},
    Body, HttpContext, HttpHandler, RequestOrResponse, WebSocketHandler,
};
use hyper::header::{HeaderValue, AUTHORIZATION, HOST};
use hyper::{Method, StatusCode, Uri};
use once_cell::sync::Lazy;
use regex::Regex;

use crossfade_api::ApiClient;
use crossfade_core::SharedState;

use crate::hosts::{host_policy, HostPolicy};

/// Matches a station manifest path and captures the station id.
static MANIFEST_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([^/,\s]+)/master\.blurl$").expect("Invalid manifest path pattern"));

/// Header carrying the backend root to the station endpoint.
const API_ROOT_HEADER: &str = "x-api-root";

/// Proxy handler that rewrites manifest requests to the backend.
#[derive(Debug, Clone)]
pub struct RewriteHandler {
    state: SharedState,
    api: ApiClient,
}

impl RewriteHandler {
    /// Creates a new handler over the shared client state.
    pub fn new(state: SharedState, api: ApiClient) -> Self {
        Self { state, api }
    }

    /// Rewrites a manifest request to its bound backend station.
    ///
    /// Requests without a binding, or that are not manifest fetches on
    /// the intercepted host, come back unchanged.
    fn rewrite(&self, req: Request<Body>) -> Request<Body> {
        let intercepted = req
            .uri()
            .authority()
            .is_some_and(|authority| host_policy(authority.as_str()) == HostPolicy::Intercept);
        if !intercepted {
            return req;
        }

        let station_id = match MANIFEST_PATH.captures(req.uri().path()) {
            Some(caps) => caps[1].to_string(),
            None => return req,
        };

        let Some(binding) = self.state.lock().binding_target(&station_id) else {
            tracing::debug!(station_id, "No binding for requested station");
            return req;
        };

        let target = self.api.station_url(&binding.station_user, &binding.station_id);
        let uri: Uri = match target.parse() {
            Ok(uri) => uri,
            Err(err) => {
                tracing::warn!(target, error = %err, "Station URL is not a valid URI");
                return req;
            }
        };

        let (Some(auth), Some(api_root), Some(host)) = (
            header_value(&self.api.auth_header()),
            header_value(self.api.api_root()),
            uri.authority().and_then(|a| header_value(a.as_str())),
        ) else {
            tracing::warn!(station_id, "Backend headers contain invalid characters");
            return req;
        };

        tracing::info!(
            from = %req.uri(),
            station_user = %binding.station_user,
            station_id,
            "Rewriting manifest request"
        );

        let (mut parts, body) = req.into_parts();
        parts.uri = uri;
        parts.headers.insert(HOST, host);
        parts.headers.insert(AUTHORIZATION, auth);
        parts.headers.insert(API_ROOT_HEADER, api_root);

        Request::from_parts(parts, body)
    }
}

impl HttpHandler for RewriteHandler {
    async fn handle_request(&mut self, _ctx: &HttpContext, req: Request<Body>) -> RequestOrResponse {
        if req.method() == Method::CONNECT {
            let rejected = req
                .uri()
                .authority()
                .is_some_and(|authority| host_policy(authority.as_str()) == HostPolicy::Reject);
            if rejected {
                tracing::debug!(uri = %req.uri(), "Refusing tunnel to blocked host");
                return RequestOrResponse::Response(refuse_connect());
            }
            return RequestOrResponse::Request(req);
        }

        RequestOrResponse::Request(self.rewrite(req))
    }

    async fn should_intercept(&mut self, _ctx: &HttpContext, req: &Request<Body>) -> bool {
        req.uri()
            .authority()
            .is_some_and(|authority| host_policy(authority.as_str()) == HostPolicy::Intercept)
    }
}

impl WebSocketHandler for RewriteHandler {}

/// Builds a header value, rejecting strings with invalid characters.
fn header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).ok()
}

/// Response returned for CONNECTs to the blocked host.
fn refuse_connect() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
}
