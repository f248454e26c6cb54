use crate::{Collection, GatewayError, GatewayResult};

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, Url};
use serde_json::Value;
use tracing::debug;

const JSON_MEDIA_TYPE: &str = "application/json";
const QUICK_TASK_PATH: &str = "/api/quick-task";
const START_LONG_TASK_SEGMENTS: [&str; 2] = ["api", "start-long-task"];

/// Stateless pass-through to the backend's request/response surface.
///
/// No queuing, caching or retries: each call is independent and may
/// complete out of order relative to others.
#[derive(Debug, Clone)]
pub struct Gateway {
    base_url: String,
    client: ReqwestClient,
}

impl Gateway {
    /// Create a gateway for the backend at `base_url` (e.g. "http://127.0.0.1:8000").
    ///
    /// Every call gives up after `request_timeout`.
    pub fn new(base_url: &str, request_timeout: Duration) -> GatewayResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(request_timeout)
            .build()
            .map_err(GatewayError::client)?;

        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: ReqwestClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward one call to a fixed `path` and return the parsed JSON body.
    ///
    /// An empty success body yields `Value::Null`.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> GatewayResult<Value> {
        let url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| GatewayError::invalid_request(&method, path, e.to_string()))?;

        self.send(method, url, body).await
    }

    /// Forward one call to the path built from `segments`.
    ///
    /// Each segment is percent-encoded on its own, so caller-supplied ids
    /// can never add, remove or replace path components.
    pub async fn forward_segments(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> GatewayResult<Value> {
        let url = self.segment_url(&method, segments)?;
        self.send(method, url, body).await
    }

    fn segment_url(&self, method: &Method, segments: &[&str]) -> GatewayResult<Url> {
        let display = format!("/{}", segments.join("/"));

        // The URL serializer drops dot segments, which would retarget the call
        if let Some(segment) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(GatewayError::invalid_request(
                method,
                &display,
                format!("invalid path segment {segment:?}"),
            ));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::invalid_request(method, &display, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::invalid_request(method, &display, "base URL cannot carry a path")
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> GatewayResult<Value> {
        let path = url.path().to_string();
        debug!("Forwarding {method} {path}");

        let mut req = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE);

        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::transport(&method, &path, e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::transport(&method, &path, e))?;

        if !status.is_success() {
            return Err(GatewayError::status(
                &method,
                &path,
                status.as_u16(),
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| GatewayError::parse(&method, &path, e))
    }

    // =========================================================================
    // Task Triggers
    // =========================================================================

    /// Run the backend's short synchronous task
    pub async fn quick_task(&self) -> GatewayResult<Value> {
        self.forward(Method::GET, QUICK_TASK_PATH, None).await
    }

    /// Ask the backend to start a long-running task; progress arrives on the relay
    pub async fn start_long_task(&self, task_id: &str) -> GatewayResult<Value> {
        let [api, endpoint] = START_LONG_TASK_SEGMENTS;
        self.forward_segments(Method::GET, &[api, endpoint, task_id], None)
            .await
    }

    // =========================================================================
    // Collection Operations
    // =========================================================================

    pub async fn list(&self, collection: Collection) -> GatewayResult<Value> {
        self.forward(Method::GET, &collection.path(), None).await
    }

    pub async fn create(&self, collection: Collection, record: &Value) -> GatewayResult<Value> {
        self.forward(Method::POST, &collection.path(), Some(record))
            .await
    }

    pub async fn get(&self, collection: Collection, id: &str) -> GatewayResult<Value> {
        self.forward_segments(Method::GET, &collection.item_segments(id), None)
            .await
    }

    pub async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: &Value,
    ) -> GatewayResult<Value> {
        self.forward_segments(Method::PUT, &collection.item_segments(id), Some(record))
            .await
    }

    pub async fn delete(&self, collection: Collection, id: &str) -> GatewayResult<Value> {
        self.forward_segments(Method::DELETE, &collection.item_segments(id), None)
            .await
    }
}
