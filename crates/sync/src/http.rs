//! HTTP client for the pantry API.
//!
//! Every collection is exposed REST-style under `/api/{collection}` and every
//! response is wrapped in `{ "success": bool, "data": ..., "error": "..." }`.
//! Documents carry their identifier in `_id`.

use async_trait::async_trait;
use pantry_core::{RemoteId, SyncPayload};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::SyncConfig;
use crate::offline::HealthCheck;
use crate::remote::{Listing, RemoteError, RemoteStore};

/// Collections whose list endpoint returns at most this many documents
/// (newest first). A listing of that size cannot be trusted to be complete.
const LIST_LIMITS: &[(&str, usize)] = &[("purchases", 50)];

fn list_limit(collection: &str) -> Option<usize> {
    LIST_LIMITS
        .iter()
        .find(|(name, _)| *name == collection)
        .map(|(_, limit)| *limit)
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Remote store backed by the pantry HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    health_path: String,
}

impl HttpRemoteStore {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            health_path: "/api/inventory".to_string(),
        }
    }

    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(api_url)
        }
    }

    /// Client with the configured base URL, token, health path and request timeout.
    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.auth_token.clone(),
            health_path: config.health_path.clone(),
        })
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/{}", self.api_url, collection)
    }

    fn document_url(&self, collection: &str, id: &RemoteId) -> String {
        format!("{}/api/{}/{}", self.api_url, collection, id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and unwrap the response envelope, returning `data`.
    async fn send(&self, req: RequestBuilder) -> Result<Value, RemoteError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let envelope = serde_json::from_str::<Envelope>(&body).ok();

        if !status.is_success() {
            let message = envelope.and_then(|e| e.error).unwrap_or(body);
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    RemoteError::Validation(message)
                }
                StatusCode::NOT_FOUND => RemoteError::NotFound,
                other => RemoteError::Api(other.as_u16(), message),
            });
        }

        let envelope = envelope.ok_or_else(|| {
            RemoteError::Parse(format!("response is not an API envelope: {body}"))
        })?;
        if !envelope.success {
            return Err(RemoteError::Api(
                status.as_u16(),
                envelope.error.unwrap_or_default(),
            ));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

/// Remove and return the `_id` of a stored document.
fn take_id(doc: &mut Value) -> Result<RemoteId, RemoteError> {
    let fields = doc
        .as_object_mut()
        .ok_or_else(|| RemoteError::Parse("document is not a JSON object".to_string()))?;
    let id = match fields.remove("_id") {
        Some(Value::String(id)) => id,
        Some(other) => other.to_string(),
        None => return Err(RemoteError::Parse("document has no _id".to_string())),
    };
    RemoteId::new(id).map_err(|e| RemoteError::Parse(e.to_string()))
}

/// Split a stored document into its `_id` and its domain fields.
fn split_document<P: DeserializeOwned>(mut doc: Value) -> Result<(RemoteId, P), RemoteError> {
    let id = take_id(&mut doc)?;
    let payload = serde_json::from_value(doc)
        .map_err(|e| RemoteError::Parse(format!("invalid document {id}: {e}")))?;
    Ok((id, payload))
}

#[async_trait]
impl<P: SyncPayload> RemoteStore<P> for HttpRemoteStore {
    async fn create_remote(&self, payload: &P) -> Result<RemoteId, RemoteError> {
        let url = self.collection_url(P::COLLECTION);
        let data = self.send(self.request(Method::POST, &url).json(payload)).await?;
        let (id, _): (RemoteId, Value) = split_document(data)?;
        tracing::debug!("Created {} document {}", P::COLLECTION, id);
        Ok(id)
    }

    async fn update_remote(&self, id: &RemoteId, payload: &P) -> Result<(), RemoteError> {
        let url = self.document_url(P::COLLECTION, id);
        self.send(self.request(Method::PUT, &url).json(payload)).await?;
        Ok(())
    }

    async fn delete_remote(&self, id: &RemoteId) -> Result<(), RemoteError> {
        let url = self.document_url(P::COLLECTION, id);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn list_remote(&self) -> Result<Listing<P>, RemoteError> {
        let url = self.collection_url(P::COLLECTION);
        let data = self.send(self.request(Method::GET, &url)).await?;
        let Value::Array(docs) = data else {
            return Err(RemoteError::Parse(format!(
                "expected a list of {} documents",
                P::COLLECTION
            )));
        };

        let returned = docs.len();
        let mut listing = Listing::full(Vec::with_capacity(returned));
        for mut doc in docs {
            let id = match take_id(&mut doc) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("Skipping unidentifiable {} document: {}", P::COLLECTION, e);
                    listing.complete = false;
                    continue;
                }
            };
            match serde_json::from_value(doc) {
                Ok(payload) => listing.docs.push((id, payload)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable {} document {}: {}", P::COLLECTION, id, e);
                    listing.skipped.push(id);
                }
            }
        }

        if list_limit(P::COLLECTION).is_some_and(|limit| returned >= limit) {
            tracing::debug!(
                "Listing of {} hit the endpoint limit; treating it as incomplete",
                P::COLLECTION
            );
            listing.complete = false;
        }
        Ok(listing)
    }
}

#[async_trait]
impl HealthCheck for HttpRemoteStore {
    /// Reachable means the API answered without a server error.
    async fn check_connectivity(&self) -> bool {
        let url = format!("{}{}", self.api_url, self.health_path);
        match self.request(Method::GET, &url).send().await {
            Ok(resp) => !resp.status().is_server_error(),
            Err(e) => {
                tracing::debug!("Health check to {} failed: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::InventoryItem;
    use serde_json::json;

    #[test]
    fn documents_split_into_id_and_payload() {
        let doc = json!({
            "_id": "65f0c0ffee",
            "__v": 0,
            "name": "Milk",
            "quantity": 2,
            "unit": "L",
            "expiryDate": "2026-10-20T00:00:00Z"
        });

        let (id, item): (RemoteId, InventoryItem) = split_document(doc).unwrap();

        assert_eq!(id.as_str(), "65f0c0ffee");
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, 2.0);
        assert!(item.expiry_date.is_some());
    }

    #[test]
    fn documents_without_id_are_rejected() {
        let result = split_document::<InventoryItem>(json!({ "name": "Milk" }));
        assert!(matches!(result, Err(RemoteError::Parse(_))));

        let result = split_document::<InventoryItem>(json!(["not", "an", "object"]));
        assert!(matches!(result, Err(RemoteError::Parse(_))));
    }

    #[test]
    fn only_capped_collections_have_a_list_limit() {
        assert_eq!(list_limit("purchases"), Some(50));
        assert_eq!(list_limit("inventory"), None);
    }

    #[test]
    fn urls_are_built_from_the_base() {
        let store = HttpRemoteStore::new("http://localhost:3000/");
        let id = RemoteId::new("abc").unwrap();

        assert_eq!(store.collection_url("inventory"), "http://localhost:3000/api/inventory");
        assert_eq!(
            store.document_url("purchases", &id),
            "http://localhost:3000/api/purchases/abc"
        );
    }
}
