//! Cloud Firestore REST adapter.
//!
//! Documents travel as Firestore typed values (`integerValue`, `mapValue`,
//! ...); this module converts them to and from plain JSON fields.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use super::document::{BackendError, Direction, Document, DocumentBackend, Fields, Query};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// ID token shared between the identity adapter (writer) and the backend (reader).
pub type BearerToken = Arc<RwLock<Option<SecretString>>>;

#[derive(Clone, Debug)]
pub struct FirestoreBackend {
    client: Client,
    documents_url: String,
    token: BearerToken,
}

impl FirestoreBackend {
    /// Backend for the `(default)` database of `project_id`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(project_id: &str, token: BearerToken) -> Result<Self, BackendError> {
        Self::with_base_url(FIRESTORE_BASE_URL, project_id, token)
    }

    /// Same as [`FirestoreBackend::new`] against another endpoint, e.g. the emulator.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        project_id: &str,
        token: BearerToken,
    ) -> Result<Self, BackendError> {
        let base = Url::parse(base_url).map_err(BackendError::other)?;
        if project_id.trim().is_empty() {
            return Err(BackendError::Other("missing project id".to_string()));
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(BackendError::other)?;

        let documents_url = format!(
            "{}/projects/{project_id}/databases/(default)/documents",
            base.as_str().trim_end_matches('/')
        );

        debug!("firestore documents URL: {}", documents_url);

        Ok(Self {
            client,
            documents_url,
            token,
        })
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_ref() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        mask: bool,
        must_exist: bool,
    ) -> Result<(), BackendError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if mask {
            params.extend(fields.keys().map(|key| ("updateMask.fieldPaths", key.as_str())));
        }
        if must_exist {
            params.push(("currentDocument.exists", "true"));
        }

        let request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&params)
            .json(&json!({ "fields": encode_fields(fields) }));

        self.send(request).await.map(|_| ())
    }
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = format!("{status} {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::PermissionDenied(message),
        StatusCode::NOT_FOUND => BackendError::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            BackendError::Unavailable(message)
        }
        s if s.is_server_error() => BackendError::Unavailable(message),
        _ => BackendError::Other(message),
    }
}

pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

pub(crate) fn decode_value(value: &Value) -> Result<Value, BackendError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|object| object.iter().next())
        .ok_or_else(|| BackendError::Decode(format!("not a typed value: {value}")))?;

    let mismatch = || BackendError::Decode(format!("malformed {kind}: {inner}"));

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner.as_bool().map(Value::Bool).ok_or_else(mismatch),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).map_err(|_| mismatch()),
            Value::Number(n) => n.as_i64().map(Value::from).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        "doubleValue" => inner
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(mismatch),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map_or_else(|| Ok(Vec::new()), |values| values.iter().map(decode_value).collect())
            .map(Value::Array),
        "mapValue" => decode_fields(inner.get("fields")).map(Value::Object),
        other => Err(BackendError::Decode(format!("unsupported value type {other}"))),
    }
}

fn decode_fields(fields: Option<&Value>) -> Result<Fields, BackendError> {
    let Some(fields) = fields else {
        return Ok(Fields::new());
    };
    let object = fields
        .as_object()
        .ok_or_else(|| BackendError::Decode("fields is not an object".to_string()))?;

    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

pub(crate) fn decode_document(value: &Value) -> Result<Document, BackendError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::Decode("document without name".to_string()))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();

    Ok(Document {
        id,
        fields: decode_fields(value.get("fields"))?,
    })
}

pub(crate) fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = json!({ "from": [{ "collectionId": collection }] });

    let filters: Vec<Value> = query
        .filters
        .iter()
        .map(|filter| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": filter.field },
                    "op": "EQUAL",
                    "value": encode_value(&filter.value),
                }
            })
        })
        .collect();

    match filters.len() {
        0 => {}
        1 => structured["where"] = filters[0].clone(),
        _ => {
            structured["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": filters }
            });
        }
    }

    if !query.order_by.is_empty() {
        let order_by: Vec<Value> = query
            .order_by
            .iter()
            .map(|order| {
                let direction = match order.direction {
                    Direction::Ascending => "ASCENDING",
                    Direction::Descending => "DESCENDING",
                };
                json!({ "field": { "fieldPath": order.field }, "direction": direction })
            })
            .collect();
        structured["orderBy"] = Value::Array(order_by);
    }

    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }

    json!({ "structuredQuery": structured })
}

#[async_trait]
impl DocumentBackend for FirestoreBackend {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let request = self.client.get(self.document_url(collection, id));
        match self.send(request).await {
            Ok(response) => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|err| BackendError::Decode(err.to_string()))?;
                decode_document(&body).map(Some)
            }
            Err(BackendError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, fields))]
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), BackendError> {
        self.patch(collection, id, &fields, merge, false).await
    }

    #[instrument(skip(self, fields))]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), BackendError> {
        self.patch(collection, id, &fields, true, true).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let request = self.client.delete(self.document_url(collection, id));
        self.send(request).await.map(|_| ())
    }

    #[instrument(skip(self, query))]
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError> {
        let request = self
            .client
            .post(format!("{}:runQuery", self.documents_url))
            .json(&structured_query(collection, query));

        let rows: Vec<Value> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))?;

        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(decode_document)
            .collect()
    }
}
