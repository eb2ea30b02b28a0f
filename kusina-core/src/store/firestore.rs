//! REST client for the hosted document database
//!
//! Talks to the Firestore v1 REST API: `documents:runQuery` for structured
//! queries and the per-document endpoints for get/create/patch/delete. The
//! caller's ID token is sent as a bearer token on every request.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::auth::Session;
use crate::config::StoreConfig;
use crate::error::{Error, Result};

use super::document::{Document, FieldValue, Fields};
use super::query::{Direction, FieldPath, Filter, Query};
use super::RecordStore;

/// Field path the REST API uses for the document identifier.
const DOCUMENT_ID_PATH: &str = "__name__";

/// HTTP-backed [`RecordStore`].
pub struct FirestoreStore {
    http_client: reqwest::Client,
    /// `projects/{project}/databases/{database}/documents`
    documents_path: String,
    base_url: String,
}

/// One element of the `runQuery` response stream
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    /// Create a new client from configuration
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .ok_or_else(|| Error::Config("store.project_id is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            documents_path: format!(
                "projects/{}/databases/{}/documents",
                project_id, config.database
            ),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn documents_url(&self) -> String {
        format!("{}/v1/{}", self.base_url, self.documents_path)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url(),
            urlencoding::encode(collection),
            urlencoding::encode(id)
        )
    }

    fn reference(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_path, collection, id)
    }

    /// Build the `structuredQuery` request body.
    fn structured_query(&self, query: &Query) -> Value {
        let mut filters = Vec::new();
        for filter in &query.filters {
            match filter {
                Filter::Eq { field, value } => {
                    filters.push(field_filter(
                        &field_path(field),
                        "EQUAL",
                        self.encode_for(field, &query.collection, value),
                    ));
                }
                Filter::Range { field, start, end } => {
                    if let Some(start) = start {
                        filters.push(field_filter(
                            field,
                            "GREATER_THAN_OR_EQUAL",
                            encode_value(&FieldValue::Timestamp(*start)),
                        ));
                    }
                    if let Some(end) = end {
                        filters.push(field_filter(
                            field,
                            "LESS_THAN",
                            encode_value(&FieldValue::Timestamp(*end)),
                        ));
                    }
                }
                Filter::In { field, values } => {
                    let encoded: Vec<Value> = values
                        .iter()
                        .map(|v| self.encode_for(field, &query.collection, v))
                        .collect();
                    filters.push(field_filter(
                        &field_path(field),
                        "IN",
                        json!({ "arrayValue": { "values": encoded } }),
                    ));
                }
            }
        }

        let mut structured = Map::new();
        structured.insert(
            "from".to_string(),
            json!([{ "collectionId": query.collection }]),
        );

        match filters.len() {
            0 => {}
            1 => {
                structured.insert("where".to_string(), filters.remove(0));
            }
            _ => {
                structured.insert(
                    "where".to_string(),
                    json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
                );
            }
        }

        if let Some((field, direction)) = &query.order_by {
            let direction = match direction {
                Direction::Ascending => "ASCENDING",
                Direction::Descending => "DESCENDING",
            };
            structured.insert(
                "orderBy".to_string(),
                json!([{ "field": { "fieldPath": field }, "direction": direction }]),
            );
        }

        if let Some(limit) = query.limit {
            structured.insert("limit".to_string(), json!(limit));
        }

        json!({ "structuredQuery": Value::Object(structured) })
    }

    /// Document-id filters compare against references, not strings.
    fn encode_for(&self, field: &FieldPath, collection: &str, value: &FieldValue) -> Value {
        match (field, value) {
            (FieldPath::DocumentId, FieldValue::String(id)) => {
                json!({ "referenceValue": self.reference(collection, id) })
            }
            _ => encode_value(value),
        }
    }
}

#[async_trait]
impl RecordStore for FirestoreStore {
    async fn run_query(&self, session: &Session, query: &Query) -> Result<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = self.structured_query(query);

        tracing::debug!(
            collection = %query.collection,
            filters = query.filters.len(),
            "Running store query"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&session.id_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Store(format!("HTTP request failed: {}", e)))?;

        let items: Vec<RunQueryItem> = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse response: {}", e)))?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|raw| decode_document(&query.collection, raw))
            .collect()
    }

    async fn get(&self, session: &Session, collection: &str, id: &str) -> Result<Option<Document>> {
        let response = self
            .http_client
            .get(self.document_url(collection, id))
            .bearer_auth(&session.id_token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("HTTP request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let raw: RawDocument = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse response: {}", e)))?;

        decode_document(collection, raw).map(Some)
    }

    async fn create(&self, session: &Session, collection: &str, fields: Fields) -> Result<String> {
        let url = format!(
            "{}/{}",
            self.documents_url(),
            urlencoding::encode(collection)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&session.id_token)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("HTTP request failed: {}", e)))?;

        let raw: RawDocument = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse response: {}", e)))?;

        let id = document_id(&raw.name)?;
        tracing::info!(collection = %collection, id = %id, "Created document");
        Ok(id)
    }

    async fn update(
        &self,
        session: &Session,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<()> {
        let mut params: Vec<(&str, &str)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", name.as_str()))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let response = self
            .http_client
            .patch(self.document_url(collection, id))
            .bearer_auth(&session.id_token)
            .query(&params)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("HTTP request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        check(response).await?;
        Ok(())
    }

    async fn delete(&self, session: &Session, collection: &str, id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.document_url(collection, id))
            .bearer_auth(&session.id_token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("HTTP request failed: {}", e)))?;

        check(response).await?;
        tracing::info!(collection = %collection, id = %id, "Deleted document");
        Ok(())
    }
}

/// Map non-success statuses to errors.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Permission(format!(
            "API error ({}): {}",
            status, error_text
        ))),
        _ => Err(Error::Store(format!("API error ({}): {}", status, error_text))),
    }
}

fn field_path(field: &FieldPath) -> String {
    match field {
        FieldPath::Field(name) => name.clone(),
        FieldPath::DocumentId => DOCUMENT_ID_PATH.to_string(),
    }
}

fn field_filter(field: &str, op: &str, value: Value) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field },
            "op": op,
            "value": value,
        }
    })
}

/// Last path segment of a document resource name.
fn document_id(name: &str) -> Result<String> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Store(format!("malformed document name: {}", name)))
}

fn decode_document(collection: &str, raw: RawDocument) -> Result<Document> {
    let id = document_id(&raw.name)?;
    let fields = raw
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect();
    Ok(Document::new(collection, id, fields))
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

pub(crate) fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
        FieldValue::Array(values) => {
            let values: Vec<Value> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Decode a typed REST value. Unknown value kinds read as null.
pub(crate) fn decode_value(value: &Value) -> FieldValue {
    let Some(object) = value.as_object() else {
        return FieldValue::Null;
    };

    if let Some(b) = object.get("booleanValue").and_then(Value::as_bool) {
        return FieldValue::Bool(b);
    }
    if let Some(raw) = object.get("integerValue") {
        let parsed = match raw {
            Value::String(s) => s.parse().ok(),
            other => other.as_i64(),
        };
        return parsed.map(FieldValue::Integer).unwrap_or(FieldValue::Null);
    }
    if let Some(d) = object.get("doubleValue").and_then(Value::as_f64) {
        return FieldValue::Double(d);
    }
    if let Some(s) = object.get("stringValue").and_then(Value::as_str) {
        return FieldValue::String(s.to_string());
    }
    if let Some(s) = object.get("referenceValue").and_then(Value::as_str) {
        return FieldValue::String(s.to_string());
    }
    if let Some(s) = object.get("timestampValue").and_then(Value::as_str) {
        return DateTime::parse_from_rfc3339(s)
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
            .unwrap_or(FieldValue::Null);
    }
    if let Some(array) = object.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect())
            .unwrap_or_default();
        return FieldValue::Array(values);
    }
    if let Some(map) = object.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        return FieldValue::Map(fields);
    }

    FieldValue::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::fields;
    use chrono::TimeZone;

    fn store() -> FirestoreStore {
        let config = StoreConfig {
            project_id: Some("demo".to_string()),
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        FirestoreStore::new(&config).unwrap()
    }

    #[test]
    fn test_requires_project_id() {
        assert!(FirestoreStore::new(&StoreConfig::default()).is_err());
    }

    #[test]
    fn test_value_roundtrip_keeps_types() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let original = FieldValue::Map(fields([
            ("total", FieldValue::Double(12.5)),
            ("qty", FieldValue::Integer(3)),
            ("createdAt", FieldValue::Timestamp(ts)),
            ("items", FieldValue::from(vec!["adobo", "sinigang"])),
        ]));

        let encoded = encode_value(&original);
        assert_eq!(encoded["mapValue"]["fields"]["qty"]["integerValue"], "3");
        assert_eq!(decode_value(&encoded), original);
    }

    #[test]
    fn test_decode_reference_as_string() {
        let value = json!({ "referenceValue": "projects/demo/databases/(default)/documents/users/u1" });
        assert_eq!(
            decode_value(&value),
            FieldValue::from("projects/demo/databases/(default)/documents/users/u1")
        );
        assert_eq!(decode_value(&json!({ "geoPointValue": {} })), FieldValue::Null);
    }

    #[test]
    fn test_document_id_from_name() {
        assert_eq!(
            document_id("projects/demo/databases/(default)/documents/orders/abc").unwrap(),
            "abc"
        );
        assert!(document_id("").is_err());
    }

    #[test]
    fn test_structured_query_composite() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let query = Query::new("orders")
            .filter(Filter::eq("restaurantId", "r1"))
            .filter(Filter::between("createdAt", start, end))
            .order_by("createdAt", Direction::Descending)
            .limit(50);

        let body = store().structured_query(&query);
        let sq = &body["structuredQuery"];
        assert_eq!(sq["from"][0]["collectionId"], "orders");
        assert_eq!(sq["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(
            sq["where"]["compositeFilter"]["filters"]
                .as_array()
                .unwrap()
                .len(),
            3
        );
        assert_eq!(sq["orderBy"][0]["direction"], "DESCENDING");
        assert_eq!(sq["limit"], 50);
    }

    #[test]
    fn test_structured_query_document_ids_are_references() {
        let query = Query::new("videos").filter(Filter::id_in(&["v1".to_string()]));
        let body = store().structured_query(&query);
        let filter = &body["structuredQuery"]["where"]["fieldFilter"];
        assert_eq!(filter["field"]["fieldPath"], "__name__");
        assert_eq!(filter["op"], "IN");
        assert_eq!(
            filter["value"]["arrayValue"]["values"][0]["referenceValue"],
            "projects/demo/databases/(default)/documents/videos/v1"
        );
    }
}
