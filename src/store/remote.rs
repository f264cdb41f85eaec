//! Remote document store: Firestore REST v1.
//!
//! Direct HTTP via reqwest — no SDK. Documents carry typed field values
//! (`stringValue`, `integerValue`, ...), so a small codec maps between
//! plain JSON records and Firestore's wire shape. Requests authenticate
//! with the project API key; a missing key surfaces as 401/403, mapped
//! to an auth error the gateway logs and degrades on.
//!
//! Remote writes are at-most-once by policy: no retry here.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{DocumentStore, StoreError};
use crate::config::FirestoreConfig;

pub struct FirestoreStore {
    client: reqwest::Client,
    project_id: String,
    api_key: String,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/{}",
            self.project_id, collection
        )
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDoc>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDoc {
    #[serde(default)]
    fields: Map<String, Value>,
}

fn check_status(status: reqwest::StatusCode, body: String) -> Result<(), StoreError> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(StoreError::AuthExpired);
    }
    if !status.is_success() {
        return Err(StoreError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn upsert(&self, collection: &str, id: &str, record: Value) -> Result<(), StoreError> {
        let body = json!({ "fields": encode_fields(&record)? });
        let resp = self
            .client
            .patch(self.doc_url(collection, id))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            check_status(status, body)?;
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.doc_url(collection, id))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = resp.status();
        // Deleting an absent document is already the desired state.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            check_status(status, body)?;
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let resp = self
            .client
            .get(self.doc_url(collection, id))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            check_status(status, body)?;
            return Ok(None);
        }
        let doc: FirestoreDoc = resp.json().await?;
        Ok(Some(decode_fields(&doc.fields)))
    }

    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        limit: u32,
    ) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .client
            .get(self.collection_url(collection))
            .query(&[
                ("pageSize", limit.to_string().as_str()),
                ("orderBy", order_by),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            check_status(status, body)?;
            return Ok(Vec::new());
        }
        let list: ListDocumentsResponse = resp.json().await?;
        Ok(list
            .documents
            .iter()
            .map(|doc| decode_fields(&doc.fields))
            .collect())
    }
}

// ============================================================================
// Value codec — plain JSON record <-> Firestore typed fields
// ============================================================================

/// Encode a flat JSON object into Firestore `fields`.
pub fn encode_fields(record: &Value) -> Result<Map<String, Value>, StoreError> {
    let obj = record
        .as_object()
        .ok_or_else(|| StoreError::Shape("record is not a JSON object".to_string()))?;
    Ok(obj
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect())
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                // Firestore carries integers as strings.
                json!({ "integerValue": n.to_string() })
            } else {
                json!({ "doubleValue": n })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "mapValue": { "fields": map.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect::<Map<_, _>>() }
        }),
    }
}

/// Decode Firestore `fields` back into a plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect(),
    )
}

fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    if let Some(s) = obj.get("stringValue").and_then(|v| v.as_str()) {
        return Value::String(s.to_string());
    }
    if let Some(raw) = obj.get("integerValue") {
        // Arrives as a string; tolerate a bare number too.
        if let Some(n) = raw.as_str().and_then(|s| s.parse::<i64>().ok()) {
            return json!(n);
        }
        if let Some(n) = raw.as_i64() {
            return json!(n);
        }
    }
    if let Some(n) = obj.get("doubleValue").and_then(|v| v.as_f64()) {
        return json!(n);
    }
    if let Some(b) = obj.get("booleanValue").and_then(|v| v.as_bool()) {
        return Value::Bool(b);
    }
    if let Some(s) = obj.get("timestampValue").and_then(|v| v.as_str()) {
        return Value::String(s.to_string());
    }
    if let Some(values) = obj
        .get("arrayValue")
        .and_then(|v| v.get("values"))
        .and_then(|v| v.as_array())
    {
        return Value::Array(values.iter().map(decode_value).collect());
    }
    if let Some(fields) = obj
        .get("mapValue")
        .and_then(|v| v.get("fields"))
        .and_then(|v| v.as_object())
    {
        return decode_fields(fields);
    }
    Value::Null
}
