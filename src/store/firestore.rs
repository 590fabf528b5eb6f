//! Firestore REST client for the three collections.
//!
//! Server-assigned timestamps (`createdAt`, `updatedAt`, audit `timestamp`)
//! use commit-time transforms so the clock is the store's, not this
//! process's. Auto-id documents get a client-generated uuid, the same way
//! the official SDKs allocate ids before writing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::gcp::TokenProvider;
use crate::models::{
    AdminAction, HealthRecord, NewAdminAction, ProfileUpdate, Role, User, UserStatus,
};

use super::{DocumentStore, StoreError};

const API_ROOT: &str = "https://firestore.googleapis.com/v1";
const USERS: &str = "users";
const HEALTH_DATA: &str = "healthData";
const ADMIN_ACTIONS: &str = "adminActions";
const PAGE_SIZE: usize = 300;

pub struct FirestoreStore {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    /// `projects/{project}/databases/(default)` — prefix of every document
    /// resource name.
    resource_root: String,
}

impl FirestoreStore {
    pub fn new(project_id: &str, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            resource_root: format!("projects/{project_id}/databases/(default)"),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{API_ROOT}/{}/{suffix}", self.resource_root)
    }

    fn doc_name(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{collection}/{id}", self.resource_root)
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        self.tokens
            .bearer()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    /// Submit a single write through `documents:commit`.
    async fn commit(&self, write: Value) -> Result<(), StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(self.url("documents:commit"))
            .bearer_auth(token)
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn run_query<T: DeserializeOwned>(&self, query: Value) -> Result<Vec<T>, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(self.url("documents:runQuery"))
            .bearer_auth(token)
            .json(&json!({ "structuredQuery": query }))
            .send()
            .await?;
        let body: Value = ensure_success(response).await?;

        let mut results = Vec::new();
        for item in body.as_array().into_iter().flatten() {
            if let Some(doc) = item.get("document") {
                results.push(decode_document(doc)?);
            }
        }
        Ok(results)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(&format!("documents/{USERS}/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = ensure_success(response).await?;
        Ok(Some(decode_document(&doc)?))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let token = self.bearer().await?;
            let mut request = self
                .http
                .get(self.url(&format!("documents/{USERS}")))
                .bearer_auth(token)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(ref next) = page_token {
                request = request.query(&[("pageToken", next)]);
            }
            let body: Value = ensure_success(request.send().await?).await?;

            for doc in body.get("documents").and_then(Value::as_array).into_iter().flatten() {
                users.push(decode_document(doc)?);
            }
            match body.get("nextPageToken").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(users)
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        self.run_query(json!({
            "from": [{ "collectionId": USERS }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "role" },
                    "op": "EQUAL",
                    "value": { "stringValue": enum_str(&role) }
                }
            }
        }))
        .await
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.commit(json!({
            "update": {
                "name": self.doc_name(USERS, &user.id),
                "fields": user_fields(user)
            },
            "updateTransforms": [
                server_time("createdAt"),
                server_time("updatedAt")
            ]
        }))
        .await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        self.commit(json!({
            "update": {
                "name": self.doc_name(USERS, id),
                "fields": {
                    "name": string_value(&update.name),
                    "gender": string_value(&enum_str(&update.gender)),
                    "birthdate": string_value(&update.birthdate)
                }
            },
            "updateMask": { "fieldPaths": ["name", "gender", "birthdate"] },
            "updateTransforms": [server_time("updatedAt")]
        }))
        .await
    }

    async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<(), StoreError> {
        self.commit(json!({
            "update": {
                "name": self.doc_name(USERS, id),
                "fields": { "status": string_value(&enum_str(&status)) }
            },
            "updateMask": { "fieldPaths": ["status"] },
            "updateTransforms": [server_time("updatedAt")]
        }))
        .await
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.url(&format!("documents/{USERS}/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn insert_health_record(&self, record: &HealthRecord) -> Result<(), StoreError> {
        let id = if record.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            record.id.clone()
        };
        self.commit(json!({
            "update": {
                "name": self.doc_name(HEALTH_DATA, &id),
                "fields": health_record_fields(record)
            }
        }))
        .await
    }

    async fn latest_health_record(
        &self,
        user_id: &str,
    ) -> Result<Option<HealthRecord>, StoreError> {
        let mut records: Vec<HealthRecord> = self
            .run_query(json!({
                "from": [{ "collectionId": HEALTH_DATA }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "userId" },
                        "op": "EQUAL",
                        "value": { "stringValue": user_id }
                    }
                },
                "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "DESCENDING" }],
                "limit": 1
            }))
            .await?;
        Ok(records.pop())
    }

    async fn append_admin_action(&self, entry: &NewAdminAction) -> Result<(), StoreError> {
        let id = Uuid::new_v4().to_string();
        self.commit(json!({
            "update": {
                "name": self.doc_name(ADMIN_ACTIONS, &id),
                "fields": {
                    "userId": string_value(&entry.user_id),
                    "userName": string_value(&entry.user_name),
                    "action": string_value(&enum_str(&entry.action)),
                    "adminId": string_value(&entry.admin_id)
                }
            },
            "updateTransforms": [server_time("timestamp")]
        }))
        .await
    }

    async fn list_admin_actions(&self) -> Result<Vec<AdminAction>, StoreError> {
        self.run_query(json!({
            "from": [{ "collectionId": ADMIN_ACTIONS }],
            "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "DESCENDING" }]
        }))
        .await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<Value, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Backend(format!("{status}: {body}")));
    }
    Ok(response.json().await?)
}

// ---------------------------------------------------------------------------
// Value encoding
// ---------------------------------------------------------------------------

fn string_value(v: &str) -> Value {
    json!({ "stringValue": v })
}

fn integer_value(v: i64) -> Value {
    // Firestore serializes int64 as a decimal string.
    json!({ "integerValue": v.to_string() })
}

fn double_value(v: f64) -> Value {
    json!({ "doubleValue": v })
}

fn timestamp_value(t: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

fn server_time(field: &str) -> Value {
    json!({ "fieldPath": field, "setToServerValue": "REQUEST_TIME" })
}

/// The wire string for a unit enum (`Role`, `Gender`, `UserStatus`, ...).
fn enum_str<T: Serialize>(v: &T) -> String {
    match serde_json::to_value(v) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn user_fields(user: &User) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("email".into(), string_value(&user.email));
    fields.insert("name".into(), string_value(&user.name));
    fields.insert("gender".into(), string_value(&enum_str(&user.gender)));
    fields.insert("birthdate".into(), string_value(&user.birthdate));
    fields.insert("role".into(), string_value(&enum_str(&user.role)));
    fields.insert("status".into(), string_value(&enum_str(&user.status)));
    if let Some(position) = &user.position {
        fields.insert("position".into(), string_value(&enum_str(position)));
    }
    Value::Object(fields)
}

fn health_record_fields(record: &HealthRecord) -> Value {
    json!({
        "userId": string_value(&record.user_id),
        "timestamp": timestamp_value(&record.timestamp),
        "Pregnancies": integer_value(record.pregnancies),
        "Glucose": integer_value(record.glucose),
        "BloodPressure": integer_value(record.blood_pressure),
        "Insulin": integer_value(record.insulin),
        "BMI": double_value(record.bmi),
        "Age": integer_value(record.age),
        "prediction": json!({
            "mapValue": {
                "fields": {
                    "probability": double_value(record.prediction.probability),
                    "risk_level": string_value(&enum_str(&record.prediction.risk_level))
                }
            }
        })
    })
}

// ---------------------------------------------------------------------------
// Value decoding
// ---------------------------------------------------------------------------

/// Flatten a Firestore `Value` into plain JSON so documents can deserialize
/// through the model structs. Timestamps come back as RFC 3339 strings,
/// which chrono accepts directly.
fn plain_value(value: &Value) -> Value {
    if let Some(v) = value.get("stringValue") {
        return v.clone();
    }
    if let Some(v) = value.get("integerValue") {
        return match v {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| v.clone()),
            _ => v.clone(),
        };
    }
    if let Some(v) = value.get("doubleValue") {
        return v.clone();
    }
    if let Some(v) = value.get("booleanValue") {
        return v.clone();
    }
    if let Some(v) = value.get("timestampValue") {
        return v.clone();
    }
    if let Some(fields) = value
        .get("mapValue")
        .and_then(|m| m.get("fields"))
        .and_then(Value::as_object)
    {
        return Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), plain_value(v)))
                .collect(),
        );
    }
    if let Some(values) = value
        .get("arrayValue")
        .and_then(|a| a.get("values"))
        .and_then(Value::as_array)
    {
        return Value::Array(values.iter().map(plain_value).collect());
    }
    Value::Null
}

/// Decode a Firestore document into a model struct, injecting the trailing
/// segment of the resource name as `id`.
fn decode_document<T: DeserializeOwned>(doc: &Value) -> Result<T, StoreError> {
    let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
    let id = name.rsplit('/').next().unwrap_or_default().to_string();

    let mut fields: serde_json::Map<String, Value> = doc
        .get("fields")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), plain_value(v))).collect())
        .unwrap_or_default();
    fields.insert("id".into(), Value::String(id));

    serde_json::from_value(Value::Object(fields)).map_err(|e| StoreError::Decode {
        path: name.to_string(),
        reason: e.to_string(),
    })
}
