//! Identity Toolkit REST client.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::gcp::TokenProvider;

use super::{IdentityError, IdentityService};

const API_ROOT: &str = "https://identitytoolkit.googleapis.com/v1";

pub struct FirebaseIdentity {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
}

impl FirebaseIdentity {
    pub fn new(tokens: Arc<TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
        }
    }

    async fn post(&self, method: &str, body: Value) -> Result<reqwest::Response, IdentityError> {
        let token = self
            .tokens
            .bearer()
            .await
            .map_err(|e| IdentityError::Backend(e.to_string()))?;
        Ok(self
            .http
            .post(format!("{API_ROOT}/accounts:{method}"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?)
    }

    /// Run an `accounts:lookup` and return the first matched account.
    async fn lookup(&self, body: Value) -> Result<Option<Value>, IdentityError> {
        let response = self.post("lookup", body).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::BAD_REQUEST {
                // Lookup rejects unknown or expired tokens with 400.
                return Err(IdentityError::InvalidToken);
            }
            return Err(IdentityError::Backend(format!("{status}: {text}")));
        }
        let body: Value = response.json().await?;
        Ok(body
            .get("users")
            .and_then(Value::as_array)
            .and_then(|users| users.first())
            .cloned())
    }
}

#[async_trait::async_trait]
impl IdentityService for FirebaseIdentity {
    async fn verify_id_token(&self, token: &str) -> Result<String, IdentityError> {
        let account = self
            .lookup(json!({ "idToken": token }))
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        account
            .get("localId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(IdentityError::InvalidToken)
    }

    async fn display_name(&self, uid: &str) -> Result<Option<String>, IdentityError> {
        let account = self.lookup(json!({ "localId": [uid] })).await?;
        Ok(account
            .as_ref()
            .and_then(|a| a.get("displayName"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), IdentityError> {
        let response = self
            .post(
                "update",
                json!({ "localId": uid, "displayName": name, "returnSecureToken": false }),
            )
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::Backend(format!("{status}: {text}")));
        }
        Ok(())
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let response = self.post("delete", json!({ "localId": uid })).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if text.contains("USER_NOT_FOUND") {
                return Err(IdentityError::AccountNotFound(uid.to_string()));
            }
            return Err(IdentityError::Backend(format!("{status}: {text}")));
        }
        Ok(())
    }
}
