pub mod auth;
pub mod error;
mod patients;
mod profile;
mod users;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything lives under the users router; auth is enforced per-route by
    // the extractors in `auth`.
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/patients", get(patients::list_patients))
        .route("/approve-doctor/:user_id", post(users::approve_doctor))
        .route("/reject-doctor/:user_id", post(users::reject_doctor))
        .route("/action-history", get(users::action_history))
        .route("/:user_id", delete(users::delete_user));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/users", user_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::{IdentityService, MemoryIdentity};
    use crate::models::{
        AdminAction, Gender, HealthRecord, NewAdminAction, Position, Prediction, ProfileUpdate,
        RiskLevel, Role, User, UserStatus,
    };
    use crate::store::{DocumentStore, MemoryStore, StoreError};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        identity: Arc<MemoryIdentity>,
    }

    /// Router over in-memory backends, pre-seeded with an admin account
    /// reachable via `Bearer tok-admin`.
    fn test_app() -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(MemoryIdentity::new());
        identity.register("tok-admin", "admin-1", Some("Root Admin"));
        store.insert_user(user("admin-1", Role::Admin, UserStatus::Active));

        let state = Arc::new(AppState {
            config: Config::default(),
            store: store.clone(),
            identity: identity.clone(),
        });
        TestApp {
            router: create_router(state),
            store,
            identity,
        }
    }

    /// Store whose audit appends always fail; everything else delegates to
    /// the in-memory backend.
    struct AuditFailStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for AuditFailStore {
        async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
            self.inner.get_user(id).await
        }

        async fn list_users(&self) -> Result<Vec<User>, StoreError> {
            self.inner.list_users().await
        }

        async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
            self.inner.list_users_by_role(role).await
        }

        async fn create_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.create_user(user).await
        }

        async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
            self.inner.update_profile(id, update).await
        }

        async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<(), StoreError> {
            self.inner.set_user_status(id, status).await
        }

        async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_user(id).await
        }

        async fn insert_health_record(&self, record: &HealthRecord) -> Result<(), StoreError> {
            self.inner.insert_health_record(record).await
        }

        async fn latest_health_record(
            &self,
            user_id: &str,
        ) -> Result<Option<HealthRecord>, StoreError> {
            self.inner.latest_health_record(user_id).await
        }

        async fn append_admin_action(&self, _entry: &NewAdminAction) -> Result<(), StoreError> {
            Err(StoreError::Backend("audit write refused".to_string()))
        }

        async fn list_admin_actions(&self) -> Result<Vec<AdminAction>, StoreError> {
            self.inner.list_admin_actions().await
        }
    }

    /// Like `test_app`, but every audit append fails at the store. The
    /// returned `store` handle is the inner backend, so assertions see what
    /// actually got written.
    fn audit_fail_app() -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(MemoryIdentity::new());
        identity.register("tok-admin", "admin-1", Some("Root Admin"));
        store.insert_user(user("admin-1", Role::Admin, UserStatus::Active));

        let state = Arc::new(AppState {
            config: Config::default(),
            store: Arc::new(AuditFailStore {
                inner: store.clone(),
            }),
            identity: identity.clone(),
        });
        TestApp {
            router: create_router(state),
            store,
            identity,
        }
    }

    fn user(id: &str, role: Role, status: UserStatus) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: format!("Name {id}"),
            gender: Gender::Female,
            birthdate: "1990-01-01".to_string(),
            role,
            status,
            position: match role {
                Role::Employee => Some(Position::Cook),
                _ => None,
            },
            created_at: None,
            updated_at: None,
        }
    }

    fn record(user_id: &str, timestamp: DateTime<Utc>) -> HealthRecord {
        HealthRecord {
            id: String::new(),
            user_id: user_id.to_string(),
            timestamp,
            pregnancies: 1,
            glucose: 130,
            blood_pressure: 85,
            insulin: 90,
            bmi: 27.0,
            age: 34,
            prediction: Prediction {
                probability: 0.45,
                risk_level: RiskLevel::Medium,
            },
        }
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn error_message(body: &Value) -> &str {
        body["error"]["message"].as_str().unwrap_or_default()
    }

    #[tokio::test]
    async fn missing_token_is_rejected_before_anything_else() {
        let app = test_app();
        let (status, body) = send(&app.router, request("GET", "/api/users/", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "No token provided");
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let app = test_app();
        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/profile", Some("bogus"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Invalid token");
    }

    #[tokio::test]
    async fn non_admin_cannot_list_users() {
        let app = test_app();
        app.identity.register("tok-emp", "emp-1", None);
        app.store
            .insert_user(user("emp-1", Role::Employee, UserStatus::Active));

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/", Some("tok-emp"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_message(&body), "Access denied. Admin only.");
    }

    #[tokio::test]
    async fn admin_lists_the_whole_collection() {
        let app = test_app();
        app.store
            .insert_user(user("emp-1", Role::Employee, UserStatus::Active));
        app.store
            .insert_user(user("doc-1", Role::Doctor, UserStatus::Pending));

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/", Some("tok-admin"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.iter().any(|u| u["id"] == "doc-1"));
    }

    #[tokio::test]
    async fn approve_doctor_happy_path() {
        let app = test_app();
        let mut doctor = user("u1", Role::Doctor, UserStatus::Pending);
        doctor.name = "Dr A".to_string();
        app.store.insert_user(doctor);

        let (status, body) = send(
            &app.router,
            request(
                "POST",
                "/api/users/approve-doctor/u1",
                Some("tok-admin"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Doctor approved successfully");

        let updated = app.store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(updated.status, UserStatus::Active);

        let actions = app.store.list_admin_actions().await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].user_id, "u1");
        assert_eq!(actions[0].user_name, "Dr A");
        assert_eq!(actions[0].admin_id, "admin-1");
        assert_eq!(
            serde_json::to_value(actions[0].action).unwrap(),
            json!("approved")
        );
    }

    #[tokio::test]
    async fn reject_doctor_sets_rejected_status() {
        let app = test_app();
        app.store
            .insert_user(user("u1", Role::Doctor, UserStatus::Pending));

        let (status, _) = send(
            &app.router,
            request(
                "POST",
                "/api/users/reject-doctor/u1",
                Some("tok-admin"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated = app.store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(updated.status, UserStatus::Rejected);

        let actions = app.store.list_admin_actions().await.unwrap();
        assert_eq!(
            serde_json::to_value(actions[0].action).unwrap(),
            json!("rejected")
        );
    }

    #[tokio::test]
    async fn approving_a_non_doctor_is_a_validation_error() {
        let app = test_app();
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let (status, body) = send(
            &app.router,
            request(
                "POST",
                "/api/users/approve-doctor/u1",
                Some("tok-admin"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "User is not a doctor");

        let unchanged = app.store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(unchanged.status, UserStatus::Active);
        assert_eq!(app.store.action_count(), 0);
    }

    #[tokio::test]
    async fn approving_a_missing_user_is_not_found() {
        let app = test_app();
        let (status, body) = send(
            &app.router,
            request(
                "POST",
                "/api/users/approve-doctor/ghost",
                Some("tok-admin"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), "User not found");
    }

    #[tokio::test]
    async fn delete_removes_identity_account_and_document() {
        let app = test_app();
        app.identity.register("tok-u1", "u1", Some("Name u1"));
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let (status, body) = send(
            &app.router,
            request("DELETE", "/api/users/u1", Some("tok-admin"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted successfully");
        assert!(app.store.get_user("u1").await.unwrap().is_none());
        assert!(!app.identity.has_account("u1"));

        let actions = app.store.list_admin_actions().await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(
            serde_json::to_value(actions[0].action).unwrap(),
            json!("deleted")
        );
    }

    #[tokio::test]
    async fn delete_tolerates_a_missing_identity_account() {
        // Seeded fixtures have user documents but no identity accounts.
        let app = test_app();
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let (status, _) = send(
            &app.router,
            request("DELETE", "/api/users/u1", Some("tok-admin"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.store.get_user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_missing_user_touches_nothing() {
        let app = test_app();
        // An identity account with no matching document must survive.
        app.identity.register("tok-ghost", "ghost", None);

        let (status, body) = send(
            &app.router,
            request("DELETE", "/api/users/ghost", Some("tok-admin"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), "User not found");
        assert!(app.identity.has_account("ghost"));
        assert_eq!(app.store.action_count(), 0);
    }

    #[tokio::test]
    async fn action_history_is_newest_first() {
        let app = test_app();
        for id in ["d1", "d2", "d3"] {
            app.store
                .insert_user(user(id, Role::Doctor, UserStatus::Pending));
            let (status, _) = send(
                &app.router,
                request(
                    "POST",
                    &format!("/api/users/approve-doctor/{id}"),
                    Some("tok-admin"),
                    None,
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/action-history", Some("tok-admin"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        let timestamps: Vec<DateTime<Utc>> = entries
            .iter()
            .map(|e| e["timestamp"].as_str().unwrap().parse().unwrap())
            .collect();
        for pair in timestamps.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert_eq!(entries[0]["userId"], "d3");
    }

    #[tokio::test]
    async fn patients_listing_joins_latest_record() {
        let app = test_app();
        app.identity.register("tok-doc", "doc-1", None);
        app.store
            .insert_user(user("doc-1", Role::Doctor, UserStatus::Active));
        app.store
            .insert_user(user("emp-1", Role::Employee, UserStatus::Active));
        app.store
            .insert_user(user("emp-2", Role::Employee, UserStatus::Active));

        let older = Utc::now() - Duration::days(40);
        let newer = Utc::now() - Duration::days(10);
        app.store.insert_health_record_raw({
            let mut r = record("emp-1", older);
            r.id = "h-old".to_string();
            r
        });
        app.store.insert_health_record_raw({
            let mut r = record("emp-1", newer);
            r.id = "h-new".to_string();
            r
        });

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/patients", Some("tok-doc"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let patients = body.as_array().unwrap();
        assert_eq!(patients.len(), 2);

        let p1 = patients.iter().find(|p| p["id"] == "emp-1").unwrap();
        assert_eq!(p1["latestHealthData"]["id"], "h-new");
        assert_eq!(p1["position"], "cook");

        let p2 = patients.iter().find(|p| p["id"] == "emp-2").unwrap();
        assert!(p2["latestHealthData"].is_null());
    }

    #[tokio::test]
    async fn patients_requires_the_doctor_role_but_not_active_status() {
        let app = test_app();
        app.identity.register("tok-emp", "emp-1", None);
        app.store
            .insert_user(user("emp-1", Role::Employee, UserStatus::Active));
        // A rejected doctor still passes the gate; only the role is checked.
        app.identity.register("tok-rejected", "doc-r", None);
        app.store
            .insert_user(user("doc-r", Role::Doctor, UserStatus::Rejected));

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/patients", Some("tok-emp"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_message(&body), "Access denied. Doctor only.");

        let (status, _) = send(
            &app.router,
            request("GET", "/api/users/patients", Some("tok-rejected"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn profile_reports_computed_age() {
        let app = test_app();
        app.identity.register("tok-u1", "u1", None);
        let mut u = user("u1", Role::Employee, UserStatus::Active);
        u.birthdate = "1990-01-01".to_string();
        app.store.insert_user(u);

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/profile", Some("tok-u1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "u1");
        assert_eq!(body["status"], "active");
        let expected = super::profile::age_on("1990-01-01", Utc::now().date_naive()).unwrap();
        assert_eq!(body["age"], expected);
    }

    #[tokio::test]
    async fn profile_without_a_document_is_not_found() {
        let app = test_app();
        app.identity.register("tok-nobody", "nobody", None);

        let (status, body) = send(
            &app.router,
            request("GET", "/api/users/profile", Some("tok-nobody"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), "User not found");
    }

    #[tokio::test]
    async fn profile_update_reports_the_first_missing_field() {
        let app = test_app();
        app.identity.register("tok-u1", "u1", None);
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let cases = [
            (json!({}), "Name is required"),
            (json!({ "name": "New Name" }), "Gender is required"),
            (
                json!({ "name": "New Name", "gender": "female" }),
                "Birthdate is required",
            ),
        ];
        for (payload, expected) in cases {
            let (status, body) = send(
                &app.router,
                request("PUT", "/api/users/profile", Some("tok-u1"), Some(payload)),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error_message(&body), expected);
        }
    }

    #[tokio::test]
    async fn profile_update_with_unknown_gender_is_a_missing_field() {
        let app = test_app();
        app.identity.register("tok-u1", "u1", None);
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let (status, body) = send(
            &app.router,
            request(
                "PUT",
                "/api/users/profile",
                Some("tok-u1"),
                Some(json!({
                    "name": "New Name",
                    "gender": "other",
                    "birthdate": "1988-07-04"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Gender is required");
    }

    #[tokio::test]
    async fn profile_update_without_a_json_body_still_validates() {
        let app = test_app();
        app.identity.register("tok-u1", "u1", None);
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        // A body without a JSON content type reads as empty.
        let req = Request::builder()
            .method("PUT")
            .uri("/api/users/profile")
            .header("Authorization", "Bearer tok-u1")
            .body(Body::from(r#"{"name":"New Name"}"#))
            .unwrap();
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Name is required");

        // So does a body that is not JSON at all.
        let req = Request::builder()
            .method("PUT")
            .uri("/api/users/profile")
            .header("Authorization", "Bearer tok-u1")
            .header("Content-Type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Name is required");
    }

    #[tokio::test]
    async fn failed_audit_write_is_a_500_and_the_status_change_stands() {
        let app = audit_fail_app();
        app.store
            .insert_user(user("u1", Role::Doctor, UserStatus::Pending));

        let (status, body) = send(
            &app.router,
            request(
                "POST",
                "/api/users/approve-doctor/u1",
                Some("tok-admin"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_message(&body), "Internal server error");

        // The status write had already been acknowledged and is not rolled back.
        let updated = app.store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(updated.status, UserStatus::Active);
        assert_eq!(app.store.action_count(), 0);
    }

    #[tokio::test]
    async fn failed_audit_write_does_not_restore_a_deleted_user() {
        let app = audit_fail_app();
        app.identity.register("tok-u1", "u1", Some("Name u1"));
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let (status, body) = send(
            &app.router,
            request("DELETE", "/api/users/u1", Some("tok-admin"), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_message(&body), "Internal server error");

        // Identity account and document are gone; only the audit entry is missing.
        assert!(app.store.get_user("u1").await.unwrap().is_none());
        assert!(!app.identity.has_account("u1"));
        assert_eq!(app.store.action_count(), 0);
    }

    #[tokio::test]
    async fn profile_update_syncs_the_display_name() {
        let app = test_app();
        app.identity.register("tok-u1", "u1", Some("Old Name"));
        app.store
            .insert_user(user("u1", Role::Employee, UserStatus::Active));

        let (status, body) = send(
            &app.router,
            request(
                "PUT",
                "/api/users/profile",
                Some("tok-u1"),
                Some(json!({
                    "name": "New Name",
                    "gender": "male",
                    "birthdate": "1988-07-04"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile updated successfully");

        let updated = app.store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.birthdate, "1988-07-04");
        assert_eq!(
            app.identity.display_name("u1").await.unwrap(),
            Some("New Name".to_string())
        );
    }

    #[tokio::test]
    async fn health_check_needs_no_auth() {
        let app = test_app();
        let (status, _) = send(&app.router, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
