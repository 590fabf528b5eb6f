//! Domain models shared by the API server and the seeder.
//!
//! Field names mirror what the document store holds: camelCase for user and
//! audit fields, capitalized names for the screening values (downstream
//! consumers depend on the literal spellings).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role; governs endpoint access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Employee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Account lifecycle state. Doctors start out `pending` until an admin
/// approves or rejects them; everyone else is `active` from creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Pending,
    Rejected,
}

/// Occupational position for employee accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Driver,
    Cook,
    Chef,
    KitchenHelper,
    TruckDriver,
    Baker,
    FoodTester,
}

/// A user document from the `users` collection. The document id doubles as
/// the identity-service UID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub gender: Gender,
    /// ISO date, `YYYY-MM-DD`.
    pub birthdate: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Risk label attached to a screening record by the prediction service.
/// The display strings are load-bearing; the UI matches on them literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    pub probability: f64,
    pub risk_level: RiskLevel,
}

/// One screening observation from the `healthData` collection.
///
/// `age` is denormalized from the user's birth year at record creation time
/// and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Pregnancies")]
    pub pregnancies: i64,
    #[serde(rename = "Glucose")]
    pub glucose: i64,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: i64,
    #[serde(rename = "Insulin")]
    pub insulin: i64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "Age")]
    pub age: i64,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminActionKind {
    Approved,
    Rejected,
    Deleted,
}

/// An entry in the append-only `adminActions` audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    pub id: String,
    /// Subject of the action.
    pub user_id: String,
    /// Snapshot of the subject's name at action time.
    pub user_name: String,
    pub action: AdminActionKind,
    /// The admin who performed the action.
    pub admin_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Audit entry to append; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAdminAction {
    pub user_id: String,
    pub user_name: String,
    pub action: AdminActionKind,
    pub admin_id: String,
}

/// Self-service profile update. All three fields are required; the handler
/// reports the first missing one. A gender value outside the known set is
/// treated as absent so it reports through the same 400 path as a missing
/// field instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_gender")]
    pub gender: Option<Gender>,
    pub birthdate: Option<String>,
}

fn lenient_gender<'de, D>(deserializer: D) -> Result<Option<Gender>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Validated profile fields handed to the store.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub gender: Gender,
    pub birthdate: String,
}

/// Response for `GET /profile`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub birthdate: String,
    pub gender: Gender,
    pub role: Role,
    pub status: UserStatus,
    /// Computed from the birthdate on every call; null when the stored
    /// birthdate does not parse.
    pub age: Option<i64>,
}

/// One row of the doctor-facing patient listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub birthdate: String,
    pub gender: Gender,
    pub position: Option<Position>,
    pub latest_health_data: Option<HealthRecord>,
}

/// Audit entry as served by `GET /action-history`; the timestamp is always
/// present, falling back to the current time for entries written before the
/// server clock was attached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminActionView {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub action: AdminActionKind,
    pub admin_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<AdminAction> for AdminActionView {
    fn from(entry: AdminAction) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            user_name: entry.user_name,
            action: entry.action,
            admin_id: entry.admin_id,
            timestamp: entry.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
