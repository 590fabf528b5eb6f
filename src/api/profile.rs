//! Self-service profile endpoints.

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::models::{MessageResponse, ProfileUpdate, ProfileView, UpdateProfileRequest};
use crate::AppState;

use super::auth::AuthUser;
use super::error::ApiError;

/// Age in whole years, the way the frontend has always displayed it:
/// elapsed days divided by 365.25, floored.
pub(super) fn age_on(birthdate: &str, today: NaiveDate) -> Option<i64> {
    let birth = NaiveDate::parse_from_str(birthdate, "%Y-%m-%d").ok()?;
    let days = (today - birth).num_days();
    Some((days as f64 / 365.25).floor() as i64)
}

/// GET `/profile`
pub async fn get_profile(
    State(_state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ProfileView>, ApiError> {
    let user = auth
        .doc
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let age = age_on(&user.birthdate, Utc::now().date_naive());
    Ok(Json(ProfileView {
        id: user.id,
        email: user.email,
        name: user.name,
        birthdate: user.birthdate,
        gender: user.gender,
        role: user.role,
        status: user.status,
        age,
    }))
}

/// PUT `/profile` — all three fields are required and checked in order;
/// the identity-service display name is synced only when it differs.
///
/// A body that fails to parse (or arrives without a JSON content type) is
/// treated as empty so the missing-field checks below answer with 400
/// rather than axum's extractor rejections.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<UpdateProfileRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let name = request
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let gender = request
        .gender
        .ok_or_else(|| ApiError::bad_request("Gender is required"))?;
    let birthdate = request
        .birthdate
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::bad_request("Birthdate is required"))?;

    if auth.doc.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    state
        .store
        .update_profile(
            &auth.uid,
            &ProfileUpdate {
                name: name.clone(),
                gender,
                birthdate,
            },
        )
        .await?;

    let current = state.identity.display_name(&auth.uid).await?;
    if current.as_deref() != Some(name.as_str()) {
        state.identity.set_display_name(&auth.uid, &name).await?;
    }

    Ok(Json(MessageResponse::new("Profile updated successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn age_is_floored_over_the_mean_year_length() {
        assert_eq!(age_on("1990-01-01", date("2024-01-02")), Some(34));
        // The day before the 34th birthday boundary.
        assert_eq!(age_on("1990-01-01", date("2023-12-31")), Some(33));
        assert_eq!(age_on("2000-02-29", date("2024-02-28")), Some(23));
    }

    #[test]
    fn unparsable_birthdate_yields_no_age() {
        assert_eq!(age_on("not-a-date", date("2024-01-02")), None);
        assert_eq!(age_on("1990/01/01", date("2024-01-02")), None);
    }
}
