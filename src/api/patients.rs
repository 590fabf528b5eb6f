//! Doctor endpoints.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::{PatientView, Role};
use crate::AppState;

use super::auth::DoctorUser;
use super::error::ApiError;

/// GET `/patients` — every employee, joined with their most recent screening
/// record. One latest-record query per employee; fine at the tens-to-low-
/// hundreds scale this runs at.
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    _doctor: DoctorUser,
) -> Result<Json<Vec<PatientView>>, ApiError> {
    let employees = state.store.list_users_by_role(Role::Employee).await?;

    let mut patients = Vec::with_capacity(employees.len());
    for user in employees {
        let latest = state.store.latest_health_record(&user.id).await?;
        patients.push(PatientView {
            id: user.id,
            email: user.email,
            name: user.name,
            birthdate: user.birthdate,
            gender: user.gender,
            position: user.position,
            latest_health_data: latest,
        });
    }

    Ok(Json(patients))
}
