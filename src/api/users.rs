//! Admin endpoints: user listing, doctor approval workflow, user deletion,
//! and the audit trail.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::identity::IdentityError;
use crate::models::{
    AdminActionKind, AdminActionView, MessageResponse, NewAdminAction, Role, User, UserStatus,
};
use crate::AppState;

use super::auth::AdminUser;
use super::error::ApiError;

/// GET `/` — the full users collection. No pagination; the cohort is tens to
/// low hundreds of accounts.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

/// POST `/approve-doctor/:user_id`
pub async fn approve_doctor(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    review_doctor(
        &state,
        &admin,
        &user_id,
        UserStatus::Active,
        AdminActionKind::Approved,
    )
    .await?;
    Ok(Json(MessageResponse::new("Doctor approved successfully")))
}

/// POST `/reject-doctor/:user_id`
pub async fn reject_doctor(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    review_doctor(
        &state,
        &admin,
        &user_id,
        UserStatus::Rejected,
        AdminActionKind::Rejected,
    )
    .await?;
    Ok(Json(MessageResponse::new("Doctor rejected successfully")))
}

/// Shared approve/reject flow. The audit entry is appended only after the
/// status write has acknowledged; the two writes are not atomic.
async fn review_doctor(
    state: &AppState,
    admin: &AdminUser,
    user_id: &str,
    status: UserStatus,
    action: AdminActionKind,
) -> Result<(), ApiError> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.role != Role::Doctor {
        return Err(ApiError::bad_request("User is not a doctor"));
    }

    state.store.set_user_status(user_id, status).await?;
    state
        .store
        .append_admin_action(&NewAdminAction {
            user_id: user_id.to_string(),
            user_name: user.name,
            action,
            admin_id: admin.uid.clone(),
        })
        .await?;

    tracing::info!(%user_id, admin_id = %admin.uid, ?action, "Doctor review recorded");
    Ok(())
}

/// DELETE `/:user_id` — remove the identity account, then the user document,
/// then append the audit entry. Health records are intentionally left in
/// place for retention.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    match state.identity.delete_account(&user_id).await {
        Ok(()) => {}
        // Seeded fixtures have documents without identity accounts.
        Err(IdentityError::AccountNotFound(_)) => {
            tracing::warn!(%user_id, "No identity account for user being deleted");
        }
        Err(e) => {
            tracing::error!("Error deleting user: {e}");
            return Err(ApiError::internal());
        }
    }

    state.store.delete_user(&user_id).await?;
    state
        .store
        .append_admin_action(&NewAdminAction {
            user_id: user_id.clone(),
            user_name: user.name,
            action: AdminActionKind::Deleted,
            admin_id: admin.uid.clone(),
        })
        .await?;

    tracing::info!(%user_id, admin_id = %admin.uid, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// GET `/action-history` — audit entries, newest first.
pub async fn action_history(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<AdminActionView>>, ApiError> {
    let entries = state.store.list_admin_actions().await?;
    Ok(Json(
        entries.into_iter().map(AdminActionView::from).collect(),
    ))
}
