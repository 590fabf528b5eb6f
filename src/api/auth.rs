//! Bearer-token authentication and role gates.
//!
//! Handlers declare their gate by taking one of the extractors below.
//! `AuthUser` resolves the caller: token out of the `Authorization` header,
//! verification against the identity service, then the caller's user
//! document. `AdminUser` and `DoctorUser` layer the role predicate on top.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::identity::IdentityError;
use crate::models::{Role, User};
use crate::AppState;

use super::error::ApiError;

/// Extract the bearer token from request headers.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// An authenticated caller: verified UID plus their user document, when one
/// exists. Endpoints that need the document decide what a missing one means
/// (404 for the profile, 403 for the role gates).
pub struct AuthUser {
    pub uid: String,
    pub doc: Option<User>,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        let uid = match state.identity.verify_id_token(token).await {
            Ok(uid) => uid,
            Err(IdentityError::InvalidToken) => {
                return Err(ApiError::unauthorized("Invalid token"))
            }
            Err(e) => {
                tracing::error!("Error verifying token: {e}");
                return Err(ApiError::internal());
            }
        };

        let doc = state.store.get_user(&uid).await?;
        Ok(AuthUser { uid, doc })
    }
}

/// An authenticated caller whose user document carries `role: admin`.
pub struct AdminUser {
    pub uid: String,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        match auth.doc {
            Some(user) if user.role == Role::Admin => Ok(AdminUser {
                uid: auth.uid,
                user,
            }),
            _ => Err(ApiError::forbidden("Access denied. Admin only.")),
        }
    }
}

/// An authenticated caller whose user document carries `role: doctor`.
///
/// Only the role is checked; the approval `status` is not re-read here, so a
/// doctor rejected after approval keeps passing until the role itself
/// changes. Status enforcement lives in the admin approval workflow.
pub struct DoctorUser {
    pub uid: String,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for DoctorUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        match auth.doc {
            Some(user) if user.role == Role::Doctor => Ok(DoctorUser {
                uid: auth.uid,
                user,
            }),
            _ => Err(ApiError::forbidden("Access denied. Doctor only.")),
        }
    }
}
