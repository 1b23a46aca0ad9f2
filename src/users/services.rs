use tracing::{info, instrument, warn};

use crate::error::{parse_id, AppError};
use crate::state::AppState;
use crate::store::{Filter, StoreError, Update};
use crate::users::dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::users::repo::NewUser;
use crate::validation::normalize_email;

const ENTITY: &str = "User";

fn email_conflict(email: &str) -> impl FnOnce(StoreError) -> AppError + '_ {
    move |e| match AppError::from(e) {
        AppError::Conflict(_) => {
            warn!(%email, "email already registered");
            AppError::Conflict(format!("User with email {email} already exists"))
        }
        other => other,
    }
}

/// Uniqueness of `email` is enforced by the store's index, not by a prior lookup.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn create_user(state: &AppState, req: CreateUserRequest) -> Result<UserResponse, AppError> {
    let new = NewUser::from(req);
    let user = state
        .users()
        .insert(&new)
        .await
        .map_err(email_conflict(&new.email))?;
    info!(user_id = %user.id, "user created");
    Ok(user.into())
}

#[instrument(skip(state))]
pub async fn find_all_users(state: &AppState) -> Result<Vec<UserResponse>, AppError> {
    let users = state.users().find_all().await?;
    Ok(users.into_iter().map(UserResponse::from).collect())
}

#[instrument(skip(state))]
pub async fn find_user_by_id(state: &AppState, id: &str) -> Result<UserResponse, AppError> {
    let user_id = parse_id(ENTITY, id)?;
    state
        .users()
        .find_by_id(user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::not_found(ENTITY, id))
}

#[instrument(skip(state))]
pub async fn find_user_by_email(state: &AppState, email: &str) -> Result<UserResponse, AppError> {
    let email = normalize_email(email);
    state
        .users()
        .find_one(&Filter::all().eq("email", email.as_str()))
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound(format!("User with email {email} not found")))
}

#[instrument(skip(state, req))]
pub async fn update_user(
    state: &AppState,
    id: &str,
    mut req: UpdateUserRequest,
) -> Result<UserResponse, AppError> {
    let user_id = parse_id(ENTITY, id)?;
    req.email = req.email.as_deref().map(normalize_email);
    let email = req.email.clone().unwrap_or_default();

    let patch = serde_json::to_value(&req).map_err(|e| AppError::Internal(e.into()))?;
    let update = Update::new().merge(patch)?.touch();
    let user = state
        .users()
        .update_by_id(user_id, &update)
        .await
        .map_err(email_conflict(&email))?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%user_id, "user updated");
    Ok(user.into())
}

#[instrument(skip(state))]
pub async fn remove_user(state: &AppState, id: &str) -> Result<(), AppError> {
    let user_id = parse_id(ENTITY, id)?;
    state
        .users()
        .delete_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%user_id, "user removed");
    Ok(())
}

#[instrument(skip(state))]
pub async fn deactivate_user(state: &AppState, id: &str) -> Result<UserResponse, AppError> {
    let user_id = parse_id(ENTITY, id)?;
    let update = Update::new().set("active", false).touch();
    let user = state
        .users()
        .update_by_id(user_id, &update)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%user_id, "user deactivated");
    Ok(user.into())
}
