use axum::async_trait;
use serde_json::Value;

use crate::commands::{
    Service, CREATE_USER, DEACTIVATE_USER, FIND_ALL_USERS, FIND_USER_BY_EMAIL, FIND_USER_BY_ID,
    REMOVE_USER, UPDATE_USER,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::transport::{reply, server::CommandHandler, IdUpdate};
use crate::users::{dto::UpdateUserRequest, services};
use crate::validation::{payload, validated, Validate};

/// Message-pattern controller of the user service.
pub struct UserCommands {
    state: AppState,
}

impl UserCommands {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl CommandHandler for UserCommands {
    fn service(&self) -> Service {
        Service::User
    }

    async fn handle(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
        let state = &self.state;
        match cmd {
            CREATE_USER => reply(services::create_user(state, validated(data)?).await?),
            FIND_ALL_USERS => reply(services::find_all_users(state).await?),
            FIND_USER_BY_ID => {
                let id: String = payload(data)?;
                reply(services::find_user_by_id(state, &id).await?)
            }
            FIND_USER_BY_EMAIL => {
                let email: String = payload(data)?;
                reply(services::find_user_by_email(state, &email).await?)
            }
            UPDATE_USER => {
                let IdUpdate { id, update } = payload::<IdUpdate<UpdateUserRequest>>(data)?;
                update.validate()?;
                reply(services::update_user(state, &id, update).await?)
            }
            REMOVE_USER => {
                let id: String = payload(data)?;
                services::remove_user(state, &id).await?;
                Ok(Value::Null)
            }
            DEACTIVATE_USER => {
                let id: String = payload(data)?;
                reply(services::deactivate_user(state, &id).await?)
            }
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}
