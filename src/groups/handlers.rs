use axum::async_trait;
use serde_json::Value;

use crate::commands::{
    Service, ADD_USER_TO_GROUP, CREATE_GROUP, CREATE_GROUP_RULES, DEACTIVATE_GROUP, FIND_ALL_GROUPS,
    FIND_GROUP_BY_CREATOR, FIND_GROUP_BY_ID, REMOVE_GROUP, REMOVE_USER_FROM_GROUP, UPDATE_GROUP,
    UPDATE_GROUP_RULES,
};
use crate::error::AppError;
use crate::groups::{
    dto::{GroupRules, UpdateGroupRequest},
    services,
};
use crate::state::AppState;
use crate::transport::{reply, server::CommandHandler, IdUpdate, RulesUpdate};
use crate::validation::{payload, reference, validated, Validate};

pub struct GroupCommands {
    state: AppState,
}

impl GroupCommands {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl CommandHandler for GroupCommands {
    fn service(&self) -> Service {
        Service::Group
    }

    async fn handle(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
        let state = &self.state;
        match cmd {
            CREATE_GROUP => reply(services::create_group(state, validated(data)?).await?),
            FIND_ALL_GROUPS => reply(services::find_all_groups(state).await?),
            FIND_GROUP_BY_ID => {
                let id: String = payload(data)?;
                reply(services::find_group_by_id(state, &id).await?)
            }
            FIND_GROUP_BY_CREATOR => {
                let created_by = reference(data).map_err(|e| AppError::Validation(e.to_string()))?;
                reply(services::find_groups_by_creator(state, &created_by).await?)
            }
            UPDATE_GROUP => {
                let IdUpdate { id, update } = payload::<IdUpdate<UpdateGroupRequest>>(data)?;
                update.validate()?;
                reply(services::update_group(state, &id, update).await?)
            }
            CREATE_GROUP_RULES => reply(services::create_group_rules(state, validated(data)?).await?),
            UPDATE_GROUP_RULES => {
                let RulesUpdate { id, rules } = payload::<RulesUpdate<GroupRules>>(data)?;
                reply(services::update_group_rules(state, &id, rules).await?)
            }
            ADD_USER_TO_GROUP => reply(services::add_user_to_group(state, validated(data)?).await?),
            REMOVE_USER_FROM_GROUP => {
                reply(services::remove_user_from_group(state, validated(data)?).await?)
            }
            REMOVE_GROUP => {
                let id: String = payload(data)?;
                services::remove_group(state, &id).await?;
                Ok(Value::Null)
            }
            DEACTIVATE_GROUP => {
                let id: String = payload(data)?;
                reply(services::deactivate_group(state, &id).await?)
            }
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}
