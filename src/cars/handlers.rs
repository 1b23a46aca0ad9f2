use axum::async_trait;
use serde_json::Value;

use crate::cars::{
    dto::{CarRules, UpdateCarRequest},
    services,
};
use crate::commands::{
    Service, CREATE_CAR, CREATE_CAR_RULES, DEACTIVATE_CAR, FIND_ALL_CARS, FIND_CAR_BY_ID,
    FIND_CAR_BY_TYPE, REMOVE_CAR, UPDATE_CAR, UPDATE_CAR_RULES,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::transport::{reply, server::CommandHandler, IdUpdate, RulesUpdate};
use crate::validation::{payload, validated, Validate};

pub struct CarCommands {
    state: AppState,
}

impl CarCommands {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl CommandHandler for CarCommands {
    fn service(&self) -> Service {
        Service::Car
    }

    async fn handle(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
        let state = &self.state;
        match cmd {
            CREATE_CAR => reply(services::create_car(state, validated(data)?).await?),
            FIND_ALL_CARS => reply(services::find_all_cars(state).await?),
            FIND_CAR_BY_ID => {
                let id: String = payload(data)?;
                reply(services::find_car_by_id(state, &id).await?)
            }
            FIND_CAR_BY_TYPE => {
                let car_type: String = payload(data)?;
                reply(services::find_cars_by_type(state, &car_type).await?)
            }
            UPDATE_CAR => {
                let IdUpdate { id, update } = payload::<IdUpdate<UpdateCarRequest>>(data)?;
                update.validate()?;
                reply(services::update_car(state, &id, update).await?)
            }
            CREATE_CAR_RULES => reply(services::create_car_rules(state, validated(data)?).await?),
            UPDATE_CAR_RULES => {
                let RulesUpdate { id, rules } = payload::<RulesUpdate<CarRules>>(data)?;
                reply(services::update_car_rules(state, &id, rules).await?)
            }
            REMOVE_CAR => {
                let id: String = payload(data)?;
                services::remove_car(state, &id).await?;
                Ok(Value::Null)
            }
            DEACTIVATE_CAR => {
                let id: String = payload(data)?;
                reply(services::deactivate_car(state, &id).await?)
            }
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}
