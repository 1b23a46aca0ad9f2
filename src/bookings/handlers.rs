use axum::async_trait;
use serde_json::Value;

use crate::bookings::{dto::UpdateBookingRequest, services};
use crate::commands::{
    Service, CANCEL_BOOKING, CREATE_BOOKING, END_BOOKING, FIND_ALL_BOOKINGS, FIND_BOOKING_BY_ID,
    FIND_BOOKING_BY_USER_ID, REMOVE_BOOKING, UPDATE_BOOKING,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::transport::{reply, server::CommandHandler, IdUpdate};
use crate::validation::{payload, reference, validated, Validate};

pub struct BookingCommands {
    state: AppState,
}

impl BookingCommands {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl CommandHandler for BookingCommands {
    fn service(&self) -> Service {
        Service::Booking
    }

    async fn handle(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
        let state = &self.state;
        match cmd {
            CREATE_BOOKING => reply(services::create_booking(state, validated(data)?).await?),
            FIND_ALL_BOOKINGS => reply(services::find_all_bookings(state).await?),
            FIND_BOOKING_BY_ID => {
                let id: String = payload(data)?;
                reply(services::find_booking_by_id(state, &id).await?)
            }
            FIND_BOOKING_BY_USER_ID => {
                let user_id = reference(data).map_err(|e| AppError::Validation(e.to_string()))?;
                reply(services::find_bookings_by_user_id(state, &user_id).await?)
            }
            UPDATE_BOOKING => {
                let IdUpdate { id, update } = payload::<IdUpdate<UpdateBookingRequest>>(data)?;
                update.validate()?;
                reply(services::update_booking(state, &id, update).await?)
            }
            CANCEL_BOOKING => reply(services::cancel_booking(state, validated(data)?).await?),
            END_BOOKING => reply(services::end_booking(state, validated(data)?).await?),
            REMOVE_BOOKING => {
                let id: String = payload(data)?;
                services::remove_booking(state, &id).await?;
                Ok(Value::Null)
            }
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}
