//! Command names shared by the gateway and the backend listeners, and the
//! process-wide table that routes each command to the service owning it.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::error::AppError;

/// Backend services reachable from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    User,
    Car,
    Booking,
    Group,
}

impl Service {
    pub const ALL: [Service; 4] = [Service::User, Service::Car, Service::Booking, Service::Group];

    pub fn name(self) -> &'static str {
        match self {
            Service::User => "user-service",
            Service::Car => "car-service",
            Service::Booking => "booking-service",
            Service::Group => "group-service",
        }
    }

    /// Commands this service answers.
    pub fn commands(self) -> &'static [&'static str] {
        match self {
            Service::User => USER_COMMANDS,
            Service::Car => CAR_COMMANDS,
            Service::Booking => BOOKING_COMMANDS,
            Service::Group => GROUP_COMMANDS,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const CREATE_USER: &str = "create_user";
pub const FIND_ALL_USERS: &str = "find_all_users";
pub const FIND_USER_BY_ID: &str = "find_user_by_id";
pub const FIND_USER_BY_EMAIL: &str = "find_user_by_email";
pub const UPDATE_USER: &str = "update_user";
pub const REMOVE_USER: &str = "remove_user";
pub const DEACTIVATE_USER: &str = "deactivate_user";

pub const CREATE_CAR: &str = "create_car";
pub const FIND_ALL_CARS: &str = "find_all_cars";
pub const FIND_CAR_BY_ID: &str = "find_car_by_id";
pub const FIND_CAR_BY_TYPE: &str = "find_car_by_type";
pub const UPDATE_CAR: &str = "update_car";
pub const CREATE_CAR_RULES: &str = "create_car_rules";
pub const UPDATE_CAR_RULES: &str = "update_car_rules";
pub const REMOVE_CAR: &str = "remove_car";
pub const DEACTIVATE_CAR: &str = "deactivate_car";

pub const CREATE_BOOKING: &str = "create_booking";
pub const FIND_ALL_BOOKINGS: &str = "find_all_bookings";
pub const FIND_BOOKING_BY_ID: &str = "find_booking_by_id";
pub const FIND_BOOKING_BY_USER_ID: &str = "find_booking_by_userId";
pub const UPDATE_BOOKING: &str = "update_booking";
pub const CANCEL_BOOKING: &str = "cancel_booking";
pub const END_BOOKING: &str = "end_booking";
pub const REMOVE_BOOKING: &str = "remove_booking";

pub const CREATE_GROUP: &str = "create_group";
pub const FIND_ALL_GROUPS: &str = "find_all_groups";
pub const FIND_GROUP_BY_ID: &str = "find_group_by_id";
pub const FIND_GROUP_BY_CREATOR: &str = "find_group_by_creator";
pub const UPDATE_GROUP: &str = "update_group";
pub const CREATE_GROUP_RULES: &str = "create_group_rules";
pub const UPDATE_GROUP_RULES: &str = "update_group_rules";
pub const ADD_USER_TO_GROUP: &str = "add_user_to_group";
pub const REMOVE_USER_FROM_GROUP: &str = "remove_user_from_group";
pub const REMOVE_GROUP: &str = "remove_group";
pub const DEACTIVATE_GROUP: &str = "deactivate_group";

const USER_COMMANDS: &[&str] = &[
    CREATE_USER,
    FIND_ALL_USERS,
    FIND_USER_BY_ID,
    FIND_USER_BY_EMAIL,
    UPDATE_USER,
    REMOVE_USER,
    DEACTIVATE_USER,
];

const CAR_COMMANDS: &[&str] = &[
    CREATE_CAR,
    FIND_ALL_CARS,
    FIND_CAR_BY_ID,
    FIND_CAR_BY_TYPE,
    UPDATE_CAR,
    CREATE_CAR_RULES,
    UPDATE_CAR_RULES,
    REMOVE_CAR,
    DEACTIVATE_CAR,
];

const BOOKING_COMMANDS: &[&str] = &[
    CREATE_BOOKING,
    FIND_ALL_BOOKINGS,
    FIND_BOOKING_BY_ID,
    FIND_BOOKING_BY_USER_ID,
    UPDATE_BOOKING,
    CANCEL_BOOKING,
    END_BOOKING,
    REMOVE_BOOKING,
];

const GROUP_COMMANDS: &[&str] = &[
    CREATE_GROUP,
    FIND_ALL_GROUPS,
    FIND_GROUP_BY_ID,
    FIND_GROUP_BY_CREATOR,
    UPDATE_GROUP,
    CREATE_GROUP_RULES,
    UPDATE_GROUP_RULES,
    ADD_USER_TO_GROUP,
    REMOVE_USER_FROM_GROUP,
    REMOVE_GROUP,
    DEACTIVATE_GROUP,
];

lazy_static! {
    static ref COMMAND_TABLE: HashMap<&'static str, Service> = Service::ALL
        .iter()
        .flat_map(|&service| service.commands().iter().map(move |&cmd| (cmd, service)))
        .collect();
}

/// Resolve the service that owns `cmd`.
pub fn resolve(cmd: &str) -> Result<Service, AppError> {
    COMMAND_TABLE
        .get(cmd)
        .copied()
        .ok_or_else(|| AppError::UnknownCommand(cmd.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_routes_to_its_owner() {
        for service in Service::ALL {
            for cmd in service.commands() {
                assert_eq!(resolve(cmd).unwrap(), service, "{cmd}");
            }
        }
    }

    #[test]
    fn command_names_are_unique_across_services() {
        let total: usize = Service::ALL.iter().map(|s| s.commands().len()).sum();
        assert_eq!(COMMAND_TABLE.len(), total);
        assert_eq!(total, 35);
    }

    #[test]
    fn unknown_command_is_rejected() {
        for cmd in ["", "create_users", "CREATE_USER", "drop_database"] {
            match resolve(cmd) {
                Err(AppError::UnknownCommand(name)) => assert_eq!(name, cmd),
                other => panic!("expected UnknownCommand for {cmd:?}, got {other:?}"),
            }
        }
    }
}
