use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cars::repo::CarRecord;
use crate::error::AppError;
use crate::validation::{require_optional_text, require_text, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarType {
    Sedan,
    Suv,
    Hatchback,
    Coupe,
    Convertible,
    Van,
    Truck,
}

impl CarType {
    pub const ALL: [CarType; 7] = [
        CarType::Sedan,
        CarType::Suv,
        CarType::Hatchback,
        CarType::Coupe,
        CarType::Convertible,
        CarType::Van,
        CarType::Truck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CarType::Sedan => "SEDAN",
            CarType::Suv => "SUV",
            CarType::Hatchback => "HATCHBACK",
            CarType::Coupe => "COUPE",
            CarType::Convertible => "CONVERTIBLE",
            CarType::Van => "VAN",
            CarType::Truck => "TRUCK",
        }
    }
}

impl fmt::Display for CarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CarType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("unknown car type: {s}")))
    }
}

/// Verification a renter must pass before booking the car.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CarRules {
    pub phone_verification: bool,
    pub email_verification: bool,
    pub license_verification: bool,
    pub physical_verification: bool,
    pub reference_verification: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCarRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub brand: String,
    pub model: String,
    pub color: String,
}

impl Validate for CreateCarRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("brand", &self.brand)?;
        require_text("model", &self.model)?;
        require_text("color", &self.color)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCarRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub car_type: Option<CarType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl Validate for UpdateCarRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_optional_text("name", self.name.as_deref())?;
        require_optional_text("description", self.description.as_deref())?;
        require_optional_text("brand", self.brand.as_deref())?;
        require_optional_text("model", self.model.as_deref())?;
        require_optional_text("color", self.color.as_deref())
    }
}

/// Attach rules to an existing car. Flags are listed inline so unknown keys
/// are rejected for the whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCarRulesRequest {
    pub car_id: String,
    #[serde(default)]
    pub phone_verification: bool,
    #[serde(default)]
    pub email_verification: bool,
    #[serde(default)]
    pub license_verification: bool,
    #[serde(default)]
    pub physical_verification: bool,
    #[serde(default)]
    pub reference_verification: bool,
}

impl CreateCarRulesRequest {
    pub fn rules(&self) -> CarRules {
        CarRules {
            phone_verification: self.phone_verification,
            email_verification: self.email_verification,
            license_verification: self.license_verification,
            physical_verification: self.physical_verification,
            reference_verification: self.reference_verification,
        }
    }
}

impl Validate for CreateCarRulesRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("carId", &self.car_id)
    }
}

impl Validate for CarRules {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<CarRecord> for CarResponse {
    fn from(c: CarRecord) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            car_type: c.car_type,
            brand: c.brand,
            model: c.model,
            color: c.color,
            active: c.active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarWithRulesResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub car_rules: CarRules,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<CarRecord> for CarWithRulesResponse {
    fn from(c: CarRecord) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            car_type: c.car_type,
            brand: c.brand,
            model: c.model,
            color: c.color,
            car_rules: c.car_rules.unwrap_or_default(),
            active: c.active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
