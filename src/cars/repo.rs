use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cars::dto::{CarRules, CarType, CreateCarRequest};
use crate::store::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub active: bool,
    #[serde(default)]
    pub car_rules: Option<CarRules>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Document for CarRecord {
    const COLLECTION: &'static str = "cars";
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCar {
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
}

impl From<CreateCarRequest> for NewCar {
    fn from(req: CreateCarRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            car_type: req.car_type,
            brand: req.brand,
            model: req.model,
            color: req.color,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
