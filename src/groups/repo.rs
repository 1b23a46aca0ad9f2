use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::groups::dto::{CreateGroupRequest, GroupRules};
use crate::store::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: String,
    #[serde(default)]
    pub group_rules: Option<GroupRules>,
    /// Member user ids, without duplicates.
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub bookings: Vec<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Document for GroupRecord {
    const COLLECTION: &'static str = "groups";
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub users: Vec<String>,
    pub bookings: Vec<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CreateGroupRequest> for NewGroup {
    fn from(req: CreateGroupRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            created_by: req.created_by,
            users: Vec::new(),
            bookings: Vec::new(),
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
