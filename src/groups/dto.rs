use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::groups::repo::GroupRecord;
use crate::validation::{reference, require_optional_text, require_text, Validate};

/// Verification every member of the group must pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GroupRules {
    pub phone_verification: bool,
    pub email_verification: bool,
    pub license_verification: bool,
    pub physical_verification: bool,
    pub reference_verification: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "reference")]
    pub created_by: String,
}

impl Validate for CreateGroupRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("createdBy", &self.created_by)
    }
}

/// Membership and rules have their own commands and are not patchable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl Validate for UpdateGroupRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_optional_text("name", self.name.as_deref())?;
        require_optional_text("description", self.description.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGroupRulesRequest {
    pub group_id: String,
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

impl CreateGroupRulesRequest {
    pub fn rules(&self) -> GroupRules {
        GroupRules {
            phone_verification: self.phone_verification,
            email_verification: self.email_verification,
            license_verification: self.license_verification,
            physical_verification: self.physical_verification,
            reference_verification: self.reference_verification,
        }
    }
}

impl Validate for CreateGroupRulesRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("groupId", &self.group_id)
    }
}

impl Validate for GroupRules {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Payload of `add_user_to_group` and `remove_user_from_group`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MembershipRequest {
    pub group_id: String,
    #[serde(deserialize_with = "reference")]
    pub user_id: String,
}

impl Validate for MembershipRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("groupId", &self.group_id)?;
        require_text("userId", &self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub users: Vec<String>,
    pub bookings: Vec<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<GroupRecord> for GroupResponse {
    fn from(g: GroupRecord) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            created_by: g.created_by,
            users: g.users,
            bookings: g.bookings,
            active: g.active,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupWithRulesResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub group_rules: GroupRules,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<GroupRecord> for GroupWithRulesResponse {
    fn from(g: GroupRecord) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            group_rules: g.group_rules.unwrap_or_default(),
            active: g.active,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupWithMembersResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub users: Vec<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<GroupRecord> for GroupWithMembersResponse {
    fn from(g: GroupRecord) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            users: g.users,
            active: g.active,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}
