use tracing::{info, instrument};

use crate::error::{parse_id, AppError};
use crate::groups::dto::{
    CreateGroupRequest, CreateGroupRulesRequest, GroupResponse, GroupRules, GroupWithMembersResponse,
    GroupWithRulesResponse, MembershipRequest, UpdateGroupRequest,
};
use crate::groups::repo::{GroupRecord, NewGroup};
use crate::state::AppState;
use crate::store::{Filter, Update};

const ENTITY: &str = "Group";

async fn apply(state: &AppState, id: &str, update: Update) -> Result<GroupRecord, AppError> {
    let group_id = parse_id(ENTITY, id)?;
    state
        .groups()
        .update_by_id(group_id, &update.touch())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))
}

fn rules_update(rules: &GroupRules) -> Result<Update, AppError> {
    let rules = serde_json::to_value(rules).map_err(|e| AppError::Internal(e.into()))?;
    Ok(Update::new().set("groupRules", rules))
}

#[instrument(skip(state, req), fields(created_by = %req.created_by))]
pub async fn create_group(state: &AppState, req: CreateGroupRequest) -> Result<GroupResponse, AppError> {
    let group = state.groups().insert(&NewGroup::from(req)).await?;
    info!(group_id = %group.id, "group created");
    Ok(group.into())
}

#[instrument(skip(state))]
pub async fn find_all_groups(state: &AppState) -> Result<Vec<GroupResponse>, AppError> {
    let groups = state.groups().find_all().await?;
    Ok(groups.into_iter().map(GroupResponse::from).collect())
}

#[instrument(skip(state))]
pub async fn find_group_by_id(state: &AppState, id: &str) -> Result<GroupResponse, AppError> {
    let group_id = parse_id(ENTITY, id)?;
    state
        .groups()
        .find_by_id(group_id)
        .await?
        .map(GroupResponse::from)
        .ok_or_else(|| AppError::not_found(ENTITY, id))
}

#[instrument(skip(state))]
pub async fn find_groups_by_creator(
    state: &AppState,
    created_by: &str,
) -> Result<Vec<GroupResponse>, AppError> {
    let groups = state
        .groups()
        .find_many(&Filter::all().eq("createdBy", created_by.trim()))
        .await?;
    Ok(groups.into_iter().map(GroupResponse::from).collect())
}

#[instrument(skip(state, req))]
pub async fn update_group(
    state: &AppState,
    id: &str,
    req: UpdateGroupRequest,
) -> Result<GroupResponse, AppError> {
    let patch = serde_json::to_value(&req).map_err(|e| AppError::Internal(e.into()))?;
    let group = apply(state, id, Update::new().merge(patch)?).await?;
    info!(group_id = %group.id, "group updated");
    Ok(group.into())
}

#[instrument(skip(state, req))]
pub async fn create_group_rules(
    state: &AppState,
    req: CreateGroupRulesRequest,
) -> Result<GroupWithRulesResponse, AppError> {
    let group = apply(state, &req.group_id, rules_update(&req.rules())?).await?;
    info!(group_id = %group.id, "group rules set");
    Ok(group.into())
}

#[instrument(skip(state, rules))]
pub async fn update_group_rules(
    state: &AppState,
    id: &str,
    rules: GroupRules,
) -> Result<GroupWithRulesResponse, AppError> {
    let group = apply(state, id, rules_update(&rules)?).await?;
    info!(group_id = %group.id, "group rules replaced");
    Ok(group.into())
}

/// Set semantics: adding a member twice leaves a single entry.
#[instrument(skip(state, req), fields(group_id = %req.group_id, user_id = %req.user_id))]
pub async fn add_user_to_group(
    state: &AppState,
    req: MembershipRequest,
) -> Result<GroupWithMembersResponse, AppError> {
    let update = Update::new().add_to_set("users", req.user_id.as_str());
    let group = apply(state, &req.group_id, update).await?;
    info!(members = group.users.len(), "user added to group");
    Ok(group.into())
}

#[instrument(skip(state, req), fields(group_id = %req.group_id, user_id = %req.user_id))]
pub async fn remove_user_from_group(
    state: &AppState,
    req: MembershipRequest,
) -> Result<GroupWithMembersResponse, AppError> {
    let update = Update::new().pull("users", req.user_id.as_str());
    let group = apply(state, &req.group_id, update).await?;
    info!(members = group.users.len(), "user removed from group");
    Ok(group.into())
}

#[instrument(skip(state))]
pub async fn remove_group(state: &AppState, id: &str) -> Result<(), AppError> {
    let group_id = parse_id(ENTITY, id)?;
    state
        .groups()
        .delete_by_id(group_id)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%group_id, "group removed");
    Ok(())
}

#[instrument(skip(state))]
pub async fn deactivate_group(state: &AppState, id: &str) -> Result<GroupResponse, AppError> {
    let group = apply(state, id, Update::new().set("active", false)).await?;
    info!(group_id = %group.id, "group deactivated");
    Ok(group.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(created_by: &str) -> CreateGroupRequest {
        CreateGroupRequest {
            name: "Weekend drivers".into(),
            description: "Shared SUVs for weekend trips".into(),
            created_by: created_by.into(),
        }
    }

    fn member(group_id: &str, user_id: &str) -> MembershipRequest {
        MembershipRequest {
            group_id: group_id.into(),
            user_id: user_id.into(),
        }
    }

    #[tokio::test]
    async fn adding_twice_keeps_one_entry() {
        let state = AppState::fake().await;
        let id = create_group(&state, group("1")).await.unwrap().id.to_string();

        add_user_to_group(&state, member(&id, "7")).await.unwrap();
        let after = add_user_to_group(&state, member(&id, "7")).await.unwrap();
        assert_eq!(after.users, vec!["7".to_string()]);

        let after = add_user_to_group(&state, member(&id, "8")).await.unwrap();
        assert_eq!(after.users.len(), 2);

        let after = remove_user_from_group(&state, member(&id, "7")).await.unwrap();
        assert_eq!(after.users, vec!["8".to_string()]);

        let after = remove_user_from_group(&state, member(&id, "7")).await.unwrap();
        assert_eq!(after.users, vec!["8".to_string()]);
    }

    #[tokio::test]
    async fn membership_on_absent_group_is_not_found() {
        let state = AppState::fake().await;
        let id = uuid::Uuid::new_v4().to_string();
        assert!(matches!(
            add_user_to_group(&state, member(&id, "1")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            remove_user_from_group(&state, member("nope", "1")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let state = AppState::fake().await;
        let req = group("5");
        let created = create_group(&state, req.clone()).await.unwrap();
        assert!(created.active);
        assert!(created.users.is_empty());

        let found = find_group_by_id(&state, &created.id.to_string()).await.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.name, req.name);
        assert_eq!(found.description, req.description);
        assert_eq!(found.created_by, req.created_by);
    }

    #[tokio::test]
    async fn find_by_creator_filters() {
        let state = AppState::fake().await;
        create_group(&state, group("1")).await.unwrap();
        create_group(&state, group("2")).await.unwrap();

        let mine = find_groups_by_creator(&state, "1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].created_by, "1");
        assert_eq!(find_all_groups(&state).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rules_update_and_deactivate() {
        let state = AppState::fake().await;
        let id = create_group(&state, group("1")).await.unwrap().id.to_string();

        let ruled = create_group_rules(
            &state,
            CreateGroupRulesRequest {
                group_id: id.clone(),
                license_verification: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(ruled.group_rules.license_verification);
        assert!(ruled.active);
        assert!(ruled.updated_at.is_some());

        let replaced = update_group_rules(&state, &id, GroupRules::default()).await.unwrap();
        assert_eq!(replaced.group_rules, GroupRules::default());

        let renamed = update_group(
            &state,
            &id,
            UpdateGroupRequest {
                name: Some("Commuters".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Commuters");
        assert!(renamed.updated_at.is_some());

        let deactivated = deactivate_group(&state, &id).await.unwrap();
        assert!(!deactivated.active);
    }

    #[tokio::test]
    async fn second_remove_is_not_found() {
        let state = AppState::fake().await;
        let id = create_group(&state, group("1")).await.unwrap().id.to_string();
        remove_group(&state, &id).await.unwrap();
        assert!(matches!(remove_group(&state, &id).await, Err(AppError::NotFound(_))));
        assert!(matches!(deactivate_group(&state, &id).await, Err(AppError::NotFound(_))));
    }
}
