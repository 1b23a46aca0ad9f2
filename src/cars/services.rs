use tracing::{info, instrument};

use crate::cars::dto::{
    CarResponse, CarRules, CarType, CarWithRulesResponse, CreateCarRequest, CreateCarRulesRequest,
    UpdateCarRequest,
};
use crate::cars::repo::{CarRecord, NewCar};
use crate::error::{parse_id, AppError};
use crate::state::AppState;
use crate::store::{Filter, Update};

const ENTITY: &str = "Car";

async fn apply(state: &AppState, id: &str, update: Update) -> Result<CarRecord, AppError> {
    let car_id = parse_id(ENTITY, id)?;
    state
        .cars()
        .update_by_id(car_id, &update)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))
}

fn rules_update(rules: &CarRules) -> Result<Update, AppError> {
    let rules = serde_json::to_value(rules).map_err(|e| AppError::Internal(e.into()))?;
    Ok(Update::new().set("carRules", rules).touch())
}

#[instrument(skip(state, req))]
pub async fn create_car(state: &AppState, req: CreateCarRequest) -> Result<CarResponse, AppError> {
    let car = state.cars().insert(&NewCar::from(req)).await?;
    info!(car_id = %car.id, car_type = %car.car_type, "car created");
    Ok(car.into())
}

#[instrument(skip(state))]
pub async fn find_all_cars(state: &AppState) -> Result<Vec<CarResponse>, AppError> {
    let cars = state.cars().find_all().await?;
    Ok(cars.into_iter().map(CarResponse::from).collect())
}

#[instrument(skip(state))]
pub async fn find_car_by_id(state: &AppState, id: &str) -> Result<CarResponse, AppError> {
    let car_id = parse_id(ENTITY, id)?;
    state
        .cars()
        .find_by_id(car_id)
        .await?
        .map(CarResponse::from)
        .ok_or_else(|| AppError::not_found(ENTITY, id))
}

#[instrument(skip(state))]
pub async fn find_cars_by_type(state: &AppState, car_type: &str) -> Result<Vec<CarResponse>, AppError> {
    let car_type: CarType = car_type.parse()?;
    let cars = state
        .cars()
        .find_many(&Filter::all().eq("type", car_type.as_str()))
        .await?;
    Ok(cars.into_iter().map(CarResponse::from).collect())
}

#[instrument(skip(state, req))]
pub async fn update_car(state: &AppState, id: &str, req: UpdateCarRequest) -> Result<CarResponse, AppError> {
    let patch = serde_json::to_value(&req).map_err(|e| AppError::Internal(e.into()))?;
    let car = apply(state, id, Update::new().merge(patch)?.touch()).await?;
    info!(car_id = %car.id, "car updated");
    Ok(car.into())
}

#[instrument(skip(state, req))]
pub async fn create_car_rules(
    state: &AppState,
    req: CreateCarRulesRequest,
) -> Result<CarWithRulesResponse, AppError> {
    let car = apply(state, &req.car_id, rules_update(&req.rules())?).await?;
    info!(car_id = %car.id, "car rules set");
    Ok(car.into())
}

#[instrument(skip(state, rules))]
pub async fn update_car_rules(
    state: &AppState,
    id: &str,
    rules: CarRules,
) -> Result<CarWithRulesResponse, AppError> {
    let car = apply(state, id, rules_update(&rules)?).await?;
    info!(car_id = %car.id, "car rules replaced");
    Ok(car.into())
}

#[instrument(skip(state))]
pub async fn remove_car(state: &AppState, id: &str) -> Result<(), AppError> {
    let car_id = parse_id(ENTITY, id)?;
    state
        .cars()
        .delete_by_id(car_id)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%car_id, "car removed");
    Ok(())
}

#[instrument(skip(state))]
pub async fn deactivate_car(state: &AppState, id: &str) -> Result<CarResponse, AppError> {
    let car = apply(state, id, Update::new().set("active", false).touch()).await?;
    info!(car_id = %car.id, "car deactivated");
    Ok(car.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(name: &str, car_type: CarType) -> CreateCarRequest {
        CreateCarRequest {
            name: name.into(),
            description: "Reliable daily driver".into(),
            car_type,
            brand: "Toyota".into(),
            model: "Corolla".into(),
            color: "Blue".into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let state = AppState::fake().await;
        let req = car("Corolla", CarType::Sedan);
        let created = create_car(&state, req.clone()).await.unwrap();
        assert!(created.active);

        let found = find_car_by_id(&state, &created.id.to_string()).await.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.model, req.model);
        assert_eq!(found.car_type, CarType::Sedan);
    }

    #[tokio::test]
    async fn find_by_type_filters_and_validates() {
        let state = AppState::fake().await;
        create_car(&state, car("a", CarType::Suv)).await.unwrap();
        create_car(&state, car("b", CarType::Van)).await.unwrap();
        create_car(&state, car("c", CarType::Suv)).await.unwrap();

        let suvs = find_cars_by_type(&state, "SUV").await.unwrap();
        assert_eq!(suvs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), ["a", "c"]);
        assert!(find_cars_by_type(&state, "TRUCK").await.unwrap().is_empty());
        assert!(matches!(find_cars_by_type(&state, "BOAT").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn rules_are_created_then_replaced() {
        let state = AppState::fake().await;
        let created = create_car(&state, car("a", CarType::Coupe)).await.unwrap();
        let id = created.id.to_string();

        let with_rules = create_car_rules(
            &state,
            CreateCarRulesRequest {
                car_id: id.clone(),
                phone_verification: true,
                license_verification: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(with_rules.car_rules.phone_verification);
        assert!(with_rules.car_rules.license_verification);
        assert!(with_rules.active);
        assert_eq!(with_rules.created_at, created.created_at);
        assert!(with_rules.updated_at.is_some());

        let replaced = update_car_rules(
            &state,
            &id,
            CarRules {
                email_verification: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(
            replaced.car_rules,
            CarRules {
                email_verification: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn update_and_deactivate() {
        let state = AppState::fake().await;
        let id = create_car(&state, car("a", CarType::Truck)).await.unwrap().id.to_string();

        let updated = update_car(
            &state,
            &id,
            UpdateCarRequest {
                color: Some("Red".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.color, "Red");
        assert_eq!(updated.brand, "Toyota");

        let deactivated = deactivate_car(&state, &id).await.unwrap();
        assert!(!deactivated.active);
    }

    #[tokio::test]
    async fn absent_cars_are_not_found() {
        let state = AppState::fake().await;
        let id = uuid::Uuid::new_v4().to_string();
        assert!(matches!(find_car_by_id(&state, &id).await, Err(AppError::NotFound(_))));
        assert!(matches!(deactivate_car(&state, "42").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            update_car_rules(&state, &id, CarRules::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(remove_car(&state, &id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn second_remove_is_not_found() {
        let state = AppState::fake().await;
        let id = create_car(&state, car("a", CarType::Van)).await.unwrap().id.to_string();
        remove_car(&state, &id).await.unwrap();
        assert!(matches!(remove_car(&state, &id).await, Err(AppError::NotFound(_))));
    }
}
