use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::engine::AgencyService;
use crate::types::{
    Agent, AgentId, AssignAgent, Mission, MissionId, NewAgent, NewMission, NewTarget,
    NotesUpdate, SalaryUpdate, Target, TargetId,
};

type Service = State<Arc<AgencyService>>;
type IdPath<T> = Result<Path<T>, PathRejection>;
type Body<T> = Result<Json<T>, JsonRejection>;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Agents

pub async fn create_agent(
    State(service): Service,
    body: Body<NewAgent>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let Json(agent) = body?;
    let created = service.create_agent(agent).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_agent(
    State(service): Service,
    path: IdPath<AgentId>,
    body: Body<SalaryUpdate>,
) -> Result<Json<Agent>, ApiError> {
    let Path(id) = path?;
    let Json(update) = body?;
    Ok(Json(service.update_salary(id, update.salary).await?))
}

pub async fn delete_agent(
    State(service): Service,
    path: IdPath<AgentId>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    service.delete_agent(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_agent(
    State(service): Service,
    path: IdPath<AgentId>,
) -> Result<Json<Agent>, ApiError> {
    let Path(id) = path?;
    Ok(Json(service.get_agent(id).await?))
}

pub async fn list_agents(State(service): Service) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(service.list_agents().await?))
}

// Missions

pub async fn create_mission(
    State(service): Service,
    body: Body<NewMission>,
) -> Result<(StatusCode, Json<Mission>), ApiError> {
    let Json(mission) = body?;
    let created = service.create_mission(mission).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn assign_agent(
    State(service): Service,
    path: IdPath<MissionId>,
    body: Body<AssignAgent>,
) -> Result<Json<Mission>, ApiError> {
    let Path(mission_id) = path?;
    let Json(assign) = body?;
    Ok(Json(service.assign_agent(mission_id, assign.agent_id).await?))
}

pub async fn complete_mission(
    State(service): Service,
    path: IdPath<MissionId>,
) -> Result<Json<Mission>, ApiError> {
    let Path(id) = path?;
    Ok(Json(service.complete_mission(id).await?))
}

pub async fn delete_mission(
    State(service): Service,
    path: IdPath<MissionId>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    service.delete_mission(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_mission(
    State(service): Service,
    path: IdPath<MissionId>,
) -> Result<Json<Mission>, ApiError> {
    let Path(id) = path?;
    Ok(Json(service.get_mission(id).await?))
}

pub async fn list_missions(State(service): Service) -> Result<Json<Vec<Mission>>, ApiError> {
    Ok(Json(service.list_missions().await?))
}

// Targets

pub async fn add_target(
    State(service): Service,
    path: IdPath<MissionId>,
    body: Body<NewTarget>,
) -> Result<(StatusCode, Json<Target>), ApiError> {
    let Path(mission_id) = path?;
    let Json(target) = body?;
    let created = service.add_target(mission_id, target).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_target(
    State(service): Service,
    path: IdPath<(MissionId, TargetId)>,
) -> Result<StatusCode, ApiError> {
    let Path((mission_id, target_id)) = path?;
    service.delete_target(mission_id, target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_target_notes(
    State(service): Service,
    path: IdPath<(MissionId, TargetId)>,
    body: Body<NotesUpdate>,
) -> Result<Json<Target>, ApiError> {
    let Path((mission_id, target_id)) = path?;
    let Json(update) = body?;
    let target = service
        .update_target_notes(mission_id, target_id, &update.notes)
        .await?;
    Ok(Json(target))
}

pub async fn complete_target(
    State(service): Service,
    path: IdPath<(MissionId, TargetId)>,
) -> Result<StatusCode, ApiError> {
    let Path((mission_id, target_id)) = path?;
    service.complete_target(mission_id, target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
