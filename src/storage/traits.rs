use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Agent, AgentId, Mission, MissionId, NewAgent, NewMission, NewTarget, Target, TargetId,
};

/// Persistence for agents, missions and targets.
///
/// Operations that enforce a rule from `engine::rules` perform the check and the
/// write as one atomic unit. Missing rows surface as `Error::NotFound`, rule
/// violations as `Error::Conflict` or `Error::Validation`.
#[async_trait]
pub trait Storage: Send + Sync {
    // Agent operations
    async fn create_agent(&self, agent: &NewAgent, breed_validation: bool) -> Result<Agent>;
    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>>;
    async fn list_agents(&self) -> Result<Vec<Agent>>;
    async fn update_agent_salary(&self, id: AgentId, salary: i32) -> Result<Agent>;
    /// Unconditional. Missions held by the agent become unassigned.
    async fn delete_agent(&self, id: AgentId) -> Result<()>;

    // Mission operations
    async fn create_mission(&self, mission: &NewMission) -> Result<Mission>;
    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>>;
    async fn list_missions(&self) -> Result<Vec<Mission>>;
    async fn assign_agent(&self, mission_id: MissionId, agent_id: AgentId) -> Result<Mission>;
    async fn complete_mission(&self, id: MissionId) -> Result<Mission>;
    /// Rejected while an agent is assigned; removes the mission's targets with it.
    async fn delete_mission(&self, id: MissionId) -> Result<()>;

    // Target operations
    async fn add_target(&self, mission_id: MissionId, target: &NewTarget) -> Result<Target>;
    async fn delete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()>;
    async fn update_target_notes(
        &self,
        mission_id: MissionId,
        target_id: TargetId,
        notes: &str,
    ) -> Result<Target>;
    async fn complete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()>;
}
