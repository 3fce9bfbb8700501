use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::rules;
use crate::error::{Error, Result};
use crate::storage::traits::Storage;
use crate::types::{
    Agent, AgentId, Mission, MissionId, NewAgent, NewMission, NewTarget, Target, TargetId,
};

#[derive(Default)]
struct Inner {
    agents: BTreeMap<AgentId, Agent>,
    missions: BTreeMap<MissionId, Mission>,
    next_agent_id: AgentId,
    next_mission_id: MissionId,
    next_target_id: TargetId,
}

impl Inner {
    fn next_agent_id(&mut self) -> AgentId {
        self.next_agent_id += 1;
        self.next_agent_id
    }

    fn next_mission_id(&mut self) -> MissionId {
        self.next_mission_id += 1;
        self.next_mission_id
    }

    fn next_target_id(&mut self) -> TargetId {
        self.next_target_id += 1;
        self.next_target_id
    }

    fn mission_mut(&mut self, id: MissionId) -> Result<&mut Mission> {
        self.missions
            .get_mut(&id)
            .ok_or_else(|| mission_not_found(id))
    }
}

/// Store backed by process memory.
///
/// A single lock guards all tables, so every operation is atomic with respect
/// to every other one.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| Error::Internal("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| Error::Internal("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn create_agent(&self, agent: &NewAgent, breed_validation: bool) -> Result<Agent> {
        let mut inner = self.write()?;
        let id = inner.next_agent_id();
        let agent = Agent::from_new(id, agent.clone(), breed_validation);
        inner.agents.insert(id, agent.clone());
        Ok(agent)
    }

    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>> {
        Ok(self.read()?.agents.get(&id).cloned())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.read()?.agents.values().cloned().collect())
    }

    async fn update_agent_salary(&self, id: AgentId, salary: i32) -> Result<Agent> {
        let mut inner = self.write()?;
        let agent = inner
            .agents
            .get_mut(&id)
            .ok_or_else(|| agent_not_found(id))?;
        agent.salary = salary;
        Ok(agent.clone())
    }

    async fn delete_agent(&self, id: AgentId) -> Result<()> {
        let mut inner = self.write()?;
        inner.agents.remove(&id);
        for mission in inner.missions.values_mut() {
            if mission.agent_id == Some(id) {
                mission.agent_id = None;
            }
        }
        Ok(())
    }

    async fn create_mission(&self, mission: &NewMission) -> Result<Mission> {
        let mut inner = self.write()?;
        let id = inner.next_mission_id();
        let mut targets = Vec::with_capacity(mission.targets.len());
        for target in &mission.targets {
            let target_id = inner.next_target_id();
            targets.push(Target::from_new(target_id, id, target));
        }

        let mission = Mission {
            id,
            name: mission.name.clone(),
            agent_id: None,
            complete_state: false,
            targets,
        };
        inner.missions.insert(id, mission.clone());
        Ok(mission)
    }

    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        Ok(self.read()?.missions.get(&id).cloned())
    }

    async fn list_missions(&self) -> Result<Vec<Mission>> {
        Ok(self.read()?.missions.values().cloned().collect())
    }

    async fn assign_agent(&self, mission_id: MissionId, agent_id: AgentId) -> Result<Mission> {
        let mut inner = self.write()?;
        if !inner.agents.contains_key(&agent_id) {
            return Err(agent_not_found(agent_id));
        }
        if !inner.missions.contains_key(&mission_id) {
            return Err(mission_not_found(mission_id));
        }

        let active_elsewhere = inner
            .missions
            .values()
            .find(|m| m.id != mission_id && m.agent_id == Some(agent_id) && !m.complete_state)
            .map(|m| m.id);
        rules::check_assign(agent_id, mission_id, active_elsewhere)?;

        let mission = inner.mission_mut(mission_id)?;
        mission.agent_id = Some(agent_id);
        Ok(mission.clone())
    }

    async fn complete_mission(&self, id: MissionId) -> Result<Mission> {
        let mut inner = self.write()?;
        let mission = inner.mission_mut(id)?;
        mission.complete_state = true;
        Ok(mission.clone())
    }

    async fn delete_mission(&self, id: MissionId) -> Result<()> {
        let mut inner = self.write()?;
        let mission = inner.mission_mut(id)?;
        rules::check_delete_mission(id, mission.agent_id)?;
        inner.missions.remove(&id);
        Ok(())
    }

    async fn add_target(&self, mission_id: MissionId, target: &NewTarget) -> Result<Target> {
        let mut inner = self.write()?;
        {
            let mission = inner.mission_mut(mission_id)?;
            rules::check_add_target(mission.complete_state, &mission.targets, target)?;
        }
        let target_id = inner.next_target_id();
        let target = Target::from_new(target_id, mission_id, target);
        inner.mission_mut(mission_id)?.targets.push(target.clone());
        Ok(target)
    }

    async fn delete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()> {
        let mut inner = self.write()?;
        let mission = inner.mission_mut(mission_id)?;
        let target = mission
            .target(target_id)
            .ok_or_else(|| target_not_found(mission_id, target_id))?;
        rules::check_delete_target(target)?;
        mission.targets.retain(|t| t.id != target_id);
        Ok(())
    }

    async fn update_target_notes(
        &self,
        mission_id: MissionId,
        target_id: TargetId,
        notes: &str,
    ) -> Result<Target> {
        let mut inner = self.write()?;
        let mission = inner.mission_mut(mission_id)?;
        let mission_complete = mission.complete_state;
        let target = mission
            .targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .ok_or_else(|| target_not_found(mission_id, target_id))?;
        rules::check_update_notes(mission_complete, target)?;
        target.notes = notes.to_string();
        Ok(target.clone())
    }

    async fn complete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()> {
        let mut inner = self.write()?;
        let target = inner
            .mission_mut(mission_id)?
            .targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .ok_or_else(|| target_not_found(mission_id, target_id))?;
        target.complete_state = true;
        Ok(())
    }
}

fn agent_not_found(id: AgentId) -> Error {
    Error::not_found(format!("agent {}", id))
}

fn mission_not_found(id: MissionId) -> Error {
    Error::not_found(format!("mission {}", id))
}

fn target_not_found(mission_id: MissionId, target_id: TargetId) -> Error {
    Error::not_found(format!("target {} in mission {}", target_id, mission_id))
}
