use serde::{Deserialize, Serialize};

use super::{AgentId, MissionId, TargetId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    pub agent_id: Option<AgentId>,
    pub complete_state: bool,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub mission_id: MissionId,
    pub name: String,
    pub country: String,
    pub notes: String,
    pub complete_state: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMission {
    pub name: String,
    pub targets: Vec<NewTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTarget {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignAgent {
    #[serde(alias = "agentId")]
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesUpdate {
    pub notes: String,
}

impl Mission {
    /// A mission is active while it has an assignee and is not complete.
    pub fn is_active(&self) -> bool {
        self.agent_id.is_some() && !self.complete_state
    }

    pub fn target(&self, target_id: TargetId) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == target_id)
    }
}

impl Target {
    pub fn from_new(id: TargetId, mission_id: MissionId, new: &NewTarget) -> Self {
        Self {
            id,
            mission_id,
            name: new.name.clone(),
            country: new.country.clone(),
            notes: new.notes.clone(),
            complete_state: false,
        }
    }

    pub fn matches(&self, other: &NewTarget) -> bool {
        self.name == other.name && self.country == other.country && self.notes == other.notes
    }
}
