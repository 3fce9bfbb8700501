//! Mission and target consistency rules.
//!
//! Every function here is a pure check over a snapshot of the rows involved.
//! Storage backends load that snapshot inside the same atomic unit that
//! performs the write, so a passing check cannot be invalidated before commit.

use crate::error::{Error, Result};
use crate::types::{
    AgentId, MissionId, NewAgent, NewMission, NewTarget, Target, MAX_TARGETS, MIN_TARGETS,
};

pub fn validate_new_agent(agent: &NewAgent) -> Result<()> {
    if agent.name.trim().is_empty() {
        return Err(Error::validation("agent name is required"));
    }
    if agent.breed.trim().is_empty() {
        return Err(Error::validation("agent breed is required"));
    }
    if agent.years_of_experience < 0 {
        return Err(Error::validation("years_of_experience must not be negative"));
    }
    validate_salary(agent.salary)
}

pub fn validate_salary(salary: i32) -> Result<()> {
    if salary < 0 {
        return Err(Error::validation("salary must not be negative"));
    }
    Ok(())
}

pub fn validate_new_target(target: &NewTarget) -> Result<()> {
    if target.name.trim().is_empty() {
        return Err(Error::validation("target name is required"));
    }
    if target.country.trim().is_empty() {
        return Err(Error::validation("target country is required"));
    }
    Ok(())
}

pub fn validate_new_mission(mission: &NewMission) -> Result<()> {
    if mission.name.trim().is_empty() {
        return Err(Error::validation("mission name is required"));
    }

    let count = mission.targets.len();
    if !(MIN_TARGETS..=MAX_TARGETS).contains(&count) {
        return Err(Error::validation(format!(
            "a mission must have between {} and {} targets, got {}",
            MIN_TARGETS, MAX_TARGETS, count
        )));
    }

    for (i, target) in mission.targets.iter().enumerate() {
        validate_new_target(target)?;
        if mission.targets[..i].contains(target) {
            return Err(duplicate_target(target));
        }
    }

    Ok(())
}

/// Checks an insertion of `target` into a mission currently holding `existing`.
pub fn check_add_target(
    mission_complete: bool,
    existing: &[Target],
    target: &NewTarget,
) -> Result<()> {
    if mission_complete {
        return Err(Error::conflict("cannot add a target to a completed mission"));
    }
    validate_new_target(target)?;
    if existing.len() >= MAX_TARGETS {
        return Err(Error::validation(format!(
            "a mission cannot have more than {} targets",
            MAX_TARGETS
        )));
    }
    if existing.iter().any(|t| t.matches(target)) {
        return Err(duplicate_target(target));
    }
    Ok(())
}

pub fn check_delete_target(target: &Target) -> Result<()> {
    if target.complete_state {
        return Err(Error::conflict(format!(
            "target {} is complete and cannot be deleted",
            target.id
        )));
    }
    Ok(())
}

pub fn check_update_notes(mission_complete: bool, target: &Target) -> Result<()> {
    if mission_complete {
        return Err(Error::conflict(format!(
            "mission {} is complete, notes are frozen",
            target.mission_id
        )));
    }
    if target.complete_state {
        return Err(Error::conflict(format!(
            "target {} is complete, notes are frozen",
            target.id
        )));
    }
    Ok(())
}

/// `active_elsewhere` is the incomplete mission other than `mission_id` the
/// agent is currently assigned to, if any.
pub fn check_assign(
    agent_id: AgentId,
    mission_id: MissionId,
    active_elsewhere: Option<MissionId>,
) -> Result<()> {
    match active_elsewhere {
        Some(other) if other != mission_id => Err(Error::conflict(format!(
            "agent {} is already assigned to incomplete mission {}",
            agent_id, other
        ))),
        _ => Ok(()),
    }
}

pub fn check_delete_mission(mission_id: MissionId, agent_id: Option<AgentId>) -> Result<()> {
    if let Some(agent_id) = agent_id {
        return Err(Error::conflict(format!(
            "mission {} is assigned to agent {}",
            mission_id, agent_id
        )));
    }
    Ok(())
}

fn duplicate_target(target: &NewTarget) -> Error {
    Error::validation(format!(
        "target '{}' in {} with identical notes already exists in the mission",
        target.name, target.country
    ))
}
