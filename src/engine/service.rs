use std::sync::Arc;

use crate::config::BreedFailurePolicy;
use crate::engine::rules;
use crate::error::{Error, Result};
use crate::providers::BreedValidator;
use crate::storage::Storage;
use crate::types::{
    Agent, AgentId, Mission, MissionId, NewAgent, NewMission, NewTarget, Target, TargetId,
};

/// Entry point for every agent, mission and target operation.
pub struct AgencyService {
    storage: Arc<dyn Storage>,
    breeds: Arc<dyn BreedValidator>,
    breed_failure: BreedFailurePolicy,
}

impl AgencyService {
    pub fn new(storage: Arc<dyn Storage>, breeds: Arc<dyn BreedValidator>) -> Self {
        Self {
            storage,
            breeds,
            breed_failure: BreedFailurePolicy::default(),
        }
    }

    pub fn with_breed_failure_policy(mut self, policy: BreedFailurePolicy) -> Self {
        self.breed_failure = policy;
        self
    }

    pub async fn create_agent(&self, agent: NewAgent) -> Result<Agent> {
        rules::validate_new_agent(&agent)?;

        let breed_validation = match self.breeds.is_recognized(&agent.breed).await {
            Ok(recognized) => recognized,
            Err(Error::UpstreamUnavailable(reason))
                if self.breed_failure == BreedFailurePolicy::MarkUnvalidated =>
            {
                log::warn!(
                    "storing agent {} with unvalidated breed {}: {}",
                    agent.name,
                    agent.breed,
                    reason
                );
                false
            }
            Err(e) => return Err(e),
        };

        let created = self.storage.create_agent(&agent, breed_validation).await?;
        log::info!(
            "created agent {} (breed {} recognized: {})",
            created.id,
            created.breed,
            created.breed_validation
        );
        Ok(created)
    }

    pub async fn get_agent(&self, id: AgentId) -> Result<Agent> {
        self.storage
            .get_agent(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("agent {}", id)))
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.storage.list_agents().await
    }

    pub async fn update_salary(&self, id: AgentId, salary: i32) -> Result<Agent> {
        rules::validate_salary(salary)?;
        self.storage.update_agent_salary(id, salary).await
    }

    pub async fn delete_agent(&self, id: AgentId) -> Result<()> {
        self.storage.delete_agent(id).await?;
        log::info!("deleted agent {}", id);
        Ok(())
    }

    pub async fn create_mission(&self, mission: NewMission) -> Result<Mission> {
        rules::validate_new_mission(&mission)?;
        let created = self.storage.create_mission(&mission).await?;
        log::info!(
            "created mission {} with {} targets",
            created.id,
            created.targets.len()
        );
        Ok(created)
    }

    pub async fn get_mission(&self, id: MissionId) -> Result<Mission> {
        self.storage
            .get_mission(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("mission {}", id)))
    }

    pub async fn list_missions(&self) -> Result<Vec<Mission>> {
        self.storage.list_missions().await
    }

    pub async fn assign_agent(&self, mission_id: MissionId, agent_id: AgentId) -> Result<Mission> {
        let mission = self
            .storage
            .assign_agent(mission_id, agent_id)
            .await
            .inspect_err(|e| log_rejection("assign agent", e))?;
        log::info!("assigned agent {} to mission {}", agent_id, mission_id);
        Ok(mission)
    }

    pub async fn complete_mission(&self, id: MissionId) -> Result<Mission> {
        self.storage.complete_mission(id).await
    }

    pub async fn delete_mission(&self, id: MissionId) -> Result<()> {
        self.storage
            .delete_mission(id)
            .await
            .inspect_err(|e| log_rejection("delete mission", e))?;
        log::info!("deleted mission {}", id);
        Ok(())
    }

    pub async fn add_target(&self, mission_id: MissionId, target: NewTarget) -> Result<Target> {
        self.storage
            .add_target(mission_id, &target)
            .await
            .inspect_err(|e| log_rejection("add target", e))
    }

    pub async fn delete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()> {
        self.storage
            .delete_target(mission_id, target_id)
            .await
            .inspect_err(|e| log_rejection("delete target", e))
    }

    pub async fn update_target_notes(
        &self,
        mission_id: MissionId,
        target_id: TargetId,
        notes: &str,
    ) -> Result<Target> {
        self.storage
            .update_target_notes(mission_id, target_id, notes)
            .await
            .inspect_err(|e| log_rejection("update notes", e))
    }

    pub async fn complete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()> {
        self.storage.complete_target(mission_id, target_id).await
    }
}

fn log_rejection(operation: &str, error: &Error) {
    match error {
        Error::Conflict(_) | Error::Validation(_) => {
            log::info!("{} rejected: {}", operation, error)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{StaticBreedValidator, UnavailableBreedValidator};
    use crate::storage::InMemoryStore;

    fn service() -> AgencyService {
        AgencyService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticBreedValidator::common()),
        )
    }

    fn new_agent(breed: &str) -> NewAgent {
        NewAgent {
            name: "Whiskers".to_string(),
            years_of_experience: 5,
            breed: breed.to_string(),
            salary: 3000,
        }
    }

    fn new_target(name: &str, country: &str, notes: &str) -> NewTarget {
        NewTarget {
            name: name.to_string(),
            country: country.to_string(),
            notes: notes.to_string(),
        }
    }

    async fn mission_with(service: &AgencyService, targets: Vec<NewTarget>) -> Mission {
        service
            .create_mission(NewMission {
                name: "M1".to_string(),
                targets,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_agent_annotates_breed() {
        let service = service();

        let known = service.create_agent(new_agent("Siamese")).await.unwrap();
        assert!(known.breed_validation);

        let unknown = service.create_agent(new_agent("Gryphon")).await.unwrap();
        assert!(!unknown.breed_validation);
    }

    #[tokio::test]
    async fn test_create_agent_rejects_when_catalog_unavailable() {
        let store = Arc::new(InMemoryStore::new());
        let service = AgencyService::new(store.clone(), Arc::new(UnavailableBreedValidator));

        let result = service.create_agent(new_agent("Siamese")).await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
        assert!(store.list_agents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_agent_degrades_when_configured() {
        let service = AgencyService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(UnavailableBreedValidator),
        )
        .with_breed_failure_policy(BreedFailurePolicy::MarkUnvalidated);

        let agent = service.create_agent(new_agent("Siamese")).await.unwrap();
        assert!(!agent.breed_validation);
    }

    #[tokio::test]
    async fn test_get_missing_agent_is_not_found() {
        let result = service().get_agent(7).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_negative_salary_rejected() {
        let service = service();
        let agent = service.create_agent(new_agent("Siamese")).await.unwrap();

        let result = service.update_salary(agent.id, -5).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(service.get_agent(agent.id).await.unwrap().salary, 3000);
    }

    #[tokio::test]
    async fn test_target_limit_scenario() {
        let service = service();
        let mission = mission_with(
            &service,
            vec![
                new_target("Berlin", "DE", "n1"),
                new_target("Paris", "FR", "n2"),
            ],
        )
        .await;

        service
            .add_target(mission.id, new_target("Rome", "IT", "n3"))
            .await
            .unwrap();
        let fourth = service
            .add_target(mission.id, new_target("Oslo", "NO", "n4"))
            .await;
        assert!(matches!(fourth, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_target_to_completed_mission() {
        let service = service();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "")]).await;
        service.complete_mission(mission.id).await.unwrap();

        let result = service
            .add_target(mission.id, new_target("Paris", "FR", ""))
            .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_target_rejected() {
        let service = service();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "n1")]).await;

        let result = service
            .add_target(mission.id, new_target("Berlin", "DE", "n1"))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_notes_frozen_after_target_completion() {
        let service = service();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "n1")]).await;
        let target_id = mission.targets[0].id;

        let updated = service
            .update_target_notes(mission.id, target_id, "seen at the station")
            .await
            .unwrap();
        assert_eq!(updated.notes, "seen at the station");

        service.complete_target(mission.id, target_id).await.unwrap();
        let result = service.update_target_notes(mission.id, target_id, "x").await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        let mission = service.get_mission(mission.id).await.unwrap();
        assert_eq!(mission.targets[0].notes, "seen at the station");
    }

    #[tokio::test]
    async fn test_notes_frozen_after_mission_completion() {
        let service = service();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "n1")]).await;
        let target_id = mission.targets[0].id;

        service.complete_mission(mission.id).await.unwrap();
        let result = service.update_target_notes(mission.id, target_id, "x").await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        // completing a target of a completed mission is still allowed
        service.complete_target(mission.id, target_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_completed_target_cannot_be_deleted() {
        let service = service();
        let mission = mission_with(
            &service,
            vec![new_target("Berlin", "DE", ""), new_target("Paris", "FR", "")],
        )
        .await;
        let done = mission.targets[0].id;
        let open = mission.targets[1].id;

        service.complete_target(mission.id, done).await.unwrap();
        let result = service.delete_target(mission.id, done).await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        service.delete_target(mission.id, open).await.unwrap();
        let mission = service.get_mission(mission.id).await.unwrap();
        assert_eq!(mission.targets.len(), 1);
    }

    #[tokio::test]
    async fn test_agent_busy_scenario() {
        let service = service();
        let agent = service.create_agent(new_agent("Bengal")).await.unwrap();
        let first = mission_with(&service, vec![new_target("Berlin", "DE", "")]).await;
        let second = mission_with(&service, vec![new_target("Paris", "FR", "")]).await;

        let assigned = service.assign_agent(first.id, agent.id).await.unwrap();
        assert!(assigned.is_active());

        let result = service.assign_agent(second.id, agent.id).await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        service.complete_mission(first.id).await.unwrap();
        service.assign_agent(second.id, agent.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_assign_unknown_agent() {
        let service = service();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "")]).await;

        let result = service.assign_agent(mission.id, 99).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_assigned_mission_rejected() {
        let service = service();
        let agent = service.create_agent(new_agent("Bengal")).await.unwrap();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "")]).await;
        service.assign_agent(mission.id, agent.id).await.unwrap();

        let result = service.delete_mission(mission.id).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert!(service.get_mission(mission.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unassigned_mission() {
        let service = service();
        let mission = mission_with(&service, vec![new_target("Berlin", "DE", "")]).await;

        service.delete_mission(mission.id).await.unwrap();
        let result = service.get_mission(mission.id).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
