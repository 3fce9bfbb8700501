use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashMap;

use crate::config::PostgresConfig;
use crate::engine::rules;
use crate::error::{Error, Result};
use crate::storage::traits::Storage;
use crate::types::{
    Agent, AgentId, Mission, MissionId, NewAgent, NewMission, NewTarget, Target, TargetId,
};

const AGENT_COLUMNS: &str = "id, name, years_of_experience, breed, breed_validation, salary";
const MISSION_COLUMNS: &str = "id, name, agent_id, complete_state";
const TARGET_COLUMNS: &str = "id, mission_id, name, country, notes, complete_state";

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await?;
        log::info!("connected to {}", config.redacted_source());
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../migrations/V001__initial_schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Read-only transaction whose statements all see one snapshot.
    async fn begin_snapshot(&self) -> Result<sqlx::Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_agent(&self, agent: &NewAgent, breed_validation: bool) -> Result<Agent> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO agents (name, years_of_experience, breed, breed_validation, salary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {AGENT_COLUMNS}
            "#
        ))
        .bind(&agent.name)
        .bind(agent.years_of_experience)
        .bind(&agent.breed)
        .bind(breed_validation)
        .bind(agent.salary)
        .fetch_one(&self.pool)
        .await?;

        row_to_agent(&row)
    }

    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>> {
        let row = sqlx::query(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_agent).transpose()
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        let rows = sqlx::query(&format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_agent).collect()
    }

    async fn update_agent_salary(&self, id: AgentId, salary: i32) -> Result<Agent> {
        let row = sqlx::query(&format!(
            "UPDATE agents SET salary = $2 WHERE id = $1 RETURNING {AGENT_COLUMNS}"
        ))
        .bind(id)
        .bind(salary)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => row_to_agent(&r),
            None => Err(agent_not_found(id)),
        }
    }

    async fn delete_agent(&self, id: AgentId) -> Result<()> {
        // missions.agent_id is ON DELETE SET NULL
        sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_mission(&self, mission: &NewMission) -> Result<Mission> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO missions (name) VALUES ($1) RETURNING {MISSION_COLUMNS}"
        ))
        .bind(&mission.name)
        .fetch_one(&mut *tx)
        .await?;
        let mut created = row_to_mission(&row)?;

        for target in &mission.targets {
            created
                .targets
                .push(insert_target(&mut *tx, created.id, target).await?);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let mut tx = self.begin_snapshot().await?;

        let row = sqlx::query(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mission = match row {
            Some(r) => {
                let mut mission = row_to_mission(&r)?;
                mission.targets = load_targets(&mut *tx, id).await?;
                Some(mission)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(mission)
    }

    async fn list_missions(&self) -> Result<Vec<Mission>> {
        let mut tx = self.begin_snapshot().await?;

        let mission_rows = sqlx::query(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions ORDER BY id"
        ))
        .fetch_all(&mut *tx)
        .await?;

        let target_rows = sqlx::query(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets ORDER BY mission_id, id"
        ))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut targets_by_mission: HashMap<MissionId, Vec<Target>> = HashMap::new();
        for row in &target_rows {
            let target = row_to_target(row)?;
            targets_by_mission
                .entry(target.mission_id)
                .or_default()
                .push(target);
        }

        mission_rows
            .iter()
            .map(|r| {
                let mut mission = row_to_mission(r)?;
                mission.targets = targets_by_mission.remove(&mission.id).unwrap_or_default();
                Ok(mission)
            })
            .collect()
    }

    async fn assign_agent(&self, mission_id: MissionId, agent_id: AgentId) -> Result<Mission> {
        let mut tx = self.pool.begin().await?;

        // The agent row lock serializes concurrent assignments of the same agent.
        let agent: Option<AgentId> =
            sqlx::query_scalar("SELECT id FROM agents WHERE id = $1 FOR UPDATE")
                .bind(agent_id)
                .fetch_optional(&mut *tx)
                .await?;
        if agent.is_none() {
            return Err(agent_not_found(agent_id));
        }

        let row = sqlx::query(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE id = $1 FOR UPDATE"
        ))
        .bind(mission_id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut mission = match row {
            Some(r) => row_to_mission(&r)?,
            None => return Err(mission_not_found(mission_id)),
        };

        let active_elsewhere: Option<MissionId> = sqlx::query_scalar(
            r#"
            SELECT id FROM missions
            WHERE agent_id = $1 AND complete_state = FALSE AND id <> $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(agent_id)
        .bind(mission_id)
        .fetch_optional(&mut *tx)
        .await?;
        rules::check_assign(agent_id, mission_id, active_elsewhere)?;

        sqlx::query("UPDATE missions SET agent_id = $1 WHERE id = $2")
            .bind(agent_id)
            .bind(mission_id)
            .execute(&mut *tx)
            .await?;

        mission.agent_id = Some(agent_id);
        mission.targets = load_targets(&mut *tx, mission_id).await?;

        tx.commit().await?;
        Ok(mission)
    }

    async fn complete_mission(&self, id: MissionId) -> Result<Mission> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE missions SET complete_state = TRUE WHERE id = $1 RETURNING {MISSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut mission = match row {
            Some(r) => row_to_mission(&r)?,
            None => return Err(mission_not_found(id)),
        };
        mission.targets = load_targets(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(mission)
    }

    async fn delete_mission(&self, id: MissionId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let agent_id: Option<Option<AgentId>> =
            sqlx::query_scalar("SELECT agent_id FROM missions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let agent_id = agent_id.ok_or_else(|| mission_not_found(id))?;
        rules::check_delete_mission(id, agent_id)?;

        sqlx::query("DELETE FROM targets WHERE mission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM missions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_target(&self, mission_id: MissionId, target: &NewTarget) -> Result<Target> {
        let mut tx = self.pool.begin().await?;

        let mission_complete = lock_mission(&mut tx, mission_id).await?;
        let existing = load_targets(&mut *tx, mission_id).await?;
        rules::check_add_target(mission_complete, &existing, target)?;

        let created = insert_target(&mut *tx, mission_id, target).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn delete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        lock_mission(&mut tx, mission_id).await?;
        let target = lock_target(&mut tx, mission_id, target_id).await?;
        rules::check_delete_target(&target)?;

        sqlx::query("DELETE FROM targets WHERE id = $1 AND mission_id = $2")
            .bind(target_id)
            .bind(mission_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_target_notes(
        &self,
        mission_id: MissionId,
        target_id: TargetId,
        notes: &str,
    ) -> Result<Target> {
        let mut tx = self.pool.begin().await?;

        let mission_complete = lock_mission(&mut tx, mission_id).await?;
        let target = lock_target(&mut tx, mission_id, target_id).await?;
        rules::check_update_notes(mission_complete, &target)?;

        let row = sqlx::query(&format!(
            "UPDATE targets SET notes = $3 WHERE id = $1 AND mission_id = $2 RETURNING {TARGET_COLUMNS}"
        ))
        .bind(target_id)
        .bind(mission_id)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;
        let updated = row_to_target(&row)?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn complete_target(&self, mission_id: MissionId, target_id: TargetId) -> Result<()> {
        let result =
            sqlx::query("UPDATE targets SET complete_state = TRUE WHERE id = $1 AND mission_id = $2")
                .bind(target_id)
                .bind(mission_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(target_not_found(mission_id, target_id));
        }
        Ok(())
    }
}

/// Locks the mission row for the rest of the transaction and returns its
/// completion flag.
async fn lock_mission(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    mission_id: MissionId,
) -> Result<bool> {
    let complete: Option<bool> =
        sqlx::query_scalar("SELECT complete_state FROM missions WHERE id = $1 FOR UPDATE")
            .bind(mission_id)
            .fetch_optional(&mut **tx)
            .await?;
    complete.ok_or_else(|| mission_not_found(mission_id))
}

async fn lock_target(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    mission_id: MissionId,
    target_id: TargetId,
) -> Result<Target> {
    let row = sqlx::query(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE id = $1 AND mission_id = $2 FOR UPDATE"
    ))
    .bind(target_id)
    .bind(mission_id)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(r) => row_to_target(&r),
        None => Err(target_not_found(mission_id, target_id)),
    }
}

async fn load_targets<'e, E>(executor: E, mission_id: MissionId) -> Result<Vec<Target>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE mission_id = $1 ORDER BY id"
    ))
    .bind(mission_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(row_to_target).collect()
}

async fn insert_target<'e, E>(
    executor: E,
    mission_id: MissionId,
    target: &NewTarget,
) -> Result<Target>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO targets (mission_id, name, country, notes, complete_state)
        VALUES ($1, $2, $3, $4, FALSE)
        RETURNING {TARGET_COLUMNS}
        "#
    ))
    .bind(mission_id)
    .bind(&target.name)
    .bind(&target.country)
    .bind(&target.notes)
    .fetch_one(executor)
    .await?;

    row_to_target(&row)
}

fn row_to_agent(r: &PgRow) -> Result<Agent> {
    Ok(Agent {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        years_of_experience: r.try_get("years_of_experience")?,
        breed: r.try_get("breed")?,
        breed_validation: r.try_get("breed_validation")?,
        salary: r.try_get("salary")?,
    })
}

fn row_to_mission(r: &PgRow) -> Result<Mission> {
    Ok(Mission {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        agent_id: r.try_get("agent_id")?,
        complete_state: r.try_get("complete_state")?,
        targets: Vec::new(),
    })
}

fn row_to_target(r: &PgRow) -> Result<Target> {
    Ok(Target {
        id: r.try_get("id")?,
        mission_id: r.try_get("mission_id")?,
        name: r.try_get("name")?,
        country: r.try_get("country")?,
        notes: r.try_get("notes")?,
        complete_state: r.try_get("complete_state")?,
    })
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
