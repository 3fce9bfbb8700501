use serde::{Deserialize, Serialize};

use super::AgentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub years_of_experience: i32,
    pub breed: String,
    pub breed_validation: bool,
    pub salary: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub years_of_experience: i32,
    pub breed: String,
    pub salary: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SalaryUpdate {
    pub salary: i32,
}

impl Agent {
    pub fn from_new(id: AgentId, new: NewAgent, breed_validation: bool) -> Self {
        Self {
            id,
            name: new.name,
            years_of_experience: new.years_of_experience,
            breed: new.breed,
            breed_validation,
            salary: new.salary,
        }
    }
}
