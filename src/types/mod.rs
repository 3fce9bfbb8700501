pub mod agent;
pub mod mission;

pub use agent::{Agent, NewAgent, SalaryUpdate};
pub use mission::{AssignAgent, Mission, NewMission, NewTarget, NotesUpdate, Target};

pub type AgentId = i64;
pub type MissionId = i64;
pub type TargetId = i64;

/// Lower bound on targets supplied when a mission is created.
pub const MIN_TARGETS: usize = 1;
/// Upper bound on targets a mission may hold at any time.
pub const MAX_TARGETS: usize = 3;
