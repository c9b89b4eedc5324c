pub mod auditor;
pub mod repair;
pub mod step_index;
