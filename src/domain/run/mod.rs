//! Run domain module
//!
//! A run is the durable, pollable record of one workflow execution:
//! `pending -> running -> completed | failed`, plus one result per step.

mod entity;
pub mod repository;

pub use entity::{
    Run, RunHistoryEntry, RunId, RunStatus, RunUpdate, StepResult, StepStatus, WORKFLOW_STEP_ID,
};
pub use repository::RunRepository;

#[cfg(test)]
pub use repository::MockRunRepository;
