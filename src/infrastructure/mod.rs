//! Infrastructure layer - External service implementations

pub mod llm;
pub mod logging;
pub mod run;
pub mod services;
pub mod storage;
pub mod workflow;
