//! Tasks service stack definition
//!
//! Declares the serverless Tasks backend: one DynamoDB table, two shared
//! Lambda layers, four CRUD functions with least-privilege table grants,
//! and a REST API binding one route per function.

pub mod config;
pub mod stack;

pub use config::StackConfig;
pub use stack::{build_tasks_stack, TABLE_ENV_VAR};
