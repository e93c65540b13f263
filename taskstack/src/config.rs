//! Configuration management

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Stack configuration, loadable from a `taskstack.toml` file.
/// CLI flags override file values.
#[derive(Debug, Clone, Deserialize)]
pub struct StackConfig {
    /// Stack name
    #[serde(default = "default_stack_name")]
    pub stack_name: String,

    /// Base directory holding the Lambda code and layer assets
    #[serde(default = "default_lambda_dir")]
    pub lambda_dir: PathBuf,

    /// API Gateway stage name
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Physical table name; set explicitly so handlers and tooling can
    /// reference the table without resolving stack outputs
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: default_stack_name(),
            lambda_dir: default_lambda_dir(),
            stage: default_stage(),
            table_name: default_table_name(),
        }
    }
}

impl StackConfig {
    /// Load from a TOML file, falling back to defaults for absent keys
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()
    }
}

fn default_stack_name() -> String {
    "TasksStack".to_string()
}

fn default_lambda_dir() -> PathBuf {
    PathBuf::from("lambdas")
}

fn default_stage() -> String {
    "prod".to_string()
}

fn default_table_name() -> String {
    "TasksTable".to_string()
}
