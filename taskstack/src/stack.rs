//! The Tasks stack: table, layers, functions, API

use taskstack_apigateway::{HttpMethod, LambdaIntegration, RestApi, RestApiProps};
use taskstack_core::{Stack, SynthError};
use taskstack_dynamodb::{Attribute, BillingMode, RemovalPolicy, Table, TableProps};
use taskstack_lambda::{Code, Function, FunctionProps, LayerVersion, LayerVersionProps, Runtime};

use crate::config::StackConfig;

/// Environment variable each handler reads the table name from
pub const TABLE_ENV_VAR: &str = "TASKS_TABLE_NAME";

const HANDLER: &str = "handler.lambda_handler";
const RUNTIME: Runtime = Runtime::Python311;

/// Build the full Tasks resource graph from configuration.
///
/// Dependency order is carried by the declarations themselves: functions
/// reference the table name and layer ARNs, methods reference function
/// ARNs, and the deployment depends on every method.
pub fn build_tasks_stack(config: &StackConfig) -> Result<Stack, SynthError> {
    let mut stack = Stack::new(config.stack_name.clone())?
        .with_description("Serverless Tasks Service");

    // Database
    let tasks_table = Table::new(
        &mut stack,
        "TasksTable",
        TableProps {
            table_name: Some(config.table_name.clone()),
            partition_key: Attribute::string("taskId"),
            billing_mode: BillingMode::PayPerRequest,
            deletion_protection: false,
            removal_policy: RemovalPolicy::Destroy,
        },
    )?;

    // Shared layers
    let common_layer = LayerVersion::new(
        &mut stack,
        "TaskAppCommonLayer",
        LayerVersionProps {
            code: Code::from_asset(config.lambda_dir.join("layers").join("common")),
            compatible_runtimes: vec![RUNTIME],
            description: Some("Common layer with models and utilities".to_string()),
        },
    )?;
    let dependencies_layer = LayerVersion::new(
        &mut stack,
        "TaskAppDependenciesLayer",
        LayerVersionProps {
            code: Code::from_asset(config.lambda_dir.join("layers").join("dependencies")),
            compatible_runtimes: vec![RUNTIME],
            description: Some("Dependencies layer".to_string()),
        },
    )?;

    // CRUD functions
    let make_function = |stack: &mut Stack, id: &str, asset: &str| -> Result<Function, SynthError> {
        Function::new(
            stack,
            id,
            FunctionProps::new(RUNTIME, HANDLER, Code::from_asset(config.lambda_dir.join(asset)))
                .layer(&common_layer)
                .layer(&dependencies_layer)
                .env(TABLE_ENV_VAR, tasks_table.table_name()),
        )
    };

    let create_task = make_function(&mut stack, "CreateTaskLambda", "create_task")?;
    tasks_table.grant_write_data(&mut stack, &create_task)?;

    let get_task = make_function(&mut stack, "GetTaskLambda", "get_task")?;
    tasks_table.grant_read_data(&mut stack, &get_task)?;

    let update_task = make_function(&mut stack, "UpdateTaskLambda", "update_task")?;
    tasks_table.grant_read_write_data(&mut stack, &update_task)?;

    let delete_task = make_function(&mut stack, "DeleteTaskLambda", "delete_task")?;
    tasks_table.grant_read_write_data(&mut stack, &delete_task)?;

    // REST surface
    let api = RestApi::new(
        &mut stack,
        "TasksApi",
        RestApiProps {
            rest_api_name: Some("Tasks Service".to_string()),
            description: Some("Serverless Tasks Service.".to_string()),
        },
    )?;

    let tasks = api.root().add_resource(&mut stack, "tasks")?;
    tasks.add_method(&mut stack, HttpMethod::Post, &LambdaIntegration::new(&create_task))?;

    let task_id = tasks.add_resource(&mut stack, "{taskId}")?;
    task_id.add_method(&mut stack, HttpMethod::Get, &LambdaIntegration::new(&get_task))?;
    task_id.add_method(&mut stack, HttpMethod::Put, &LambdaIntegration::new(&update_task))?;
    task_id.add_method(&mut stack, HttpMethod::Delete, &LambdaIntegration::new(&delete_task))?;

    api.deploy(&mut stack, &config.stage)?;

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_builds_and_validates() {
        let stack = build_tasks_stack(&StackConfig::default()).unwrap();
        let template = stack.synth().unwrap();

        assert_eq!(template.resources_of_type("AWS::DynamoDB::Table").len(), 1);
        assert_eq!(
            template.resources_of_type("AWS::Lambda::LayerVersion").len(),
            2
        );
        assert_eq!(template.resources_of_type("AWS::Lambda::Function").len(), 4);
        assert_eq!(
            template.resources_of_type("AWS::ApiGateway::Method").len(),
            4
        );
    }

    #[test]
    fn test_stage_name_from_config() {
        let config = StackConfig {
            stage: "dev".to_string(),
            ..StackConfig::default()
        };
        let template = build_tasks_stack(&config).unwrap().synth().unwrap();
        let stages = template.resources_of_type("AWS::ApiGateway::Stage");
        assert_eq!(template.resources[stages[0]].properties["StageName"], "dev");
    }

    #[test]
    fn test_six_assets_staged() {
        // four function bundles + two layers
        let stack = build_tasks_stack(&StackConfig::default()).unwrap();
        assert_eq!(stack.assets().len(), 6);
    }
}
