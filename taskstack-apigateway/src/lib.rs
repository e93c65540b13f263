//! API Gateway REST API constructs
//!
//! A `RestApi` owns a tree of resources; each resource can bind HTTP
//! methods to Lambda proxy integrations. Binding a method also grants
//! the API permission to invoke the function, scoped to the method's
//! execute-api ARN. One method per (verb, path) pair: a duplicate
//! binding fails at declaration.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use taskstack_core::{logical_id, CfnResource, Expr, Stack, SynthError};
use taskstack_lambda::Function;

/// HTTP methods a REST resource can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

/// A synchronous Lambda proxy integration (`AWS_PROXY`)
#[derive(Debug, Clone)]
pub struct LambdaIntegration {
    function: Function,
}

impl LambdaIntegration {
    pub fn new(function: &Function) -> Self {
        Self {
            function: function.clone(),
        }
    }

    /// Invocation URI for the integration. Lambda integrations always
    /// call the function with POST regardless of the route's verb.
    fn uri(&self) -> Expr {
        Expr::Sub(format!(
            "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{}.Arn}}/invocations",
            self.function.logical_id()
        ))
    }
}

/// REST API declaration properties
#[derive(Debug, Clone, Default)]
pub struct RestApiProps {
    pub rest_api_name: Option<String>,
    pub description: Option<String>,
}

/// An `AWS::ApiGateway::RestApi`
#[derive(Debug, Clone)]
pub struct RestApi {
    logical_id: String,
}

impl RestApi {
    pub fn new(stack: &mut Stack, id: &str, props: RestApiProps) -> Result<Self, SynthError> {
        taskstack_core::construct::validate_id(id)?;

        let logical = logical_id(&[id]);
        let mut properties = json!({});
        if let Some(name) = props.rest_api_name {
            properties["Name"] = json!(name);
        }
        if let Some(description) = props.description {
            properties["Description"] = json!(description);
        }

        stack.add_resource(&logical, CfnResource::new("AWS::ApiGateway::RestApi", properties))?;

        Ok(Self { logical_id: logical })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The API's root (`/`) resource
    pub fn root(&self) -> ApiResource {
        ApiResource {
            api_logical_id: self.logical_id.clone(),
            resource_ref: Expr::get_att(&self.logical_id, "RootResourceId"),
            path: "/".to_string(),
            id_path: vec![self.logical_id.clone()],
        }
    }

    /// Declare a deployment of every method bound so far, plus a stage.
    ///
    /// The deployment carries `DependsOn` for each of the API's methods;
    /// without it CloudFormation may deploy before the routes exist.
    /// Call this after the last `add_method`.
    pub fn deploy(&self, stack: &mut Stack, stage_name: &str) -> Result<(), SynthError> {
        taskstack_core::construct::validate_id(stage_name)?;

        let method_ids: Vec<String> = stack
            .resources_of_type("AWS::ApiGateway::Method")
            .into_iter()
            .filter(|id| {
                stack
                    .resource_properties(id)
                    .and_then(|p| p.get("RestApiId"))
                    .and_then(|v| v.get("Ref"))
                    .and_then(|v| v.as_str())
                    == Some(self.logical_id.as_str())
            })
            .collect();

        let deployment_id = logical_id(&[&self.logical_id, "Deployment"]);
        let mut deployment = CfnResource::new(
            "AWS::ApiGateway::Deployment",
            json!({"RestApiId": serde_json::to_value(Expr::Ref(self.logical_id.clone()))?}),
        );
        for method_id in method_ids {
            deployment = deployment.depends_on(method_id);
        }
        stack.add_resource(&deployment_id, deployment)?;

        let stage_id = logical_id(&[&self.logical_id, "Stage", stage_name]);
        let stage = CfnResource::new(
            "AWS::ApiGateway::Stage",
            json!({
                "RestApiId": serde_json::to_value(Expr::Ref(self.logical_id.clone()))?,
                "DeploymentId": serde_json::to_value(Expr::Ref(deployment_id))?,
                "StageName": stage_name,
            }),
        );
        stack.add_resource(&stage_id, stage)?;
        debug!(api = %self.logical_id, stage = %stage_name, "declared deployment");
        Ok(())
    }
}

/// A node in the API's resource tree
#[derive(Debug, Clone)]
pub struct ApiResource {
    api_logical_id: String,
    resource_ref: Expr,
    path: String,
    id_path: Vec<String>,
}

impl ApiResource {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declare a child resource for a path part. Parts wrapped in braces
    /// declare path parameters, e.g. `{taskId}`.
    pub fn add_resource(&self, stack: &mut Stack, part: &str) -> Result<Self, SynthError> {
        taskstack_core::construct::validate_id(part)?;

        let mut id_path = self.id_path.clone();
        id_path.push(part.to_string());
        let components: Vec<&str> = id_path.iter().map(String::as_str).collect();
        let logical = logical_id(&components);

        let properties = json!({
            "RestApiId": serde_json::to_value(Expr::Ref(self.api_logical_id.clone()))?,
            "ParentId": serde_json::to_value(&self.resource_ref)?,
            "PathPart": part,
        });
        stack.add_resource(&logical, CfnResource::new("AWS::ApiGateway::Resource", properties))?;

        let path = if self.path == "/" {
            format!("/{part}")
        } else {
            format!("{}/{part}", self.path)
        };

        Ok(Self {
            api_logical_id: self.api_logical_id.clone(),
            resource_ref: Expr::Ref(logical),
            path,
            id_path,
        })
    }

    /// Bind an HTTP method on this resource to a Lambda integration
    pub fn add_method(
        &self,
        stack: &mut Stack,
        method: HttpMethod,
        integration: &LambdaIntegration,
    ) -> Result<(), SynthError> {
        let mut id_path = self.id_path.clone();
        id_path.push(method.as_str().to_string());
        let components: Vec<&str> = id_path.iter().map(String::as_str).collect();
        let logical = logical_id(&components);

        let properties = json!({
            "HttpMethod": method.as_str(),
            "ResourceId": serde_json::to_value(&self.resource_ref)?,
            "RestApiId": serde_json::to_value(Expr::Ref(self.api_logical_id.clone()))?,
            "AuthorizationType": "NONE",
            "Integration": {
                "Type": "AWS_PROXY",
                "IntegrationHttpMethod": "POST",
                "Uri": serde_json::to_value(integration.uri())?,
            },
        });
        stack.add_resource(&logical, CfnResource::new("AWS::ApiGateway::Method", properties))?;
        debug!(path = %self.path, method = method.as_str(), "bound method");

        // Path parameters become wildcards in the execute-api source ARN
        let arn_path = self
            .path
            .split('/')
            .map(|part| if part.starts_with('{') { "*" } else { part })
            .collect::<Vec<_>>()
            .join("/");
        let source_arn = Expr::Sub(format!(
            "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/*/{}{}",
            self.api_logical_id,
            method.as_str(),
            arn_path,
        ));
        integration.function.add_permission(
            stack,
            &format!("ApiPermission{}", logical),
            "apigateway.amazonaws.com",
            source_arn,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskstack_lambda::{Code, FunctionProps, Runtime};

    fn make_function(stack: &mut Stack, id: &str) -> Function {
        Function::new(
            stack,
            id,
            FunctionProps::new(
                Runtime::Python311,
                "handler.lambda_handler",
                Code::from_asset(format!("lambdas/{id}")),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_rest_api_and_resource_tree() {
        let mut stack = Stack::new("Test").unwrap();
        let api = RestApi::new(
            &mut stack,
            "TasksApi",
            RestApiProps {
                rest_api_name: Some("Tasks Service".to_string()),
                description: None,
            },
        )
        .unwrap();

        let tasks = api.root().add_resource(&mut stack, "tasks").unwrap();
        let task_id = tasks.add_resource(&mut stack, "{taskId}").unwrap();

        assert_eq!(tasks.path(), "/tasks");
        assert_eq!(task_id.path(), "/tasks/{taskId}");

        let resources = stack.resources_of_type("AWS::ApiGateway::Resource");
        assert_eq!(resources.len(), 2);

        // Child parent is the tasks resource, not the API root
        let child_props = stack
            .resource_properties(
                resources
                    .iter()
                    .find(|id| {
                        stack.resource_properties(id).unwrap()["PathPart"] == "{taskId}"
                    })
                    .unwrap(),
            )
            .unwrap();
        assert!(child_props["ParentId"]["Ref"].is_string());
    }

    #[test]
    fn test_add_method_binds_proxy_integration_and_permission() {
        let mut stack = Stack::new("Test").unwrap();
        let api = RestApi::new(&mut stack, "TasksApi", RestApiProps::default()).unwrap();
        let function = make_function(&mut stack, "CreateTaskLambda");

        let tasks = api.root().add_resource(&mut stack, "tasks").unwrap();
        tasks
            .add_method(&mut stack, HttpMethod::Post, &LambdaIntegration::new(&function))
            .unwrap();

        let methods = stack.resources_of_type("AWS::ApiGateway::Method");
        assert_eq!(methods.len(), 1);
        let props = stack.resource_properties(&methods[0]).unwrap();
        assert_eq!(props["HttpMethod"], "POST");
        assert_eq!(props["Integration"]["Type"], "AWS_PROXY");
        assert_eq!(props["Integration"]["IntegrationHttpMethod"], "POST");
        let uri = props["Integration"]["Uri"]["Fn::Sub"].as_str().unwrap();
        assert!(uri.contains(&format!("${{{}.Arn}}", function.logical_id())));

        let permissions = stack.resources_of_type("AWS::Lambda::Permission");
        assert_eq!(permissions.len(), 1);
        let perm = stack.resource_properties(&permissions[0]).unwrap();
        let arn = perm["SourceArn"]["Fn::Sub"].as_str().unwrap();
        assert!(arn.ends_with("/*/POST/tasks"));
    }

    #[test]
    fn test_duplicate_method_on_same_path_rejected() {
        let mut stack = Stack::new("Test").unwrap();
        let api = RestApi::new(&mut stack, "TasksApi", RestApiProps::default()).unwrap();
        let f1 = make_function(&mut stack, "Fn1");
        let f2 = make_function(&mut stack, "Fn2");

        let tasks = api.root().add_resource(&mut stack, "tasks").unwrap();
        tasks
            .add_method(&mut stack, HttpMethod::Get, &LambdaIntegration::new(&f1))
            .unwrap();
        let result = tasks.add_method(&mut stack, HttpMethod::Get, &LambdaIntegration::new(&f2));
        assert!(matches!(result, Err(SynthError::DuplicateLogicalId(_))));
    }

    #[test]
    fn test_path_parameter_wildcarded_in_source_arn() {
        let mut stack = Stack::new("Test").unwrap();
        let api = RestApi::new(&mut stack, "TasksApi", RestApiProps::default()).unwrap();
        let function = make_function(&mut stack, "GetTaskLambda");

        let task_id = api
            .root()
            .add_resource(&mut stack, "tasks")
            .unwrap()
            .add_resource(&mut stack, "{taskId}")
            .unwrap();
        task_id
            .add_method(&mut stack, HttpMethod::Get, &LambdaIntegration::new(&function))
            .unwrap();

        let permissions = stack.resources_of_type("AWS::Lambda::Permission");
        let perm = stack.resource_properties(&permissions[0]).unwrap();
        let arn = perm["SourceArn"]["Fn::Sub"].as_str().unwrap();
        assert!(arn.ends_with("/*/GET/tasks/*"));
    }

    #[test]
    fn test_deploy_depends_on_every_method() {
        let mut stack = Stack::new("Test").unwrap();
        let api = RestApi::new(&mut stack, "TasksApi", RestApiProps::default()).unwrap();
        let f1 = make_function(&mut stack, "Fn1");
        let f2 = make_function(&mut stack, "Fn2");

        let tasks = api.root().add_resource(&mut stack, "tasks").unwrap();
        tasks
            .add_method(&mut stack, HttpMethod::Post, &LambdaIntegration::new(&f1))
            .unwrap();
        tasks
            .add_method(&mut stack, HttpMethod::Get, &LambdaIntegration::new(&f2))
            .unwrap();

        api.deploy(&mut stack, "prod").unwrap();

        let template = stack.synth().unwrap();
        let deployments = template.resources_of_type("AWS::ApiGateway::Deployment");
        assert_eq!(deployments.len(), 1);
        assert_eq!(template.resources[deployments[0]].depends_on.len(), 2);

        let stages = template.resources_of_type("AWS::ApiGateway::Stage");
        assert_eq!(stages.len(), 1);
        assert_eq!(
            template.resources[stages[0]].properties["StageName"],
            "prod"
        );
    }
}
