//! Lambda function construct

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use taskstack_core::{logical_id, Asset, AssetLocation, CfnResource, Expr, Stack, SynthError};
use taskstack_iam::{Grantable, Role};

use crate::layer::LayerVersion;

/// Supported Lambda runtimes
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum Runtime {
    #[serde(rename = "python3.9")]
    Python39,
    #[serde(rename = "python3.10")]
    Python310,
    #[serde(rename = "python3.11")]
    Python311,
    #[serde(rename = "python3.12")]
    Python312,
}

impl Runtime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python39 => "python3.9",
            Self::Python310 => "python3.10",
            Self::Python311 => "python3.11",
            Self::Python312 => "python3.12",
        }
    }
}

/// Function code source
#[derive(Debug, Clone)]
pub enum Code {
    /// Local directory staged as a zipped asset
    Asset(Asset),
}

impl Code {
    pub fn from_asset(path: impl AsRef<Path>) -> Self {
        Self::Asset(Asset::from_path(path))
    }

    pub(crate) fn stage(self, stack: &mut Stack) -> AssetLocation {
        match self {
            Self::Asset(asset) => stack.add_asset(asset),
        }
    }
}

/// Function declaration properties
#[derive(Debug, Clone)]
pub struct FunctionProps {
    pub runtime: Runtime,
    pub handler: String,
    pub code: Code,
    /// Layer version ARNs are resolved through `Ref` on each layer
    pub layers: Vec<Expr>,
    /// Ordered so synthesis output is stable
    pub environment: BTreeMap<String, Expr>,
    pub memory_size: i32,
    pub timeout_secs: i32,
    pub description: Option<String>,
}

impl FunctionProps {
    pub fn new(runtime: Runtime, handler: impl Into<String>, code: Code) -> Self {
        Self {
            runtime,
            handler: handler.into(),
            code,
            layers: Vec::new(),
            environment: BTreeMap::new(),
            memory_size: 128,
            timeout_secs: 3,
            description: None,
        }
    }

    pub fn layer(mut self, layer: &LayerVersion) -> Self {
        self.layers.push(layer.layer_version_arn());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: Expr) -> Self {
        self.environment.insert(key.into(), value);
        self
    }
}

/// An `AWS::Lambda::Function` with its service role
#[derive(Debug, Clone)]
pub struct Function {
    logical_id: String,
    role: Role,
}

impl Function {
    pub fn new(stack: &mut Stack, id: &str, props: FunctionProps) -> Result<Self, SynthError> {
        taskstack_core::construct::validate_id(id)?;

        let role = Role::service(
            stack,
            &[id, "ServiceRole"],
            "lambda.amazonaws.com",
            &["service-role/AWSLambdaBasicExecutionRole"],
        )?;

        let logical = logical_id(&[id]);
        let location = props.code.stage(stack);

        let mut properties = json!({
            "Runtime": serde_json::to_value(props.runtime)?,
            "Handler": props.handler,
            "Code": {
                "S3Bucket": serde_json::to_value(&location.bucket)?,
                "S3Key": location.key,
            },
            "Role": serde_json::to_value(role.arn())?,
            "MemorySize": props.memory_size,
            "Timeout": props.timeout_secs,
        });
        if !props.layers.is_empty() {
            properties["Layers"] = serde_json::to_value(&props.layers)?;
        }
        if !props.environment.is_empty() {
            properties["Environment"] = json!({
                "Variables": serde_json::to_value(&props.environment)?,
            });
        }
        if let Some(description) = props.description {
            properties["Description"] = json!(description);
        }

        let resource =
            CfnResource::new("AWS::Lambda::Function", properties).depends_on(role.logical_id());
        stack.add_resource(&logical, resource)?;
        debug!(function = %logical, "declared function");

        Ok(Self {
            logical_id: logical,
            role,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn function_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// Allow `principal` to invoke this function from `source_arn`,
    /// declared as an `AWS::Lambda::Permission`
    pub fn add_permission(
        &self,
        stack: &mut Stack,
        id: &str,
        principal: &str,
        source_arn: Expr,
    ) -> Result<(), SynthError> {
        let permission_id = logical_id(&[&self.logical_id, id]);
        let properties = json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": serde_json::to_value(self.function_arn())?,
            "Principal": principal,
            "SourceArn": serde_json::to_value(source_arn)?,
        });
        stack.add_resource(
            &permission_id,
            CfnResource::new("AWS::Lambda::Permission", properties),
        )
    }
}

impl Grantable for Function {
    fn role_logical_id(&self) -> &str {
        self.role.logical_id()
    }
}
