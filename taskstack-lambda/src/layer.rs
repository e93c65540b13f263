//! Lambda layer construct

use serde_json::json;

use taskstack_core::{logical_id, CfnResource, Expr, Stack, SynthError};

use crate::function::{Code, Runtime};

/// Layer declaration properties
#[derive(Debug, Clone)]
pub struct LayerVersionProps {
    pub code: Code,
    pub compatible_runtimes: Vec<Runtime>,
    pub description: Option<String>,
}

/// An `AWS::Lambda::LayerVersion`. Immutable once declared; functions
/// reference it through `Ref`, which resolves to the layer version ARN.
#[derive(Debug, Clone)]
pub struct LayerVersion {
    logical_id: String,
}

impl LayerVersion {
    pub fn new(stack: &mut Stack, id: &str, props: LayerVersionProps) -> Result<Self, SynthError> {
        taskstack_core::construct::validate_id(id)?;

        let logical = logical_id(&[id]);
        let location = props.code.stage(stack);

        let mut properties = json!({
            "Content": {
                "S3Bucket": serde_json::to_value(&location.bucket)?,
                "S3Key": location.key,
            },
            "CompatibleRuntimes": serde_json::to_value(&props.compatible_runtimes)?,
        });
        if let Some(description) = props.description {
            properties["Description"] = json!(description);
        }

        stack.add_resource(
            &logical,
            CfnResource::new("AWS::Lambda::LayerVersion", properties),
        )?;

        Ok(Self {
            logical_id: logical,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Layer version ARN, resolved at deploy time
    pub fn layer_version_arn(&self) -> Expr {
        Expr::Ref(self.logical_id.clone())
    }
}
