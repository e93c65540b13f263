//! Stack container and synthesis pass

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::asset::{Asset, AssetLocation, ASSETS_BUCKET_PARAM};
use crate::error::SynthError;
use crate::expr::collect_references;
use crate::resource::CfnResource;
use crate::template::{Parameter, Template};

static STACK_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("valid regex"));

/// A named, deployable unit of resource declarations.
///
/// Constructs register resources here as they are declared; `synth`
/// validates the graph and produces the template. The container holds no
/// clocks and no randomness, so identical declarations always synthesize
/// to identical output.
#[derive(Debug)]
pub struct Stack {
    name: String,
    description: Option<String>,
    parameters: BTreeMap<String, Parameter>,
    resources: BTreeMap<String, CfnResource>,
    assets: Vec<Asset>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Result<Self, SynthError> {
        let name = name.into();
        if !STACK_NAME.is_match(&name) {
            return Err(SynthError::InvalidStackName(name));
        }
        Ok(Self {
            name,
            description: None,
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            assets: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a resource under a logical id
    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: CfnResource,
    ) -> Result<(), SynthError> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId(logical_id));
        }
        debug!(%logical_id, resource_type = %resource.resource_type, "registered resource");
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Mutable access to an already registered resource. Grant helpers
    /// use this to extend inline policy documents after declaration.
    pub fn resource_mut(&mut self, logical_id: &str) -> Result<&mut CfnResource, SynthError> {
        self.resources
            .get_mut(logical_id)
            .ok_or_else(|| SynthError::ResourceNotFound(logical_id.to_string()))
    }

    pub fn contains_resource(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    /// Logical ids of registered resources with the given type,
    /// in logical-id order
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<String> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Read-only view of a registered resource's properties
    pub fn resource_properties(&self, logical_id: &str) -> Option<&serde_json::Value> {
        self.resources.get(logical_id).map(|r| &r.properties)
    }

    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        parameter: Parameter,
    ) -> Result<(), SynthError> {
        let name = name.into();
        if self.parameters.contains_key(&name) {
            return Err(SynthError::DuplicateParameter(name));
        }
        self.parameters.insert(name, parameter);
        Ok(())
    }

    /// Stage a local code asset, declaring the deployment-bucket
    /// parameter on first use
    pub fn add_asset(&mut self, asset: Asset) -> AssetLocation {
        if !self.parameters.contains_key(ASSETS_BUCKET_PARAM) {
            self.parameters.insert(
                ASSETS_BUCKET_PARAM.to_string(),
                Parameter::string("Bucket holding zipped code assets"),
            );
        }
        let location = AssetLocation::new(asset.key.clone());
        if !self.assets.iter().any(|a| a.fingerprint == asset.fingerprint) {
            self.assets.push(asset);
        }
        location
    }

    /// Assets staged so far, in declaration order
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Validate the resource graph and produce the template
    pub fn synth(&self) -> Result<Template, SynthError> {
        self.validate()?;

        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for resource in self.resources.values() {
            *by_type.entry(resource.resource_type.as_str()).or_default() += 1;
        }
        info!(
            stack = %self.name,
            resources = self.resources.len(),
            assets = self.assets.len(),
            "synthesized stack"
        );
        for (resource_type, count) in &by_type {
            debug!(%resource_type, count, "resource type");
        }

        Ok(Template {
            format_version: Template::FORMAT_VERSION,
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            resources: self.resources.clone(),
        })
    }

    /// Every `DependsOn` target and every intrinsic reference must name
    /// a declared resource, a declared parameter, or an `AWS::*` pseudo
    /// parameter.
    fn validate(&self) -> Result<(), SynthError> {
        for (logical_id, resource) in &self.resources {
            for target in &resource.depends_on {
                if !self.resources.contains_key(target) {
                    return Err(SynthError::DanglingReference {
                        from: logical_id.clone(),
                        to: target.clone(),
                    });
                }
            }

            let mut referenced = Vec::new();
            collect_references(&resource.properties, &mut referenced);
            for target in referenced {
                if !self.is_valid_target(&target) {
                    return Err(SynthError::DanglingReference {
                        from: logical_id.clone(),
                        to: target,
                    });
                }
            }
        }
        Ok(())
    }

    fn is_valid_target(&self, target: &str) -> bool {
        target.starts_with("AWS::")
            || self.resources.contains_key(target)
            || self.parameters.contains_key(target)
    }
}
