//! Synthesized CloudFormation template

use serde::Serialize;
use std::collections::BTreeMap;

use crate::resource::CfnResource;

/// A template parameter
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            parameter_type: "String".to_string(),
            description: Some(description.into()),
        }
    }
}

/// A fully synthesized template. Maps are `BTreeMap` so the JSON output
/// is byte-stable across synthesis passes.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, CfnResource>,
}

impl Template {
    pub const FORMAT_VERSION: &'static str = "2010-09-09";

    /// Render the template as JSON
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Logical ids of resources with the given CloudFormation type,
    /// in logical-id order
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_serializes_sorted_resources() {
        let mut resources = BTreeMap::new();
        resources.insert(
            "Zeta".to_string(),
            CfnResource::new("AWS::DynamoDB::Table", json!({})),
        );
        resources.insert(
            "Alpha".to_string(),
            CfnResource::new("AWS::Lambda::Function", json!({})),
        );
        let template = Template {
            format_version: Template::FORMAT_VERSION,
            description: None,
            parameters: BTreeMap::new(),
            resources,
        };

        let json = template.to_json(false).unwrap();
        assert!(json.find("Alpha").unwrap() < json.find("Zeta").unwrap());
        assert!(json.contains(r#""AWSTemplateFormatVersion":"2010-09-09""#));
    }

    #[test]
    fn test_resources_of_type_filters() {
        let mut resources = BTreeMap::new();
        resources.insert(
            "T".to_string(),
            CfnResource::new("AWS::DynamoDB::Table", json!({})),
        );
        resources.insert(
            "F".to_string(),
            CfnResource::new("AWS::Lambda::Function", json!({})),
        );
        let template = Template {
            format_version: Template::FORMAT_VERSION,
            description: None,
            parameters: BTreeMap::new(),
            resources,
        };

        assert_eq!(template.resources_of_type("AWS::DynamoDB::Table"), vec!["T"]);
    }
}
