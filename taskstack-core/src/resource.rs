//! CloudFormation resource model

use serde::Serialize;
use serde_json::Value;

/// Deletion behavior CloudFormation applies when a resource leaves the
/// stack or is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
}

/// A single entry in the template's `Resources` map
#[derive(Debug, Clone, Serialize)]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties")]
    pub properties: Value,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl CfnResource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_serialization_omits_empty_fields() {
        let resource = CfnResource::new("AWS::Lambda::Function", json!({"Handler": "h"}));
        let v = serde_json::to_value(&resource).unwrap();
        assert_eq!(v, json!({"Type": "AWS::Lambda::Function", "Properties": {"Handler": "h"}}));
    }

    #[test]
    fn test_deletion_policy_sets_both_arms() {
        let resource = CfnResource::new("AWS::DynamoDB::Table", json!({}))
            .with_deletion_policy(DeletionPolicy::Delete);
        let v = serde_json::to_value(&resource).unwrap();
        assert_eq!(v["DeletionPolicy"], json!("Delete"));
        assert_eq!(v["UpdateReplacePolicy"], json!("Delete"));
    }

    #[test]
    fn test_depends_on_serialized_in_order() {
        let resource = CfnResource::new("AWS::ApiGateway::Deployment", json!({}))
            .depends_on("MethodA")
            .depends_on("MethodB");
        let v = serde_json::to_value(&resource).unwrap();
        assert_eq!(v["DependsOn"], json!(["MethodA", "MethodB"]));
    }
}
