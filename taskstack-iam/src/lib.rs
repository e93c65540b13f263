//! IAM constructs for taskstack
//!
//! Policy documents, service roles, and the grant plumbing used by
//! resource crates to attach least-privilege statements to a grantee's
//! role.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use taskstack_core::{logical_id, CfnResource, Expr, Stack, SynthError};

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A single policy statement
#[derive(Debug, Clone, Serialize)]
pub struct PolicyStatement {
    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Action")]
    pub actions: Vec<String>,

    #[serde(rename = "Resource", skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Expr>,

    #[serde(rename = "Principal", skip_serializing_if = "Option::is_none")]
    pub principal: Option<Value>,
}

impl PolicyStatement {
    /// Allow `actions` on `resources`
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Self {
        Self {
            effect: Effect::Allow,
            actions: actions.iter().map(ToString::to_string).collect(),
            resources,
            principal: None,
        }
    }

    /// Allow a service principal to perform `actions` (no resource list;
    /// used in assume-role documents)
    pub fn allow_service(service: &str, actions: &[&str]) -> Self {
        Self {
            effect: Effect::Allow,
            actions: actions.iter().map(ToString::to_string).collect(),
            resources: Vec::new(),
            principal: Some(json!({"Service": service})),
        }
    }
}

/// An IAM policy document, version 2012-10-17
#[derive(Debug, Clone, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: &'static str,

    #[serde(rename = "Statement")]
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub const VERSION: &'static str = "2012-10-17";

    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: Self::VERSION,
            statements,
        }
    }
}

/// Constructs that can receive IAM grants expose the logical id of the
/// role their permissions attach to.
pub trait Grantable {
    fn role_logical_id(&self) -> &str;
}

/// An `AWS::IAM::Role` assumable by an AWS service
#[derive(Debug, Clone)]
pub struct Role {
    logical_id: String,
}

impl Role {
    /// Declare a role assumable by `service` (e.g. `lambda.amazonaws.com`)
    /// with the given managed policies attached
    pub fn service(
        stack: &mut Stack,
        path: &[&str],
        service: &str,
        managed_policy_arns: &[&str],
    ) -> Result<Self, SynthError> {
        let id = logical_id(path);
        let assume = PolicyDocument::new(vec![PolicyStatement::allow_service(
            service,
            &["sts:AssumeRole"],
        )]);

        let mut properties = json!({
            "AssumeRolePolicyDocument": serde_json::to_value(&assume)?,
        });
        if !managed_policy_arns.is_empty() {
            let arns: Vec<Expr> = managed_policy_arns
                .iter()
                .map(|suffix| {
                    Expr::Sub(format!("arn:${{AWS::Partition}}:iam::aws:policy/{suffix}"))
                })
                .collect();
            properties["ManagedPolicyArns"] = serde_json::to_value(arns)?;
        }

        stack.add_resource(&id, CfnResource::new("AWS::IAM::Role", properties))?;
        Ok(Self { logical_id: id })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }
}

impl Grantable for Role {
    fn role_logical_id(&self) -> &str {
        &self.logical_id
    }
}

/// Append `statement` to the grantee role's default inline policy,
/// creating the `AWS::IAM::Policy` resource on first use.
///
/// Repeated grants against the same role accumulate statements in one
/// document rather than fanning out into separate policy resources.
pub fn attach_inline_statement(
    stack: &mut Stack,
    grantee: &dyn Grantable,
    statement: PolicyStatement,
) -> Result<(), SynthError> {
    let role_id = grantee.role_logical_id().to_string();
    let policy_id = logical_id(&[&role_id, "DefaultPolicy"]);

    if !stack.contains_resource(&policy_id) {
        let document = PolicyDocument::new(Vec::new());
        let properties = json!({
            "PolicyName": policy_id.clone(),
            "PolicyDocument": serde_json::to_value(&document)?,
            "Roles": [serde_json::to_value(Expr::Ref(role_id.clone()))?],
        });
        stack.add_resource(&policy_id, CfnResource::new("AWS::IAM::Policy", properties))?;
    }

    debug!(role = %role_id, actions = ?statement.actions, "attached inline statement");

    let resource = stack.resource_mut(&policy_id)?;
    let statements = resource
        .properties
        .pointer_mut("/PolicyDocument/Statement")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| SynthError::ResourceNotFound(policy_id.clone()))?;
    statements.push(serde_json::to_value(statement)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeGrantee(String);

    impl Grantable for FakeGrantee {
        fn role_logical_id(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_policy_document_wire_shape() {
        let doc = PolicyDocument::new(vec![PolicyStatement::allow(
            &["dynamodb:GetItem"],
            vec![Expr::get_att("Table1", "Arn")],
        )]);
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["Version"], "2012-10-17");
        assert_eq!(v["Statement"][0]["Effect"], "Allow");
        assert_eq!(v["Statement"][0]["Action"][0], "dynamodb:GetItem");
        assert_eq!(
            v["Statement"][0]["Resource"][0],
            serde_json::json!({"Fn::GetAtt": ["Table1", "Arn"]})
        );
    }

    #[test]
    fn test_service_role_assume_document() {
        let mut stack = Stack::new("Test").unwrap();
        let role = Role::service(
            &mut stack,
            &["Fn1", "ServiceRole"],
            "lambda.amazonaws.com",
            &["service-role/AWSLambdaBasicExecutionRole"],
        )
        .unwrap();

        let props = stack.resource_properties(role.logical_id()).unwrap();
        assert_eq!(
            props["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "lambda.amazonaws.com"
        );
        assert!(props["ManagedPolicyArns"][0]["Fn::Sub"]
            .as_str()
            .unwrap()
            .ends_with("AWSLambdaBasicExecutionRole"));
    }

    #[test]
    fn test_grants_accumulate_in_one_policy() {
        let mut stack = Stack::new("Test").unwrap();
        stack
            .add_resource(
                "Role1",
                CfnResource::new("AWS::IAM::Role", serde_json::json!({})),
            )
            .unwrap();
        let grantee = FakeGrantee("Role1".to_string());

        attach_inline_statement(
            &mut stack,
            &grantee,
            PolicyStatement::allow(&["dynamodb:GetItem"], vec![Expr::get_att("T", "Arn")]),
        )
        .unwrap();
        attach_inline_statement(
            &mut stack,
            &grantee,
            PolicyStatement::allow(&["dynamodb:PutItem"], vec![Expr::get_att("T", "Arn")]),
        )
        .unwrap();

        let policies = stack.resources_of_type("AWS::IAM::Policy");
        assert_eq!(policies.len(), 1);
        let props = stack.resource_properties(&policies[0]).unwrap();
        assert_eq!(
            props["PolicyDocument"]["Statement"].as_array().unwrap().len(),
            2
        );
    }
}
