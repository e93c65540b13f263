//! DynamoDB table construct
//!
//! Declares `AWS::DynamoDB::Table` resources and carries the
//! least-privilege data grants: read, write, and read-write action sets
//! scoped to the table ARN, attached to a grantee's default policy.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use taskstack_core::{logical_id, CfnResource, DeletionPolicy, Expr, Stack, SynthError};
use taskstack_iam::{attach_inline_statement, Grantable, PolicyStatement};

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]{3,255}$").expect("valid regex"));

/// Partition / sort key attribute types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttributeType {
    S,
    N,
    B,
}

/// A key attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl Attribute {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::S,
        }
    }
}

/// Table billing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    PayPerRequest,
    Provisioned,
}

/// What happens to the table when it leaves the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Destroy,
    Retain,
}

impl RemovalPolicy {
    fn deletion_policy(self) -> DeletionPolicy {
        match self {
            Self::Destroy => DeletionPolicy::Delete,
            Self::Retain => DeletionPolicy::Retain,
        }
    }
}

/// Table declaration properties
#[derive(Debug, Clone)]
pub struct TableProps {
    pub table_name: Option<String>,
    pub partition_key: Attribute,
    pub billing_mode: BillingMode,
    pub deletion_protection: bool,
    pub removal_policy: RemovalPolicy,
}

/// Actions matching the managed read-data grant
const READ_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
    "dynamodb:GetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:Scan",
];

/// Actions matching the managed write-data grant
const WRITE_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
];

/// An `AWS::DynamoDB::Table`
#[derive(Debug, Clone)]
pub struct Table {
    logical_id: String,
}

impl Table {
    pub fn new(stack: &mut Stack, id: &str, props: TableProps) -> Result<Self, SynthError> {
        taskstack_core::construct::validate_id(id)?;
        if let Some(name) = &props.table_name {
            if !TABLE_NAME.is_match(name) {
                return Err(SynthError::InvalidResourceName {
                    kind: "DynamoDB table",
                    name: name.clone(),
                });
            }
        }
        if props.partition_key.name.is_empty() {
            return Err(SynthError::InvalidResourceName {
                kind: "partition key",
                name: String::new(),
            });
        }

        let logical = logical_id(&[id]);
        let mut properties = json!({
            "KeySchema": [{
                "AttributeName": props.partition_key.name,
                "KeyType": "HASH",
            }],
            "AttributeDefinitions": [{
                "AttributeName": props.partition_key.name,
                "AttributeType": serde_json::to_value(props.partition_key.attribute_type)?,
            }],
            "BillingMode": serde_json::to_value(props.billing_mode)?,
            "DeletionProtectionEnabled": props.deletion_protection,
        });
        if let Some(name) = props.table_name {
            properties["TableName"] = json!(name);
        }

        let resource = CfnResource::new("AWS::DynamoDB::Table", properties)
            .with_deletion_policy(props.removal_policy.deletion_policy());
        stack.add_resource(&logical, resource)?;

        Ok(Self {
            logical_id: logical,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The table's name, resolved at deploy time
    pub fn table_name(&self) -> Expr {
        Expr::Ref(self.logical_id.clone())
    }

    pub fn table_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// Grant read access to the table's data
    pub fn grant_read_data(
        &self,
        stack: &mut Stack,
        grantee: &dyn Grantable,
    ) -> Result<(), SynthError> {
        self.grant(stack, grantee, READ_DATA_ACTIONS)
    }

    /// Grant write access to the table's data
    pub fn grant_write_data(
        &self,
        stack: &mut Stack,
        grantee: &dyn Grantable,
    ) -> Result<(), SynthError> {
        self.grant(stack, grantee, WRITE_DATA_ACTIONS)
    }

    /// Grant read and write access to the table's data
    pub fn grant_read_write_data(
        &self,
        stack: &mut Stack,
        grantee: &dyn Grantable,
    ) -> Result<(), SynthError> {
        let mut actions: Vec<&str> = READ_DATA_ACTIONS
            .iter()
            .chain(WRITE_DATA_ACTIONS)
            .copied()
            .collect();
        actions.sort_unstable();
        actions.dedup();
        self.grant(stack, grantee, &actions)
    }

    fn grant(
        &self,
        stack: &mut Stack,
        grantee: &dyn Grantable,
        actions: &[&str],
    ) -> Result<(), SynthError> {
        debug!(table = %self.logical_id, role = %grantee.role_logical_id(), "table grant");
        attach_inline_statement(
            stack,
            grantee,
            PolicyStatement::allow(actions, vec![self.table_arn()]),
        )
    }
}
