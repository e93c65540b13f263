//! CloudFormation intrinsic expressions

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A template value that is either a literal string or a CloudFormation
/// intrinsic. Serializes to the wire form CloudFormation expects:
/// `"text"`, `{"Ref": "Id"}`, `{"Fn::GetAtt": ["Id", "Attr"]}`, or
/// `{"Fn::Sub": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Literal string
    Lit(String),
    /// `Ref` to a resource, parameter, or `AWS::*` pseudo parameter
    Ref(String),
    /// `Fn::GetAtt` on a resource attribute
    GetAtt { logical_id: String, attribute: String },
    /// `Fn::Sub` template; `${Target}` and `${Target.Attr}` are resolved
    /// by CloudFormation at deploy time
    Sub(String),
}

impl Expr {
    pub fn lit(s: impl Into<String>) -> Self {
        Self::Lit(s.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    /// Logical ids this expression refers to, as (source, target) pairs
    /// for the synthesis validation pass. `Fn::Sub` targets include the
    /// part before any `.attribute` suffix.
    pub fn referenced_ids(&self) -> Vec<String> {
        match self {
            Self::Lit(_) => Vec::new(),
            Self::Ref(id) => vec![id.clone()],
            Self::GetAtt { logical_id, .. } => vec![logical_id.clone()],
            Self::Sub(template) => sub_targets(template),
        }
    }
}

/// Extract `${X}` / `${X.Attr}` targets from an `Fn::Sub` template.
/// `${!escaped}` sequences are skipped, matching CloudFormation.
pub(crate) fn sub_targets(template: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else { break };
        let inner = &tail[..end];
        if !inner.starts_with('!') && !inner.is_empty() {
            let id = inner.split('.').next().unwrap_or(inner);
            targets.push(id.to_string());
        }
        rest = &tail[end + 1..];
    }
    targets
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Lit(s) => serializer.serialize_str(s),
            Self::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Self::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?;
                map.end()
            }
            Self::Sub(template) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Sub", template)?;
                map.end()
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Self::Lit(s.to_string())
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Self::Lit(s)
    }
}

/// Collect every logical id referenced by intrinsics inside an already
/// serialized properties value. Used by the stack validation pass.
pub(crate) fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    out.push(id.clone());
                    return;
                }
                if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(id)) = parts.first() {
                        out.push(id.clone());
                    }
                    return;
                }
                if let Some(Value::String(template)) = map.get("Fn::Sub") {
                    out.extend(sub_targets(template));
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, out);
            }
        }
        _ => {}
    }
}
