//! Core types for taskstack
//!
//! This crate provides the construct model shared by all taskstack
//! resource crates: logical-id derivation, CloudFormation intrinsic
//! expressions, the resource/template data model, code-asset staging,
//! and the `Stack` container with its synthesis pass.

pub mod asset;
pub mod construct;
pub mod error;
pub mod expr;
pub mod resource;
pub mod stack;
pub mod template;

pub use asset::{Asset, AssetLocation, ASSETS_BUCKET_PARAM};
pub use construct::logical_id;
pub use error::SynthError;
pub use expr::Expr;
pub use resource::{CfnResource, DeletionPolicy};
pub use stack::Stack;
pub use template::{Parameter, Template};
