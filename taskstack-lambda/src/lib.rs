//! Lambda constructs for taskstack

pub mod function;
pub mod layer;

pub use function::{Code, Function, FunctionProps, Runtime};
pub use layer::{LayerVersion, LayerVersionProps};
