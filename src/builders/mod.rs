//! Builders to construct component sets from configuration.

pub mod toolkit_builder;

pub use toolkit_builder::{build_toolkit, Toolkit};
