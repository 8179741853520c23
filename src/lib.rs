//! solc-buildpack - Cloud Native Buildpack for the Solidity compiler
//!
//! Installs `solc` into a cacheable layer built from a checksummed
//! Node.js distribution, records its SBOM, and contributes launch
//! processes.

pub mod build;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod detect;
pub mod env;
pub mod error;
pub mod extract;
pub mod layer;
pub mod process;
pub mod sbom;
pub mod setup;
pub mod solc;

pub use error::{BuildpackError, BuildpackResult};
