//! unipack: a JavaScript source bundler
//!
//! Given one entry module, unipack discovers every module reachable through
//! static imports, assigns each a stable identity, rewrites module syntax to
//! an interoperable require/exports convention, and emits a single
//! self-contained .js file whose embedded runtime reproduces module-loading
//! semantics without a native loader.

pub mod code_generator;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph_builder;
pub mod orchestrator;
pub mod resolver;
pub mod types;

pub use config::Config;
pub use error::{BundleError, BundleResult};
pub use orchestrator::Bundler;
pub use types::{Asset, ModuleId};
