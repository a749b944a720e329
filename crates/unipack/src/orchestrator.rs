//! Build orchestration
//!
//! Wires configuration, resolver, graph builder and code generator into one
//! entry-path-in, bundle-text-out pipeline. Each run is independent; nothing
//! is shared across invocations.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::{
    code_generator::emit_bundle,
    compiler::{EsCompiler, SourceCompiler},
    config::Config,
    graph_builder::GraphBuilder,
    resolver::ImportResolver,
    types::Asset,
};

/// Runs a complete bundling pipeline for one configuration
#[derive(Debug)]
pub struct Bundler<C = EsCompiler> {
    config: Config,
    compiler: C,
}

impl Bundler {
    /// Bundler using the default ECMAScript module compiler
    pub fn new(config: Config) -> Self {
        Self {
            config,
            compiler: EsCompiler,
        }
    }
}

impl<C: SourceCompiler> Bundler<C> {
    /// Bundler with an injected source compiler
    pub fn with_compiler(config: Config, compiler: C) -> Self {
        Self { config, compiler }
    }

    /// Discover the asset graph reachable from `entry`
    pub fn build_graph(&self, entry: &Path) -> Result<Vec<Asset>> {
        let resolver = ImportResolver::from_config(&self.config, entry);
        let builder = GraphBuilder::new(&self.compiler, resolver, self.config.target);
        let assets = builder.build_graph(entry)?;
        info!("discovered {} modules from {}", assets.len(), entry.display());
        Ok(assets)
    }

    /// Produce the bundle text for `entry`
    pub fn bundle(&self, entry: &Path) -> Result<String> {
        let assets = self.build_graph(entry)?;
        let bundle = emit_bundle(&assets)?;
        info!("emitted bundle: {} bytes", bundle.len());
        Ok(bundle)
    }

    /// Bundle `entry` and write the result to `output`. The output file is
    /// only touched after the whole bundle succeeded; a failed build never
    /// leaves partial output behind.
    pub fn write_bundle(&self, entry: &Path, output: &Path) -> Result<()> {
        let bundle = self.bundle(entry)?;
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output directory {}", parent.display()))?;
        }
        std::fs::write(output, bundle)
            .with_context(|| format!("failed to write bundle to {}", output.display()))?;
        info!("wrote bundle to {}", output.display());
        Ok(())
    }
}
