//! Dependency graph construction
//!
//! Walks the module graph breadth-first from the entry file, creating one
//! [`Asset`] per distinct source path. Identity assignment is owned by the
//! builder's path table, so builds are deterministic and independent; there
//! is no process-wide counter.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    compiler::{SourceCompiler, TargetOptions},
    error::{BundleError, BundleResult},
    resolver::ImportResolver,
    types::{Asset, FxIndexMap, ModuleId},
};

/// Builds the complete, deduplicated asset set reachable from an entry file
#[derive(Debug)]
pub struct GraphBuilder<'a, C> {
    compiler: &'a C,
    resolver: ImportResolver,
    target: TargetOptions,
}

impl<'a, C: SourceCompiler> GraphBuilder<'a, C> {
    pub fn new(compiler: &'a C, resolver: ImportResolver, target: TargetOptions) -> Self {
        Self {
            compiler,
            resolver,
            target,
        }
    }

    /// Discover every module reachable from `entry`, in breadth-first
    /// discovery order. The entry asset always has identity 0.
    ///
    /// A path's identity is fixed the first time it is seen, not when its
    /// processing completes, so importers can record dependency identities
    /// before the target module has been read. Cycles terminate because each
    /// distinct path is processed at most once.
    pub fn build_graph(&self, entry: &Path) -> BundleResult<Vec<Asset>> {
        let entry_path = self.resolver.resolve_entry(entry)?;

        // Insertion order doubles as identity assignment
        let mut ids: FxIndexMap<PathBuf, ModuleId> = FxIndexMap::default();
        let mut worklist: VecDeque<PathBuf> = VecDeque::new();
        let mut assets = Vec::new();

        ids.insert(entry_path.clone(), ModuleId::ENTRY);
        worklist.push_back(entry_path);

        while let Some(path) = worklist.pop_front() {
            let id = ids[&path];
            debug!("processing module {id}: {}", path.display());

            let source = std::fs::read_to_string(&path).map_err(|source| BundleError::Io {
                file: path.clone(),
                source,
            })?;
            let ast = self.compiler.parse(&source, &path)?;
            let raw_dependencies = self.compiler.extract_imports(&ast);
            let transpiled_body = self.compiler.transpile(&ast, &self.target)?;

            let mut dependency_map = FxIndexMap::default();
            for specifier in &raw_dependencies {
                if dependency_map.contains_key(specifier) {
                    continue;
                }
                let resolved = self.resolver.resolve(&path, specifier)?;
                let dep_id = match ids.get(&resolved) {
                    Some(existing) => *existing,
                    None => {
                        let fresh = ModuleId::new(ids.len() as u32);
                        ids.insert(resolved.clone(), fresh);
                        worklist.push_back(resolved);
                        fresh
                    }
                };
                dependency_map.insert(specifier.clone(), dep_id);
            }

            assets.push(Asset {
                id,
                source_path: path,
                raw_dependencies,
                transpiled_body,
                dependency_map,
            });
        }

        debug!("graph complete: {} modules", assets.len());
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compiler with canned outputs so traversal logic is tested without
    /// any real parsing
    #[derive(Debug, Default)]
    struct FakeCompiler;

    /// "Syntax tree" of the fake: one specifier per non-empty line
    #[derive(Debug)]
    struct FakeAst {
        imports: Vec<String>,
    }

    impl SourceCompiler for FakeCompiler {
        type Ast = FakeAst;

        fn parse(&self, source: &str, _path: &Path) -> BundleResult<FakeAst> {
            Ok(FakeAst {
                imports: source
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_owned)
                    .collect(),
            })
        }

        fn extract_imports(&self, ast: &FakeAst) -> Vec<String> {
            ast.imports.clone()
        }

        fn transpile(&self, ast: &FakeAst, _target: &TargetOptions) -> BundleResult<String> {
            Ok(format!("/* {} imports */", ast.imports.len()))
        }
    }

    fn builder(compiler: &FakeCompiler) -> GraphBuilder<'_, FakeCompiler> {
        GraphBuilder::new(
            compiler,
            ImportResolver::new(vec![".js".into()], None),
            TargetOptions::default(),
        )
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn single_module_graph() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "entry.js", "");

        let compiler = FakeCompiler;
        let assets = builder(&compiler)
            .build_graph(&dir.path().join("entry.js"))
            .unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, ModuleId::ENTRY);
        assert!(assets[0].raw_dependencies.is_empty());
    }

    #[test]
    fn breadth_first_identity_assignment() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "entry.js", "./a.js\n./b.js\n");
        write(dir.path(), "a.js", "./c.js\n");
        write(dir.path(), "b.js", "");
        write(dir.path(), "c.js", "");

        let compiler = FakeCompiler;
        let assets = builder(&compiler)
            .build_graph(&dir.path().join("entry.js"))
            .unwrap();

        // Entry first, then its direct dependencies in source order, then
        // theirs
        let names: Vec<_> = assets
            .iter()
            .map(|a| a.source_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["entry.js", "a.js", "b.js", "c.js"]);
        for (i, asset) in assets.iter().enumerate() {
            assert_eq!(asset.id, ModuleId::new(i as u32));
        }
    }

    #[test]
    fn cyclic_imports_terminate_with_cross_populated_maps() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "a.js", "./b.js\n");
        write(dir.path(), "b.js", "./a.js\n");

        let compiler = FakeCompiler;
        let assets = builder(&compiler)
            .build_graph(&dir.path().join("a.js"))
            .unwrap();

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].dependency_map["./b.js"], ModuleId::new(1));
        assert_eq!(assets[1].dependency_map["./a.js"], ModuleId::ENTRY);
    }

    #[test]
    fn shared_dependency_is_deduplicated() {
        // entry -> left -> shared, entry -> right -> shared: 4 assets, and
        // both siblings reference the same identity for shared
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "entry.js", "./left.js\n./right.js\n");
        write(dir.path(), "left.js", "./shared.js\n");
        write(dir.path(), "right.js", "./shared.js\n");
        write(dir.path(), "shared.js", "");

        let compiler = FakeCompiler;
        let assets = builder(&compiler)
            .build_graph(&dir.path().join("entry.js"))
            .unwrap();

        assert_eq!(assets.len(), 4);
        let left = &assets[1];
        let right = &assets[2];
        assert_eq!(
            left.dependency_map["./shared.js"],
            right.dependency_map["./shared.js"]
        );
    }

    #[test]
    fn duplicate_specifiers_in_one_module_are_harmless() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "entry.js", "./a.js\n./a.js\n");
        write(dir.path(), "a.js", "");

        let compiler = FakeCompiler;
        let assets = builder(&compiler)
            .build_graph(&dir.path().join("entry.js"))
            .unwrap();

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].raw_dependencies, vec!["./a.js", "./a.js"]);
        assert_eq!(assets[0].dependency_map.len(), 1);
    }

    #[test]
    fn dependency_map_keys_match_raw_dependencies() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "entry.js", "./a.js\n./b.js\n./a.js\n");
        write(dir.path(), "a.js", "");
        write(dir.path(), "b.js", "");

        let compiler = FakeCompiler;
        let assets = builder(&compiler)
            .build_graph(&dir.path().join("entry.js"))
            .unwrap();

        let keys: Vec<_> = assets[0].dependency_map.keys().cloned().collect();
        assert_eq!(keys, vec!["./a.js", "./b.js"]);
    }

    #[test]
    fn missing_dependency_aborts_the_build() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "entry.js", "./missing.js\n");

        let compiler = FakeCompiler;
        let err = builder(&compiler)
            .build_graph(&dir.path().join("entry.js"))
            .unwrap_err();
        assert!(matches!(err, BundleError::Resolution { .. }));
        assert!(err.to_string().contains("./missing.js"));
        assert!(err.to_string().contains("entry.js"));
    }

    #[test]
    fn missing_entry_is_a_resolution_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let compiler = FakeCompiler;
        let err = builder(&compiler)
            .build_graph(&dir.path().join("nope.js"))
            .unwrap_err();
        assert!(matches!(err, BundleError::Resolution { .. }));
    }
}
