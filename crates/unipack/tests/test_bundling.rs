use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use unipack::{Bundler, Config, ModuleId};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn bundler() -> Bundler {
    Bundler::new(Config::default())
}

#[test]
fn two_module_end_to_end() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "entry.js",
        "import x from './x.js';\nconsole.log(x);\n",
    );
    write(dir.path(), "x.js", "export default 42;\n");

    let bundler = bundler();
    let assets = bundler.build_graph(&dir.path().join("entry.js")).unwrap();

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].id, ModuleId::ENTRY);
    assert!(assets[0].source_path.ends_with("entry.js"));
    assert!(assets[1].source_path.ends_with("x.js"));
    assert_eq!(assets[0].raw_dependencies, vec!["./x.js"]);
    assert_eq!(assets[0].dependency_map["./x.js"], ModuleId::new(1));
    assert_eq!(
        assets[0].transpiled_body,
        "const x = require(\"./x.js\").default;\nconsole.log(x);\n"
    );
    assert_eq!(assets[1].transpiled_body, "exports.default = 42;\n");

    let bundle = bundler.bundle(&dir.path().join("entry.js")).unwrap();
    // Self-contained: an IIFE around a registry, evaluation starts at the
    // entry identity
    assert!(bundle.starts_with("(function(modules) {"));
    assert!(bundle.contains("load(0);"));
    assert!(bundle.contains("0: [function(require, module, exports) {"));
    assert!(bundle.contains("exports.default = 42;"));
    assert!(bundle.contains("{\"./x.js\": 1}"));
    assert!(bundle.ends_with("});\n"));
}

#[test]
fn missing_import_aborts_without_output() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "entry.js",
        "import y from './missing.js';\nconsole.log(y);\n",
    );

    let err = bundler().bundle(&dir.path().join("entry.js")).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("./missing.js"), "got: {message}");
    assert!(message.contains("entry.js"), "got: {message}");
}

#[test]
fn shared_module_is_bundled_once() {
    // entry and sib both import shared: exactly 3 assets, one identity for
    // shared referenced from both dependency maps
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "entry.js",
        "import s from './sib.js';\nimport a from './shared.js';\nconsole.log(s + a);\n",
    );
    write(
        dir.path(),
        "sib.js",
        "import a from './shared.js';\nexport default a + 1;\n",
    );
    write(dir.path(), "shared.js", "export default 1;\n");

    let assets = bundler().build_graph(&dir.path().join("entry.js")).unwrap();
    assert_eq!(assets.len(), 3);

    let entry = &assets[0];
    let sib = &assets[1];
    assert_eq!(
        entry.dependency_map["./shared.js"],
        sib.dependency_map["./shared.js"]
    );
}

#[test]
fn cyclic_modules_bundle_without_looping() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.js",
        "import { b } from './b.js';\nexport const a = 'a';\n",
    );
    write(
        dir.path(),
        "b.js",
        "import { a } from './a.js';\nexport const b = 'b';\n",
    );

    let bundler = bundler();
    let assets = bundler.build_graph(&dir.path().join("a.js")).unwrap();
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].dependency_map["./b.js"], ModuleId::new(1));
    assert_eq!(assets[1].dependency_map["./a.js"], ModuleId::ENTRY);

    // Emission also succeeds; the runtime cache keeps evaluation finite
    let bundle = bundler.bundle(&dir.path().join("a.js")).unwrap();
    assert!(bundle.contains("cache[id] = module;"));
}

#[test]
fn bundle_output_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "entry.js",
        "import x from './x.js';\nconsole.log(x);\n",
    );
    write(dir.path(), "x.js", "export default 42;\n");

    let bundler = bundler();
    let first = bundler.bundle(&dir.path().join("entry.js")).unwrap();
    let second = bundler.bundle(&dir.path().join("entry.js")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn write_bundle_creates_output_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "entry.js", "console.log('hello');\n");

    let out = dir.path().join("dist").join("bundle.js");
    bundler()
        .write_bundle(&dir.path().join("entry.js"), &out)
        .unwrap();

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("console.log('hello');"));
}

#[test]
fn parse_failure_names_the_offending_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "entry.js", "import b from './broken.js';\n");
    write(dir.path(), "broken.js", "const s = 'unterminated\n");

    let err = bundler().bundle(&dir.path().join("entry.js")).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("broken.js"), "got: {message}");
    assert!(message.contains("unterminated string literal"), "got: {message}");
}

#[test]
fn extension_inference_matches_explicit_import() {
    // `./util` and `./util.js` written by two different importers still
    // deduplicate to one asset
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "entry.js",
        "import a from './a.js';\nimport u from './util';\nconsole.log(a + u);\n",
    );
    write(dir.path(), "a.js", "import u from './util.js';\nexport default u;\n");
    write(dir.path(), "util.js", "export default 7;\n");

    let assets = bundler().build_graph(&dir.path().join("entry.js")).unwrap();
    assert_eq!(assets.len(), 3);
    assert_eq!(
        assets[0].dependency_map["./util"],
        assets[1].dependency_map["./util.js"]
    );
}
