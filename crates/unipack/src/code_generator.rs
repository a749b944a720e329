//! Bundle emission
//!
//! Turns the asset set into one self-contained program: a fixed runtime
//! prologue plus one registry entry per asset. Emission is a pure function
//! of its input; equal asset slices produce byte-identical output.
//!
//! The runtime defines nothing in the enclosing global scope. The whole
//! registry lives inside an immediately-invoked closure whose only
//! observable action is `load(0)`. `load` caches each module by identity
//! before the factory runs, so every module body executes at most once and
//! cyclic requires observe the in-progress exports object instead of
//! recursing forever.

use std::fmt::Write as _;

use crate::{
    error::{BundleError, BundleResult},
    types::Asset,
};

/// Runtime loader. `modules` maps identity to a `[factory, dependencyMap]`
/// pair; `load` gives each factory a specifier-resolving `require`, a fresh
/// `module` object and its `exports`.
const RUNTIME_PRELUDE: &str = "\
(function(modules) {
  var cache = Object.create(null);
  function load(id) {
    if (cache[id] !== undefined) {
      return cache[id].exports;
    }
    var entry = modules[id];
    var module = { exports: {} };
    cache[id] = module;
    function localRequire(specifier) {
      return load(entry[1][specifier]);
    }
    entry[0](localRequire, module, module.exports);
    return module.exports;
  }
  load(0);
})({
";

const RUNTIME_EPILOGUE: &str = "});\n";

/// Emit the complete bundle text for an asset set. Pure function, no I/O.
pub fn emit_bundle(assets: &[Asset]) -> BundleResult<String> {
    let mut registry = String::new();
    for asset in assets {
        let entry = ModuleEntry::from_asset(asset)?;
        entry.render(&mut registry);
    }

    let mut out =
        String::with_capacity(RUNTIME_PRELUDE.len() + registry.len() + RUNTIME_EPILOGUE.len());
    out.push_str(RUNTIME_PRELUDE);
    out.push_str(&registry);
    out.push_str(RUNTIME_EPILOGUE);
    Ok(out)
}

/// One registry entry, validated for safe embedding
#[derive(Debug)]
struct ModuleEntry<'a> {
    id: u32,
    factory_body: &'a str,
    dependency_map: &'a crate::types::FxIndexMap<String, crate::types::ModuleId>,
}

impl<'a> ModuleEntry<'a> {
    /// Check that the transpiled body can be embedded verbatim as a function
    /// body. Bodies never pass through string escaping, so disallowed
    /// control characters are fatal rather than silently mangled.
    fn from_asset(asset: &'a Asset) -> BundleResult<Self> {
        if let Some(bad) = asset
            .transpiled_body
            .chars()
            .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(BundleError::Emit {
                file: asset.source_path.clone(),
                reason: format!(
                    "transpiled body contains control character U+{:04X}",
                    bad as u32
                ),
            });
        }
        Ok(Self {
            id: asset.id.as_u32(),
            factory_body: &asset.transpiled_body,
            dependency_map: &asset.dependency_map,
        })
    }

    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "{}: [function(require, module, exports) {{", self.id);
        out.push_str(self.factory_body);
        if !self.factory_body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("}, {");
        for (i, (specifier, id)) in self.dependency_map.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}: {}", js_string_literal(specifier), id);
        }
        out.push_str("}],\n");
    }
}

/// Quote arbitrary text as a JavaScript string literal
///
/// The single escaping routine for all generated string literals. U+2028 and
/// U+2029 are line terminators in JavaScript and must not appear raw inside
/// a literal.
pub fn js_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
