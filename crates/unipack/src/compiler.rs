//! Source compiler seam and the default ECMAScript module compiler
//!
//! The graph builder consumes parsing and transpilation through the
//! [`SourceCompiler`] trait so traversal logic can be exercised with a fake
//! compiler returning fixed outputs. The default implementation,
//! [`EsCompiler`], recognizes top-level `import`/`export` declarations with a
//! comment/string/template-aware scanner and rewrites them to the
//! interoperable require/exports convention. Everything else in a module is
//! copied through verbatim.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    code_generator::js_string_literal,
    error::{BundleError, BundleResult},
};

/// Options describing the execution environment the transpiled code targets
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetOptions {
    /// Emit `var` bindings and member accesses instead of `const` and
    /// destructuring, for pre-ES2015 targets
    pub use_var: bool,
}

/// Parsing and transpilation capability consumed by the graph builder
pub trait SourceCompiler {
    /// Parsed representation of one module
    type Ast;

    /// Parse source text into a syntax tree
    fn parse(&self, source: &str, path: &Path) -> BundleResult<Self::Ast>;

    /// Dependency specifiers in source order, duplicates preserved
    fn extract_imports(&self, ast: &Self::Ast) -> Vec<String>;

    /// Rewrite the module as a function body expecting call-time `require`,
    /// `module` and `exports` bindings
    fn transpile(&self, ast: &Self::Ast, target: &TargetOptions) -> BundleResult<String>;
}

/// The default source compiler for ECMAScript modules
#[derive(Debug, Clone, Copy, Default)]
pub struct EsCompiler;

impl SourceCompiler for EsCompiler {
    type Ast = Program;

    fn parse(&self, source: &str, path: &Path) -> BundleResult<Program> {
        Scanner::new(source, path).parse_program()
    }

    fn extract_imports(&self, ast: &Program) -> Vec<String> {
        ast.import_specifiers()
    }

    fn transpile(&self, ast: &Program, target: &TargetOptions) -> BundleResult<String> {
        Ok(ast.render(target))
    }
}

/// A parsed module: verbatim code runs interleaved with the structured
/// module-syntax declarations the scanner lifted out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Source text copied through untouched
    Code(String),
    Import(ImportDecl),
    Export(ExportDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportDecl {
    specifier: String,
    clause: ImportClause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportClause {
    /// `import './m.js'`
    SideEffect,
    /// `import d from '...'`
    Default(String),
    /// `import * as ns from '...'`
    Namespace(String),
    /// `import { a, b as c } from '...'`
    Named(Vec<NamedBinding>),
    /// `import d, { a } from '...'`
    DefaultAndNamed(String, Vec<NamedBinding>),
    /// `import d, * as ns from '...'`
    DefaultAndNamespace(String, String),
}

/// One `a` or `a as b` entry in an import or export brace list
#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedBinding {
    /// Name on the module-record side (imported name, or local name for
    /// exports)
    source: String,
    /// Name bound or exposed on this side (local binding, or exported name)
    target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExportDecl {
    /// `export default <expression or declaration>`
    Default { code: String },
    /// `export const/let/var/function/class ...`
    Declaration { code: String, names: Vec<String> },
    /// `export { a, b as c }`
    Named { bindings: Vec<NamedBinding> },
    /// `export { a, b as c } from '...'`
    NamedFrom {
        bindings: Vec<NamedBinding>,
        specifier: String,
    },
    /// `export * from '...'` and `export * as ns from '...'`
    StarFrom {
        alias: Option<String>,
        specifier: String,
    },
}

impl Program {
    /// Dependency specifiers in source order, duplicates preserved.
    /// Re-export declarations participate like imports.
    fn import_specifiers(&self) -> Vec<String> {
        let mut specifiers = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Import(decl) => specifiers.push(decl.specifier.clone()),
                Segment::Export(
                    ExportDecl::NamedFrom { specifier, .. }
                    | ExportDecl::StarFrom { specifier, .. },
                ) => specifiers.push(specifier.clone()),
                _ => {}
            }
        }
        specifiers
    }

    /// Render the module as a require/exports function body
    fn render(&self, target: &TargetOptions) -> String {
        let kw = if target.use_var { "var" } else { "const" };
        let mut out = String::new();
        // Counter for helper bindings so repeated imports never collide
        let mut temp = 0usize;

        for segment in &self.segments {
            match segment {
                Segment::Code(code) => out.push_str(code),
                Segment::Import(decl) => {
                    render_import(&mut out, decl, kw, target.use_var, &mut temp);
                }
                Segment::Export(decl) => render_export(&mut out, decl, kw, &mut temp),
            }
        }
        out
    }
}

fn render_require(specifier: &str) -> String {
    format!("require({})", js_string_literal(specifier))
}

fn render_named_bindings(out: &mut String, bindings: &[NamedBinding], kw: &str, source_expr: &str) {
    // ES2015 targets get a destructuring pattern, ES5 targets get one
    // member access per binding.
    if kw == "var" {
        for binding in bindings {
            let _ = write!(
                out,
                "var {} = {}.{}; ",
                binding.target, source_expr, binding.source
            );
        }
        // Trim the trailing separator space
        out.pop();
    } else {
        out.push_str("const { ");
        for (i, binding) in bindings.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if binding.source == binding.target {
                out.push_str(&binding.source);
            } else {
                let _ = write!(out, "{}: {}", binding.source, binding.target);
            }
        }
        let _ = write!(out, " }} = {source_expr};");
    }
}

fn render_import(out: &mut String, decl: &ImportDecl, kw: &str, use_var: bool, temp: &mut usize) {
    let require = render_require(&decl.specifier);
    match &decl.clause {
        ImportClause::SideEffect => {
            let _ = write!(out, "{require};");
        }
        ImportClause::Default(local) => {
            let _ = write!(out, "{kw} {local} = {require}.default;");
        }
        ImportClause::Namespace(local) => {
            let _ = write!(out, "{kw} {local} = {require};");
        }
        ImportClause::Named(bindings) => {
            if use_var {
                let helper = next_helper(temp, "_imported");
                let _ = write!(out, "var {helper} = {require}; ");
                render_named_bindings(out, bindings, kw, &helper);
            } else {
                render_named_bindings(out, bindings, kw, &require);
            }
        }
        ImportClause::DefaultAndNamed(local, bindings) => {
            let helper = next_helper(temp, "_imported");
            let _ = write!(out, "{kw} {helper} = {require}; {kw} {local} = {helper}.default; ");
            render_named_bindings(out, bindings, kw, &helper);
        }
        ImportClause::DefaultAndNamespace(local, namespace) => {
            let _ = write!(
                out,
                "{kw} {namespace} = {require}; {kw} {local} = {namespace}.default;"
            );
        }
    }
}

fn render_export(out: &mut String, decl: &ExportDecl, kw: &str, temp: &mut usize) {
    match decl {
        ExportDecl::Default { code } => {
            let _ = write!(out, "exports.default = {code};");
        }
        ExportDecl::Declaration { code, names } => {
            let _ = write!(out, "{code};");
            for name in names {
                let _ = write!(out, " exports.{name} = {name};");
            }
        }
        ExportDecl::Named { bindings } => {
            for (i, binding) in bindings.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "exports.{} = {};", binding.target, binding.source);
            }
        }
        ExportDecl::NamedFrom {
            bindings,
            specifier,
        } => {
            let helper = next_helper(temp, "_reexport");
            let _ = write!(out, "{kw} {helper} = {};", render_require(specifier));
            for binding in bindings {
                let _ = write!(
                    out,
                    " exports.{} = {}.{};",
                    binding.target, helper, binding.source
                );
            }
        }
        ExportDecl::StarFrom {
            alias: Some(name),
            specifier,
        } => {
            let _ = write!(out, "exports.{name} = {};", render_require(specifier));
        }
        ExportDecl::StarFrom {
            alias: None,
            specifier,
        } => {
            let helper = next_helper(temp, "_reexport");
            let key = next_helper(temp, "_key");
            let _ = write!(
                out,
                "{kw} {helper} = {}; for (var {key} in {helper}) if ({key} !== \"default\") \
                 exports[{key}] = {helper}[{key}];",
                render_require(specifier)
            );
        }
    }
}

fn next_helper(temp: &mut usize, prefix: &str) -> String {
    let name = format!("{prefix}{temp}");
    *temp += 1;
    name
}

/// Characters that may start or continue an identifier word
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Keywords after which an expression (and so a regex literal) may begin
fn is_expression_keyword(word: &str) -> bool {
    matches!(
        word,
        "return"
            | "typeof"
            | "case"
            | "in"
            | "of"
            | "new"
            | "delete"
            | "void"
            | "instanceof"
            | "do"
            | "else"
            | "yield"
            | "await"
            | "throw"
    )
}

/// Significant characters after which a `/` starts a regex literal rather
/// than a division
fn regex_can_follow(last: Option<char>) -> bool {
    match last {
        None => true,
        Some(c) => matches!(
            c,
            '=' | '(' | ',' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';' | '+' | '-'
                | '*' | '%' | '<' | '>' | '~' | '^'
        ),
    }
}

/// Single-pass scanner over one module's source text
///
/// Operates on bytes; every delimiter it matches is ASCII, so slicing at
/// match positions always lands on UTF-8 boundaries. Non-ASCII text is only
/// ever copied through inside code runs.
struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    path: PathBuf,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, path: &Path) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            path: path.to_path_buf(),
        }
    }

    fn error(&self, message: impl Into<String>) -> BundleError {
        BundleError::Parse {
            file: self.path.clone(),
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        if b == b'\n' {
            self.line += 1;
        }
        self.pos += 1;
        Some(b)
    }

    fn parse_program(mut self) -> BundleResult<Program> {
        let mut segments = Vec::new();
        let mut code = String::new();
        // Bracket nesting outside of strings and comments; declarations are
        // only recognized at the top level
        let mut depth = 0i64;
        // Last significant (non-whitespace, non-comment) character copied
        // into the current code run; drives the regex-vs-division heuristic
        // and rejects `obj.import` member accesses
        let mut last_significant: Option<char> = None;

        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => {
                    let start = self.pos;
                    self.skip_string(b)?;
                    code.push_str(&self.src[start..self.pos]);
                    last_significant = Some(char::from(b));
                }
                b'`' => {
                    let start = self.pos;
                    self.skip_template()?;
                    code.push_str(&self.src[start..self.pos]);
                    last_significant = Some('`');
                }
                b'/' => {
                    let start = self.pos;
                    match self.bytes.get(self.pos + 1) {
                        Some(b'/') => {
                            self.skip_line_comment();
                            code.push_str(&self.src[start..self.pos]);
                        }
                        Some(b'*') => {
                            self.skip_block_comment()?;
                            code.push_str(&self.src[start..self.pos]);
                        }
                        _ if regex_can_follow(last_significant) => {
                            self.skip_regex()?;
                            code.push_str(&self.src[start..self.pos]);
                            last_significant = Some('/');
                        }
                        _ => {
                            self.bump();
                            code.push('/');
                            last_significant = Some('/');
                        }
                    }
                }
                b'{' | b'(' | b'[' => {
                    depth += 1;
                    self.bump();
                    code.push(char::from(b));
                    last_significant = Some(char::from(b));
                }
                b'}' | b')' | b']' => {
                    depth -= 1;
                    self.bump();
                    code.push(char::from(b));
                    last_significant = Some(char::from(b));
                }
                _ if is_ident_start(b) => {
                    let word = self.read_word();
                    let is_decl = depth == 0
                        && last_significant != Some('.')
                        && match word {
                            // `import(...)` and `import.meta` are expressions
                            "import" => !matches!(
                                self.peek_significant(),
                                Some(b'(') | Some(b'.')
                            ),
                            "export" => true,
                            _ => false,
                        };
                    if is_decl {
                        if !code.is_empty() {
                            segments.push(Segment::Code(std::mem::take(&mut code)));
                        }
                        let segment = if word == "import" {
                            Segment::Import(self.parse_import_decl()?)
                        } else {
                            Segment::Export(self.parse_export_decl()?)
                        };
                        segments.push(segment);
                        last_significant = Some(';');
                    } else {
                        code.push_str(word);
                        // After `return`, `typeof` and friends a `/` starts
                        // a regex, not a division
                        last_significant = if is_expression_keyword(word) {
                            Some('=')
                        } else {
                            word.chars().last()
                        };
                    }
                }
                _ => {
                    self.bump();
                    // Only ASCII whitespace is insignificant; everything
                    // else updates the heuristic state
                    if b.is_ascii() {
                        if !b.is_ascii_whitespace() {
                            last_significant = Some(char::from(b));
                        }
                        code.push(char::from(b));
                    } else {
                        // Copy the remaining bytes of a multi-byte char
                        let start = self.pos - 1;
                        while self.peek().is_some_and(|c| (c & 0xC0) == 0x80) {
                            self.pos += 1;
                        }
                        code.push_str(&self.src[start..self.pos]);
                        last_significant = self.src[start..self.pos].chars().last();
                    }
                }
            }
        }

        if !code.is_empty() {
            segments.push(Segment::Code(code));
        }
        Ok(Program { segments })
    }

    /// Read a full identifier word starting at the current position
    fn read_word(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Peek the next significant byte without consuming anything
    fn peek_significant(&self) -> Option<u8> {
        let mut i = self.pos;
        while let Some(&b) = self.bytes.get(i) {
            if b.is_ascii_whitespace() {
                i += 1;
            } else {
                return Some(b);
            }
        }
        None
    }

    /// Skip whitespace and comments between declaration tokens
    fn skip_trivia(&mut self) -> BundleResult<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') => match self.bytes.get(self.pos + 1) {
                    Some(b'/') => self.skip_line_comment(),
                    Some(b'*') => self.skip_block_comment()?,
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn expect_word(&mut self, expected: &str) -> BundleResult<()> {
        self.skip_trivia()?;
        let word = self.read_word();
        if word == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}', found '{word}'")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> BundleResult<String> {
        self.skip_trivia()?;
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.error(format!("expected {what}")));
        }
        Ok(self.read_word().to_owned())
    }

    fn eat_byte(&mut self, expected: u8) -> BundleResult<bool> {
        self.skip_trivia()?;
        if self.peek() == Some(expected) {
            self.bump();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume a trailing `;` on the current line, if present. Never crosses
    /// a newline, so statement separation survives into the next code run.
    fn eat_semicolon(&mut self) {
        let mut i = self.pos;
        while matches!(self.bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        if self.bytes.get(i) == Some(&b';') {
            self.pos = i + 1;
        }
    }

    /// Parse the quoted module specifier of an import/export-from clause
    fn parse_specifier(&mut self) -> BundleResult<String> {
        self.skip_trivia()?;
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error("expected module specifier string")),
        };
        let start = self.pos;
        self.skip_string(quote)?;
        let raw = &self.src[start + 1..self.pos - 1];
        if raw.contains('\\') {
            return Err(self.error("escape sequences in module specifiers are not supported"));
        }
        Ok(raw.to_owned())
    }

    /// Parse an `import ...` declaration; the `import` word is already
    /// consumed
    fn parse_import_decl(&mut self) -> BundleResult<ImportDecl> {
        self.skip_trivia()?;
        let clause = match self.peek() {
            Some(b'"' | b'\'') => {
                let specifier = self.parse_specifier()?;
                self.eat_semicolon();
                return Ok(ImportDecl {
                    specifier,
                    clause: ImportClause::SideEffect,
                });
            }
            Some(b'{') => ImportClause::Named(self.parse_binding_list("import")?),
            Some(b'*') => {
                self.bump();
                self.expect_word("as")?;
                ImportClause::Namespace(self.expect_ident("namespace binding name")?)
            }
            Some(b) if is_ident_start(b) => {
                let default_binding = self.read_word().to_owned();
                if self.eat_byte(b',')? {
                    self.skip_trivia()?;
                    match self.peek() {
                        Some(b'{') => ImportClause::DefaultAndNamed(
                            default_binding,
                            self.parse_binding_list("import")?,
                        ),
                        Some(b'*') => {
                            self.bump();
                            self.expect_word("as")?;
                            ImportClause::DefaultAndNamespace(
                                default_binding,
                                self.expect_ident("namespace binding name")?,
                            )
                        }
                        _ => return Err(self.error("expected '{' or '*' after ',' in import")),
                    }
                } else {
                    ImportClause::Default(default_binding)
                }
            }
            _ => return Err(self.error("expected import clause")),
        };
        self.expect_word("from")?;
        let specifier = self.parse_specifier()?;
        self.eat_semicolon();
        Ok(ImportDecl { specifier, clause })
    }

    /// Parse a `{ a, b as c }` list; the cursor is on the `{`
    fn parse_binding_list(&mut self, context: &str) -> BundleResult<Vec<NamedBinding>> {
        self.skip_trivia()?;
        self.bump(); // consume '{'
        let mut bindings = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'}') => {
                    self.bump();
                    break;
                }
                Some(b) if is_ident_start(b) => {
                    let source = self.read_word().to_owned();
                    self.skip_trivia()?;
                    let target = if self.peek().is_some_and(is_ident_start) {
                        let word = self.read_word();
                        if word != "as" {
                            return Err(
                                self.error(format!("expected 'as', found '{word}' in {context}"))
                            );
                        }
                        self.expect_ident("binding name after 'as'")?
                    } else {
                        source.clone()
                    };
                    bindings.push(NamedBinding { source, target });
                    if !self.eat_byte(b',')? {
                        self.skip_trivia()?;
                        if self.peek() == Some(b'}') {
                            self.bump();
                            break;
                        }
                        return Err(self.error(format!("expected ',' or '}}' in {context} list")));
                    }
                }
                _ => return Err(self.error(format!("expected identifier in {context} list"))),
            }
        }
        Ok(bindings)
    }

    /// Parse an `export ...` declaration; the `export` word is already
    /// consumed
    fn parse_export_decl(&mut self) -> BundleResult<ExportDecl> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'{') => {
                let bindings = self.parse_binding_list("export")?;
                // Lookahead for `from`; anything else is rolled back so the
                // trailing trivia stays in the stream for the next code run
                let checkpoint = (self.pos, self.line);
                self.skip_trivia()?;
                if self.peek().is_some_and(is_ident_start) && self.read_word() == "from" {
                    let specifier = self.parse_specifier()?;
                    self.eat_semicolon();
                    return Ok(ExportDecl::NamedFrom {
                        bindings,
                        specifier,
                    });
                }
                (self.pos, self.line) = checkpoint;
                self.eat_semicolon();
                Ok(ExportDecl::Named { bindings })
            }
            Some(b'*') => {
                self.bump();
                self.skip_trivia()?;
                let alias = if self.peek().is_some_and(is_ident_start) {
                    let word = self.read_word();
                    if word == "as" {
                        let name = self.expect_ident("namespace export name")?;
                        self.expect_word("from")?;
                        Some(name)
                    } else if word == "from" {
                        None
                    } else {
                        return Err(self.error(format!("expected 'as' or 'from', found '{word}'")));
                    }
                } else {
                    return Err(self.error("expected 'as' or 'from' after 'export *'"));
                };
                let specifier = self.parse_specifier()?;
                self.eat_semicolon();
                Ok(ExportDecl::StarFrom { alias, specifier })
            }
            Some(b) if is_ident_start(b) => {
                let keyword = self.read_word().to_owned();
                match keyword.as_str() {
                    "default" => {
                        let code = self.consume_statement()?;
                        if code.is_empty() {
                            return Err(self.error("expected expression after 'export default'"));
                        }
                        Ok(ExportDecl::Default { code })
                    }
                    "const" | "let" | "var" => {
                        let rest = self.consume_statement()?;
                        let names = declared_names(&rest)
                            .ok_or_else(|| self.error("unsupported export pattern"))?;
                        Ok(ExportDecl::Declaration {
                            code: format!("{keyword} {rest}"),
                            names,
                        })
                    }
                    "function" | "class" | "async" => {
                        let mut full_keyword = keyword;
                        if full_keyword == "async" {
                            self.expect_word("function")?;
                            full_keyword.push_str(" function");
                        }
                        let rest = self.consume_statement()?;
                        let name = first_identifier(&rest)
                            .ok_or_else(|| self.error("expected a name on exported declaration"))?;
                        Ok(ExportDecl::Declaration {
                            code: format!("{full_keyword} {rest}"),
                            names: vec![name],
                        })
                    }
                    other => Err(self.error(format!("unsupported export declaration '{other}'"))),
                }
            }
            _ => Err(self.error("expected export clause")),
        }
    }

    /// Consume source text until the end of the current statement: a `;` at
    /// bracket depth zero (consumed, excluded) or a newline at depth zero
    /// (left in the stream). Brackets, strings, templates, comments and
    /// regexes are skipped atomically.
    fn consume_statement(&mut self) -> BundleResult<String> {
        self.skip_trivia()?;
        let start = self.pos;
        let mut end = self.pos;
        let mut depth = 0i64;
        let mut last_significant: Option<char> = Some('=');
        while let Some(b) = self.peek() {
            match b {
                b';' if depth == 0 => {
                    self.bump();
                    break;
                }
                b'\n' if depth == 0 => break,
                b'"' | b'\'' => {
                    self.skip_string(b)?;
                    last_significant = Some(char::from(b));
                }
                b'`' => {
                    self.skip_template()?;
                    last_significant = Some('`');
                }
                b'/' => match self.bytes.get(self.pos + 1) {
                    Some(b'/') => self.skip_line_comment(),
                    Some(b'*') => self.skip_block_comment()?,
                    _ if regex_can_follow(last_significant) => {
                        self.skip_regex()?;
                        last_significant = Some('/');
                    }
                    _ => {
                        self.bump();
                        last_significant = Some('/');
                    }
                },
                b'{' | b'(' | b'[' => {
                    depth += 1;
                    self.bump();
                    last_significant = Some(char::from(b));
                }
                b'}' | b')' | b']' => {
                    depth -= 1;
                    self.bump();
                    last_significant = Some(char::from(b));
                }
                _ => {
                    self.bump();
                    if b.is_ascii() && !b.is_ascii_whitespace() {
                        last_significant = Some(char::from(b));
                    }
                }
            }
            end = self.pos;
        }
        Ok(self.src[start..end].trim_end().to_owned())
    }

    fn skip_string(&mut self, quote: u8) -> BundleResult<()> {
        self.bump(); // opening quote
        while let Some(b) = self.peek() {
            match b {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'\n' => return Err(self.error("unterminated string literal")),
                _ if b == quote => {
                    self.bump();
                    return Ok(());
                }
                _ => {
                    self.bump();
                }
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn skip_template(&mut self) -> BundleResult<()> {
        self.bump(); // opening backtick
        while let Some(b) = self.bump() {
            match b {
                b'\\' => {
                    self.bump();
                }
                b'`' => return Ok(()),
                b'$' if self.peek() == Some(b'{') => {
                    self.bump();
                    self.skip_template_substitution()?;
                }
                _ => {}
            }
        }
        Err(self.error("unterminated template literal"))
    }

    /// Skip a `${ ... }` substitution, including nested templates
    fn skip_template_substitution(&mut self) -> BundleResult<()> {
        let mut depth = 1i64;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => self.skip_string(b)?,
                b'`' => self.skip_template()?,
                b'{' => {
                    depth += 1;
                    self.bump();
                }
                b'}' => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
        Err(self.error("unterminated template substitution"))
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> BundleResult<()> {
        self.bump();
        self.bump(); // consume `/*`
        while let Some(b) = self.bump() {
            if b == b'*' && self.peek() == Some(b'/') {
                self.bump();
                return Ok(());
            }
        }
        Err(self.error("unterminated block comment"))
    }

    fn skip_regex(&mut self) -> BundleResult<()> {
        self.bump(); // opening slash
        let mut in_class = false;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'\n' => return Err(self.error("unterminated regular expression")),
                b'[' => {
                    in_class = true;
                    self.bump();
                }
                b']' => {
                    in_class = false;
                    self.bump();
                }
                b'/' if !in_class => {
                    self.bump();
                    // Trailing flags
                    while self.peek().is_some_and(is_ident_part) {
                        self.bump();
                    }
                    return Ok(());
                }
                _ => {
                    self.bump();
                }
            }
        }
        Err(self.error("unterminated regular expression"))
    }
}

/// Names declared by a `const`/`let`/`var` declaration body (the text after
/// the keyword). Returns None for destructuring patterns.
fn declared_names(decl: &str) -> Option<Vec<String>> {
    let bytes = decl.as_bytes();
    let mut names = Vec::new();
    let mut pos = 0usize;
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if !is_ident_start(bytes[pos]) {
            return None;
        }
        let start = pos;
        while pos < bytes.len() && is_ident_part(bytes[pos]) {
            pos += 1;
        }
        names.push(decl[start..pos].to_owned());

        // Skip the initializer, if any, up to a top-level comma
        let mut depth = 0i64;
        let mut found_comma = false;
        while pos < bytes.len() {
            match bytes[pos] {
                b'{' | b'(' | b'[' => depth += 1,
                b'}' | b')' | b']' => depth -= 1,
                b',' if depth == 0 => {
                    found_comma = true;
                    pos += 1;
                    break;
                }
                b'"' | b'\'' | b'`' => {
                    let quote = bytes[pos];
                    pos += 1;
                    while pos < bytes.len() && bytes[pos] != quote {
                        if bytes[pos] == b'\\' {
                            pos += 1;
                        }
                        pos += 1;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        if !found_comma {
            break;
        }
    }
    if names.is_empty() { None } else { Some(names) }
}

/// First identifier in a declaration body, skipping generator stars
fn first_identifier(decl: &str) -> Option<String> {
    let bytes = decl.as_bytes();
    let mut pos = 0usize;
    while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'*') {
        pos += 1;
    }
    if pos >= bytes.len() || !is_ident_start(bytes[pos]) {
        return None;
    }
    let start = pos;
    while pos < bytes.len() && is_ident_part(bytes[pos]) {
        pos += 1;
    }
    Some(decl[start..pos].to_owned())
}
