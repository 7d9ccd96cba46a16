//! `<script>` and `<script setup>` compilation.
//!
//! The output is an ES module (TypeScript still in place) that binds the
//! component options to a given identifier. A plain `<script>` only has its
//! default export rewritten; `<script setup>` is turned into an options
//! object whose `setup()` runs the block body and returns its top-level
//! bindings.

use crate::commonjs::{collect_pat_names, property_key};
use crate::ecma::{self, Edits, Failure};
use crate::error::CompileError;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use sfc_parser::{ScriptBlock, ScriptLang, SfcDescriptor};
use source_pos::LineIndex;
use swc_common::Spanned;
use swc_ecma_ast::*;

/// `import Name from '....vue'`, single default imports only.
static COMPONENT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(\w+)\s+from\s+['"][^'"]+\.vue['"]"#).expect("component import regex")
});

/// Binding of the plain `<script>` default export when `<script setup>` is
/// present too.
const DEFAULT_IDENT: &str = "__default__";

const MACROS: &[&str] = &["defineProps", "defineEmits", "defineExpose", "withDefaults"];

const MAX_TYPE_DEPTH: usize = 16;

/// The script section compiled to an ES module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub content: String,
    /// Zero-based file line of the first content line, when lines of
    /// `content` still match the `<script>` block line for line.
    pub line_offset: Option<u32>,
}

/// Compile the script blocks of `descriptor`, binding the options object to
/// `ident`. Error positions are mapped into the component file.
pub fn compile_script(
    descriptor: &SfcDescriptor,
    lines: &LineIndex,
    ident: &str,
) -> Result<CompiledScript, Vec<CompileError>> {
    match (&descriptor.script, &descriptor.script_setup) {
        (script, Some(setup)) => Ok(CompiledScript {
            content: compile_setup(setup, script.as_ref(), lines, ident)?,
            line_offset: None,
        }),
        (Some(script), None) => {
            let content = rewrite_default(&script.content, script.lang, ident)
                .map_err(|failures| block_errors(script, lines, failures))?;
            Ok(CompiledScript {
                content,
                line_offset: Some(lines.line_col(script.content_span.start).line),
            })
        }
        (None, None) => Ok(CompiledScript {
            content: format!("const {ident} = {{}};"),
            line_offset: None,
        }),
    }
}

fn block_errors(block: &ScriptBlock, lines: &LineIndex, failures: Vec<Failure>) -> Vec<CompileError> {
    failures
        .into_iter()
        .map(|f| {
            CompileError::script(f.message)
                .at(lines.location(block.content_span.start + f.offset as u32))
        })
        .collect()
}

/// Rewrite the default export of `source` into `const <ident> = ...`.
///
/// A module without a default export gets `const <ident> = {};` appended.
pub fn rewrite_default(source: &str, lang: ScriptLang, ident: &str) -> Result<String, Vec<Failure>> {
    let module = ecma::parse_module(source, lang)?;
    Ok(rewrite_default_in(source, &module, ident))
}

fn rewrite_default_in(source: &str, module: &Module, ident: &str) -> String {
    let mut edits = Edits::new();
    let mut tail = None;
    let mut found = false;

    for item in &module.body {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };
        match decl {
            ModuleDecl::ExportDefaultExpr(export) => {
                let start = ecma::range(export).start;
                edits.replace(start..ecma::range(&*export.expr).start, format!("const {ident} = "));
                found = true;
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                let name = match &export.decl {
                    DefaultDecl::Class(c) => c.ident.as_ref(),
                    DefaultDecl::Fn(f) => f.ident.as_ref(),
                    DefaultDecl::TsInterfaceDecl(_) => continue,
                };
                let start = ecma::range(export).start;
                let decl_start = ecma::range(&export.decl).start;
                match name {
                    Some(name) => {
                        edits.remove(start..decl_start);
                        tail = Some(format!("const {ident} = {};", name.sym));
                    }
                    None => edits.replace(start..decl_start, format!("const {ident} = ")),
                }
                found = true;
            }
            ModuleDecl::ExportNamed(named) if !named.type_only => {
                if let Some(text) = rewrite_named_default(source, named, ident, &mut tail) {
                    edits.replace(ecma::range(named), text);
                    found = true;
                }
            }
            _ => {}
        }
    }

    let mut out = edits.apply(source);
    if !found {
        tail = Some(format!("const {ident} = {{}};"));
    }
    if let Some(tail) = tail {
        out.push('\n');
        out.push_str(&tail);
    }
    out
}

/// `export { a as default, b }` loses its default specifier; the binding
/// is assigned to `ident` instead.
fn rewrite_named_default(
    source: &str,
    named: &NamedExport,
    ident: &str,
    tail: &mut Option<String>,
) -> Option<String> {
    let mut default_orig = None;
    let mut rest = Vec::new();
    for spec in &named.specifiers {
        if let ExportSpecifier::Named(s) = spec {
            let exported = s.exported.as_ref().unwrap_or(&s.orig);
            if !s.is_type_only && export_name(source, exported) == "default" {
                default_orig = Some(export_name(source, &s.orig));
                continue;
            }
        }
        rest.push(ecma::text(source, spec));
    }
    let orig = default_orig?;

    let from = named
        .src
        .as_ref()
        .map(|src| format!(" from {}", ecma::text(source, &**src)));
    let mut text = String::new();
    if !rest.is_empty() {
        text.push_str(&format!(
            "export {{ {} }}{};",
            rest.join(", "),
            from.as_deref().unwrap_or_default()
        ));
    }
    match from {
        Some(from) => {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!("import {{ {orig} as {ident} }}{from};"));
        }
        None => *tail = Some(format!("const {ident} = {orig};")),
    }
    Some(text)
}

fn export_name(source: &str, name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => ecma::string_value(source, s).to_string(),
    }
}

/// Components to register for a `<script setup>` body: every identifier
/// bound by a single default import of a `.vue` file.
pub fn registered_components(setup: &str) -> Vec<String> {
    COMPONENT_IMPORT
        .captures_iter(setup)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// The `components` assignment for `names`, if there are any.
pub fn registration(ident: &str, names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let entries: Vec<String> = names.iter().map(|n| format!("\"{n}\": {n}")).collect();
    Some(format!("{ident}.components = {{ {} }};", entries.join(", ")))
}

#[derive(Clone, Copy)]
enum TypeDef<'a> {
    Interface(&'a TsInterfaceDecl),
    Alias(&'a TsType),
}

/// Interfaces and type aliases declared at the top level of the component's
/// scripts, with the source text each was parsed from.
#[derive(Default)]
struct TypeScope<'a> {
    defs: FxHashMap<String, (&'a str, TypeDef<'a>)>,
}

impl<'a> TypeScope<'a> {
    fn collect(&mut self, source: &'a str, module: &'a Module) {
        for item in &module.body {
            let decl = match item {
                ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => &export.decl,
                _ => continue,
            };
            match decl {
                Decl::TsInterface(i) => {
                    self.defs
                        .insert(i.id.sym.to_string(), (source, TypeDef::Interface(i)));
                }
                Decl::TsTypeAlias(a) => {
                    self.defs
                        .insert(a.id.sym.to_string(), (source, TypeDef::Alias(&a.type_ann)));
                }
                _ => {}
            }
        }
    }

    /// Flatten the members of an object-like type.
    fn members(
        &self,
        source: &'a str,
        ty: &'a TsType,
        depth: usize,
        out: &mut Vec<(&'a str, &'a TsTypeElement)>,
    ) -> Result<(), String> {
        if depth > MAX_TYPE_DEPTH {
            return Err("Type is nested too deeply to resolve".to_string());
        }
        match ty {
            TsType::TsTypeLit(lit) => {
                out.extend(lit.members.iter().map(|m| (source, m)));
                Ok(())
            }
            TsType::TsParenthesizedType(p) => self.members(source, &p.type_ann, depth + 1, out),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(i)) => {
                for part in &i.types {
                    self.members(source, part, depth + 1, out)?;
                }
                Ok(())
            }
            TsType::TsTypeRef(r) => match &r.type_name {
                TsEntityName::Ident(name) => self.named_members(&name.sym, depth + 1, out),
                _ => Err(unresolvable(ecma::text(source, r))),
            },
            _ => Err(unresolvable(ecma::text(source, ty))),
        }
    }

    fn named_members(
        &self,
        name: &str,
        depth: usize,
        out: &mut Vec<(&'a str, &'a TsTypeElement)>,
    ) -> Result<(), String> {
        match self.defs.get(name).copied() {
            Some((source, TypeDef::Interface(decl))) => {
                for parent in &decl.extends {
                    match &*parent.expr {
                        Expr::Ident(id) => self.named_members(&id.sym, depth + 1, out)?,
                        other => return Err(unresolvable(ecma::text(source, other))),
                    }
                }
                out.extend(decl.body.body.iter().map(|m| (source, m)));
                Ok(())
            }
            Some((source, TypeDef::Alias(ty))) => self.members(source, ty, depth + 1, out),
            None => Err(unresolvable(name)),
        }
    }

    /// Runtime constructors a value of `ty` can have. `null` stands for
    /// "any".
    fn runtime_types(&self, ty: &TsType, depth: usize, out: &mut Vec<&'static str>) {
        fn push(t: &'static str, out: &mut Vec<&'static str>) {
            if !out.contains(&t) {
                out.push(t);
            }
        }
        if depth > MAX_TYPE_DEPTH {
            push("null", out);
            return;
        }
        match ty {
            TsType::TsKeywordType(k) => {
                let t = match k.kind {
                    TsKeywordTypeKind::TsStringKeyword => "String",
                    TsKeywordTypeKind::TsNumberKeyword => "Number",
                    TsKeywordTypeKind::TsBooleanKeyword => "Boolean",
                    TsKeywordTypeKind::TsObjectKeyword => "Object",
                    TsKeywordTypeKind::TsSymbolKeyword => "Symbol",
                    TsKeywordTypeKind::TsBigIntKeyword => "BigInt",
                    _ => "null",
                };
                push(t, out);
            }
            TsType::TsTypeLit(_) | TsType::TsMappedType(_) => push("Object", out),
            TsType::TsArrayType(_) | TsType::TsTupleType(_) => push("Array", out),
            TsType::TsFnOrConstructorType(_) => push("Function", out),
            TsType::TsLitType(lit) => push(
                match lit.lit {
                    TsLit::Str(_) | TsLit::Tpl(_) => "String",
                    TsLit::Number(_) => "Number",
                    TsLit::Bool(_) => "Boolean",
                    TsLit::BigInt(_) => "BigInt",
                },
                out,
            ),
            TsType::TsParenthesizedType(p) => self.runtime_types(&p.type_ann, depth + 1, out),
            TsType::TsOptionalType(o) => self.runtime_types(&o.type_ann, depth + 1, out),
            TsType::TsTypeOperator(op) => match op.op {
                TsTypeOperatorOp::KeyOf => push("String", out),
                _ => self.runtime_types(&op.type_ann, depth + 1, out),
            },
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(u)) => {
                for part in &u.types {
                    self.runtime_types(part, depth + 1, out);
                }
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(_)) => {
                push("Object", out)
            }
            TsType::TsTypeRef(r) => {
                let TsEntityName::Ident(name) = &r.type_name else {
                    push("null", out);
                    return;
                };
                let t = match &*name.sym {
                    "Array" | "ReadonlyArray" => "Array",
                    "Function" => "Function",
                    "Object" | "Record" | "Partial" | "Required" | "Readonly" | "Pick" | "Omit" => {
                        "Object"
                    }
                    "String" => "String",
                    "Number" => "Number",
                    "Boolean" => "Boolean",
                    "Symbol" => "Symbol",
                    "Date" => "Date",
                    "RegExp" => "RegExp",
                    "Promise" => "Promise",
                    "Map" => "Map",
                    "Set" => "Set",
                    "WeakMap" => "WeakMap",
                    "WeakSet" => "WeakSet",
                    other => match self.defs.get(other).copied() {
                        Some((_, TypeDef::Interface(_))) => "Object",
                        Some((_, TypeDef::Alias(ty))) => {
                            self.runtime_types(ty, depth + 1, out);
                            return;
                        }
                        None => "null",
                    },
                };
                push(t, out);
            }
            _ => push("null", out),
        }
    }
}

fn unresolvable(what: &str) -> String {
    format!(
        "Unresolvable type `{what}`: only type literals, interfaces and type aliases declared in this component are supported"
    )
}

fn render_types(types: &[&str]) -> String {
    match types {
        [] => "null".to_string(),
        _ if types.contains(&"null") => "null".to_string(),
        [single] => single.to_string(),
        _ => format!("[{}]", types.join(", ")),
    }
}

/// Name of an object-type member or object-literal key.
fn key_name(source: &str, key: &Expr) -> Option<String> {
    match key {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Lit(Lit::Str(s)) => Some(ecma::string_value(source, s).to_string()),
        _ => None,
    }
}

/// Argument declared through a macro: a runtime value or a type parameter.
#[derive(Clone, Copy)]
enum Declared<'a> {
    Runtime(&'a Expr),
    Typed(&'a TsType),
}

struct SetupCompiler<'a> {
    source: &'a str,
    scope: TypeScope<'a>,
    edits: Edits,
    failures: Vec<Failure>,
    imports: Vec<&'a str>,
    types: Vec<&'a str>,
    bindings: Vec<String>,
    props: Option<Option<Declared<'a>>>,
    defaults: Option<&'a Expr>,
    emits: Option<Option<Declared<'a>>>,
}

impl<'a> SetupCompiler<'a> {
    fn fail(&mut self, node: &impl Spanned, message: impl Into<String>) {
        self.failures.push(Failure {
            offset: ecma::range(node).start,
            message: message.into(),
        });
    }

    fn bind(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !MACROS.contains(&name.as_str()) && !self.bindings.contains(&name) {
            self.bindings.push(name);
        }
    }

    fn hoist_type(&mut self, item: &'a ModuleItem) {
        self.types.push(ecma::text(self.source, item));
        self.edits.remove(ecma::range(item));
    }

    fn item(&mut self, item: &'a ModuleItem) {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                self.imports.push(ecma::text(self.source, item));
                self.edits.remove(ecma::range(item));
                if import.type_only {
                    return;
                }
                for spec in &import.specifiers {
                    match spec {
                        ImportSpecifier::Named(s) if s.is_type_only => {}
                        ImportSpecifier::Named(s) => self.bind(s.local.sym.to_string()),
                        ImportSpecifier::Default(s) => self.bind(s.local.sym.to_string()),
                        ImportSpecifier::Namespace(s) => self.bind(s.local.sym.to_string()),
                    }
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export))
                if matches!(export.decl, Decl::TsInterface(_) | Decl::TsTypeAlias(_)) =>
            {
                self.hoist_type(item)
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) if named.type_only => {
                self.hoist_type(item)
            }
            ModuleItem::ModuleDecl(decl) => {
                self.fail(decl, "<script setup> cannot contain ES module exports.")
            }
            ModuleItem::Stmt(Stmt::Decl(Decl::TsInterface(_) | Decl::TsTypeAlias(_))) => {
                self.hoist_type(item)
            }
            ModuleItem::Stmt(Stmt::Expr(stmt)) => self.macro_call(&stmt.expr),
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => {
                for declarator in &var.decls {
                    let mut names = Vec::new();
                    collect_pat_names(&declarator.name, &mut names);
                    names.into_iter().for_each(|n| self.bind(n));
                    if let Some(init) = &declarator.init {
                        self.macro_call(init);
                    }
                }
            }
            ModuleItem::Stmt(Stmt::Decl(Decl::Fn(f))) => self.bind(f.ident.sym.to_string()),
            ModuleItem::Stmt(Stmt::Decl(Decl::Class(c))) => self.bind(c.ident.sym.to_string()),
            ModuleItem::Stmt(Stmt::Decl(Decl::TsEnum(e))) => self.bind(e.id.sym.to_string()),
            _ => {}
        }
    }

    /// Replace a top-level compiler macro call with the runtime value it
    /// stands for.
    fn macro_call(&mut self, expr: &'a Expr) {
        let Some((name, call)) = as_macro(expr) else {
            return;
        };
        let range = ecma::range(call);
        match name {
            "defineProps" => {
                self.define_props(call, None);
                self.edits.replace(range, "__props");
            }
            "withDefaults" => {
                match call.args.first().and_then(|arg| as_macro(&arg.expr)) {
                    Some(("defineProps", inner)) => {
                        let defaults = call.args.get(1).map(|arg| &*arg.expr);
                        self.define_props(inner, defaults);
                    }
                    _ => self.fail(call, "withDefaults() first argument must be a defineProps() call."),
                }
                self.edits.replace(range, "__props");
            }
            "defineEmits" => {
                if self.emits.is_some() {
                    self.fail(call, "duplicate defineEmits() call");
                    return;
                }
                self.emits = Some(self.declared(call, "defineEmits"));
                self.edits.replace(range, "__emit");
            }
            "defineExpose" => self.edits.replace(ecma::range(&call.callee), "__expose"),
            _ => {}
        }
    }

    fn declared(&mut self, call: &'a CallExpr, name: &str) -> Option<Declared<'a>> {
        let typed = call
            .type_args
            .as_ref()
            .and_then(|args| args.params.first())
            .map(|ty| &**ty);
        let runtime = call.args.first().map(|arg| &*arg.expr);
        match (typed, runtime) {
            (Some(_), Some(_)) => {
                self.fail(
                    call,
                    format!("{name}() cannot accept both type and non-type arguments at the same time. Use one or the other."),
                );
                None
            }
            (Some(ty), None) => Some(Declared::Typed(ty)),
            (None, Some(expr)) => Some(Declared::Runtime(expr)),
            (None, None) => None,
        }
    }

    fn define_props(&mut self, call: &'a CallExpr, defaults: Option<&'a Expr>) {
        if self.props.is_some() {
            self.fail(call, "duplicate defineProps() call");
            return;
        }
        let declared = self.declared(call, "defineProps");
        if defaults.is_some() && !matches!(declared, Some(Declared::Typed(_))) {
            self.fail(call, "withDefaults() can only be used with type-based defineProps declaration.");
        }
        self.props = Some(declared);
        self.defaults = defaults;
    }

    fn render_props(&mut self) -> Option<String> {
        match self.props.flatten()? {
            Declared::Runtime(expr) => Some(ecma::text(self.source, expr).to_string()),
            Declared::Typed(ty) => {
                let mut members = Vec::new();
                if let Err(message) = self.scope.members(self.source, ty, 0, &mut members) {
                    self.fail(ty, message);
                    return None;
                }
                let defaults = self.default_values();

                let mut entries = Vec::new();
                for (source, member) in members {
                    let (key, optional, types) = match member {
                        TsTypeElement::TsPropertySignature(p) if !p.computed => {
                            let mut types = Vec::new();
                            if let Some(ann) = &p.type_ann {
                                self.scope.runtime_types(&ann.type_ann, 0, &mut types);
                            }
                            (&p.key, p.optional, types)
                        }
                        TsTypeElement::TsMethodSignature(m) if !m.computed => {
                            (&m.key, m.optional, vec!["Function"])
                        }
                        _ => continue,
                    };
                    let Some(name) = key_name(source, key) else {
                        continue;
                    };
                    let mut entry = format!(
                        "{}: {{ type: {}, required: {}",
                        property_key(&name),
                        render_types(&types),
                        !optional
                    );
                    if let Some(default) = defaults.get(&name) {
                        entry.push_str(&format!(", default: {default}"));
                    }
                    entry.push_str(" }");
                    entries.push(entry);
                }
                Some(format!("{{ {} }}", entries.join(", ")))
            }
        }
    }

    /// Default values given to `withDefaults`, by prop name.
    fn default_values(&mut self) -> FxHashMap<String, String> {
        let mut map = FxHashMap::default();
        let Some(expr) = self.defaults else {
            return map;
        };
        let Expr::Object(object) = expr else {
            self.fail(expr, "withDefaults() defaults must be an object literal.");
            return map;
        };
        for prop in &object.props {
            match prop {
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::KeyValue(kv) => {
                        let name = match &kv.key {
                            PropName::Ident(ident) => Some(ident.sym.to_string()),
                            PropName::Str(s) => Some(ecma::string_value(self.source, s).to_string()),
                            _ => None,
                        };
                        match name {
                            Some(name) => {
                                map.insert(name, ecma::text(self.source, &*kv.value).to_string());
                            }
                            None => self.fail(&kv.key, "Unsupported key in withDefaults() defaults."),
                        }
                    }
                    Prop::Shorthand(ident) => {
                        map.insert(ident.sym.to_string(), ident.sym.to_string());
                    }
                    other => self.fail(other, "Unsupported property in withDefaults() defaults."),
                },
                PropOrSpread::Spread(spread) => {
                    self.fail(spread, "Spread is not supported in withDefaults() defaults.")
                }
            }
        }
        map
    }

    fn render_emits(&mut self) -> Option<String> {
        match self.emits.flatten()? {
            Declared::Runtime(expr) => Some(ecma::text(self.source, expr).to_string()),
            Declared::Typed(ty) => {
                let mut members = Vec::new();
                if let Err(message) = self.scope.members(self.source, ty, 0, &mut members) {
                    self.fail(ty, message);
                    return None;
                }
                let mut names = Vec::new();
                for (source, member) in members {
                    match member {
                        TsTypeElement::TsCallSignatureDecl(sig) => {
                            if let Some(TsFnParam::Ident(param)) = sig.params.first() {
                                if let Some(ann) = &param.type_ann {
                                    event_names(source, &ann.type_ann, &mut names);
                                }
                            }
                        }
                        TsTypeElement::TsPropertySignature(p) if !p.computed => {
                            names.extend(key_name(source, &p.key));
                        }
                        _ => {}
                    }
                }
                let quoted: Vec<String> = names.iter().map(|n| format!("{n:?}")).collect();
                Some(format!("[{}]", quoted.join(", ")))
            }
        }
    }
}

/// String literal members of an event-name type.
fn event_names(source: &str, ty: &TsType, out: &mut Vec<String>) {
    match ty {
        TsType::TsLitType(TsLitType {
            lit: TsLit::Str(s), ..
        }) => out.push(ecma::string_value(source, s).to_string()),
        TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(u)) => {
            for part in &u.types {
                event_names(source, part, out);
            }
        }
        TsType::TsParenthesizedType(p) => event_names(source, &p.type_ann, out),
        _ => {}
    }
}

fn as_macro(expr: &Expr) -> Option<(&'static str, &CallExpr)> {
    let Expr::Call(call) = expr else {
        return None;
    };
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Ident(ident) = &**callee else {
        return None;
    };
    MACROS
        .iter()
        .find(|m| **m == &*ident.sym)
        .map(|m| (*m, call))
}

fn compile_setup(
    setup: &ScriptBlock,
    script: Option<&ScriptBlock>,
    lines: &LineIndex,
    ident: &str,
) -> Result<String, Vec<CompileError>> {
    let normal = match script {
        Some(script) => {
            let module = ecma::parse_module(&script.content, script.lang)
                .map_err(|failures| block_errors(script, lines, failures))?;
            Some((script, module))
        }
        None => None,
    };
    let module = ecma::parse_module(&setup.content, setup.lang)
        .map_err(|failures| block_errors(setup, lines, failures))?;

    let mut scope = TypeScope::default();
    if let Some((script, normal_module)) = &normal {
        scope.collect(&script.content, normal_module);
    }
    scope.collect(&setup.content, &module);

    let mut compiler = SetupCompiler {
        source: &setup.content,
        scope,
        edits: Edits::new(),
        failures: Vec::new(),
        imports: Vec::new(),
        types: Vec::new(),
        bindings: Vec::new(),
        props: None,
        defaults: None,
        emits: None,
    };
    for item in &module.body {
        compiler.item(item);
    }
    let props = compiler.render_props();
    let emits = compiler.render_emits();
    if !compiler.failures.is_empty() {
        return Err(block_errors(setup, lines, compiler.failures));
    }

    let mut out = String::new();
    for import in &compiler.imports {
        out.push_str(import);
        out.push('\n');
    }
    if let Some((script, normal_module)) = &normal {
        out.push_str(rewrite_default_in(&script.content, normal_module, DEFAULT_IDENT).trim());
        out.push('\n');
    }
    for ty in &compiler.types {
        out.push_str(ty);
        out.push('\n');
    }

    if normal.is_some() {
        out.push_str(&format!("const {ident} = Object.assign({DEFAULT_IDENT}, {{\n"));
    } else {
        out.push_str(&format!("const {ident} = {{\n"));
    }
    if let Some(props) = props {
        out.push_str(&format!("  props: {props},\n"));
    }
    if let Some(emits) = emits {
        out.push_str(&format!("  emits: {emits},\n"));
    }
    out.push_str("  setup(__props, { emit: __emit, expose: __expose }) {\n");
    let body = compiler.edits.apply(&setup.content);
    let body = body.trim_matches(|c| c == '\n' || c == '\r');
    if !body.trim().is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    if compiler.bindings.is_empty() {
        out.push_str("return {};\n");
    } else {
        out.push_str(&format!("return {{ {} }};\n", compiler.bindings.join(", ")));
    }
    out.push_str("  }\n");
    out.push_str(if normal.is_some() { "});" } else { "};" });
    Ok(out)
}
