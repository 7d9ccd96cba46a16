//! ES module syntax to CommonJS.
//!
//! Imports become `require` calls and exports become assignments on
//! `exports`. Bindings are copied rather than live, which is all the preview
//! runtime needs: an exported declaration is copied right after it, a local
//! `export { .. }` list at the end of the module.

use crate::ecma::{self, Edits};
use swc_ecma_ast::*;

/// Helpers and flags the converted body depends on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Prologue {
    pub es_module: bool,
    pub interop_default: bool,
    pub export_star: bool,
}

impl Prologue {
    /// Text placed before the converted body.
    pub fn render(&self) -> String {
        let mut out = String::from("\"use strict\";\n");
        if self.es_module {
            out.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
        }
        if self.interop_default {
            out.push_str(
                "function __interopDefault(m) { return m && m.__esModule ? m.default : m; }\n",
            );
        }
        if self.export_star {
            out.push_str(
                "function __exportStar(m, e) { for (var k in m) if (k !== \"default\" && !Object.prototype.hasOwnProperty.call(e, k)) e[k] = m[k]; }\n",
            );
        }
        out
    }
}

/// Collect the edits converting `module` to CommonJS.
pub fn convert(source: &str, module: &Module, edits: &mut Edits) -> Prologue {
    let mut converter = Converter {
        source,
        edits,
        prologue: Prologue::default(),
        temp: 0,
        trailing: Vec::new(),
    };
    for item in &module.body {
        if let ModuleItem::ModuleDecl(decl) = item {
            converter.module_decl(decl);
        }
    }
    if !converter.trailing.is_empty() {
        let text = format!("\n{}", converter.trailing.join(" "));
        converter.edits.insert(source.len(), text);
    }
    converter.prologue
}

struct Converter<'a, 'e> {
    source: &'a str,
    edits: &'e mut Edits,
    prologue: Prologue,
    temp: usize,
    /// Assignments for local export lists, which may name bindings
    /// declared further down.
    trailing: Vec<String>,
}

impl Converter<'_, '_> {
    fn temp_name(&mut self) -> String {
        let name = format!("__mod{}", self.temp);
        self.temp += 1;
        name
    }

    fn require(&self, src: &Str) -> String {
        format!("require({})", ecma::text(self.source, src))
    }

    fn export_name(&self, name: &ModuleExportName) -> String {
        match name {
            ModuleExportName::Ident(ident) => ident.sym.to_string(),
            ModuleExportName::Str(s) => ecma::string_value(self.source, s).to_string(),
        }
    }

    fn module_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(import) if !import.type_only => self.import(import),
            ModuleDecl::ExportDecl(export) => self.export_decl(export),
            ModuleDecl::ExportDefaultExpr(export) => {
                self.prologue.es_module = true;
                let start = ecma::range(export).start;
                let expr_start = ecma::range(&*export.expr).start;
                self.edits.replace(start..expr_start, "exports.default = ");
            }
            ModuleDecl::ExportDefaultDecl(export) => self.export_default_decl(export),
            ModuleDecl::ExportNamed(named) if !named.type_only => self.export_named(named),
            ModuleDecl::ExportAll(all) if !all.type_only => {
                self.prologue.es_module = true;
                self.prologue.export_star = true;
                let text = format!("__exportStar({}, exports);", self.require(&all.src));
                self.edits.replace(ecma::range(all), text);
            }
            _ => {}
        }
    }

    fn import(&mut self, import: &ImportDecl) {
        let require = self.require(&import.src);
        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();

        for spec in &import.specifiers {
            match spec {
                ImportSpecifier::Default(s) => default = Some(s.local.sym.to_string()),
                ImportSpecifier::Namespace(s) => namespace = Some(s.local.sym.to_string()),
                ImportSpecifier::Named(s) if !s.is_type_only => {
                    let local = s.local.sym.to_string();
                    match &s.imported {
                        Some(imported) => {
                            let imported = self.export_name(imported);
                            if imported == local {
                                named.push(local);
                            } else {
                                named.push(format!("{}: {}", property_key(&imported), local));
                            }
                        }
                        None => named.push(local),
                    }
                }
                ImportSpecifier::Named(_) => {}
            }
        }

        let bindings = default.is_some() as usize + namespace.is_some() as usize + !named.is_empty() as usize;
        let text = match bindings {
            0 => format!("{require};"),
            1 => {
                if let Some(name) = default {
                    self.prologue.interop_default = true;
                    format!("var {name} = __interopDefault({require});")
                } else if let Some(name) = namespace {
                    format!("var {name} = {require};")
                } else {
                    format!("var {{ {} }} = {require};", named.join(", "))
                }
            }
            _ => {
                let temp = self.temp_name();
                let mut parts = vec![format!("var {temp} = {require};")];
                if let Some(name) = default {
                    self.prologue.interop_default = true;
                    parts.push(format!("var {name} = __interopDefault({temp});"));
                }
                if let Some(name) = namespace {
                    parts.push(format!("var {name} = {temp};"));
                }
                if !named.is_empty() {
                    parts.push(format!("var {{ {} }} = {temp};", named.join(", ")));
                }
                parts.join(" ")
            }
        };
        self.edits.replace(ecma::range(import), text);
    }

    fn export_decl(&mut self, export: &ExportDecl) {
        let mut names = Vec::new();
        match &export.decl {
            Decl::Class(c) if !c.declare => names.push(c.ident.sym.to_string()),
            Decl::Fn(f) if !f.declare && f.function.body.is_some() => {
                names.push(f.ident.sym.to_string())
            }
            Decl::Var(v) if !v.declare => {
                for declarator in &v.decls {
                    collect_pat_names(&declarator.name, &mut names);
                }
            }
            _ => return,
        }
        self.prologue.es_module = true;

        let start = ecma::range(export).start;
        let decl = ecma::range(&export.decl);
        self.edits.blank(self.source, start..decl.start);
        let assignments: Vec<String> = names
            .iter()
            .map(|name| format!("exports.{name} = {name};"))
            .collect();
        self.edits
            .insert(decl.end, format!("; {}", assignments.join(" ")));
    }

    fn export_default_decl(&mut self, export: &ExportDefaultDecl) {
        let ident = match &export.decl {
            DefaultDecl::Class(c) => c.ident.as_ref(),
            DefaultDecl::Fn(f) => f.ident.as_ref(),
            _ => return,
        };
        self.prologue.es_module = true;

        let start = ecma::range(export).start;
        let decl = ecma::range(&export.decl);
        match ident {
            Some(ident) => {
                self.edits.blank(self.source, start..decl.start);
                self.edits
                    .insert(decl.end, format!("; exports.default = {};", ident.sym));
            }
            None => self.edits.replace(start..decl.start, "exports.default = "),
        }
    }

    fn export_named(&mut self, named: &NamedExport) {
        self.prologue.es_module = true;
        let source_module = match &named.src {
            Some(src) => {
                let temp = self.temp_name();
                Some((temp, self.require(src)))
            }
            None => None,
        };

        let mut parts = Vec::new();
        if let Some((temp, require)) = &source_module {
            parts.push(format!("var {temp} = {require};"));
        }
        for spec in &named.specifiers {
            match spec {
                ExportSpecifier::Named(s) if !s.is_type_only => {
                    let orig = self.export_name(&s.orig);
                    let exported = s
                        .exported
                        .as_ref()
                        .map(|e| self.export_name(e))
                        .unwrap_or_else(|| orig.clone());
                    let value = match &source_module {
                        Some((temp, _)) => member(temp, &orig),
                        None => orig,
                    };
                    parts.push(format!("{} = {value};", member("exports", &exported)));
                }
                ExportSpecifier::Namespace(s) => {
                    if let Some((temp, _)) = &source_module {
                        let exported = self.export_name(&s.name);
                        parts.push(format!("{} = {temp};", member("exports", &exported)));
                    }
                }
                _ => {}
            }
        }
        if source_module.is_some() {
            self.edits.replace(ecma::range(named), parts.join(" "));
        } else {
            self.edits.blank(self.source, ecma::range(named));
            self.trailing.extend(parts);
        }
    }
}

/// All identifiers bound by a declaration pattern.
pub fn collect_pat_names(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(binding) => out.push(binding.id.sym.to_string()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_pat_names(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => collect_pat_names(&kv.value, out),
                    ObjectPatProp::Assign(assign) => out.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => collect_pat_names(&rest.arg, out),
                }
            }
        }
        Pat::Rest(rest) => collect_pat_names(&rest.arg, out),
        Pat::Assign(assign) => collect_pat_names(&assign.left, out),
        _ => {}
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub(crate) fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("{name:?}")
    }
}

fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{name:?}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfc_parser::ScriptLang;

    fn cjs(source: &str) -> String {
        let module = ecma::parse_module(source, ScriptLang::Js).unwrap();
        let mut edits = Edits::new();
        let prologue = convert(source, &module, &mut edits);
        format!("{}{}", prologue.render(), edits.apply(source))
    }

    fn body(out: &str) -> Vec<&str> {
        out.lines()
            .filter(|l| !l.starts_with("\"use strict\"") && !l.starts_with("function __") && !l.starts_with("Object.defineProperty"))
            .map(str::trim)
            .collect()
    }

    #[test]
    fn test_imports() {
        let out = cjs("import Vue from 'vue'\nimport { ref, computed as c } from \"vue\"\nimport * as utils from './utils'\nimport './side-effect'");
        assert_eq!(
            body(&out),
            vec![
                "var Vue = __interopDefault(require('vue'));",
                "var { ref, computed: c } = require(\"vue\");",
                "var utils = require('./utils');",
                "require('./side-effect');",
            ]
        );
        assert!(out.contains("function __interopDefault"));
        assert!(!out.contains("__esModule\", { value"));
    }

    #[test]
    fn test_mixed_import_uses_temp() {
        let out = cjs("import Vue, { h } from 'vue'");
        assert_eq!(
            body(&out),
            vec!["var __mod0 = require('vue'); var Vue = __interopDefault(__mod0); var { h } = __mod0;"]
        );
    }

    #[test]
    fn test_exports() {
        let out = cjs("export const a = 1, { b } = obj\nexport function f() {}\nexport { a as alias }\nexport default { name: 'x' }");
        assert!(out.starts_with("\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\n"));
        assert_eq!(
            body(&out),
            vec![
                "const a = 1, { b } = obj; exports.a = a; exports.b = b;",
                "function f() {}; exports.f = f;",
                "",
                "exports.default = { name: 'x' }",
                "exports.alias = a;",
            ]
        );
    }

    #[test]
    fn test_export_list_before_declarations() {
        let out = cjs("export { a as b, c }\nconst a = 1\nlet c = 2");
        assert_eq!(
            body(&out),
            vec!["", "const a = 1", "let c = 2", "exports.b = a; exports.c = c;"]
        );
    }

    #[test]
    fn test_exported_bindings_are_copied() {
        let out = cjs("export let count = 0\ncount = 1\nlet total = 0\nexport { total }\ntotal = 5");
        // The declaration export holds the initial value; the list export
        // is read once the body has run.
        assert_eq!(
            body(&out),
            vec![
                "let count = 0; exports.count = count;",
                "count = 1",
                "let total = 0",
                "",
                "total = 5",
                "exports.total = total;",
            ]
        );
    }

    #[test]
    fn test_reexports() {
        let out = cjs("export * from './a'\nexport { x, default as y } from './b'");
        assert_eq!(
            body(&out),
            vec![
                "__exportStar(require('./a'), exports);",
                "var __mod0 = require('./b'); exports.x = __mod0.x; exports.y = __mod0.default;",
            ]
        );
        assert!(out.contains("function __exportStar"));
    }

    #[test]
    fn test_named_default_class() {
        let out = cjs("export default class Foo {}");
        assert_eq!(body(&out), vec!["class Foo {}; exports.default = Foo;"]);
    }
}
