//! In-place TypeScript erasure.
//!
//! Type-only syntax is overwritten with spaces (line breaks kept) so the
//! remaining JavaScript keeps its original line and column positions.
//! Constructs with runtime semantics (enums, namespaces, parameter
//! properties, `import =` and `export =`) cannot be erased and are reported.

use crate::ecma::{self, Edits, Failure};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use swc_common::Spanned;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

static MODIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(public|private|protected|readonly|override|abstract|declare)\b")
        .expect("modifier regex")
});

/// Collect the edits that erase TypeScript from `module`.
pub fn erase_types(source: &str, module: &Module, edits: &mut Edits) -> Result<(), Vec<Failure>> {
    let mut eraser = TypeEraser {
        source,
        edits,
        failures: Vec::new(),
    };
    module.visit_with(&mut eraser);
    if eraser.failures.is_empty() {
        Ok(())
    } else {
        Err(eraser.failures)
    }
}

struct TypeEraser<'a, 'e> {
    source: &'a str,
    edits: &'e mut Edits,
    failures: Vec<Failure>,
}

impl TypeEraser<'_, '_> {
    fn blank(&mut self, range: Range<usize>) {
        self.edits.blank(self.source, range);
    }

    fn blank_node(&mut self, node: &impl Spanned) {
        self.blank(ecma::range(node));
    }

    /// Blank a list element together with the comma that follows it.
    fn blank_list_item(&mut self, node: &impl Spanned) {
        let range = ecma::range(node);
        let rest = &self.source[range.end..];
        let trimmed = rest.trim_start();
        let end = if trimmed.starts_with(',') {
            range.end + (rest.len() - trimmed.len()) + 1
        } else {
            range.end
        };
        self.blank(range.start..end);
    }

    fn unsupported(&mut self, node: &impl Spanned, message: &str) {
        self.failures.push(Failure {
            offset: ecma::range(node).start,
            message: message.to_string(),
        });
    }

    /// Blank TypeScript-only modifier keywords in `range`.
    fn blank_modifiers(&mut self, range: Range<usize>) {
        let Some(window) = self.source.get(range.clone()) else {
            return;
        };
        let found: Vec<Range<usize>> = MODIFIER
            .find_iter(window)
            .filter(|m| {
                let prev = window[..m.start()].chars().next_back();
                !matches!(prev, Some('@' | '.' | '#'))
            })
            .map(|m| range.start + m.start()..range.start + m.end())
            .collect();
        for r in found {
            self.blank(r);
        }
    }
}

/// Declarations that exist only at the type level.
fn is_ambient(decl: &Decl) -> bool {
    match decl {
        Decl::TsInterface(_) | Decl::TsTypeAlias(_) => true,
        Decl::Class(c) => c.declare,
        Decl::Fn(f) => f.declare || f.function.body.is_none(),
        Decl::Var(v) => v.declare,
        Decl::TsEnum(e) => e.declare,
        Decl::TsModule(m) => m.declare,
        Decl::Using(_) => false,
    }
}

impl Visit for TypeEraser<'_, '_> {
    fn visit_module_item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                if import.type_only {
                    self.blank_node(item);
                    return;
                }
                for spec in &import.specifiers {
                    if let ImportSpecifier::Named(named) = spec {
                        if named.is_type_only {
                            self.blank_list_item(named);
                        }
                    }
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) if is_ambient(&export.decl) => {
                self.blank_node(item);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => {
                if named.type_only {
                    self.blank_node(item);
                    return;
                }
                for spec in &named.specifiers {
                    if let ExportSpecifier::Named(s) = spec {
                        if s.is_type_only {
                            self.blank_list_item(s);
                        }
                    }
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(all)) if all.type_only => {
                self.blank_node(item);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(ExportDefaultDecl {
                decl: DefaultDecl::TsInterfaceDecl(_),
                ..
            }))
            | ModuleItem::ModuleDecl(ModuleDecl::TsNamespaceExport(_)) => {
                self.blank_node(item);
            }
            ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(node)) => {
                if node.is_type_only {
                    self.blank_node(item);
                } else {
                    self.unsupported(item, "`import x = require()` is not supported; use an ES import");
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::TsExportAssignment(_)) => {
                self.unsupported(item, "`export =` is not supported; use `export default`");
            }
            _ => item.visit_children_with(self),
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) if is_ambient(decl) => self.blank_node(stmt),
            _ => stmt.visit_children_with(self),
        }
    }

    fn visit_ts_type_ann(&mut self, ann: &TsTypeAnn) {
        let bytes = self.source.as_bytes();
        let range = ecma::range(ann);
        let mut start = range.start;

        if bytes.get(start) != Some(&b':') {
            let mut k = start;
            while k > 0 && bytes[k - 1].is_ascii_whitespace() {
                k -= 1;
            }
            if k > 0 && bytes[k - 1] == b':' {
                start = k - 1;
            }
        }
        // Optional (`x?: T`) and definite (`x!: T`) markers.
        let mut k = start;
        while k > 0 && bytes[k - 1].is_ascii_whitespace() {
            k -= 1;
        }
        if k > 0 && matches!(bytes[k - 1], b'?' | b'!') {
            start = k - 1;
        }

        self.blank(start..range.end);
    }

    fn visit_ts_type_param_decl(&mut self, node: &TsTypeParamDecl) {
        self.blank_node(node);
    }

    fn visit_ts_type_param_instantiation(&mut self, node: &TsTypeParamInstantiation) {
        self.blank_node(node);
    }

    fn visit_ts_as_expr(&mut self, node: &TsAsExpr) {
        self.blank(ecma::range(&*node.expr).end..ecma::range(node).end);
        node.expr.visit_with(self);
    }

    fn visit_ts_satisfies_expr(&mut self, node: &TsSatisfiesExpr) {
        self.blank(ecma::range(&*node.expr).end..ecma::range(node).end);
        node.expr.visit_with(self);
    }

    fn visit_ts_const_assertion(&mut self, node: &TsConstAssertion) {
        self.blank(ecma::range(&*node.expr).end..ecma::range(node).end);
        node.expr.visit_with(self);
    }

    fn visit_ts_non_null_expr(&mut self, node: &TsNonNullExpr) {
        self.blank(ecma::range(&*node.expr).end..ecma::range(node).end);
        node.expr.visit_with(self);
    }

    fn visit_ts_type_assertion(&mut self, node: &TsTypeAssertion) {
        self.blank(ecma::range(node).start..ecma::range(&*node.expr).start);
        node.expr.visit_with(self);
    }

    fn visit_ts_interface_decl(&mut self, node: &TsInterfaceDecl) {
        self.blank_node(node);
    }

    fn visit_ts_type_alias_decl(&mut self, node: &TsTypeAliasDecl) {
        self.blank_node(node);
    }

    fn visit_ts_enum_decl(&mut self, node: &TsEnumDecl) {
        if !node.declare {
            self.unsupported(node, "TypeScript enums are not supported; use a plain object instead");
        }
    }

    fn visit_ts_module_decl(&mut self, node: &TsModuleDecl) {
        if !node.declare && !node.global {
            self.unsupported(node, "TypeScript namespaces are not supported");
        }
    }

    fn visit_ts_param_prop(&mut self, node: &TsParamProp) {
        self.unsupported(
            node,
            "Parameter properties are not supported; assign the field in the constructor body",
        );
    }

    fn visit_class(&mut self, class: &Class) {
        if class.is_abstract {
            let start = ecma::range(class).start;
            let head = &self.source[start..];
            if head.starts_with("abstract") {
                self.blank(start..start + "abstract".len());
            } else {
                let before = self.source[..start].trim_end();
                if before.ends_with("abstract") {
                    self.blank(before.len() - "abstract".len()..before.len());
                }
            }
        }

        if let (Some(first), Some(last)) = (class.implements.first(), class.implements.last()) {
            let first_start = ecma::range(first).start;
            if let Some(kw) = self.source[..first_start].rfind("implements") {
                self.blank(kw..ecma::range(last).end);
            }
        }

        class.visit_children_with(self);
    }

    fn visit_class_member(&mut self, member: &ClassMember) {
        match member {
            ClassMember::TsIndexSignature(_) => self.blank_node(member),
            ClassMember::Method(m) if m.function.body.is_none() || m.is_abstract => {
                self.blank_node(member)
            }
            ClassMember::Constructor(c) if c.body.is_none() => self.blank_node(member),
            ClassMember::ClassProp(p) if p.declare || p.is_abstract => self.blank_node(member),
            ClassMember::Method(m) => {
                self.blank_modifiers(ecma::range(member).start..ecma::range(&m.key).start);
                member.visit_children_with(self);
            }
            ClassMember::ClassProp(p) => {
                self.blank_modifiers(ecma::range(member).start..ecma::range(&p.key).start);
                member.visit_children_with(self);
            }
            ClassMember::Constructor(c) => {
                self.blank_modifiers(ecma::range(member).start..ecma::range(&c.key).start);
                member.visit_children_with(self);
            }
            _ => member.visit_children_with(self),
        }
    }
}
