use oxc_allocator::CloneIn;
use oxc_ast::ast::*;
use oxc_ast_visit::VisitMut;
use oxc_span::GetSpan;
use rustc_hash::FxHashSet;
use tracing::debug;

use super::{Visitor, unwrap_parens};

/// What the first argument of a `require` call tells us about its target.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Specifier {
    Static(String),
    Dynamic,
    Unsupported,
}

/// Result of rewriting `<target> = require("<static>")`.
pub(super) enum AssignmentOutcome {
    /// The hoisted import binds `<target>` itself; the assignment can go.
    Removable(String),
    /// The right-hand side now refers to the import.
    Replaced,
}

pub(super) fn require_call<'e, 'a>(expr: &'e Expression<'a>) -> Option<&'e CallExpression<'a>> {
    let Expression::CallExpression(call) = unwrap_parens(expr) else {
        return None;
    };
    matches!(&call.callee, Expression::Identifier(id) if id.name.as_str() == "require").then_some(&**call)
}

pub(super) fn classify_specifier(call: &CallExpression<'_>) -> Specifier {
    let Some(first) = call.arguments.first() else {
        return Specifier::Unsupported;
    };
    let Some(arg) = first.as_expression() else {
        return Specifier::Unsupported;
    };
    match unwrap_parens(arg) {
        Expression::StringLiteral(lit) => Specifier::Static(lit.value.to_string()),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => {
            let Some(quasi) = tpl.quasis.first() else {
                return Specifier::Unsupported;
            };
            let chunk = quasi.value.cooked.unwrap_or(quasi.value.raw);
            Specifier::Static(chunk.to_string())
        }
        _ => Specifier::Dynamic,
    }
}

pub(super) fn static_require_specifier(expr: &Expression<'_>) -> Option<String> {
    match classify_specifier(require_call(expr)?) {
        Specifier::Static(source) => Some(source),
        _ => None,
    }
}

impl<'a> Visitor<'a> {
    pub(super) fn fresh_uid(&mut self, base: &str) -> String {
        let state = &self.state;
        self.bindings.generate_uid(base, |name| state.is_claimed(name))
    }

    pub(super) fn hoist_default_import(&mut self, local: &str, source: &str) -> bool {
        let Some(import) = self.build_default_import(local, source) else {
            return false;
        };
        self.state.claim(local);
        self.hoisted.push(import);
        self.modified = true;
        debug!(local, source, "hoisted default import");
        true
    }

    pub(super) fn hoist_named_import(&mut self, pairs: &[(String, String)], source: &str) -> bool {
        let Some(import) = self.build_named_import(pairs, source) else {
            return false;
        };
        for (_, local) in pairs {
            self.state.claim(local);
        }
        self.hoisted.push(import);
        self.modified = true;
        debug!(source, specifiers = pairs.len(), "hoisted named import");
        true
    }

    /// `require(...)` met as a plain expression, i.e. with no destination to bind.
    pub(super) fn rewrite_require_call(&mut self, expr: &mut Expression<'a>) {
        let Expression::CallExpression(call) = unwrap_parens_mut(expr) else {
            return;
        };
        match classify_specifier(call) {
            Specifier::Static(source) => {
                let span = call.span;
                let local = self.fresh_uid(&source);
                if self.hoist_default_import(&local, &source) {
                    *expr = self.make_ident_expr(span, &local);
                }
            }
            Specifier::Dynamic => {
                for arg in call.arguments.iter_mut() {
                    self.visit_argument(arg);
                }
                let Some(source) = call.arguments.first().and_then(|a| a.as_expression()) else {
                    return;
                };
                let source = source.clone_in(self.allocator);
                if let Some(stmt) = self.build_dynamic_import(call.span, source) {
                    debug!("computed require specifier, deferring to import()");
                    self.replace_current_statement(stmt);
                    self.modified = true;
                }
            }
            Specifier::Unsupported => {
                debug!("require call without a usable specifier left alone");
                oxc_ast_visit::walk_mut::walk_call_expression(self, call);
            }
        }
    }

    /// `<target> = require("<static>")`. Returns `None` when the assignment is not of that shape.
    pub(super) fn rewrite_required_assignment(
        &mut self,
        assign: &mut AssignmentExpression<'a>,
    ) -> Option<AssignmentOutcome> {
        if assign.operator != AssignmentOperator::Assign {
            return None;
        }
        let source = static_require_specifier(&assign.right)?;
        let span = assign.right.span();

        let local = match &assign.left {
            AssignmentTarget::AssignmentTargetIdentifier(id) => {
                let name = id.name.to_string();
                if !self.bindings.contains(&name) && !self.state.is_claimed(&name) {
                    return self.hoist_default_import(&name, &source).then_some(AssignmentOutcome::Removable(name));
                }
                self.fresh_uid(&name)
            }
            AssignmentTarget::StaticMemberExpression(member) => {
                let name = member.property.name.to_string();
                if is_free_name(self, &name) { name } else { self.fresh_uid(&name) }
            }
            _ => self.fresh_uid(&source),
        };

        if !self.hoist_default_import(&local, &source) {
            return None;
        }
        assign.right = self.make_ident_expr(span, &local);
        Some(AssignmentOutcome::Replaced)
    }

    /// Handles `<pattern> = require("<static>")` declarators. Returns whether the declarator should
    /// be dropped because a hoisted import now provides its bindings.
    pub(super) fn rewrite_required_declarator(&mut self, declarator: &mut VariableDeclarator<'a>, removable: bool) -> bool {
        let Some(init) = declarator.init.as_ref() else {
            return false;
        };
        let Some(source) = static_require_specifier(init) else {
            return false;
        };
        let span = init.span();

        if removable {
            match &declarator.id {
                BindingPattern::ObjectPattern(pattern) => {
                    if let Some(pairs) = self.named_import_pairs(pattern) {
                        if self.hoist_named_import(&pairs, &source) {
                            return true;
                        }
                    }
                }
                BindingPattern::BindingIdentifier(id) if self.can_import_as(&id.name) => {
                    let name = id.name.to_string();
                    if self.hoist_default_import(&name, &source) {
                        return true;
                    }
                }
                _ => {}
            }
        }

        let base = match &declarator.id {
            BindingPattern::BindingIdentifier(id) => id.name.to_string(),
            _ => source.clone(),
        };
        let local = self.fresh_uid(&base);
        if self.hoist_default_import(&local, &source) {
            declarator.init = Some(self.make_ident_expr(span, &local));
        }
        false
    }

    /// A removed declarator may hand its name to an import only when nothing else claims it and no
    /// other module-level declaration (`function a() {}`, a second `var a`) would collide with it.
    fn can_import_as(&self, name: &str) -> bool {
        !self.state.is_claimed(name) && self.bindings.declaration_count(name) <= 1
    }

    /// `(imported, local)` pairs for a destructuring that maps one-to-one onto named imports.
    fn named_import_pairs(&self, pattern: &ObjectPattern<'a>) -> Option<Vec<(String, String)>> {
        if pattern.rest.is_some() {
            debug!("rest element in required destructuring, keeping the pattern");
            return None;
        }
        let mut pairs = Vec::with_capacity(pattern.properties.len());
        let mut locals = FxHashSet::default();
        for prop in &pattern.properties {
            if prop.computed {
                return None;
            }
            let imported = match &prop.key {
                PropertyKey::StaticIdentifier(key) => key.name.to_string(),
                PropertyKey::StringLiteral(key) => key.value.to_string(),
                _ => return None,
            };
            let BindingPattern::BindingIdentifier(local) = &prop.value else {
                return None;
            };
            let local = local.name.to_string();
            if !self.can_import_as(&local) || !locals.insert(local.clone()) {
                return None;
            }
            pairs.push((imported, local));
        }
        Some(pairs)
    }
}

fn is_free_name(v: &Visitor<'_>, name: &str) -> bool {
    !v.bindings.contains(name) && !v.state.is_claimed(name) && !v.bindings.is_used(name)
}

fn unwrap_parens_mut<'e, 'a>(mut expr: &'e mut Expression<'a>) -> &'e mut Expression<'a> {
    loop {
        match expr {
            Expression::ParenthesizedExpression(p) => expr = &mut p.expression,
            _ => return expr,
        }
    }
}
