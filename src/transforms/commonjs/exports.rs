use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use tracing::debug;

use super::scope::is_valid_binding_name;
use super::{Visitor, rename, unwrap_parens};

struct ExportAssignment {
    name: String,
    // set when the assigned value is a bare identifier
    value_name: Option<String>,
}

fn export_assignment(stmt: &Statement<'_>) -> Option<ExportAssignment> {
    let Statement::ExpressionStatement(es) = stmt else {
        return None;
    };
    let Expression::AssignmentExpression(assign) = &es.expression else {
        return None;
    };
    if assign.operator != AssignmentOperator::Assign {
        return None;
    }
    let AssignmentTarget::StaticMemberExpression(member) = &assign.left else {
        return None;
    };
    if !matches!(&member.object, Expression::Identifier(obj) if obj.name.as_str() == "exports") {
        return None;
    }
    let value_name = match unwrap_parens(&assign.right) {
        Expression::Identifier(id) => Some(id.name.to_string()),
        _ => None,
    };
    Some(ExportAssignment { name: member.property.name.to_string(), value_name })
}

/// A call, or a member chain hanging off one (`require("m").a`).
fn is_call_based(expr: &Expression<'_>) -> bool {
    match unwrap_parens(expr) {
        Expression::CallExpression(_) => true,
        Expression::StaticMemberExpression(m) => is_call_based(&m.object),
        Expression::ComputedMemberExpression(m) => is_call_based(&m.object),
        Expression::PrivateFieldExpression(m) => is_call_based(&m.object),
        _ => false,
    }
}

fn assigned_value<'s, 'a>(stmt: &'s Statement<'a>) -> Option<&'s Expression<'a>> {
    let Statement::ExpressionStatement(es) = stmt else {
        return None;
    };
    let Expression::AssignmentExpression(assign) = &es.expression else {
        return None;
    };
    Some(&assign.right)
}

impl<'a> Visitor<'a> {
    /// Promotes the Program-level statement `exports.<name> = <value>;` at `index` to
    /// `export const <name> = <value>;`, renaming a colliding `<value>` across the file first.
    /// Returns where that statement sits afterwards; it moves down when the rename splits an
    /// earlier `export const`.
    pub(super) fn promote_export_assignment(&mut self, body: &mut ArenaVec<'a, Statement<'a>>, mut index: usize) -> usize {
        let Some(ExportAssignment { name, value_name }) = export_assignment(&body[index]) else {
            return index;
        };
        if assigned_value(&body[index]).is_some_and(is_call_based) {
            debug!(name = %name, "call-based export value left alone");
            return index;
        }
        if !is_valid_binding_name(&name) || self.state.is_exported(&name) {
            debug!(name = %name, "export name unusable as a binding or already exported");
            return index;
        }

        let renamed_value = value_name.filter(|v| self.bindings.is_top_level(v) || self.state.is_claimed(v));
        let name_taken = self.bindings.is_top_level(&name) || self.state.is_claimed(&name);
        match renamed_value.as_deref() {
            Some(value) if value == name => {}
            None if value_is(&body[index], &name) => {
                // `exports.x = x` with `x` unbound would read its own export before initialization.
                debug!(name = %name, "export of an unbound identifier with the same name left alone");
                return index;
            }
            _ if name_taken => {
                debug!(name = %name, "export name already bound at module level");
                return index;
            }
            _ => {}
        }

        if let Some(old) = renamed_value {
            let fresh = self.fresh_uid(&old);
            if let Some(binding) = self.bindings.get(&old) {
                debug!(
                    from = %binding.name,
                    to = %fresh,
                    declared_at = ?binding.declared_at,
                    references = binding.references.len(),
                    "renaming colliding export value"
                );
            }
            self.state.claim(&fresh);
            let split = rename::rename_in_statements(self.allocator, body, &old, &fresh);
            if !split.is_empty() {
                debug!(name = %old, exports = split.len(), "split renamed export declarations");
            }
            let moved = split.iter().filter(|&&at| at < index).count();
            index += moved;
            self.bindings.rename(&old, &fresh);
            self.state.record_rename(&old, &fresh);
            self.modified = true;
        }

        let Some(export) = assigned_value(&body[index]).and_then(|value| self.build_named_export(&name, value)) else {
            return index;
        };
        body[index] = export;
        self.state.claim(&name);
        self.state.mark_exported(&name);
        self.modified = true;
        debug!(name = %name, "promoted exports assignment to named export");
        index
    }
}

fn value_is(stmt: &Statement<'_>, name: &str) -> bool {
    assigned_value(stmt).is_some_and(|value| matches!(unwrap_parens(value), Expression::Identifier(id) if id.name.as_str() == name))
}
