//! CommonJS to ES module conversion.
//!
//! One forward walk over the program. Statement lists are driven here rather than by
//! `walk_statements` so that a component can ask for the statement it is currently inside to be
//! removed or replaced; the request is applied once that statement has been walked, so no sibling
//! is visited twice and removed nodes are never visited. Imports synthesized along the way are
//! queued and inserted at the head of the body after the current top-level statement.

use oxc_allocator::{Box as ArenaBox, Vec as ArenaVec};
use oxc_ast::ast::*;
use oxc_ast_visit::VisitMut;
use oxc_span::GetSpan;
use tracing::debug;

use crate::{Transform, TransformCtx};

mod builders;
mod declarations;
mod exports;
mod program;
mod rename;
mod require;
mod scope;
mod state;

use require::AssignmentOutcome;
use scope::BindingTable;
use state::TransformState;

pub struct CommonJsToEsm;

impl Transform for CommonJsToEsm {
    fn name(&self) -> &'static str {
        "commonJsToEsm"
    }

    fn run<'a>(&self, ctx: &mut TransformCtx<'a>, program: &mut Program<'a>) -> bool {
        let mut v = Visitor::new(ctx.allocator, BindingTable::from_program(program));
        v.visit_program(program);
        v.modified
    }
}

enum StatementAction<'a> {
    Remove,
    Replace(Vec<Statement<'a>>),
}

struct Visitor<'a> {
    allocator: &'a oxc_allocator::Allocator,
    bindings: BindingTable,
    state: TransformState,
    // synthesized imports waiting for the current top-level statement to finish
    hoisted: Vec<Statement<'a>>,
    // requested action for the innermost statement being walked
    pending: Option<StatementAction<'a>>,
    // set while entering a `var`/`let`/`const` that sits directly in the Program body
    declaration_in_program_body: bool,
    modified: bool,
}

impl<'a> Visitor<'a> {
    fn new(allocator: &'a oxc_allocator::Allocator, bindings: BindingTable) -> Self {
        Self {
            allocator,
            bindings,
            state: TransformState::default(),
            hoisted: Vec::new(),
            pending: None,
            declaration_in_program_body: false,
            modified: false,
        }
    }

    fn remove_current_statement(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(StatementAction::Remove);
        }
        self.modified = true;
    }

    fn replace_current_statement(&mut self, stmt: Statement<'a>) {
        match &mut self.pending {
            Some(StatementAction::Replace(stmts)) => stmts.push(stmt),
            _ => self.pending = Some(StatementAction::Replace(vec![stmt])),
        }
        self.modified = true;
    }

    /// Applies `action` to `stmts[index]` and returns the index of the next unvisited statement.
    fn apply_in_list(&self, stmts: &mut ArenaVec<'a, Statement<'a>>, index: usize, action: Option<StatementAction<'a>>) -> usize {
        match action {
            None => index + 1,
            Some(StatementAction::Remove) => {
                stmts.remove(index);
                index
            }
            Some(StatementAction::Replace(replacements)) => {
                stmts.remove(index);
                let count = replacements.len();
                for (offset, stmt) in replacements.into_iter().enumerate() {
                    stmts.insert(index + offset, stmt);
                }
                index + count
            }
        }
    }

    /// Single-statement positions (`if` bodies, loop bodies, labels) cannot shrink or grow.
    fn apply_in_place(&self, stmt: &mut Statement<'a>, action: StatementAction<'a>) {
        let span = stmt.span();
        match action {
            StatementAction::Remove => {
                *stmt = Statement::EmptyStatement(ArenaBox::new_in(EmptyStatement { span }, self.allocator));
            }
            StatementAction::Replace(mut replacements) if replacements.len() == 1 => {
                if let Some(replacement) = replacements.pop() {
                    *stmt = replacement;
                }
            }
            StatementAction::Replace(replacements) => {
                let mut body = ArenaVec::new_in(self.allocator);
                for replacement in replacements {
                    body.push(replacement);
                }
                *stmt = Statement::BlockStatement(ArenaBox::new_in(
                    BlockStatement { span, body, scope_id: Default::default() },
                    self.allocator,
                ));
            }
        }
    }

    /// Imports hoisted out of a statement that then gets replaced stay in place, even when the
    /// replacement no longer refers to them (`f(require(a), require("b"))` becomes `import(a);`).
    fn note_kept_imports(&self, action: Option<&StatementAction<'a>>, hoisted_before: usize) {
        let kept = self.hoisted.len().saturating_sub(hoisted_before);
        if kept > 0 && matches!(action, Some(StatementAction::Replace(_))) {
            debug!(kept, "statement replaced by dynamic import, keeping imports hoisted from it");
        }
    }

    /// Walks one statement of a list and applies whatever was requested for it.
    fn walk_listed_statement(&mut self, stmts: &mut ArenaVec<'a, Statement<'a>>, index: usize) -> usize {
        let outer = self.pending.take();
        let hoisted_before = self.hoisted.len();
        oxc_ast_visit::walk_mut::walk_statement(self, &mut stmts[index]);
        let action = std::mem::replace(&mut self.pending, outer);
        self.note_kept_imports(action.as_ref(), hoisted_before);
        self.apply_in_list(stmts, index, action)
    }

    fn rewrite_program_body(&mut self, body: &mut ArenaVec<'a, Statement<'a>>) {
        let mut i = 0;
        while i < body.len() {
            i = self.promote_export_assignment(body, i);

            self.declaration_in_program_body = matches!(body[i], Statement::VariableDeclaration(_));
            i = self.walk_listed_statement(body, i);
            self.declaration_in_program_body = false;

            // Each import goes to the very top, so later discoveries end up above earlier ones.
            for mut import in std::mem::take(&mut self.hoisted) {
                oxc_ast_visit::walk_mut::walk_statement(self, &mut import);
                body.insert(0, import);
                i += 1;
            }
        }
    }
}

fn unwrap_parens<'e, 'a>(mut expr: &'e Expression<'a>) -> &'e Expression<'a> {
    loop {
        match expr {
            Expression::ParenthesizedExpression(p) => expr = &p.expression,
            _ => return expr,
        }
    }
}

impl<'a> VisitMut<'a> for Visitor<'a> {
    fn visit_program(&mut self, it: &mut Program<'a>) {
        self.install_module_wrapper(it);
        self.rewrite_program_body(&mut it.body);
    }

    fn visit_statements(&mut self, it: &mut ArenaVec<'a, Statement<'a>>) {
        let mut i = 0;
        while i < it.len() {
            i = self.walk_listed_statement(it, i);
        }
    }

    fn visit_statement(&mut self, it: &mut Statement<'a>) {
        let outer = self.pending.take();
        let hoisted_before = self.hoisted.len();
        oxc_ast_visit::walk_mut::walk_statement(self, it);
        if let Some(action) = std::mem::replace(&mut self.pending, outer) {
            self.note_kept_imports(Some(&action), hoisted_before);
            self.apply_in_place(it, action);
        }
    }

    fn visit_variable_declaration(&mut self, it: &mut VariableDeclaration<'a>) {
        let removable = std::mem::take(&mut self.declaration_in_program_body);
        let mut i = 0;
        while i < it.declarations.len() {
            self.register_declarator(&it.declarations[i], removable);
            if self.rewrite_required_declarator(&mut it.declarations[i], removable) {
                it.declarations.remove(i);
                continue;
            }
            self.visit_variable_declarator(&mut it.declarations[i]);
            i += 1;
        }
        if it.declarations.is_empty() {
            self.remove_current_statement();
        }
    }

    fn visit_expression_statement(&mut self, it: &mut ExpressionStatement<'a>) {
        if let Expression::AssignmentExpression(assign) = &mut it.expression {
            if let Some(AssignmentOutcome::Removable(_)) = self.rewrite_required_assignment(assign) {
                self.remove_current_statement();
                return;
            }
        }
        oxc_ast_visit::walk_mut::walk_expression_statement(self, it);
    }

    fn visit_expression(&mut self, it: &mut Expression<'a>) {
        if require::require_call(it).is_some() {
            self.rewrite_require_call(it);
            return;
        }
        if let Expression::AssignmentExpression(assign) = it {
            if let Some(AssignmentOutcome::Removable(name)) = self.rewrite_required_assignment(assign) {
                // The hoisted import binds `name`; the assignment's value is that binding.
                let span = assign.span;
                *it = self.make_ident_expr(span, &name);
                return;
            }
        }
        oxc_ast_visit::walk_mut::walk_expression(self, it);
    }

    fn visit_import_specifier(&mut self, it: &mut ImportSpecifier<'a>) {
        self.register_named_import(it);
    }

    fn visit_import_default_specifier(&mut self, it: &mut ImportDefaultSpecifier<'a>) {
        self.register_default_import(it);
    }

    fn visit_identifier_reference(&mut self, it: &mut IdentifierReference<'a>) {
        self.bindings.add_reference(&it.name, it.span);
    }
}
