use indexmap::IndexMap;
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use rustc_hash::FxHashSet;
use tracing::trace;

const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "eval", "export", "extends", "false", "finally", "for", "function", "if", "implements",
    "import", "in", "instanceof", "interface", "let", "new", "null", "package", "private", "protected", "public",
    "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
    "yield",
];

#[derive(Debug)]
pub(super) struct Binding {
    pub(super) name: String,
    pub(super) declared_at: Span,
    pub(super) references: Vec<Span>,
    // declared directly at module level, as opposed to hoisted in from a nested declarator
    pub(super) top_level: bool,
    // module-level declarations of this name found when seeding (`var a; function a() {}` is two)
    pub(super) declarations: usize,
}

/// Root-scope bindings of one file, keyed by name, plus every identifier name the file mentions.
#[derive(Debug, Default)]
pub(super) struct BindingTable {
    bindings: IndexMap<String, Binding>,
    used_names: FxHashSet<String>,
}

impl BindingTable {
    pub(super) fn from_program(program: &Program<'_>) -> Self {
        let mut table = Self::default();

        let mut used = UsedNames { out: &mut table.used_names };
        used.visit_program(program);

        let mut declared = Vec::new();
        for stmt in &program.body {
            match stmt {
                Statement::VariableDeclaration(decl) => collect_declaration_names(decl, &mut declared),
                Statement::FunctionDeclaration(func) => declared.extend(func.id.as_ref().map(|id| (id.name.to_string(), id.span))),
                Statement::ClassDeclaration(class) => declared.extend(class.id.as_ref().map(|id| (id.name.to_string(), id.span))),
                Statement::ImportDeclaration(import) => {
                    for specifier in import.specifiers.iter().flatten() {
                        let local = match specifier {
                            ImportDeclarationSpecifier::ImportSpecifier(s) => &s.local,
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => &s.local,
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => &s.local,
                        };
                        declared.push((local.name.to_string(), local.span));
                    }
                }
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(Declaration::VariableDeclaration(decl)) => collect_declaration_names(decl, &mut declared),
                    Some(Declaration::FunctionDeclaration(func)) => {
                        declared.extend(func.id.as_ref().map(|id| (id.name.to_string(), id.span)))
                    }
                    Some(Declaration::ClassDeclaration(class)) => {
                        declared.extend(class.id.as_ref().map(|id| (id.name.to_string(), id.span)))
                    }
                    _ => {}
                },
                Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        declared.extend(func.id.as_ref().map(|id| (id.name.to_string(), id.span)))
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        declared.extend(class.id.as_ref().map(|id| (id.name.to_string(), id.span)))
                    }
                    _ => {}
                },
                other => {
                    // `var` inside top-level blocks and loops still binds at module level.
                    let mut hoisted = HoistedVars { out: &mut declared };
                    hoisted.visit_statement(other);
                }
            }
        }

        for (name, span) in declared {
            table.register(&name, span, true);
            if let Some(binding) = table.bindings.get_mut(&name) {
                binding.declarations += 1;
            }
        }
        table
    }

    pub(super) fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub(super) fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub(super) fn is_top_level(&self, name: &str) -> bool {
        self.bindings.get(name).is_some_and(|b| b.top_level)
    }

    pub(super) fn declaration_count(&self, name: &str) -> usize {
        self.bindings.get(name).map_or(0, |b| b.declarations)
    }

    /// Registers `name`, or records `span` as another reference when it is already bound.
    /// Returns whether a new binding was created.
    pub(super) fn register(&mut self, name: &str, span: Span, top_level: bool) -> bool {
        self.used_names.insert(name.to_string());
        if let Some(binding) = self.bindings.get_mut(name) {
            binding.references.push(span);
            return false;
        }
        trace!(name, top_level, "registered binding");
        self.bindings.insert(
            name.to_string(),
            Binding { name: name.to_string(), declared_at: span, references: Vec::new(), top_level, declarations: 0 },
        );
        true
    }

    pub(super) fn add_reference(&mut self, name: &str, span: Span) -> bool {
        let Some(binding) = self.bindings.get_mut(name) else {
            return false;
        };
        binding.references.push(span);
        true
    }

    /// Moves the binding for `from` (with its references) to `to`. The tree itself is rewritten by
    /// the renamer; this keeps the table in step with it.
    pub(super) fn rename(&mut self, from: &str, to: &str) -> bool {
        self.used_names.insert(to.to_string());
        let Some(mut binding) = self.bindings.shift_remove(from) else {
            return false;
        };
        binding.name = to.to_string();
        self.bindings.insert(to.to_string(), binding);
        true
    }

    /// Generates `_base`, `_base2`, `_base3`, ... skipping anything bound, used, or rejected by `taken`.
    pub(super) fn generate_uid(&mut self, base: &str, taken: impl Fn(&str) -> bool) -> String {
        let identifier = to_identifier(base);
        let stem = identifier.trim_start_matches('_').trim_end_matches(|c: char| c.is_ascii_digit());

        let mut i = 1usize;
        loop {
            let candidate = if i > 1 { format!("_{stem}{i}") } else { format!("_{stem}") };
            if !self.bindings.contains_key(&candidate) && !self.used_names.contains(&candidate) && !taken(&candidate) {
                self.used_names.insert(candidate.clone());
                return candidate;
            }
            i += 1;
        }
    }

    pub(super) fn is_used(&self, name: &str) -> bool {
        self.used_names.contains(name)
    }
}

/// Turns an arbitrary string (typically a module specifier) into an identifier:
/// `./foo-bar.js` becomes `fooBarJs`.
pub(super) fn to_identifier(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '$' || c == '_' { c } else { '-' })
        .collect();
    let trimmed = replaced.trim_start_matches(|c: char| c == '-' || c.is_ascii_digit());

    let mut out = String::with_capacity(trimmed.len());
    let mut upper_next = false;
    for c in trimmed.chars() {
        if c == '-' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    if out.is_empty() {
        return "_".to_string();
    }
    if is_reserved_word(&out) {
        return format!("_{out}");
    }
    out
}

pub(super) fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

pub(super) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '$' || first == '_') && chars.all(|c| c.is_alphanumeric() || c == '$' || c == '_')
}

/// A name usable as `const <name>`.
pub(super) fn is_valid_binding_name(name: &str) -> bool {
    is_identifier_name(name) && !is_reserved_word(name)
}

/// Every identifier `pattern` binds, in source order.
pub(super) fn pattern_names(pattern: &BindingPattern<'_>) -> Vec<(String, Span)> {
    let mut names = Vec::new();
    let mut collector = BindingNames { out: &mut names };
    collector.visit_binding_pattern(pattern);
    names
}

pub(super) fn pattern_binds(pattern: &BindingPattern<'_>, name: &str) -> bool {
    pattern_names(pattern).iter().any(|(n, _)| n == name)
}

pub(super) fn parameters_bind(params: &FormalParameters<'_>, name: &str) -> bool {
    let mut names = Vec::new();
    let mut collector = BindingNames { out: &mut names };
    collector.visit_formal_parameters(params);
    names.iter().any(|(n, _)| n == name)
}

/// Whether `stmts` declare `name` in the scope they form. Lexical declarations are only looked for at
/// the list's own level; with `include_vars`, `var` declarations anywhere outside nested functions count
/// too (function-body semantics).
pub(super) fn statements_declare(stmts: &[Statement<'_>], name: &str, include_vars: bool) -> bool {
    for stmt in stmts {
        let found = match stmt {
            Statement::VariableDeclaration(decl) if decl.kind != VariableDeclarationKind::Var => {
                decl.declarations.iter().any(|d| pattern_binds(&d.id, name))
            }
            Statement::FunctionDeclaration(func) => func.id.as_ref().is_some_and(|id| id.name.as_str() == name),
            Statement::ClassDeclaration(class) => class.id.as_ref().is_some_and(|id| id.name.as_str() == name),
            _ => false,
        };
        if found {
            return true;
        }
    }

    if !include_vars {
        return false;
    }
    let mut vars = Vec::new();
    let mut hoisted = HoistedVars { out: &mut vars };
    for stmt in stmts {
        hoisted.visit_statement(stmt);
    }
    vars.iter().any(|(n, _)| n == name)
}

fn collect_declaration_names(decl: &VariableDeclaration<'_>, out: &mut Vec<(String, Span)>) {
    let mut collector = BindingNames { out };
    for declarator in &decl.declarations {
        collector.visit_binding_pattern(&declarator.id);
    }
}

struct UsedNames<'s> {
    out: &'s mut FxHashSet<String>,
}

impl<'a> Visit<'a> for UsedNames<'_> {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        self.out.insert(it.name.to_string());
    }

    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        self.out.insert(it.name.to_string());
    }
}

struct BindingNames<'s> {
    out: &'s mut Vec<(String, Span)>,
}

impl<'a> Visit<'a> for BindingNames<'_> {
    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        self.out.push((it.name.to_string(), it.span));
    }

    // Default values may hold functions; their parameters are not ours.
    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}
}

struct HoistedVars<'s> {
    out: &'s mut Vec<(String, Span)>,
}

impl<'a> Visit<'a> for HoistedVars<'_> {
    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        if it.kind == VariableDeclarationKind::Var {
            collect_declaration_names(it, self.out);
        }
        oxc_ast_visit::walk::walk_variable_declaration(self, it);
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    use super::*;

    fn table_for(source: &str) -> BindingTable {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
        assert!(ret.errors.is_empty());
        BindingTable::from_program(&ret.program)
    }

    #[test]
    fn to_identifier_camel_cases_specifiers() {
        assert_eq!(to_identifier("./foo-bar.js"), "fooBarJs");
        assert_eq!(to_identifier("lodash"), "lodash");
        assert_eq!(to_identifier("@scope/pkg"), "scopePkg");
        assert_eq!(to_identifier("123"), "_");
        assert_eq!(to_identifier("class"), "_class");
    }

    #[test]
    fn seeds_top_level_and_hoisted_bindings() {
        let table = table_for(
            "let a = 1;\nconst { b, c: d } = obj;\nfunction f() { var inner; }\nclass K {}\nimport e from 'e';\nif (x) { var hoisted = 1; let scoped = 2; }\n",
        );
        for name in ["a", "b", "d", "f", "K", "e", "hoisted"] {
            assert!(table.contains(name), "missing {name}");
            assert!(table.is_top_level(name));
        }
        assert!(!table.contains("c"));
        assert!(!table.contains("inner"));
        assert!(!table.contains("scoped"));
        assert!(table.is_used("obj"));
        assert!(table.is_used("inner"));
    }

    #[test]
    fn counts_repeated_module_level_declarations() {
        let table = table_for("function a() {}\nvar a = 1;\nvar b;\nif (x) { var b = 2; }\nvar c;\nfunction g() { var c; }\n");
        assert_eq!(table.declaration_count("a"), 2);
        assert_eq!(table.declaration_count("b"), 2);
        assert_eq!(table.declaration_count("c"), 1);
        assert_eq!(table.declaration_count("missing"), 0);
    }

    #[test]
    fn register_twice_records_a_reference() {
        let mut table = BindingTable::default();
        assert!(table.register("x", Span::new(0, 1), true));
        assert!(!table.register("x", Span::new(5, 6), false));
        let binding = table.get("x").unwrap();
        assert_eq!(binding.declared_at, Span::new(0, 1));
        assert_eq!(binding.references, vec![Span::new(5, 6)]);
        assert!(binding.top_level);
    }

    #[test]
    fn rename_moves_binding_and_references() {
        let mut table = BindingTable::default();
        table.register("x", Span::new(0, 1), true);
        table.add_reference("x", Span::new(9, 10));
        assert!(table.rename("x", "_x"));
        assert!(!table.contains("x"));
        let binding = table.get("_x").unwrap();
        assert_eq!(binding.name, "_x");
        assert_eq!(binding.references.len(), 1);
        assert!(!table.rename("missing", "_missing"));
    }

    #[test]
    fn generate_uid_skips_taken_names() {
        let mut table = table_for("const _mod = 1; _mod2();\n");
        assert_eq!(table.generate_uid("mod", |_| false), "_mod3");
        assert_eq!(table.generate_uid("mod", |_| false), "_mod4");
        assert_eq!(table.generate_uid("x1", |n| n == "_x"), "_x2");
        assert_eq!(table.generate_uid("./foo-bar.js", |_| false), "_fooBarJs");
    }

    #[test]
    fn statements_declare_respects_scope_kinds() {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, "let a; if (x) { var b; } function c() { var d; }", SourceType::mjs()).parse();
        let body = &ret.program.body;
        assert!(statements_declare(body, "a", false));
        assert!(!statements_declare(body, "b", false));
        assert!(statements_declare(body, "b", true));
        assert!(statements_declare(body, "c", false));
        assert!(!statements_declare(body, "d", true));
    }
}
