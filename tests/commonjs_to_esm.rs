use esmify_rs::{API_VERSION, ConvertOptions, Error, Esmify};

fn run(input: &str) -> String {
    let e = Esmify::default();
    let out = e
        .convert(input, ConvertOptions { source_type: Some(oxc_span::SourceType::mjs()), ..ConvertOptions::default() })
        .unwrap();

    println!("==== INPUT ====\n{input}\n==== OUTPUT ====\n{}\n", out.code);
    out.code
}

/// Parses `code` as a module again and fails on any syntax or binding error (duplicate
/// declarations, exports of unknown locals).
fn assert_binds_uniquely(code: &str) {
    let allocator = oxc_allocator::Allocator::default();
    let ret = oxc_parser::Parser::new(&allocator, code, oxc_span::SourceType::mjs()).parse();
    assert!(ret.errors.is_empty(), "output does not parse: {:?}", ret.errors);
    let checked = oxc_semantic::SemanticBuilder::new().with_check_syntax_error(true).build(&ret.program);
    let errors: Vec<String> = checked.errors.iter().map(|e| e.to_string()).collect();
    assert!(errors.is_empty(), "binding errors in output: {}", errors.join("; "));
}

#[test]
fn destructured_require_becomes_named_import() {
    let input = "const { a: x, b: y } = require(\"mod\");\nconsole.log(x, y);\n";
    let output = run(input);
    assert!(output.contains("a as x"));
    assert!(output.contains("b as y"));
    assert!(output.contains("from \"mod\""));
    assert!(!output.contains("require"));
}

#[test]
fn destructure_with_rest_keeps_pattern_on_generated_import() {
    let input = "const { a, ...rest } = require(\"mod\");\n";
    let output = run(input);
    assert!(output.contains("import _mod from \"mod\""));
    assert!(output.contains("= _mod"));
    assert!(output.contains("...rest"));
}

#[test]
fn undeclared_assignment_target_becomes_default_import() {
    let input = "foo = require(\"mod\");\nfoo.bar();\n";
    let output = run(input);
    assert!(output.contains("import foo from \"mod\""));
    assert!(!output.contains("foo ="));
    assert!(output.contains("foo.bar()"));
}

#[test]
fn declared_assignment_target_is_assigned_from_fresh_import() {
    let input = "var foo;\nfoo = require(\"mod\");\n";
    let output = run(input);
    assert!(output.contains("import _foo from \"mod\""));
    assert!(output.contains("foo = _foo"));
}

#[test]
fn bare_require_is_replaced_by_generated_identifier() {
    let input = "require(\"mod\");\n";
    let output = run(input);
    assert!(output.contains("import _mod from \"mod\""));
    assert!(output.contains("_mod;"));
    assert!(!output.contains("require"));
}

#[test]
fn generated_identifiers_are_derived_from_the_specifier() {
    let input = "setup(require(\"./foo-bar.js\"));\n";
    let output = run(input);
    assert!(output.contains("import _fooBarJs from \"./foo-bar.js\""));
    assert!(output.contains("setup(_fooBarJs)"));
}

#[test]
fn require_into_name_with_another_declaration_keeps_the_declarator() {
    let input = "function a() {}\nvar a = require(\"a\");\n";
    let output = run(input);
    assert!(output.contains("import _a from \"a\""));
    assert!(output.contains("var a = _a"));
    assert!(!output.contains("import a from"));
    assert_binds_uniquely(&output);
}

#[test]
fn repeated_var_requires_get_distinct_imports() {
    let input = "var a = require(\"a\");\nvar a = require(\"b\");\n";
    let output = run(input);
    assert!(output.contains("import _a from \"a\""));
    assert!(output.contains("import _a2 from \"b\""));
    assert!(output.contains("var a = _a;"));
    assert!(output.contains("var a = _a2;"));
    assert_binds_uniquely(&output);
}

#[test]
fn destructured_require_into_redeclared_name_keeps_the_pattern() {
    let input = "let { x } = require(\"m\");\nfunction f() { var x; }\nfunction x2() {}\nvar { y } = require(\"n\");\nvar y;\n";
    let output = run(input);
    assert!(output.contains("import { x } from \"m\""));
    assert!(output.contains("import _n from \"n\""));
    assert!(output.contains("= _n"));
    assert_binds_uniquely(&output);
}

#[test]
fn template_literal_specifier_is_static() {
    let input = "const a = require(`mod`);\n";
    let output = run(input);
    assert!(output.contains("import a from \"mod\""));
    assert!(!output.contains("require"));
}

#[test]
fn member_target_uses_its_property_name() {
    let input = "module.exports.helper = require(\"./helper\");\n";
    let output = run(input);
    assert!(output.contains("import helper from \"./helper\""));
    assert!(output.contains("module.exports.helper = helper"));
}

#[test]
fn nested_declarator_keeps_its_declaration() {
    let input = "function load() {\n  const path = require(\"path\");\n  return path;\n}\n";
    let output = run(input);
    assert!(output.contains("import _path from \"path\""));
    assert!(output.contains("const path = _path"));
    assert!(output.contains("return path"));
}

#[test]
fn later_imports_are_placed_above_earlier_ones() {
    let input = "const a = require(\"a\");\nconst b = require(\"b\");\n";
    let output = run(input);
    let a = output.find("import a from \"a\"").unwrap();
    let b = output.find("import b from \"b\"").unwrap();
    let module = output.find("var module").unwrap();
    assert!(b < a);
    assert!(a < module);
}

#[test]
fn computed_require_falls_back_to_dynamic_import() {
    let input = "require(computedExpr());\nconst m = require(name);\n";
    let output = run(input);
    assert!(output.contains("import(computedExpr())"));
    assert!(output.contains("import(name)"));
    assert!(!output.contains("require"));
}

#[test]
fn dynamic_fallback_keeps_imports_hoisted_from_the_same_statement() {
    let input = "foo(require(a), require(\"b\"));\n";
    let output = run(input);
    assert!(output.contains("import(a)"));
    assert!(output.contains("import _b from \"b\""));
    assert!(!output.contains("foo("));
    assert!(!output.contains("require"));
}

#[test]
fn require_in_single_statement_position() {
    let input = "if (ok) foo = require(\"mod\");\nif (ready) require(name);\n";
    let output = run(input);
    assert!(output.contains("import foo from \"mod\""));
    assert!(output.contains("if (ok);"));
    assert!(output.contains("import(name)"));
}

#[test]
fn renamed_require_alias_is_left_alone() {
    let input = "const r = require;\nconst a = r(\"mod\");\n";
    let output = run(input);
    assert!(output.contains("r(\"mod\")"));
    assert!(!output.contains("import a"));
}

#[test]
fn module_wrapper_is_installed_exactly_once() {
    for input in ["", "console.log(1);\n", "exports.a = 1;\nmodule.exports.b = 2;\n"] {
        let output = run(input);
        assert_eq!(output.matches("var module =").count(), 1);
        assert!(output.contains("exports: {}"));
        assert_eq!(output.matches("export default module.exports;").count(), 1);
    }
}

#[test]
fn export_of_colliding_identifier_renames_it() {
    let input = "let x = 1;\nfunction g(x) { return x; }\nx += 1;\nexports.x = x;\n";
    let output = run(input);
    assert!(output.contains("let _x = 1"));
    assert!(output.contains("_x += 1"));
    assert!(output.contains("return x;"));
    assert!(output.contains("export const x = _x"));
    assert!(!output.contains("let x"));
}

#[test]
fn export_of_named_import_local_renames_the_specifier() {
    let input = "const { a: x } = require(\"m\");\nexports.x = x;\n";
    let output = run(input);
    assert!(output.contains("a as _x"));
    assert!(output.contains("export const x = _x"));
}

#[test]
fn export_of_an_already_exported_name_keeps_that_export() {
    let input = "exports.x = 1;\nexports.y = x;\n";
    let output = run(input);
    assert!(output.contains("const _x = 1;"));
    assert!(output.contains("export { _x as x };"));
    assert!(output.contains("export const y = _x;"));
    assert!(!output.contains("export const _x"));
    assert_binds_uniquely(&output);
}

#[test]
fn split_export_does_not_disturb_later_promotions() {
    let input = "exports.x = 1;\nexports.y = x;\nexports.z = 3;\nuse(x, y);\n";
    let output = run(input);
    assert!(output.contains("export { _x as x };"));
    assert!(output.contains("export const y = _x;"));
    assert!(output.contains("export const z = 3;"));
    assert!(output.contains("use(_x, y)"));
    assert_binds_uniquely(&output);
}

#[test]
fn export_of_other_values_is_promoted() {
    let input = "exports.f = function () { return 1; };\nexports.answer = 42;\nexports.alias = someGlobal;\n";
    let output = run(input);
    assert!(output.contains("export const f = function"));
    assert!(output.contains("export const answer = 42"));
    assert!(output.contains("export const alias = someGlobal"));
}

#[test]
fn call_based_export_is_left_to_the_require_rewriter() {
    let input = "exports.a = require(\"mod\").a;\n";
    let output = run(input);
    assert!(output.contains("import _mod from \"mod\""));
    assert!(output.contains("exports.a = _mod.a"));
    assert!(!output.contains("export const a"));
}

#[test]
fn nested_export_is_left_alone() {
    let input = "function f() { exports.a = 1; }\n";
    let output = run(input);
    assert!(output.contains("exports.a = 1"));
    assert!(!output.contains("export const a"));
}

#[test]
fn unusable_export_names_are_left_alone() {
    let input = "exports.default = 1;\nexports.y = 1;\nexports.y = 2;\nexports.z = z;\n";
    let output = run(input);
    assert!(output.contains("exports.default = 1"));
    assert_eq!(output.matches("export const y").count(), 1);
    assert!(output.contains("exports.y = 2"));
    assert!(output.contains("exports.z = z"));
}

#[test]
fn export_name_bound_to_something_else_is_left_alone() {
    let input = "function a() {}\nexports.a = b;\n";
    let output = run(input);
    assert!(output.contains("exports.a = b"));
    assert!(!output.contains("export const a"));
}

#[test]
fn transform_program_rewrites_a_parsed_tree() {
    let allocator = oxc_allocator::Allocator::default();
    let source = "const fs = require(\"fs\");\n";
    let ret = oxc_parser::Parser::new(&allocator, source, oxc_span::SourceType::mjs()).parse();
    let mut program = ret.program;
    assert!(Esmify::default().transform_program(&allocator, &mut program));
    let code = oxc_codegen::Codegen::new().build(&program).code;
    assert!(code.contains("import fs from \"fs\""));
}

#[test]
fn incompatible_host_is_rejected() {
    let err = Esmify::for_host(API_VERSION + 1).err().unwrap();
    assert!(matches!(err, Error::IncompatibleHost { required, found } if required == API_VERSION && found == API_VERSION + 1));
    assert!(Esmify::for_host(API_VERSION).is_ok());
}

#[test]
fn parse_errors_are_reported() {
    let err = Esmify::default().convert("const = ;", ConvertOptions::default()).err().unwrap();
    assert!(matches!(err, Error::ParseFailed { ref errors } if !errors.is_empty()));
}

#[test]
fn source_type_is_derived_from_filename() {
    let out = Esmify::default()
        .convert(
            "const a = require(\"a\");\n",
            ConvertOptions { filename_for_source_type: Some("index.js".into()), ..ConvertOptions::default() },
        )
        .unwrap();
    assert!(out.modified);
    assert!(out.code.contains("import a from \"a\""));

    let err = Esmify::default()
        .convert("", ConvertOptions { filename_for_source_type: Some("index.txt".into()), ..ConvertOptions::default() })
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidSourceType { .. }));
}
