use super::*;
use crate::source::SourceManager;
use crate::syntax::lexer::LexerOptions;
use crate::syntax::preprocessor::{Preprocessor, PreprocessorOptions};

fn parse_text(text: &str) -> SyntaxTree {
    let sm = SourceManager::new();
    let id = sm.assign_text("test.v", text, None);
    let mut pp = Preprocessor::new(&sm, LexerOptions::default(), PreprocessorOptions::default());
    pp.push_source(id);
    parse(pp, &ParserOptions::default(), vec![id])
}

#[test]
fn parses_an_empty_module() {
    let tree = parse_text("module m; endmodule\n");
    assert!(tree.diagnostics.is_empty(), "{:?}", tree.diagnostics);
    assert_eq!(tree.elements.len(), 1);
    assert_eq!(tree.elements[0].name, "m");
    assert_eq!(tree.elements[0].kind, ElementKind::Module);
}

#[test]
fn parses_every_design_element_kind() {
    let text = "module m; endmodule\ninterface i; endinterface\nprogram p; endprogram\npackage k; endpackage\n";
    let tree = parse_text(text);
    assert!(tree.diagnostics.is_empty(), "{:?}", tree.diagnostics);
    let kinds: Vec<ElementKind> = tree.elements.iter().map(|el| el.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Module,
            ElementKind::Interface,
            ElementKind::Program,
            ElementKind::Package,
        ]
    );
}

#[test]
fn collects_header_parameters() {
    let tree = parse_text("module m #(parameter WIDTH = 8, DEPTH = 4) (input clk); endmodule\n");
    let params = &tree.elements[0].parameters;
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "WIDTH");
    assert_eq!(params[0].default.as_deref(), Some("8"));
    assert_eq!(params[1].name, "DEPTH");
}

#[test]
fn collects_body_parameters() {
    let tree = parse_text("module m; parameter LIMIT = 16; endmodule\n");
    let params = &tree.elements[0].parameters;
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "LIMIT");
    assert_eq!(params[0].default.as_deref(), Some("16"));
}

#[test]
fn collects_instantiations() {
    let text = "module top; sub u0 (.clk(clk)); sub u1 (), u2 (); other #(.W(4)) o (); endmodule\nmodule sub; endmodule\n";
    let tree = parse_text(text);
    let instances = &tree.elements[0].instances;
    let names: Vec<(&str, &str)> = instances
        .iter()
        .map(|inst| (inst.module_name.as_str(), inst.instance_name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("sub", "u0"), ("sub", "u1"), ("sub", "u2"), ("other", "o")]
    );
}

#[test]
fn collects_enum_typedefs_and_typed_vars() {
    let text = "module m; typedef enum logic [1:0] { RED, GREEN, BLUE } color_t; color_t shade; endmodule\n";
    let tree = parse_text(text);
    let element = &tree.elements[0];
    assert_eq!(element.enums.len(), 1);
    assert_eq!(element.enums[0].name, "color_t");
    assert_eq!(element.enums[0].members, vec!["RED", "GREEN", "BLUE"]);
    assert_eq!(element.typed_vars.len(), 1);
    assert_eq!(element.typed_vars[0].type_name, "color_t");
    assert_eq!(element.typed_vars[0].name, "shade");
}

#[test]
fn records_literal_assignments_to_variables() {
    let text = "module m; typedef enum { A, B } e_t; e_t v; initial begin v = 1; end endmodule\n";
    let tree = parse_text(text);
    let element = &tree.elements[0];
    assert_eq!(element.literal_assignments.len(), 1);
    assert_eq!(element.literal_assignments[0].target, "v");
}

#[test]
fn records_ranged_vars_and_selects() {
    let text = "module m; wire [3:0] x; assign y = x[5]; assign z = x[2:1]; endmodule\n";
    let tree = parse_text(text);
    let element = &tree.elements[0];
    assert_eq!(element.ranged_vars.len(), 1);
    assert_eq!(element.ranged_vars[0].msb, 3);
    assert_eq!(element.ranged_vars[0].lsb, 0);
    assert_eq!(element.selects.len(), 2);
    assert_eq!(element.selects[0].target, "x");
    assert_eq!(element.selects[0].high, 5);
    assert_eq!(element.selects[0].low, None);
    assert_eq!(element.selects[1].high, 2);
    assert_eq!(element.selects[1].low, Some(1));
}

#[test]
fn records_system_calls_with_first_argument() {
    let text = "module m; initial begin $finish(3); $display(\"hi\"); end endmodule\n";
    let tree = parse_text(text);
    let calls = &tree.elements[0].sys_calls;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].name, "$finish");
    assert_eq!(calls[0].first_arg.as_deref(), Some("3"));
    assert_eq!(calls[1].name, "$display");
}

#[test]
fn procedural_blocks_and_event_controls_parse_quietly() {
    let text = "module m; reg q; always_ff @(posedge clk) begin q <= d; end initial #10 q = 0; endmodule\n";
    let tree = parse_text(text);
    assert!(tree.diagnostics.is_empty(), "{:?}", tree.diagnostics);
}

#[test]
fn each_invalid_statement_produces_one_error() {
    let mut text = String::from("module m;\n");
    for _ in 0..50 {
        text.push_str("!!! bad;\n");
    }
    text.push_str("endmodule\n");
    let tree = parse_text(&text);
    assert_eq!(tree.diagnostics.len(), 50);
    assert!(tree
        .diagnostics
        .iter()
        .all(|diag| diag.code == DiagCode::ExpectedMember));
}

#[test]
fn unclosed_elements_are_reported() {
    let tree = parse_text("module m;\nwire w;\n");
    assert_eq!(tree.diagnostics.len(), 1);
    assert_eq!(tree.diagnostics[0].code, DiagCode::UnclosedDesignElement);
    assert!(tree.diagnostics[0].message().contains('m'));
}

#[test]
fn recovery_resumes_at_the_next_element() {
    let text = "garbage tokens here;\nmodule ok; endmodule\n";
    let tree = parse_text(text);
    assert_eq!(tree.diagnostics.len(), 1);
    assert_eq!(tree.elements.len(), 1);
    assert_eq!(tree.elements[0].name, "ok");
}

#[test]
fn deep_nesting_hits_the_recursion_limit_once() {
    let mut text = String::from("module m;\ninitial ");
    for _ in 0..40 {
        text.push_str("begin ");
    }
    for _ in 0..40 {
        text.push_str("end ");
    }
    text.push_str("\nendmodule\n");

    let sm = SourceManager::new();
    let id = sm.assign_text("deep.v", text, None);
    let mut pp = Preprocessor::new(&sm, LexerOptions::default(), PreprocessorOptions::default());
    pp.push_source(id);
    let options = ParserOptions {
        max_recursion_depth: 8,
    };
    let tree = parse(pp, &options, vec![id]);
    let depth_errors = tree
        .diagnostics
        .iter()
        .filter(|diag| diag.code == DiagCode::MaxParseDepthExceeded)
        .count();
    assert_eq!(depth_errors, 1);
}

#[test]
fn diagnostics_inside_macro_expansions_carry_the_macro_name() {
    let text = "`define BROKEN !!!\nmodule m; `BROKEN; endmodule\n";
    let tree = parse_text(text);
    assert_eq!(tree.diagnostics.len(), 1);
    assert_eq!(
        tree.diagnostics[0].macro_name.as_deref(),
        Some("BROKEN")
    );
}

#[test]
fn end_labels_are_accepted() {
    let tree = parse_text("module m; endmodule : m\n");
    assert!(tree.diagnostics.is_empty(), "{:?}", tree.diagnostics);
}
