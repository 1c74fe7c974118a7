mod common;

use common::{analyze_source, create_store, last_reference, variable_type};
use phpantom_core::{ParsedDocument, SymbolKind, analyze_with_limit};

// ─── Sequential assignments ─────────────────────────────────────────────────

#[test]
fn test_later_assignment_replaces_earlier_type() {
    let table = analyze_source(concat!(
        "<?php\n",
        "class Foo {}\n",
        "$x = 1;\n",
        "$x = new Foo();\n",
        "$y = $x;\n",
    ));
    assert_eq!(variable_type(&table, "$y"), "Foo");
}

#[test]
fn test_chained_assignment_types_every_target() {
    let table = analyze_source("<?php\n$a = $b = 'text';\n");
    assert_eq!(variable_type(&table, "$a"), "string");
    assert_eq!(variable_type(&table, "$b"), "string");
}

#[test]
fn test_left_hand_reference_carries_assigned_type() {
    let table = analyze_source("<?php\n$count = 10;\n");
    let refs = table.filter(|r| r.name == "$count");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].ty.to_string(), "int");
}

#[test]
fn test_read_before_assignment_has_no_type() {
    let table = analyze_source("<?php\n$y = $x;\n$x = 1;\n");
    let first_x = table
        .filter(|r| r.kind == SymbolKind::Variable && r.name == "$x")
        .into_iter()
        .next()
        .unwrap();
    assert!(first_x.ty.is_empty(), "got {}", first_x.ty);
    assert_eq!(variable_type(&table, "$y"), "");
}

// ─── Conditional branches ───────────────────────────────────────────────────

#[test]
fn test_if_elseif_else_merges_every_arm() {
    let table = analyze_source(concat!(
        "<?php\n",
        "if ($a) {\n",
        "    $x = 1;\n",
        "} elseif ($b) {\n",
        "    $x = 'one';\n",
        "} else {\n",
        "    $x = 1.0;\n",
        "}\n",
        "$y = $x;\n",
    ));
    assert_eq!(variable_type(&table, "$y"), "float|int|string");
}

#[test]
fn test_if_without_else_keeps_the_prior_type() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$x = null;\n",
        "if ($ready) {\n",
        "    $x = 5;\n",
        "}\n",
        "$y = $x;\n",
    ));
    assert_eq!(variable_type(&table, "$y"), "int|null");
}

#[test]
fn test_arm_that_skips_the_variable_keeps_the_prior_type() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$x = true;\n",
        "if ($a) {\n",
        "    $x = 1;\n",
        "} else {\n",
        "    $other = 2;\n",
        "}\n",
        "$y = $x;\n",
    ));
    assert_eq!(variable_type(&table, "$y"), "bool|int");
}

#[test]
fn test_branch_sees_types_assigned_before_it() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$x = 'name';\n",
        "if ($a) {\n",
        "    $inside = $x;\n",
        "}\n",
    ));
    assert_eq!(variable_type(&table, "$inside"), "string");
}

#[test]
fn test_switch_without_default_keeps_the_prior_type() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$x = 'none';\n",
        "switch ($mode) {\n",
        "    case 1:\n",
        "        $x = 1;\n",
        "        break;\n",
        "    case 2:\n",
        "        $x = 2.5;\n",
        "        break;\n",
        "}\n",
        "$y = $x;\n",
    ));
    assert_eq!(variable_type(&table, "$y"), "float|int|string");
}

#[test]
fn test_union_limit_collapses_to_mixed() {
    let mut store = create_store();
    let document = ParsedDocument::new(
        "file:///limit.php",
        concat!(
            "<?php\n",
            "if ($a) { $x = 1; } elseif ($b) { $x = 'a'; } else { $x = 1.5; }\n",
            "$y = $x;\n",
        ),
    );
    let table = analyze_with_limit(&mut store, &document, 2).unwrap();
    assert_eq!(variable_type(&table, "$y"), "mixed");
}

// ─── Narrowing ──────────────────────────────────────────────────────────────

#[test]
fn test_instanceof_narrows_inside_the_branch() {
    let table = analyze_source(concat!(
        "<?php\n",
        "class Circle { public function radius(): float {} }\n",
        "function f($shape) {\n",
        "    if ($shape instanceof Circle) {\n",
        "        $r = $shape->radius();\n",
        "    }\n",
        "}\n",
    ));
    assert_eq!(variable_type(&table, "$r"), "float");
    let call = last_reference(&table, SymbolKind::Method, "radius");
    assert_eq!(call.scope.as_deref(), Some("Circle"));
}

#[test]
fn test_var_annotation_types_the_next_assignment() {
    let table = analyze_source(concat!(
        "<?php\n",
        "namespace App;\n",
        "class Mailer { public function send(): bool {} }\n",
        "/** @var Mailer */\n",
        "$mailer = container('mailer');\n",
        "$sent = $mailer->send();\n",
        "$plain = container('other');\n",
    ));
    assert_eq!(variable_type(&table, "$mailer"), "App\\Mailer");
    assert_eq!(variable_type(&table, "$sent"), "bool");
    assert_eq!(variable_type(&table, "$plain"), "");
}

// ─── Loops ──────────────────────────────────────────────────────────────────

#[test]
fn test_foreach_value_takes_the_element_type() {
    let table = analyze_source(concat!(
        "<?php\n",
        "class User { public function name(): string {} }\n",
        "/** @param User[] $users */\n",
        "function names(array $users) {\n",
        "    foreach ($users as $user) {\n",
        "        $n = $user->name();\n",
        "    }\n",
        "}\n",
    ));
    assert_eq!(variable_type(&table, "$user"), "User");
    assert_eq!(variable_type(&table, "$n"), "string");
}

#[test]
fn test_foreach_with_list_destructuring() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$rows = [[1, 2], [3, 4]];\n",
        "foreach ($rows as [$left, $right]) {\n",
        "    $sum = $left;\n",
        "}\n",
    ));
    assert_eq!(variable_type(&table, "$rows"), "int[][]");
    assert_eq!(variable_type(&table, "$sum"), "int");
}

// ─── Closures ───────────────────────────────────────────────────────────────

#[test]
fn test_closure_sees_only_captured_variables() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$a = 1;\n",
        "$b = 'text';\n",
        "$f = function ($p) use ($a) {\n",
        "    $fromUse = $a;\n",
        "    $fromOuter = $b;\n",
        "};\n",
        "$after = $a;\n",
    ));
    assert_eq!(variable_type(&table, "$fromUse"), "int");
    assert_eq!(variable_type(&table, "$fromOuter"), "");
    assert_eq!(variable_type(&table, "$after"), "int");
    assert_eq!(variable_type(&table, "$f"), "Closure");
}

#[test]
fn test_assignment_inside_closure_does_not_leak() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$x = 1;\n",
        "$f = function () { $x = 'inner'; };\n",
        "$y = $x;\n",
    ));
    assert_eq!(variable_type(&table, "$y"), "int");
}

#[test]
fn test_arrow_function_sees_every_visible_variable() {
    let table = analyze_source(concat!(
        "<?php\n",
        "$factor = 2;\n",
        "$double = fn($n) => $factor;\n",
    ));
    assert_eq!(variable_type(&table, "$factor"), "int");
    assert_eq!(variable_type(&table, "$double"), "Closure");
}
