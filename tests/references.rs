mod common;

use common::{add_file, analyze_file, create_store, uri};
use phpantom_core::{
    Position, ReferenceStore, ReferenceTable, SymbolKind, SymbolStore, read_references,
};

const FOO: &str = concat!(
    "<?php\n",
    "namespace App;\n",
    "class Foo {\n",
    "    public function run(): int {}\n",
    "}\n",
);

const USER: &str = concat!(
    "<?php\n",
    "use App\\Foo;\n",
    "$f = new Foo();\n",
    "$f->run();\n",
    "$name = Foo::class;\n",
);

fn project() -> (SymbolStore, ReferenceStore) {
    let mut store = create_store();
    let foo = add_file(&mut store, "foo.php", FOO);
    let user = add_file(&mut store, "user.php", USER);
    let mut references = ReferenceStore::new();
    references.add(read_references(&foo, &store));
    references.add(read_references(&user, &store));
    (store, references)
}

// ─── Reference store ────────────────────────────────────────────────────────

#[test]
fn test_find_collects_references_across_files() {
    let (_, references) = project();
    let foo = references.find("App\\Foo", |_| true);
    assert_eq!(foo.len(), 4, "{foo:#?}");
    assert!(foo.iter().any(|r| r.kind == SymbolKind::Constructor));

    let run = references.find("run", |r| r.kind == SymbolKind::Method);
    assert_eq!(run.len(), 2);
    assert!(run.iter().all(|r| r.scope.as_deref() == Some("App\\Foo")));
}

#[test]
fn test_find_is_case_insensitive_for_classes() {
    let (_, references) = project();
    assert_eq!(references.find("\\app\\foo", |_| true).len(), 4);
    assert!(references.find("App\\Missing", |_| true).is_empty());
}

#[test]
fn test_remove_drops_a_file_from_the_index() {
    let (_, mut references) = project();
    assert_eq!(references.table_count(), 2);
    let removed = references.remove(&uri("user.php")).unwrap();
    assert_eq!(removed.uri(), uri("user.php"));
    assert_eq!(references.table_count(), 1);
    assert_eq!(references.find("App\\Foo", |_| true).len(), 1);
    assert!(references.remove(&uri("user.php")).is_none());
}

#[test]
fn test_re_adding_a_table_replaces_the_old_one() {
    let (mut store, mut references) = project();
    let table = analyze_file(&mut store, "user.php", "<?php\n$x = 1;\n");
    references.add(table);
    assert_eq!(references.table_count(), 2);
    assert_eq!(references.find("App\\Foo", |_| true).len(), 1);
}

// ─── Positions ──────────────────────────────────────────────────────────────

#[test]
fn test_reference_at_position() {
    let (_, references) = project();
    let table = references.table(&uri("user.php")).unwrap();

    let ctor = table.reference_at_position(Position::new(2, 10)).unwrap();
    assert_eq!(ctor.kind, SymbolKind::Constructor);
    assert_eq!(ctor.name, "App\\Foo");

    let call = table.reference_at_position(Position::new(3, 5)).unwrap();
    assert_eq!(call.kind, SymbolKind::Method);
    assert_eq!(call.ty.to_string(), "int");

    assert!(table.reference_at_position(Position::new(40, 0)).is_none());
}

#[test]
fn test_method_body_gets_its_own_scope() {
    let (_, references) = project();
    let table = references.table(&uri("foo.php")).unwrap();
    let inside = table.scope_at_position(Position::new(3, 30)).unwrap();
    let outside = table.scope_at_position(Position::new(1, 0)).unwrap();
    assert_ne!(inside.location.range, outside.location.range);
    assert!(outside.location.range.contains(inside.location.range.start));
}

// ─── Serialisation ──────────────────────────────────────────────────────────

#[test]
fn test_reference_table_json_round_trip() {
    let (_, references) = project();
    let table = references.table(&uri("user.php")).unwrap();
    let json = serde_json::to_string(table).unwrap();
    let back: ReferenceTable = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, table);
}
