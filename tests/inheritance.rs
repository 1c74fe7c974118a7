mod common;

use std::borrow::Cow;

use common::{add_file, analyze_file, create_store, variable_type};
use phpantom_core::{Declaration, MemberMergeStrategy, SymbolKind, SymbolStore, TypeAggregate};

const SHAPES: &str = concat!(
    "<?php\n",
    "interface Shape {\n",
    "    public function area(): float;\n",
    "}\n",
    "trait Describes {\n",
    "    public function describe(): string {}\n",
    "}\n",
    "abstract class Base implements Shape {\n",
    "    use Describes;\n",
    "    /**\n",
    "     * Area in whole units.\n",
    "     * @return int\n",
    "     */\n",
    "    public function area(): float {}\n",
    "    protected function id(): int {}\n",
    "    private function secret(): string {}\n",
    "}\n",
    "class Square extends Base {\n",
    "    public function area(): float {}\n",
    "    public function side(): float {}\n",
    "}\n",
);

fn shapes_store() -> SymbolStore {
    let mut store = SymbolStore::new();
    add_file(&mut store, "shapes.php", SHAPES);
    store
}

fn owners(members: &[Cow<'_, Declaration>]) -> Vec<String> {
    members
        .iter()
        .map(|m| format!("{}::{}", m.scope.as_deref().unwrap_or(""), m.name))
        .collect()
}

fn area(d: &Declaration) -> bool {
    d.kind == SymbolKind::Method && d.name == "area"
}

// ─── Merge strategies ───────────────────────────────────────────────────────

#[test]
fn test_override_strategy_keeps_the_nearest_declaration() {
    let store = shapes_store();
    let found = store.find_members("Square", MemberMergeStrategy::Override, area);
    assert_eq!(owners(&found), vec!["Square::area"]);
    assert_eq!(found[0].resolved_type().to_string(), "float");
}

#[test]
fn test_documented_strategy_prefers_a_documented_ancestor() {
    let store = shapes_store();
    let found = store.find_members("Square", MemberMergeStrategy::Documented, area);
    assert_eq!(owners(&found), vec!["Base::area"]);
    assert_eq!(found[0].resolved_type().to_string(), "int");
}

#[test]
fn test_base_strategy_keeps_the_most_base_declaration() {
    let store = shapes_store();
    let found = store.find_members("Square", MemberMergeStrategy::Base, area);
    assert_eq!(owners(&found), vec!["Shape::area"]);
}

#[test]
fn test_none_strategy_returns_own_members_only() {
    let store = shapes_store();
    let found = store.find_members("Square", MemberMergeStrategy::None, |_| true);
    assert_eq!(owners(&found), vec!["Square::area", "Square::side"]);
}

#[test]
fn test_parent_privates_are_hidden_and_trait_members_are_inherited() {
    let store = shapes_store();
    let all = owners(&store.find_members("Square", MemberMergeStrategy::Override, |_| true));
    assert!(all.contains(&"Base::id".to_string()), "{all:?}");
    assert!(all.contains(&"Describes::describe".to_string()), "{all:?}");
    assert!(!all.contains(&"Base::secret".to_string()), "{all:?}");
}

#[test]
fn test_find_base_member_walks_to_the_interface() {
    let store = shapes_store();
    let square_area = store
        .find_member_by_name("Square", "area", MemberMergeStrategy::None)
        .unwrap();
    let base = store.find_base_member(&square_area);
    assert_eq!(base.scope.as_deref(), Some("Shape"));
}

#[test]
fn test_aggregate_walks_traits_then_parents_then_interfaces() {
    let store = shapes_store();
    let square = TypeAggregate::create(&store, "square").unwrap();
    let order: Vec<&str> = square.associated(|_| true).iter().map(|d| d.name.as_str()).collect();
    assert_eq!(order, vec!["Base", "Describes", "Shape"]);
    assert!(square.is_base_class("BASE"));
    assert!(square.is_associated("Shape"));
}

// ─── Member references ──────────────────────────────────────────────────────

#[test]
fn test_member_calls_resolve_through_the_hierarchy() {
    let mut store = create_store();
    add_file(&mut store, "shapes.php", SHAPES);
    let table = analyze_file(
        &mut store,
        "use.php",
        concat!(
            "<?php\n",
            "$s = new Square();\n",
            "$area = $s->area();\n",
            "$side = $s->side();\n",
            "$text = $s->describe();\n",
        ),
    );
    assert_eq!(variable_type(&table, "$s"), "Square");
    assert_eq!(variable_type(&table, "$area"), "int");
    assert_eq!(variable_type(&table, "$side"), "float");
    assert_eq!(variable_type(&table, "$text"), "string");
}

#[test]
fn test_parent_calls_resolve_against_the_base_class() {
    let mut store = create_store();
    add_file(&mut store, "shapes.php", SHAPES);
    let table = analyze_file(
        &mut store,
        "child.php",
        concat!(
            "<?php\n",
            "class Tile extends Base {\n",
            "    public function key() {\n",
            "        $id = parent::id();\n",
            "    }\n",
            "}\n",
        ),
    );
    assert_eq!(variable_type(&table, "$id"), "int");
    let parent = table
        .filter(|r| r.alt_name.as_deref() == Some("parent"))
        .pop()
        .unwrap();
    assert_eq!(parent.name, "Base");
}

#[test]
fn test_builtin_exception_hierarchy() {
    let mut store = create_store();
    let table = analyze_file(
        &mut store,
        "errors.php",
        concat!(
            "<?php\n",
            "class NotFound extends RuntimeException {}\n",
            "$e = new NotFound('missing');\n",
            "$message = $e->getMessage();\n",
            "$previous = $e->getPrevious();\n",
        ),
    );
    assert_eq!(variable_type(&table, "$message"), "string");
    let previous = variable_type(&table, "$previous");
    let mut atoms: Vec<&str> = previous.split('|').collect();
    atoms.sort_unstable();
    assert_eq!(atoms, vec!["Throwable", "null"]);
}
