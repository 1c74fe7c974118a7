mod common;

use common::{add_file, analyze_file, create_store, uri, variable_type};
use phpantom_core::{ParsedDocument, SymbolKind, SymbolModifiers, SymbolTable};

/// A file exercising every declaration kind, without a single doc comment.
const UNDOCUMENTED: &str = concat!(
    "<?php\n",
    "namespace App;\n",
    "use Lib\\Base;\n",
    "// a plain comment is not documentation\n",
    "interface Shape { public function area(): float; }\n",
    "trait Named { protected string $name = ''; }\n",
    "class Circle extends Base implements Shape {\n",
    "    use Named;\n",
    "    const SIDES = 0;\n",
    "    /* neither is this */\n",
    "    private float $radius = 1.0;\n",
    "    public function __construct(private int $id, float $radius) {}\n",
    "    public function area(): float { $f = fn($x) => $x * 2; return 3.14; }\n",
    "}\n",
    "enum Colour: string { case Red = 'r'; }\n",
    "function make(int $n = 1): Circle { $c = function () use ($n) {}; return new Circle($n, 2.0); }\n",
    "const LIMIT = 10;\n",
    "define('LEGACY', true);\n",
    "$anon = new class { public $x; };\n",
);

fn create(src: &str) -> SymbolTable {
    SymbolTable::create(&ParsedDocument::new(uri("shapes.php"), src))
}

#[test]
fn test_undocumented_declarations_carry_no_doc() {
    let table = create(UNDOCUMENTED);
    let symbols = table.symbols();
    assert!(symbols.len() > 20, "expected a full table, got {}", symbols.len());
    for decl in symbols {
        assert!(
            decl.doc.is_none(),
            "{} {} should have no doc, got {:?}",
            decl.kind,
            decl.name,
            decl.doc
        );
    }
}

#[test]
fn test_every_declaration_kind_is_read() {
    let table = create(UNDOCUMENTED);
    let has = |kind: SymbolKind, name: &str| {
        table
            .find(|d| d.kind == kind && d.name == name)
            .is_some()
    };
    assert!(has(SymbolKind::Namespace, "App"));
    assert!(has(SymbolKind::Interface, "App\\Shape"));
    assert!(has(SymbolKind::Trait, "App\\Named"));
    assert!(has(SymbolKind::Class, "App\\Circle"));
    assert!(has(SymbolKind::Class, "App\\Colour"));
    assert!(has(SymbolKind::ClassConstant, "SIDES"));
    assert!(has(SymbolKind::ClassConstant, "Red"));
    assert!(has(SymbolKind::Property, "$radius"));
    assert!(has(SymbolKind::Property, "$id"));
    assert!(has(SymbolKind::Method, "area"));
    assert!(has(SymbolKind::Function, "App\\make"));
    assert!(has(SymbolKind::Constant, "App\\LIMIT"));
    assert!(has(SymbolKind::Constant, "LEGACY"));
}

#[test]
fn test_enums_are_final_classes() {
    let table = create(UNDOCUMENTED);
    let colour = table
        .find(|d| d.name == "App\\Colour")
        .expect("enum should be declared");
    assert!(colour.has(SymbolModifiers::FINAL));
    assert!(colour.associated.iter().any(|a| a.name == "BackedEnum"));

    let red = table
        .find(|d| d.kind == SymbolKind::ClassConstant && d.name == "Red")
        .expect("case should be declared");
    assert!(red.has(SymbolModifiers::STATIC | SymbolModifiers::PUBLIC));
    assert_eq!(red.ty.to_string(), "App\\Colour");
}

#[test]
fn test_promoted_parameters_are_properties_and_parameters() {
    let table = create(UNDOCUMENTED);
    let id = table
        .find(|d| d.kind == SymbolKind::Property && d.name == "$id")
        .expect("promoted property");
    assert!(id.has(SymbolModifiers::PRIVATE));
    assert_eq!(id.ty.to_string(), "int");
    assert_eq!(id.scope.as_deref(), Some("App\\Circle"));

    // a parameter without a modifier is not promoted
    let radius = table.filter(|d| d.kind == SymbolKind::Property && d.name == "$radius");
    assert_eq!(radius.len(), 1);
    assert_eq!(radius[0].ty.to_string(), "float");
    assert!(
        table
            .find(|d| d.kind == SymbolKind::Parameter && d.name == "$id")
            .is_some()
    );
}

#[test]
fn test_promoted_property_resolves_from_another_file() {
    let mut store = create_store();
    add_file(
        &mut store,
        "point.php",
        concat!(
            "<?php\nnamespace Geo;\n",
            "final class Point {\n",
            "    public function __construct(public readonly float $x, protected ?Point $origin = null) {}\n",
            "}\n",
        ),
    );
    let table = analyze_file(
        &mut store,
        "use.php",
        "<?php\n$p = new \\Geo\\Point(1.0);\n$x = $p->x;\n",
    );
    assert_eq!(variable_type(&table, "$x"), "float");

    let point = store
        .table(&uri("point.php"))
        .and_then(|t| t.find(|d| d.kind == SymbolKind::Property && d.name == "$x"))
        .expect("promoted property in store");
    assert!(point.has(SymbolModifiers::READ_ONLY | SymbolModifiers::PUBLIC));
}
