//! Registry tests

use super::*;

#[test]
fn test_registry_replaces_identical_pattern_in_place() {
    let mut registry = PrinterRegistry::new("test");
    registry.add_printer("A", TypePattern::exact("X"), status::StatusPrinter::create);
    registry.add_printer("B", TypePattern::exact("Y"), status::StatusPrinter::create);
    registry.add_printer("C", TypePattern::exact("X"), string_data::StringDataPrinter::create);

    let names: Vec<&str> = registry.printers().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["C", "B"]);
    assert_eq!(registry.lookup("X").map(|p| p.name.as_str()), Some("C"));
}

#[test]
fn test_registry_prefix_and_exact_matching() {
    let registry = mongo_printers();

    let found = |name: &str| registry.lookup(name).map(|p| p.name.clone());
    assert_eq!(found("mongo::StringMap<int>").as_deref(), Some("StringMap"));
    assert_eq!(found("const mongo::Status").as_deref(), Some("Status"));
    assert_eq!(found("mongo::StatusWith<int>"), None);
    assert_eq!(found("mongo::BSONObjBuilder"), None);
    assert_eq!(found("std::string").as_deref(), Some("std::string"));
}

#[test]
fn test_registry_merge_later_wins() {
    let mut base = mongo_printers();
    let mut extra = PrinterRegistry::new("extra");
    extra.add_printer(
        "MyStatus",
        TypePattern::exact("mongo::Status"),
        string_data::StringDataPrinter::create,
    );
    extra.add_printer(
        "Other",
        TypePattern::prefix("other::"),
        string_data::StringDataPrinter::create,
    );

    let before = base.len();
    base.merge(extra);
    assert_eq!(base.len(), before + 1);
    assert_eq!(
        base.lookup("mongo::Status").map(|p| p.name.as_str()),
        Some("MyStatus")
    );
}

#[test]
fn test_registry_disabled_printers_are_skipped() {
    let mut registry = mongo_printers();
    assert!(registry.set_enabled("Status", false));
    assert!(!registry.set_enabled("NoSuchPrinter", false));
    assert!(registry.lookup("mongo::Status").is_none());

    assert!(registry.set_enabled("Status", true));
    assert!(registry.lookup("mongo::Status").is_some());
}

#[test]
fn test_pattern_display() {
    assert_eq!(TypePattern::exact("mongo::Status").to_string(), "^mongo::Status$");
    assert_eq!(TypePattern::prefix("mongo::StringMap<").to_string(), "^mongo::StringMap<");
}
