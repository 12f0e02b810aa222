//! Config and category tables loaded from files.

use std::fs;
use std::path::PathBuf;
use tabrule_core::*;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

#[test]
fn work_profile_overrides_defaults() {
    let config = EngineConfig::from_toml_str(&fixture("engine.toml")).expect("valid config");
    assert_eq!(config.origins.direct, "typed");
    assert_eq!(config.categories.unknown, "uncategorized");
    assert!(!config.dedupe.strip_query);
    assert!(config.dedupe.strip_fragment);

    let names: Vec<&str> = config.origins.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["intranet", "google"]);
}

#[test]
fn work_profile_drives_key_derivation() {
    let config = EngineConfig::from_toml_str(&fixture("engine.toml")).expect("valid config");
    let classifier = OriginClassifier::new(config.origins.clone());

    assert_eq!(classifier.classify(Some("https://wiki.example.com/Onboarding")), "intranet");
    assert_eq!(classifier.classify(Some("https://www.google.com/search?q=x")), "google");
    // reddit is not in this profile's list, so the domain stands in.
    assert_eq!(classifier.classify(Some("https://old.reddit.com/")), "old.reddit.com");
    assert_eq!(classifier.classify(None), "typed");

    let a = dupe_key("https://corp.example.com/search?q=1#top", &config.dedupe);
    let b = dupe_key("https://corp.example.com/search?q=2", &config.dedupe);
    assert_eq!(a, "https://corp.example.com/search?q=1");
    assert_ne!(a, b);
}

#[test]
fn category_table_from_file() {
    let table = StaticCategoryTable::from_json(&fixture("categories.json")).expect("valid table");
    assert_eq!(table.len(), 3);
    assert_eq!(table.categories_of("corp.example.com"), vec![Category::new("work")]);
    assert_eq!(table.categories_of("build.corp.example.com"), vec![Category::new("work")]);
    assert_eq!(table.categories_of("shop.example.com"), vec![Category::new("misc")]);
    assert!(table.categories_of("example.org").is_empty());
}

#[test]
fn malformed_inputs_are_typed_errors() {
    let err = EngineConfig::from_toml_str("[origins\ndirect = 1").unwrap_err();
    assert!(matches!(err, ConfigError::ParseFailed { .. }));

    let err = StaticCategoryTable::from_json(r#"{"a.com": "news"}"#).unwrap_err();
    assert!(matches!(err, CategoryError::LoadFailed { .. }));

    let wrapped: CoreError = err.into();
    assert!(wrapped.to_string().starts_with("Category error: "));
}
