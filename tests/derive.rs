//! `#[derive(Construct)]` end to end

#![cfg(feature = "derive")]

use slinpin::{locals, Class, ClassRef, Construct, Constructible, Container, DiError, Injection, Locals};
use std::sync::Arc;

struct Pool {
    url: String,
}

#[derive(Construct)]
struct Repository {
    #[inject(key = "primary_pool")]
    pool: Arc<Pool>,
    table: String,
    cache: Option<Arc<Pool>>,
    page_size: Option<u32>,
}

#[derive(Construct)]
#[construct(name = "Point")]
struct Coordinates {
    x: i32,
    #[inject("y_axis")]
    y: i32,
}

#[derive(Construct)]
struct Marker;

#[test]
fn test_declared_signature() {
    assert_eq!(Repository::class_name(), "Repository");
    assert_eq!(Repository::parameters(), ["pool", "table", "cache", "page_size"]);
    assert_eq!(
        Repository::annotations().name("pool").map(String::as_str),
        Some("primary_pool")
    );

    assert_eq!(Coordinates::class_name(), "Point");
    assert_eq!(Coordinates::annotations().name("y").map(String::as_str), Some("y_axis"));

    assert!(Marker::parameters().is_empty());
}

#[test]
fn test_service_from_derived_class() {
    let container = Container::new();
    container.constant("primary_pool", Pool { url: "postgres://primary".into() });
    container.constant("table", String::from("users"));
    container.service("users", ClassRef::of::<Repository>(), Injection::none());

    let repo = container.fetch_as::<Repository>("users").unwrap().unwrap();
    assert_eq!(repo.pool.url, "postgres://primary");
    assert_eq!(repo.table, "users");
    assert!(repo.cache.is_none());
    assert!(repo.page_size.is_none());

    let again = container.fetch_as::<Repository>("users").unwrap().unwrap();
    assert!(Arc::ptr_eq(&repo, &again));
}

#[test]
fn test_optional_fields_filled_when_registered() {
    let container = Container::new();
    container.constant("primary_pool", Pool { url: "a".into() });
    container.constant("cache", Pool { url: "b".into() });
    container.constant("table", String::from("t"));
    container.constant("page_size", 50u32);

    let value = container.construct(ClassRef::of::<Repository>(), Injection::none()).unwrap();
    let repo = value.downcast::<Repository>().ok().unwrap();

    assert_eq!(repo.cache.as_ref().map(|p| p.url.as_str()), Some("b"));
    assert_eq!(repo.page_size, Some(50));
}

#[test]
fn test_registration_keys_override_field_attributes() {
    let container = Container::new();
    container.constant("primary_pool", Pool { url: "primary".into() });
    container.constant("replica_pool", Pool { url: "replica".into() });
    container.constant("table", String::from("t"));
    container.service(
        "replica_users",
        ClassRef::of::<Repository>(),
        Injection::new().key("pool", "replica_pool"),
    );

    let repo = container.fetch_as::<Repository>("replica_users").unwrap().unwrap();
    assert_eq!(repo.pool.url, "replica");
}

#[test]
fn test_missing_required_field() {
    let container = Container::new();
    container.constant("table", String::from("t"));
    container.service("users", ClassRef::of::<Repository>(), Injection::none());

    assert!(matches!(
        container.fetch("users"),
        Err(DiError::MissingArgument { position: 0, key }) if key == "primary_pool"
    ));
}

#[test]
fn test_factory_by_declared_name() {
    let container = Container::new();
    container.declare::<Coordinates>();
    container.constant("y_axis", 10i32);
    container.factory("point", "Point", Injection::none());

    let make = container.instantiator("point").unwrap().unwrap();
    let a = make.call_as::<Coordinates>(&locals! { "x" => 1i32 }).unwrap();
    // Locals are matched against the merged key, not the field name
    let b = make.call_as::<Coordinates>(&locals! { "x" => 3i32, "y_axis" => 4i32 }).unwrap();

    assert_eq!((a.x, a.y), (1, 10));
    assert_eq!((b.x, b.y), (3, 4));
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_unit_struct() {
    let container = Container::new();
    container.factory("marker", Class::of::<Marker>(), Injection::none());

    let make = container.instantiator("marker").unwrap().unwrap();
    assert_eq!(make.target(), "Marker");
    assert!(make.keys().is_empty());
    assert!(make.call_as::<Marker>(&Locals::new()).is_ok());
}
