//! Example demonstrating the #[derive(Construct)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use slinpin::{locals, ClassRef, Construct, Container, Injection};
use std::sync::Arc;

// Dependencies
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct Cache {
    size: usize,
}

// Field names are the constructor parameters
#[derive(Construct)]
struct UserService {
    // Injected from "primary_db" instead of "db"
    #[inject(key = "primary_db")]
    db: Arc<Database>,
    // None when no cache is registered
    cache: Option<Arc<Cache>>,
    // Cloned out of the registry
    table: String,
}

// Declared under a name so factories can refer to it
#[derive(Construct)]
#[construct(name = "Session")]
struct UserSession {
    user_id: u64,
    #[inject("session_ttl")]
    ttl_secs: u32,
}

fn main() {
    println!("=== Derive Construct Example ===\n");

    let container = Container::new();
    container.constant("primary_db", Database { url: "postgres://localhost".into() });
    container.constant("table", String::from("users"));
    container.constant("session_ttl", 3600u32);

    container.service("users", ClassRef::of::<UserService>(), Injection::none());

    let users = container.fetch_as::<UserService>("users").unwrap().unwrap();
    println!("UserService built:");
    println!("  db.url = {}", users.db.url);
    println!("  cache  = {}", if users.cache.is_some() { "present" } else { "none" });
    println!("  table  = {}", users.table);

    // A second fetch returns the same instance
    let again = container.fetch_as::<UserService>("users").unwrap().unwrap();
    println!("  shared = {}", Arc::ptr_eq(&users, &again));

    // Factories build a fresh instance per call, with call-time locals on top
    container.declare::<UserSession>();
    container.factory("session", "Session", Injection::none());

    let make = container.instantiator("session").unwrap().unwrap();
    for user_id in [1u64, 2] {
        let session = make.call_as::<UserSession>(&locals! { "user_id" => user_id }).unwrap();
        println!("\nSession for user {}: ttl {}s", session.user_id, session.ttl_secs);
    }

    println!("\n=== Example Complete ===");
}
