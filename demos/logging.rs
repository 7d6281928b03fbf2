//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use slinpin::{locals, Class, Container, DiError, Function, Injection};

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
    user: u64,
}

fn main() {
    // JSON if logging-json is enabled, pretty if logging-pretty is enabled
    slinpin::logging::builder().trace().slinpin_only().init();

    println!("=== Slinpin Logging Demo ===\n");

    // logs: "Creating new root container"
    let container = Container::new();

    // logs: "Registering provider" with provider = "constant" / "service"
    container.constant("db_url", "postgres://localhost/mydb");
    container.service(
        "db",
        Function::new("connect", ["db_url"], |args| {
            println!("  [App] Connecting to {}...", args.get::<&str>(0)?);
            Ok(Database {
                url: args.get::<&str>(0)?.to_owned(),
            })
        }),
        Injection::none(),
    );

    // logs: "Evaluating provider", then "Memoized value hit" on the second fetch
    println!("Fetching db twice:");
    let _ = container.fetch("db");
    let _ = container.fetch("db");

    // logs: "Creating child scope" and "Key delegated to ancestor scope"
    println!("\nFetching db from a request scope:");
    let request = container.scope();
    let _ = request.fetch("db");

    // logs: "Key not registered in scope chain"
    println!("\nFetching an unknown key:");
    let _ = request.fetch("cache");

    // Instantiator calls log their locals and scope
    println!("\nBuilding request contexts:");
    request.factory(
        "context",
        Class::new("RequestContext", ["request_id", "user"], |args| {
            Ok(RequestContext {
                request_id: args.get(0)?,
                user: args.get(1)?,
            })
        }),
        Injection::none(),
    );
    if let Ok(Some(make)) = request.instantiator("context") {
        let _ = make.call(&locals! { "request_id" => String::from("req-1"), "user" => 7u64 });
    }

    // logs: "Cyclic dependency detected"
    println!("\nRegistering a cycle:");
    request.variable("a", Function::erased("a", ["b"], |args| args.require(0)), Injection::none());
    request.variable("b", Function::erased("b", ["a"], |args| args.require(0)), Injection::none());
    if let Err(DiError::CyclicDependency { path, .. }) = request.fetch("a") {
        println!("  [App] cycle: {}", path.join(" -> "));
    }

    println!("\n=== Demo Complete ===");
}
