#![no_main]

//! Fuzz target for registry operations
//!
//! Registers, aliases and fetches a small set of keys across nested scopes.
//! Aliases may form cycles; those must surface as errors, never hang.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use slinpin::{Class, Container, DiError, Function, Injection, Locals, Value};
use std::collections::HashMap;
use std::sync::Arc;

const KEYS: [&str; 4] = ["k0", "k1", "k2", "k3"];

fn key(index: u8) -> &'static str {
    KEYS[index as usize % KEYS.len()]
}

/// Operations to perform on the scope stack
#[derive(Debug, Arbitrary)]
enum ContainerOp {
    Constant(u8, u32),
    /// `key` yields whatever `target` yields
    Alias(u8, u8),
    Factory(u8),
    Fetch(u8),
    Instantiate(u8),
    Contains(u8),
    Remove(u8),
    EnterScope,
    LeaveScope,
    Clear,
}

fn alias(target: &'static str) -> Function {
    Function::erased("alias", [target], |args| {
        Ok(args.value(0).cloned().unwrap_or_else(|| Arc::new(()) as Value))
    })
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let mut scopes = vec![Container::new()];
    // Constants registered in each scope, by key
    let mut constants: Vec<HashMap<&'static str, u32>> = vec![HashMap::new()];

    for op in ops {
        let depth = scopes.len() - 1;
        let container = &scopes[depth];

        match op {
            ContainerOp::Constant(k, value) => {
                container.constant(key(k), value);
                constants[depth].insert(key(k), value);
            }
            ContainerOp::Alias(k, target) => {
                container.variable(key(k), alias(key(target)), Injection::none());
                constants[depth].remove(key(k));
            }
            ContainerOp::Factory(k) => {
                container.factory(key(k), Class::new("Unit", Vec::<String>::new(), |_| Ok(())), Injection::none());
                constants[depth].remove(key(k));
            }
            ContainerOp::Fetch(k) => match container.fetch(key(k)) {
                Ok(value) => {
                    if let Some(expected) = constants[depth].get(key(k)) {
                        let value = value.expect("registered constant must resolve");
                        assert_eq!(value.downcast_ref::<u32>(), Some(expected));
                    }
                }
                Err(DiError::CyclicDependency { path, .. }) => assert!(path.len() >= 2),
                Err(e) => panic!("unexpected error: {e}"),
            },
            ContainerOp::Instantiate(k) => {
                if let Ok(Some(injector)) = container.instantiator(key(k)) {
                    let _ = injector.call(&Locals::new());
                }
            }
            ContainerOp::Contains(k) => {
                let local = constants[depth].contains_key(key(k));
                assert!(!local || container.contains(key(k)));
            }
            ContainerOp::Remove(k) => {
                container.remove(key(k));
                constants[depth].remove(key(k));
            }
            ContainerOp::EnterScope => {
                if scopes.len() < 8 {
                    let child = container.scope();
                    scopes.push(child);
                    constants.push(HashMap::new());
                }
            }
            ContainerOp::LeaveScope => {
                if scopes.len() > 1 {
                    scopes.pop();
                    constants.pop();
                }
            }
            ContainerOp::Clear => {
                container.clear();
                constants[depth].clear();
            }
        }
    }
});
