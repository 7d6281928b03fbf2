//! Error types for dependency injection

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while registering, fetching, or injecting
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Key is not registered anywhere in the scope chain
    /// (only raised under [`MissingKeyPolicy::Fatal`](crate::MissingKeyPolicy::Fatal))
    #[error("No provider registered for key: {key}")]
    NotFound { key: String },

    /// A provider re-entered its own key before its first evaluation finished
    #[error("Cyclic dependency detected while resolving {key}: {}", .path.join(" -> "))]
    CyclicDependency { key: String, path: Vec<String> },

    /// The injection target could not be introspected
    #[error("Cannot reflect {target}: {reason}")]
    Reflection { target: String, reason: String },

    /// A function or constructor body failed with a foreign error
    #[error("Invocation of {target} failed: {source}")]
    Invocation {
        target: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// An argument slot resolved to nothing but the body required it
    #[error("Missing argument {position} ({key})")]
    MissingArgument { position: usize, key: String },

    /// A value could not be downcast to the requested type
    #[error("Value for {key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// An instantiator was called after its registry was dropped
    #[error("Registry backing this injector has been dropped")]
    ScopeDropped,

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a Reflection error
    #[inline]
    pub fn reflection(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reflection {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a foreign error raised by a function or constructor body
    #[inline]
    pub fn invocation<E>(target: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Invocation {
            target: target.into(),
            source: Arc::new(error),
        }
    }

    /// Create a TypeMismatch error for type `T`
    #[inline]
    pub fn type_mismatch<T: 'static>(key: impl Into<String>) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a CyclicDependency error
    #[inline]
    pub fn cyclic(key: impl Into<String>, path: Vec<String>) -> Self {
        Self::CyclicDependency {
            key: key.into(),
            path,
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = DiError::cyclic("a", vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(
            err.to_string(),
            "Cyclic dependency detected while resolving a: a -> b -> a"
        );
    }

    #[test]
    fn test_invocation_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::other("disk on fire");
        let err = DiError::invocation("Database", io);

        assert!(err.to_string().contains("Database"));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("disk on fire"));
    }
}
