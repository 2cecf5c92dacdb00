//! Construction errors
//!
//! Lifecycle operations never fail; only building a plugin can, and only
//! when its bind table cannot be turned into real listeners.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolkitError {
    #[error("{kind}: bind '{key}' must look like '<event> <context>[ <selector>]'")]
    MalformedBind { kind: String, key: String },

    #[error("{kind}: bind '{key}' names method '{method}' which is not registered")]
    UnknownMethod {
        kind: String,
        key: String,
        method: String,
    },

    #[error("{kind}: bind '{key}' context '{context}' does not resolve to an event target")]
    UnresolvedContext {
        kind: String,
        key: String,
        context: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_bind() {
        let err = ToolkitError::UnresolvedContext {
            kind: "Blackout".to_string(),
            key: "click loader".to_string(),
            context: "loader".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Blackout: bind 'click loader' context 'loader' does not resolve to an event target"
        );
    }
}
