//! Emitter error types.
//!
//! The transformer is fail-fast: any construct it would have to guess about
//! becomes an error carrying the offending node's `file:line:col`.

use sharplua_semantic::SourceLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("{location}: unsupported construct: {construct}")]
    Unsupported {
        construct: String,
        location: SourceLocation,
    },

    #[error("{location}: malformed code template `{template}`: {message}")]
    MalformedTemplate {
        template: String,
        message: String,
        location: SourceLocation,
    },

    #[error("{location}: template placeholder {{{index}}} exceeds the {provided} provided argument(s)")]
    TemplateArity {
        index: usize,
        provided: usize,
        location: SourceLocation,
    },

    #[error("{location}: semantic input violates its contract: {message}")]
    Contract {
        message: String,
        location: SourceLocation,
    },

    #[error("cannot assign a distinct name to `{identifier}` in scope `{scope}`")]
    Naming { identifier: String, scope: String },
}

impl EmitError {
    pub fn unsupported(construct: impl Into<String>, location: SourceLocation) -> Self {
        EmitError::Unsupported {
            construct: construct.into(),
            location,
        }
    }

    pub fn contract(message: impl Into<String>, location: SourceLocation) -> Self {
        EmitError::Contract {
            message: message.into(),
            location,
        }
    }
}

pub type EmitResult<T> = Result<T, EmitError>;
