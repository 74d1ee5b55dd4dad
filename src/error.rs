//! Error types for the effect compiler

use crate::lexer::Location;
use thiserror::Error;

/// Compiler errors
///
/// Every class of the error taxonomy carries the location it was detected at
/// and the numeric code printed as `X####` in diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Character the token source could not classify
    ///
    /// **Triggered by:** stray characters such as `@` or `$`, unterminated strings
    #[error("{location}: error X{code}: {message}")]
    Lexical {
        /// Where the character starts
        location: Location,
        /// Diagnostic code
        code: u32,
        /// Error description
        message: String,
    },

    /// Token does not fit the grammar production being parsed
    ///
    /// **Example:** `float x = ;`
    #[error("{location}: error X{code}: {message}")]
    Syntax {
        /// Location of the offending token
        location: Location,
        /// Diagnostic code
        code: u32,
        /// Error description
        message: String,
    },

    /// Illegal or ambiguous conversion, operand shape mismatch, bad call
    ///
    /// **Example:** `float3 v = float4(0, 0, 0, 0);` (implicit truncation)
    #[error("{location}: error X{code}: {message}")]
    Type {
        /// Location of the expression
        location: Location,
        /// Diagnostic code
        code: u32,
        /// Error description
        message: String,
    },

    /// Undeclared identifier, redefinition, unresolvable overload
    #[error("{location}: error X{code}: {message}")]
    Name {
        /// Location of the identifier
        location: Location,
        /// Diagnostic code
        code: u32,
        /// Error description
        message: String,
    },

    /// Unknown pass/texture/sampler state or an invalid value for it
    ///
    /// **Example:** `pass { Foo = 1; }`
    #[error("{location}: error X{code}: {message}")]
    Property {
        /// Location of the property name or value
        location: Location,
        /// Diagnostic code
        code: u32,
        /// Error description
        message: String,
    },

    /// The IR builder cannot materialize a type node for this type
    #[error("cannot create an IR type for '{ty}'")]
    UnsupportedType {
        /// Description of the type
        ty: String,
    },

    /// Compilation failed; carries the rendered diagnostics log
    #[error("compilation failed:\n{0}")]
    CompileFailed(String),

    /// Worker pool for batch compilation could not be created
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

/// Error taxonomy classes, see [`Error::category`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unrecognized input character
    Lexical,
    /// Grammar violation
    Syntax,
    /// Type checking failure
    Type,
    /// Name resolution failure
    Name,
    /// Technique, pass or resource property failure
    Property,
    /// Failure outside the source program
    Internal,
}

impl Error {
    /// Create a syntax error
    pub fn syntax(location: Location, code: u32, message: impl Into<String>) -> Self {
        Error::Syntax {
            location,
            code,
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(location: Location, code: u32, message: impl Into<String>) -> Self {
        Error::Type {
            location,
            code,
            message: message.into(),
        }
    }

    /// Create a name resolution error
    pub fn name(location: Location, code: u32, message: impl Into<String>) -> Self {
        Error::Name {
            location,
            code,
            message: message.into(),
        }
    }

    /// Create a property error
    pub fn property(location: Location, code: u32, message: impl Into<String>) -> Self {
        Error::Property {
            location,
            code,
            message: message.into(),
        }
    }

    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Lexical { .. } => ErrorCategory::Lexical,
            Error::Syntax { .. } => ErrorCategory::Syntax,
            Error::Type { .. } => ErrorCategory::Type,
            Error::Name { .. } => ErrorCategory::Name,
            Error::Property { .. } => ErrorCategory::Property,
            _ => ErrorCategory::Internal,
        }
    }

    /// Source location, if the error refers to one
    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::Lexical { location, .. }
            | Error::Syntax { location, .. }
            | Error::Type { location, .. }
            | Error::Name { location, .. }
            | Error::Property { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Diagnostic code (0 for errors outside the source program)
    pub fn code(&self) -> u32 {
        match self {
            Error::Lexical { code, .. }
            | Error::Syntax { code, .. }
            | Error::Type { code, .. }
            | Error::Name { code, .. }
            | Error::Property { code, .. } => *code,
            _ => 0,
        }
    }

    /// Message without location and code prefix
    pub fn message(&self) -> String {
        match self {
            Error::Lexical { message, .. }
            | Error::Syntax { message, .. }
            | Error::Type { message, .. }
            | Error::Name { message, .. }
            | Error::Property { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_error_display_has_code_prefix() {
        let err = Error::syntax(Location::new(Arc::from("a.fx"), 2, 7), 3000, "syntax error");
        assert_eq!(err.to_string(), "a.fx(2, 7): error X3000: syntax error");
        assert_eq!(err.category(), ErrorCategory::Syntax);
        assert_eq!(err.code(), 3000);
    }

    #[test]
    fn test_internal_errors_have_no_location() {
        let err = Error::UnsupportedType {
            ty: "void[2]".to_string(),
        };
        assert!(err.location().is_none());
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert_eq!(err.code(), 0);
    }
}
