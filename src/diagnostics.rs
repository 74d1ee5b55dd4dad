//! Diagnostics log
//!
//! Errors and warnings are appended here by every component and read back by
//! the caller once `run` returns.

use crate::error::Error;
use crate::lexer::Location;
use std::fmt;

/// Diagnostic codes, printed as `X####`
pub mod codes {
    /// Unexpected token / generic syntax error
    pub const SYNTAX: u32 = 3000;
    /// Redefinition of a name in the same scope
    pub const REDEFINITION: u32 = 3003;
    /// Undeclared identifier
    pub const UNDECLARED: u32 = 3004;
    /// Initial value of a global must be a literal expression
    pub const NON_LITERAL_INITIALIZER: u32 = 3011;
    /// No overload accepts the argument list
    pub const NO_MATCHING_OVERLOAD: u32 = 3013;
    /// Implicit conversion impossible
    pub const CANNOT_CONVERT: u32 = 3017;
    /// Invalid member, swizzle or subscript
    pub const INVALID_ACCESS: u32 = 3018;
    /// Operand types do not fit the operator or slot
    pub const TYPE_MISMATCH: u32 = 3020;
    /// Assignment target is not a modifiable l-value
    pub const NOT_LVALUE: u32 = 3025;
    /// Void used where a value is required
    pub const VOID_VALUE: u32 = 3038;
    /// Array dimension is not a positive literal
    pub const ARRAY_DIMENSION: u32 = 3059;
    /// Ambiguous call between equally ranked overloads
    pub const AMBIGUOUS_CALL: u32 = 3067;
    /// Function declared but never defined
    pub const UNDEFINED_FUNCTION: u32 = 3079;
    /// Missing return value
    pub const MISSING_RETURN: u32 = 3080;
    /// Integral operand required
    pub const INTEGRAL_REQUIRED: u32 = 3082;
    /// `break`/`continue` outside of a loop
    pub const OUTSIDE_LOOP: u32 = 3518;
    /// Unrecognized pass, texture or sampler state
    pub const UNKNOWN_STATE: u32 = 3004;
    /// Character the scanner could not classify
    pub const UNKNOWN_CHARACTER: u32 = 1000;
    /// Struct declared without members
    pub const EMPTY_STRUCT: u32 = 5001;
    /// Texture property value adjusted
    pub const PROPERTY_ADJUSTED: u32 = 4717;
    /// Required state missing from a sampler or pass
    pub const MISSING_STATE: u32 = 3012;
    /// Qualifier given twice
    pub const DUPLICATE_QUALIFIER: u32 = 3048;
    /// Unrecognized statement attribute
    pub const UNKNOWN_ATTRIBUTE: u32 = 3554;
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Compilation failed
    Error,
    /// Compilation continues
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One message of the log
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,
    /// Where it applies
    pub location: Location,
    /// Numeric code
    pub code: u32,
    /// Human-readable text
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} X{}: {}",
            self.location, self.severity, self.code, self.message
        )
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        Diagnostic {
            severity: Severity::Error,
            location: err.location().cloned().unwrap_or_default(),
            code: err.code(),
            message: err.message(),
        }
    }
}

/// Accumulated errors and warnings of one compile
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    limit: Option<usize>,
}

impl Diagnostics {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log that keeps at most `limit` warnings
    pub fn with_limit(limit: Option<usize>) -> Self {
        Diagnostics {
            entries: Vec::new(),
            limit,
        }
    }

    /// Appends an error
    pub fn error(&mut self, location: Location, code: u32, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            location,
            code,
            message: message.into(),
        });
    }

    /// Appends a warning, unless the warning limit was reached
    pub fn warning(&mut self, location: Location, code: u32, message: impl Into<String>) {
        if let Some(limit) = self.limit {
            if self.warning_count() >= limit {
                return;
            }
        }
        let message = message.into();
        tracing::warn!("{}: warning X{}: {}", location, code, message);
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            location,
            code,
            message,
        });
    }

    /// Records an aborting error
    pub fn report(&mut self, err: &Error) {
        self.entries.push(Diagnostic::from(err));
    }

    /// Promotes every warning to an error
    pub fn promote_warnings(&mut self) {
        for entry in &mut self.entries {
            entry.severity = Severity::Error;
        }
    }

    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of warnings recorded
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// All entries in the order they were recorded
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Only the errors
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Newline-joined rendering of every entry
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    /// Drops all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn loc(line: u32) -> Location {
        Location::new(Arc::from("test.fx"), line, 1)
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut log = Diagnostics::new();
        log.warning(loc(1), codes::EMPTY_STRUCT, "struct has no members");
        assert!(!log.has_errors());
        assert_eq!(log.warning_count(), 1);
        assert_eq!(
            log.render(),
            "test.fx(1, 1): warning X5001: struct has no members\n"
        );
    }

    #[test]
    fn test_report_error() {
        let mut log = Diagnostics::new();
        let err = Error::name(loc(4), codes::UNDECLARED, "undeclared identifier 'x'");
        log.report(&err);
        assert!(log.has_errors());
        assert_eq!(log.errors().count(), 1);
        assert!(log.render().contains("error X3004: undeclared identifier 'x'"));
    }

    #[test]
    fn test_warning_limit_and_promotion() {
        let mut log = Diagnostics::with_limit(Some(1));
        log.warning(loc(1), 1, "a");
        log.warning(loc(2), 1, "b");
        assert_eq!(log.entries().len(), 1);
        log.promote_warnings();
        assert!(log.has_errors());
    }
}
