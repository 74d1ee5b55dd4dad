/// Compilation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name shown in diagnostics locations
    pub source_name: String,
    /// Report every warning as an error
    pub warnings_as_errors: bool,
    /// Maximum number of warnings kept in the log (`None` keeps all)
    pub max_warnings: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_name: "<source>".to_string(),
            warnings_as_errors: false,
            max_warnings: None,
        }
    }
}

impl CompileOptions {
    /// Options for a named source
    pub fn named(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }
}
