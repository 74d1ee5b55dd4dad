//! Batch compilation on a rayon pool
//!
//! Uses Rayon for work-stealing parallelism with a configurable thread count.
//! Each source gets its own [`Parser`](crate::parser::Parser); nothing is
//! shared between them except the read-only operator and intrinsic tables.

use crate::compiler::{CompileOptions, CompiledEffect, Compiler};
use crate::error::{Error, Result};
use rayon::prelude::*;

/// Configuration for parallel compilation
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum number of worker threads (default: num_cpus)
    pub max_parallelism: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_parallelism: num_cpus::get(),
        }
    }
}

/// Compile every `(source_name, source)` pair
///
/// Results come back in input order, one per source. A failing source does
/// not stop the others.
///
/// # Example
/// ```ignore
/// let results = compile_all(
///     &[("a.fx", SOURCE_A), ("b.fx", SOURCE_B)],
///     &CompileOptions::default(),
///     &ParallelConfig::default(),
/// )?;
/// ```
pub fn compile_all(
    sources: &[(&str, &str)],
    options: &CompileOptions,
    config: &ParallelConfig,
) -> Result<Vec<Result<CompiledEffect>>> {
    if sources.is_empty() {
        return Ok(Vec::new());
    }

    let compile_one = |(name, source): &(&str, &str)| {
        let options = CompileOptions {
            source_name: name.to_string(),
            ..options.clone()
        };
        Compiler::new(options).compile(source)
    };

    // Single source - no pool needed
    if sources.len() == 1 {
        return Ok(sources.iter().map(compile_one).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_parallelism.clamp(1, sources.len()))
        .build()
        .map_err(|e| Error::ThreadPool(format!("failed to create thread pool: {}", e)))?;

    tracing::debug!(
        sources = sources.len(),
        threads = pool.current_num_threads(),
        "compiling effects in parallel"
    );

    Ok(pool.install(|| sources.par_iter().map(compile_one).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_all_empty() {
        let results = compile_all(&[], &CompileOptions::default(), &ParallelConfig::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_compile_all_keeps_order_and_isolates_failures() {
        let sources = [
            ("good.fx", "static const float a = 1.0;"),
            ("bad.fx", "float b = ;"),
            ("also_good.fx", "struct S { float x; };"),
        ];
        let config = ParallelConfig { max_parallelism: 2 };
        let results = compile_all(&sources, &CompileOptions::default(), &config).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(Error::CompileFailed(log)) => assert!(log.starts_with("bad.fx(")),
            other => panic!("unexpected result {:?}", other.as_ref().map(|_| ())),
        }
        assert_eq!(results[2].as_ref().map(|e| e.structs.len()).unwrap_or(0), 1);
    }

    #[test]
    fn test_default_config_uses_all_cores() {
        assert_eq!(ParallelConfig::default().max_parallelism, num_cpus::get());
    }
}
