//! # shadefx - HLSL-style effect front-end compiler
//!
//! Parses effect source (global uniforms, structs, functions, textures,
//! samplers and techniques) in a single pass and emits a sectioned,
//! SPIR-V shaped intermediate representation together with reflection
//! metadata for a host application.
//!
//! ## Features
//!
//! - **Single pass** - no AST; code is emitted while parsing
//! - **Typed IR** - types and constants interned once, ids start at 100
//! - **Overload resolution** - user functions and intrinsics share one ranking
//! - **Reflection** - uniforms, textures, samplers, techniques and passes
//! - **Batch compiles** - independent sources on a rayon pool
//!
//! ## Quick Start
//!
//! ```rust
//! use shadefx::{compile, CompileOptions};
//!
//! # fn main() -> shadefx::Result<()> {
//! let source = r#"
//!     uniform float Intensity < string ui_label = "Intensity"; > = 1.0;
//!
//!     float4 VS(float4 pos : POSITION) : SV_Position { return pos; }
//!     float4 PS() : SV_Target { return Intensity; }
//!
//!     technique Simple { pass { VertexShader = VS; PixelShader = PS; } }
//! "#;
//!
//! let effect = compile(source, &CompileOptions::default())?;
//! assert_eq!(effect.uniforms[0].name, "Intensity");
//! assert_eq!(effect.techniques[0].passes.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source → Lexer → Parser ─┬─► IrBuilder (Entries, Strings, Annotations,
//!                          │              Variables, Functions, Temporary)
//!                          ├─► SymbolTable (scopes, namespaces, overloads)
//!                          └─► Diagnostics
//! ```
//!
//! ### Main Components
//!
//! - **Lexer** ([`lexer`]) - tokens with source locations, rewindable stream
//! - **Types** ([`types`]) - `TypeInfo` and conversion ranking
//! - **IR** ([`ir`]) - node store, type/constant interning, casts
//! - **Parser** ([`parser`]) - declarations, statements, expressions, techniques
//! - **Compiler** ([`compiler`]) - options and the owned compile result
//!
//! ## Error Handling
//!
//! The first error aborts a compile. Warnings accumulate and are returned with
//! the result; [`CompileOptions::warnings_as_errors`] turns them into errors.
//!
//! ```rust
//! use shadefx::{compile, CompileOptions, Error};
//!
//! match compile("float4 f = undefined_name;", &CompileOptions::default()) {
//!     Err(Error::CompileFailed(log)) => assert!(log.contains("X3004")),
//!     _ => unreachable!(),
//! }
//! ```

#![allow(clippy::too_many_arguments)]

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod diagnostics;
pub mod effect;
pub mod error;
pub mod intrinsics;
pub mod ir;
pub mod lexer;
pub mod parallel;
pub mod parser;
pub mod symbols;
pub mod types;

// Re-export main types
pub use compiler::{compile, CompileOptions, CompiledEffect, Compiler, EffectReflection};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use effect::{
    Annotations, FunctionInfo, PassProperties, StructInfo, TechniqueProperties, VariableInfo, Variant,
};
pub use error::{Error, Result};
pub use ir::{Id, IrBuilder, Node, Op, SectionId};
pub use lexer::{Lexer, Location, Token, TokenKind, TokenSource};
pub use parallel::{compile_all, ParallelConfig};
pub use parser::Parser;
pub use types::TypeInfo;
