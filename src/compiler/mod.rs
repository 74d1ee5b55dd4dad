//! # Effect compiler front door
//!
//! Wraps a [`Parser`] run and hands the results out as one owned value.
//!
//! ```text
//! source ─► Lexer ─► Parser (emits IR) ─► CompiledEffect
//!                        │
//!                        └─► Diagnostics ─► Error::CompileFailed
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use shadefx::compiler::{CompileOptions, Compiler};
//!
//! let compiler = Compiler::new(CompileOptions::default());
//! let effect = compiler.compile("float4 PS() : SV_Target { return 1; }")?;
//! println!("{}", effect.dump());
//! ```

mod options;

pub use options::CompileOptions;

use crate::diagnostics::Diagnostic;
use crate::effect::{FunctionInfo, StructInfo, TechniqueProperties, VariableInfo};
use crate::error::{Error, Result};
use crate::ir::{self, IrBuilder};
use crate::parser::Parser;
use serde::{Deserialize, Serialize};

/// Everything a successful compile produced
#[derive(Debug)]
pub struct CompiledEffect {
    /// Emitted IR
    pub ir: IrBuilder,
    /// Declared structs
    pub structs: Vec<StructInfo>,
    /// Declared functions, including forward declarations
    pub functions: Vec<FunctionInfo>,
    /// Techniques in declaration order
    pub techniques: Vec<TechniqueProperties>,
    /// Uniform globals
    pub uniforms: Vec<VariableInfo>,
    /// Texture declarations
    pub textures: Vec<VariableInfo>,
    /// Sampler declarations
    pub samplers: Vec<VariableInfo>,
    /// Warnings that did not fail the compile
    pub warnings: Vec<Diagnostic>,
}

/// Host-facing metadata of an effect, detached from the IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectReflection {
    /// Uniform globals
    pub uniforms: Vec<VariableInfo>,
    /// Texture declarations
    pub textures: Vec<VariableInfo>,
    /// Sampler declarations
    pub samplers: Vec<VariableInfo>,
    /// Techniques and their passes
    pub techniques: Vec<TechniqueProperties>,
}

impl CompiledEffect {
    /// Human-readable IR listing
    pub fn dump(&self) -> String {
        ir::dump(&self.ir)
    }

    /// Technique by name
    pub fn technique(&self, name: &str) -> Option<&TechniqueProperties> {
        self.techniques.iter().find(|t| t.name == name || t.unique_name == name)
    }

    /// Copy of the reflection records
    pub fn reflection(&self) -> EffectReflection {
        EffectReflection {
            uniforms: self.uniforms.clone(),
            textures: self.textures.clone(),
            samplers: self.samplers.clone(),
            techniques: self.techniques.clone(),
        }
    }
}

/// Effect compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options this compiler was created with
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile effect source into IR and reflection data
    pub fn compile(&self, source: &str) -> Result<CompiledEffect> {
        let mut parser = Parser::with_options(self.options.clone());
        if !parser.run(source) {
            return Err(Error::CompileFailed(parser.errors()));
        }

        let output = parser.into_parts();
        let warnings: Vec<Diagnostic> = output.diagnostics.entries().to_vec();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(CompiledEffect {
            ir: output.ir,
            structs: output.structs,
            functions: output.functions,
            techniques: output.techniques,
            uniforms: output.uniforms,
            textures: output.textures,
            samplers: output.samplers,
            warnings,
        })
    }
}

/// One-shot compile with explicit options
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompiledEffect> {
    Compiler::new(options.clone()).compile(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EFFECT: &str = r#"
        texture Tex { Width = 4; Height = 4; };
        sampler Samp { Texture = Tex; };
        float4 VS(float4 p : POSITION) : SV_Position { return p; }
        float4 PS() : SV_Target { return tex2D(Samp, float2(0.5, 0.5)); }
        technique T { pass { VertexShader = VS; PixelShader = PS; } }
    "#;

    #[test]
    fn test_compile_success() {
        let effect = compile(EFFECT, &CompileOptions::default()).unwrap();
        assert_eq!(effect.textures.len(), 1);
        assert_eq!(effect.samplers.len(), 1);
        assert!(effect.technique("T").is_some());
        assert!(effect.warnings.is_empty());
        assert!(effect.dump().contains("OpEntryPoint"));
    }

    #[test]
    fn test_compile_failure_carries_log() {
        let err = compile("float f = ;", &CompileOptions::default()).unwrap_err();
        match err {
            Error::CompileFailed(log) => assert!(log.contains("error X3000")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_warnings_as_errors() {
        let source = "struct Empty {};";
        assert_eq!(compile(source, &CompileOptions::default()).unwrap().warnings.len(), 1);

        let strict = CompileOptions {
            warnings_as_errors: true,
            ..Default::default()
        };
        assert!(compile(source, &strict).is_err());
    }
}
