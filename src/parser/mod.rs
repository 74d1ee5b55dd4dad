//! Single-pass effect parser
//!
//! Parses effect source and emits IR while it goes; there is no AST. Each
//! production consumes tokens through a one-token lookahead window and returns
//! `Result`, so the first error unwinds the whole compile.
//!
//! ```text
//! Parser::run
//!   ├── declaration.rs   top level: namespace, struct, typedef, globals, functions
//!   ├── technique.rs     technique / pass blocks, texture and sampler properties
//!   ├── statement.rs     blocks, control flow, local declarations
//!   └── expression.rs    unary, postfix, multary (ops.rs), assignment, calls
//! ```
//!
//! | Field         | Meaning                                            |
//! |---------------|----------------------------------------------------|
//! | `token`       | last consumed token                                |
//! | `token_next`  | lookahead                                          |
//! | `backup`      | single saved `(token, token_next, stream cursor)`  |
//! | `section`     | IR section receiving code right now                |
//! | `block_open`  | whether the current basic block has no terminator  |

mod declaration;
mod expression;
mod ops;
mod statement;
mod technique;

use crate::compiler::CompileOptions;
use crate::diagnostics::{codes, Diagnostics};
use crate::effect::{FunctionInfo, StructInfo, TechniqueProperties, VariableInfo};
use crate::error::{Error, Result};
use crate::ir::{Id, IrBuilder, SectionId};
use crate::lexer::{Keyword, Lexer, Location, Punct, StreamPosition, Token, TokenKind, TokenSource};
use crate::symbols::SymbolTable;
use crate::types::TypeInfo;
use std::collections::HashMap;
use std::mem;

/// Saved parser position for backtracking
#[derive(Debug, Clone)]
struct Snapshot {
    token: Token,
    token_next: Token,
    position: StreamPosition,
}

/// Swizzle applied to an l-value vector
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Swizzle {
    /// Type of the whole vector behind the pointer
    pub base_ty: TypeInfo,
    /// Selected component indices
    pub components: Vec<u32>,
}

/// Result of an expression
///
/// L-values carry a pointer type and may have a pending swizzle; r-values
/// carry the value type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Value {
    pub id: Id,
    pub ty: TypeInfo,
    pub swizzle: Option<Swizzle>,
}

impl Value {
    fn rvalue(id: Id, ty: TypeInfo) -> Self {
        Self { id, ty, swizzle: None }
    }

    fn lvalue(id: Id, ty: TypeInfo) -> Self {
        Self {
            id,
            ty: ty.pointer(),
            swizzle: None,
        }
    }

    fn is_lvalue(&self) -> bool {
        self.ty.is_pointer
    }
}

/// Branch targets of the innermost loop
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    break_label: Id,
    continue_label: Id,
    /// A `break` branched to the merge block
    has_break: bool,
}

/// Parser and IR emitter for one effect
pub struct Parser {
    options: CompileOptions,
    lexer: Box<dyn TokenSource + Send>,
    token: Token,
    token_next: Token,
    backup: Option<Snapshot>,
    diagnostics: Diagnostics,
    ir: IrBuilder,
    symbols: SymbolTable,
    structs: Vec<StructInfo>,
    functions: Vec<FunctionInfo>,
    /// (qualified name, parameter types) to index into `functions`
    declared_functions: HashMap<(String, Vec<TypeInfo>), usize>,
    techniques: Vec<TechniqueProperties>,
    uniforms: Vec<VariableInfo>,
    textures: Vec<VariableInfo>,
    samplers: Vec<VariableInfo>,
    section: SectionId,
    current_function: Option<usize>,
    called_functions: Vec<(usize, Location)>,
    loops: Vec<LoopLabels>,
    block_open: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Parser with default options
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    /// Parser with explicit options
    pub fn with_options(options: CompileOptions) -> Self {
        let diagnostics = Diagnostics::with_limit(options.max_warnings);
        Self {
            options,
            lexer: Box::new(Lexer::new("")),
            token: Token::eof(Location::default()),
            token_next: Token::eof(Location::default()),
            backup: None,
            diagnostics,
            ir: IrBuilder::new(),
            symbols: SymbolTable::new(),
            structs: Vec::new(),
            functions: Vec::new(),
            declared_functions: HashMap::new(),
            techniques: Vec::new(),
            uniforms: Vec::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
            section: SectionId::Functions,
            current_function: None,
            called_functions: Vec::new(),
            loops: Vec::new(),
            block_open: false,
        }
    }

    /// Compile effect source text
    ///
    /// Returns `true` when no error was reported. All state from a previous
    /// run is discarded first.
    pub fn run(&mut self, source: &str) -> bool {
        let lexer = Lexer::with_name(source, &self.options.source_name);
        self.run_with(lexer)
    }

    /// Compile from an arbitrary token stream
    pub fn run_with<S: TokenSource + Send + 'static>(&mut self, source: S) -> bool {
        self.reset(Box::new(source));
        tracing::debug!(source = %self.options.source_name, "compiling effect");

        if let Err(err) = self.parse_program() {
            tracing::debug!(error = %err, "compile aborted");
            self.diagnostics.report(&err);
        }
        if self.options.warnings_as_errors {
            self.diagnostics.promote_warnings();
        }

        let success = !self.diagnostics.has_errors();
        tracing::debug!(
            success,
            functions = self.functions.len(),
            techniques = self.techniques.len(),
            ids = self.ir.id_count(),
            "finished compiling effect"
        );
        success
    }

    fn reset(&mut self, lexer: Box<dyn TokenSource + Send>) {
        self.lexer = lexer;
        self.token = Token::eof(Location::default());
        self.token_next = Token::eof(Location::default());
        self.backup = None;
        self.diagnostics = Diagnostics::with_limit(self.options.max_warnings);
        self.ir.reset();
        self.symbols.reset();
        self.structs.clear();
        self.functions.clear();
        self.declared_functions.clear();
        self.techniques.clear();
        self.uniforms.clear();
        self.textures.clear();
        self.samplers.clear();
        self.section = SectionId::Functions;
        self.current_function = None;
        self.called_functions.clear();
        self.loops.clear();
        self.block_open = false;
    }

    fn parse_program(&mut self) -> Result<()> {
        self.consume();
        while !self.peek_eof() {
            self.parse_top_level()?;
        }
        self.check_called_functions()
    }

    fn check_called_functions(&self) -> Result<()> {
        for (index, location) in &self.called_functions {
            let function = &self.functions[*index];
            if !function.defined {
                return Err(Error::name(
                    location.clone(),
                    codes::UNDEFINED_FUNCTION,
                    format!("'{}': function is declared but not defined", function.name),
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// All diagnostics rendered one per line
    pub fn errors(&self) -> String {
        self.diagnostics.render()
    }

    /// Structured diagnostics of the last run
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Struct declarations
    pub fn structs(&self) -> &[StructInfo] {
        &self.structs
    }

    /// Function declarations, including forward declarations
    pub fn functions(&self) -> &[FunctionInfo] {
        &self.functions
    }

    /// Techniques in declaration order
    pub fn techniques(&self) -> &[TechniqueProperties] {
        &self.techniques
    }

    /// Uniform variables
    pub fn uniforms(&self) -> &[VariableInfo] {
        &self.uniforms
    }

    /// Texture declarations
    pub fn textures(&self) -> &[VariableInfo] {
        &self.textures
    }

    /// Sampler declarations
    pub fn samplers(&self) -> &[VariableInfo] {
        &self.samplers
    }

    /// Emitted IR
    pub fn ir(&self) -> &IrBuilder {
        &self.ir
    }

    /// Options this parser was created with
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub(crate) fn into_parts(self) -> ParserOutput {
        ParserOutput {
            diagnostics: self.diagnostics,
            ir: self.ir,
            structs: self.structs,
            functions: self.functions,
            techniques: self.techniques,
            uniforms: self.uniforms,
            textures: self.textures,
            samplers: self.samplers,
        }
    }

    // ------------------------------------------------------------------
    // Token window
    // ------------------------------------------------------------------

    /// Shift the lookahead into `token` and read a new lookahead
    fn consume(&mut self) {
        let next = self.lexer.next_token();
        self.token = mem::replace(&mut self.token_next, next);
    }

    fn peek(&self, punct: Punct) -> bool {
        self.token_next.kind == TokenKind::Punct(punct)
    }

    fn peek_keyword(&self, keyword: Keyword) -> bool {
        self.token_next.kind == TokenKind::Keyword(keyword)
    }

    fn peek_eof(&self) -> bool {
        self.token_next.kind == TokenKind::Eof
    }

    fn peek_identifier(&self) -> Option<&str> {
        match &self.token_next.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.token_next.kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    fn accept(&mut self, punct: Punct) -> bool {
        if self.peek(punct) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn accept_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek_keyword(keyword) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct) -> Result<()> {
        if self.accept(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", punct.as_str())))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.accept_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword.as_str())))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match &self.token_next.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.consume();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Identifier with optional `::` qualification, e.g. `A::B::c`
    fn expect_qualified_identifier(&mut self) -> Result<String> {
        let mut name = if self.accept(Punct::ColonColon) {
            String::from("::")
        } else {
            String::new()
        };
        name.push_str(&self.expect_identifier()?);
        while self.accept(Punct::ColonColon) {
            name.push_str("::");
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name.trim_start_matches("::").to_string())
    }

    /// Location of the lookahead token
    fn location(&self) -> Location {
        self.token_next.location.clone()
    }

    // ------------------------------------------------------------------
    // Backtracking
    // ------------------------------------------------------------------

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            token: self.token.clone(),
            token_next: self.token_next.clone(),
            position: self.lexer.position(),
        }
    }

    fn rewind(&mut self, snapshot: Snapshot) {
        self.lexer.seek(snapshot.position);
        self.token = snapshot.token;
        self.token_next = snapshot.token_next;
    }

    /// Save the current position into the single backup slot
    fn backup(&mut self) {
        self.backup = Some(self.snapshot());
    }

    /// Return to the position saved by the last `backup`
    fn restore(&mut self) {
        if let Some(snapshot) = self.backup.take() {
            self.rewind(snapshot);
        }
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Error for an unexpected lookahead token
    fn unexpected(&self, expected: &str) -> Error {
        let location = self.location();
        match &self.token_next.kind {
            TokenKind::Unknown(c) => Error::Lexical {
                location,
                code: codes::UNKNOWN_CHARACTER,
                message: format!("unexpected character '{}'", c),
            },
            found => Error::syntax(
                location,
                codes::SYNTAX,
                format!("syntax error: unexpected {}, expected {}", found, expected),
            ),
        }
    }

    fn warning(&mut self, location: Location, code: u32, message: impl Into<String>) {
        self.diagnostics.warning(location, code, message);
    }
}

/// Everything a finished parser produced, moved out in one piece
pub(crate) struct ParserOutput {
    pub diagnostics: Diagnostics,
    pub ir: IrBuilder,
    pub structs: Vec<StructInfo>,
    pub functions: Vec<FunctionInfo>,
    pub techniques: Vec<TechniqueProperties>,
    pub uniforms: Vec<VariableInfo>,
    pub textures: Vec<VariableInfo>,
    pub samplers: Vec<VariableInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primed(source: &str) -> Parser {
        let mut parser = Parser::new();
        parser.reset(Box::new(Lexer::new(source)));
        parser.consume();
        parser
    }

    #[test]
    fn test_backup_restore_round_trip() {
        let mut parser = primed("a b c d");
        parser.consume();
        assert_eq!(parser.token.lexeme, "a");
        parser.backup();
        parser.consume();
        parser.consume();
        assert_eq!(parser.peek_identifier(), Some("d"));
        parser.restore();
        assert_eq!(parser.token.lexeme, "a");
        assert_eq!(parser.peek_identifier(), Some("b"));
        parser.consume();
        parser.consume();
        assert_eq!(parser.peek_identifier(), Some("d"));
    }

    #[test]
    fn test_restore_without_backup_is_noop() {
        let mut parser = primed("x y");
        parser.restore();
        assert_eq!(parser.peek_identifier(), Some("x"));
    }

    #[test]
    fn test_qualified_identifier() {
        let mut parser = primed("A::B::c ;");
        assert_eq!(parser.expect_qualified_identifier().unwrap(), "A::B::c");
        assert!(parser.peek(Punct::Semicolon));
    }

    #[test]
    fn test_unexpected_token_message() {
        let parser = primed("}");
        let err = parser.unexpected("identifier");
        assert_eq!(err.code(), codes::SYNTAX);
        assert!(err.message().contains("'}'"));

        let parser = primed("@");
        assert_eq!(parser.unexpected("identifier").code(), codes::UNKNOWN_CHARACTER);
    }

    #[test]
    fn test_empty_source_compiles() {
        let mut parser = Parser::new();
        assert!(parser.run(""));
        assert!(parser.errors().is_empty());
    }
}
