//! Property-based fuzzing tests for the shadefx lexer, parser and type ranking
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. The lexer and parser never panic on arbitrary input
//! 2. A failed compile always leaves a diagnostic behind
//! 3. Conversion ranking obeys its ordering rules
//! 4. Generated well-formed effects compile deterministically

use proptest::prelude::*;
use shadefx::types::{common_type, rank, SPLAT_COST};
use shadefx::{Lexer, Parser, TokenKind, TypeInfo};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Generate random strings that might break the lexer
fn arbitrary_source_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[\x00-\x7F]{0,500}").unwrap()
}

/// Generate sequences of effect-language tokens
fn token_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(effect_token(), 0..40).prop_map(|tokens| tokens.join(" "))
}

/// Generate tokens that look like effect source elements
fn effect_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("{".to_string()),
        Just("}".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just("[".to_string()),
        Just("]".to_string()),
        Just(";".to_string()),
        Just(",".to_string()),
        Just(":".to_string()),
        Just("<".to_string()),
        Just(">".to_string()),
        Just("=".to_string()),
        Just(".".to_string()),
        // Keywords
        Just("struct".to_string()),
        Just("uniform".to_string()),
        Just("static".to_string()),
        Just("const".to_string()),
        Just("technique".to_string()),
        Just("pass".to_string()),
        Just("texture".to_string()),
        Just("sampler".to_string()),
        Just("return".to_string()),
        Just("if".to_string()),
        Just("for".to_string()),
        Just("while".to_string()),
        Just("namespace".to_string()),
        // Types
        Just("float".to_string()),
        Just("float4".to_string()),
        Just("int2".to_string()),
        Just("bool".to_string()),
        Just("void".to_string()),
        // Operators
        Just("+".to_string()),
        Just("-".to_string()),
        Just("*".to_string()),
        Just("/".to_string()),
        Just("&&".to_string()),
        Just("++".to_string()),
        Just("?".to_string()),
        // Literals
        (-1000i64..1000i64).prop_map(|n| n.to_string()),
        (0.0f64..100.0f64).prop_map(|f| format!("{:.2}", f)),
        "[a-z][a-z0-9_]{0,8}".prop_map(|s| s),
        Just("\"text\"".to_string()),
    ]
}

/// Generate a numeric type of any shape
fn numeric_type() -> impl Strategy<Value = TypeInfo> {
    (0u8..5, 1u8..=4, 1u8..=4).prop_map(|(kind, rows, cols)| match kind {
        0 => TypeInfo::boolean(rows, cols),
        1 => TypeInfo::int(rows, cols),
        2 => TypeInfo::uint(rows, cols),
        3 => TypeInfo::half(rows, cols),
        _ => TypeInfo::float(rows, cols),
    })
}

/// Generate a scalar constructor for one of the numeric kinds
fn scalar_kind() -> impl Strategy<Value = fn(u8, u8) -> TypeInfo> {
    prop_oneof![
        Just(TypeInfo::boolean as fn(u8, u8) -> TypeInfo),
        Just(TypeInfo::int as fn(u8, u8) -> TypeInfo),
        Just(TypeInfo::uint as fn(u8, u8) -> TypeInfo),
        Just(TypeInfo::float as fn(u8, u8) -> TypeInfo),
    ]
}

// =============================================================================
// LEXER / PARSER ROBUSTNESS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn lexer_never_panics(source in arbitrary_source_string()) {
        let tokens = Lexer::new(&source).scan_tokens();
        prop_assert!(!tokens.is_empty());
        prop_assert_eq!(&tokens.last().unwrap().kind, &TokenKind::Eof);
    }

    #[test]
    fn parser_never_panics_on_ascii(source in arbitrary_source_string()) {
        let mut parser = Parser::new();
        let _ = parser.run(&source);
    }

    #[test]
    fn parser_never_panics_on_token_soup(source in token_soup()) {
        let mut parser = Parser::new();
        let _ = parser.run(&source);
    }

    #[test]
    fn failed_compile_reports_diagnostic(source in token_soup()) {
        let mut parser = Parser::new();
        if !parser.run(&source) {
            prop_assert!(!parser.errors().is_empty());
            prop_assert!(parser.diagnostics().has_errors());
        }
    }
}

// =============================================================================
// CONVERSION RANKING
// =============================================================================

proptest! {
    #[test]
    fn identical_types_rank_zero(ty in numeric_type()) {
        prop_assert_eq!(rank(&ty, &ty), Some(0));
    }

    #[test]
    fn splat_costs_more_than_same_shape(
        from in scalar_kind(),
        to in scalar_kind(),
        components in 2u8..=4,
    ) {
        let scalar = from(1, 1);
        let vector = from(components, 1);
        let target = to(components, 1);

        let same_shape = rank(&vector, &target).unwrap();
        let splat = rank(&scalar, &target).unwrap();
        prop_assert_eq!(splat, same_shape + SPLAT_COST);
    }

    #[test]
    fn mismatched_vector_shapes_do_not_convert(
        kind in scalar_kind(),
        a in 2u8..=4,
        b in 2u8..=4,
    ) {
        prop_assume!(a != b);
        prop_assert_eq!(rank(&kind(a, 1), &kind(b, 1)), None);
    }

    #[test]
    fn common_type_is_symmetric(a in numeric_type(), b in numeric_type()) {
        prop_assert_eq!(common_type(&a, &b), common_type(&b, &a));
    }

    #[test]
    fn common_type_accepts_both_operands(a in numeric_type(), b in numeric_type()) {
        if let Some(common) = common_type(&a, &b) {
            prop_assert!(rank(&a, &common).is_some());
            prop_assert!(rank(&b, &common).is_some());
        }
    }
}

// =============================================================================
// GENERATED PROGRAMS
// =============================================================================

fn generated_effect(scale: f64, offset: f64, iterations: u32) -> String {
    format!(
        r#"
        static const float Scale = {scale:.3};
        uniform float Offset = {offset:.3};

        float4 VS(float4 pos : POSITION) : SV_Position {{ return pos; }}

        float4 PS() : SV_Target {{
            float x = Offset;
            for (int i = 0; i < {iterations}; i++) {{ x += Scale * {offset:.3}; }}
            return float4(x, x, x, 1.0);
        }}

        technique Generated {{ pass {{ VertexShader = VS; PixelShader = PS; }} }}
        "#
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_effects_compile(
        scale in 0.0f64..100.0,
        offset in 0.0f64..100.0,
        iterations in 0u32..16,
    ) {
        let source = generated_effect(scale, offset, iterations);
        let mut parser = Parser::new();
        prop_assert!(parser.run(&source), "{}", parser.errors());
        prop_assert_eq!(parser.uniforms().len(), 1);
        prop_assert_eq!(parser.techniques().len(), 1);
    }

    #[test]
    fn compilation_is_deterministic(
        scale in 0.0f64..100.0,
        iterations in 0u32..8,
    ) {
        let source = generated_effect(scale, 1.0, iterations);
        let mut first = Parser::new();
        let mut second = Parser::new();
        prop_assert!(first.run(&source));
        prop_assert!(second.run(&source));
        prop_assert_eq!(
            shadefx::ir::dump(first.ir()),
            shadefx::ir::dump(second.ir())
        );
    }
}
