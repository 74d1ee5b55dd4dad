//! Integration tests for the effect parser
//!
//! These tests compile small effects end to end and inspect the emitted IR,
//! the reflection records and the diagnostics log.

use shadefx::diagnostics::Severity;
use shadefx::effect::{AddressMode, BlendFactor, FilterMode, TextureFormat, Variant};
use shadefx::ir::{Op, SectionId};
use shadefx::{compile, CompileOptions, Error, Parser};

/// Run a source through a fresh parser
fn parse(source: &str) -> Parser {
    let mut parser = Parser::new();
    parser.run(source);
    parser
}

/// Numeric code of the single error a source produces
fn error_code(source: &str) -> u32 {
    let parser = parse(source);
    let errors: Vec<_> = parser.diagnostics().errors().collect();
    assert_eq!(errors.len(), 1, "expected one error, log:\n{}", parser.errors());
    errors[0].code
}

fn count_ops(parser: &Parser, section: SectionId, op: Op) -> usize {
    parser.ir().section(section).iter().filter(|n| n.op == op).count()
}

const SHADERS: &str = r#"
float4 VS(float4 pos : POSITION) : SV_Position { return pos; }
float4 PS() : SV_Target { return float4(1.0, 0.5, 0.25, 1.0); }
"#;

// =============================================================================
// DECLARATIONS
// =============================================================================

#[test]
fn test_empty_source() {
    let parser = parse("");
    assert!(parser.errors().is_empty());
    assert!(parser.functions().is_empty());
}

#[test]
fn test_struct_fields_and_member_names() {
    let parser = parse(
        r#"
        struct Light {
            float3 color : color;
            float intensity;
            float2 offsets[2];
        };
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());

    let light = &parser.structs()[0];
    assert_eq!(light.name, "Light");
    let names: Vec<&str> = light.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["color", "intensity", "offsets"]);
    assert_eq!(light.fields[0].semantic.as_deref(), Some("COLOR"));
    assert_eq!(light.fields[2].ty.array_length, 2);
    assert_eq!(light.field("intensity").map(|(i, _)| i), Some(1));

    assert_eq!(count_ops(&parser, SectionId::Variables, Op::TypeStruct), 1);
    assert_eq!(count_ops(&parser, SectionId::Strings, Op::MemberName), 3);
    assert_eq!(count_ops(&parser, SectionId::Annotations, Op::MemberDecorate), 1);
}

#[test]
fn test_empty_struct_warns() {
    let parser = parse("struct Nothing {};");
    assert!(!parser.diagnostics().has_errors());
    let entries = parser.diagnostics().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, Severity::Warning);
    assert_eq!(entries[0].code, 5001);
}

#[test]
fn test_duplicate_struct_member() {
    assert_eq!(error_code("struct S { float a; int a; };"), 3003);
}

#[test]
fn test_uniforms_and_annotations() {
    let parser = parse(
        r#"
        uniform float Exposure < string ui_label = "Exp" "osure"; float ui_min = 0; > = 1.5;
        float3 Tint : TINT = float3(1, 1, 1);
        static float Hidden = 2.0;
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());

    let uniforms = parser.uniforms();
    assert_eq!(uniforms.len(), 2);
    assert_eq!(uniforms[0].name, "Exposure");
    assert_eq!(
        uniforms[0].annotations.get("ui_label"),
        Some(&Variant::String("Exposure".to_string()))
    );
    assert_eq!(uniforms[0].annotations.get("ui_min"), Some(&Variant::Float(0.0)));
    assert_eq!(uniforms[1].name, "Tint");
    assert!(uniforms.iter().all(|u| u.name != "Hidden"));
}

#[test]
fn test_global_initializer_must_be_literal() {
    assert_eq!(error_code("float a = 1.0; static float b = a;"), 3011);
}

#[test]
fn test_half_initializers_are_literals() {
    let parser = parse("static const half h = 1.0; uniform half2 x = 0.5;");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    let constants: Vec<_> = parser
        .ir()
        .section(SectionId::Variables)
        .iter()
        .filter(|n| n.op == Op::Constant)
        .map(|n| n.operands.clone())
        .collect();
    assert!(constants.contains(&vec![0x3C00]), "{:?}", constants);
    assert!(constants.contains(&vec![0x3800]), "{:?}", constants);
    assert_eq!(count_ops(&parser, SectionId::Temporary, Op::FConvert), 0);
}

#[test]
fn test_const_requires_initializer() {
    assert_eq!(error_code("static const float k;"), 3011);
}

#[test]
fn test_array_size_must_be_positive() {
    assert_eq!(error_code("static float values[0];"), 3059);
    let parser = parse("static const int N = 3; static float values[N];");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
}

#[test]
fn test_unsized_array_takes_length_from_initializer() {
    let parser = parse("static const float weights[] = { 0.25, 0.5, 0.25 };");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
}

#[test]
fn test_typedef_and_template_types() {
    let parser = parse(
        r#"
        typedef vector<float, 3> color3;
        typedef matrix<float, 2, 2> mat2;
        color3 Scale(color3 c, mat2 m) { return c * m[0][0]; }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    let params = &parser.functions()[0].parameter_list;
    assert_eq!((params[0].rows, params[0].cols), (3, 1));
    assert_eq!((params[1].rows, params[1].cols), (2, 2));
}

#[test]
fn test_namespace_qualified_names() {
    let parser = parse(
        r#"
        namespace Util {
            static const float K = 0.5;
            float Scale(float x) { return x * K; }
        }
        float4 PS() : SV_Target { return Util::Scale(Util::K); }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(parser.functions()[0].unique_name, "FUtil__Scale_f");
}

#[test]
fn test_namespaced_and_underscored_names_stay_distinct() {
    let parser = parse(
        r#"
        namespace A { float foo() { return 1.0; } }
        float A_foo() { return 2.0; }
        namespace A { struct S { float x; }; }
        struct A_S { float y; };
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    let functions: Vec<_> = parser.functions().iter().map(|f| f.unique_name.as_str()).collect();
    assert_eq!(functions, ["FA__foo", "FA_1foo"]);
    let structs: Vec<_> = parser.structs().iter().map(|s| s.unique_name.as_str()).collect();
    assert_eq!(structs, ["A__S", "A_1S"]);
}

#[test]
fn test_forward_declaration_matches_definition() {
    let parser = parse(
        r#"
        namespace N { float g(float x); }
        namespace N { float g(float x) { return x; } }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(parser.functions().len(), 1);
    assert!(parser.functions()[0].defined);
}

#[test]
fn test_integer_literal_prefixes() {
    let parser = parse("static const int a = 010; static const int b = 0x1F;");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    let constants: Vec<_> = parser
        .ir()
        .section(SectionId::Variables)
        .iter()
        .filter(|n| n.op == Op::Constant)
        .map(|n| n.operands.clone())
        .collect();
    assert_eq!(constants, [vec![8], vec![31]]);

    assert_eq!(error_code("static const int b = 0x;"), 1000);
}

#[test]
fn test_duplicate_qualifier() {
    assert_eq!(error_code("static static float x = 1;"), 3048);
}

// =============================================================================
// FUNCTIONS AND CALLS
// =============================================================================

#[test]
fn test_overload_prefers_exact_match() {
    let parser = parse(
        r#"
        float f(float x) { return x; }
        float f(int x) { return 2.0; }
        float4 PS() : SV_Target { return f(1); }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());

    let int_overload = parser.functions()[1].definition;
    let call = parser
        .ir()
        .section(SectionId::Functions)
        .iter()
        .find(|n| n.op == Op::FunctionCall)
        .expect("call emitted");
    assert_eq!(call.operand_id(0), int_overload);
}

#[test]
fn test_ambiguous_call() {
    let source = r#"
        float g(float a, int b) { return a; }
        float g(int a, float b) { return b; }
        float4 PS() : SV_Target { return g(1, 1); }
    "#;
    assert_eq!(error_code(source), 3067);
}

#[test]
fn test_no_matching_overload() {
    let source = r#"
        float h(float2 a) { return a.x; }
        float4 PS() : SV_Target { return h(1, 2); }
    "#;
    assert_eq!(error_code(source), 3013);
}

#[test]
fn test_forward_declaration_then_definition() {
    let parser = parse(
        r#"
        float later(float x);
        float4 PS() : SV_Target { return later(2.0); }
        float later(float x) { return x + 1.0; }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(parser.functions().len(), 2);
    assert!(parser.functions()[0].defined);
}

#[test]
fn test_called_but_never_defined() {
    let source = r#"
        float missing(float x);
        float4 PS() : SV_Target { return missing(1.0); }
    "#;
    assert_eq!(error_code(source), 3079);
}

#[test]
fn test_out_parameter_round_trip() {
    let parser = parse(
        r#"
        void split(float4 v, out float3 rgb, inout float a) { rgb = v.rgb; a *= v.a; }
        float4 PS() : SV_Target {
            float3 c;
            float alpha = 1.0;
            split(float4(1, 2, 3, 4), c, alpha);
            return float4(c, alpha);
        }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
}

#[test]
fn test_missing_return_value() {
    let source = "float f(float x) { if (x > 0) return x; }";
    assert_eq!(error_code(source), 3080);
}

#[test]
fn test_both_branches_return() {
    let parser = parse("float f(bool c) { if (c) return 1.0; else return 2.0; }");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::Unreachable), 1);
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::Return), 0);
}

#[test]
fn test_endless_loops_do_not_fall_through() {
    let parser = parse(
        r#"
        float f() { while (true) { return 1.0; } }
        float g(int n) { for (;;) { if (n > 0) return 2.0; } }
        float h() { do { return 3.0; } while (true); }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::Unreachable), 3);
}

#[test]
fn test_loop_with_break_can_fall_through() {
    assert_eq!(error_code("float f() { for (;;) { break; } }"), 3080);
    assert_eq!(error_code("float f(bool c) { while (true) { if (c) break; } }"), 3080);
}

#[test]
fn test_intrinsics_resolve() {
    let parser = parse(
        r#"
        float4 PS(float2 uv : TEXCOORD) : SV_Target {
            float d = saturate(dot(normalize(float3(uv, 1)), float3(0, 0, 1)));
            return lerp(float4(0, 0, 0, 1), float4(1, 1, 1, 1), pow(d, 2.2));
        }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert!(count_ops(&parser, SectionId::Functions, Op::ExtInst) >= 3);
    assert_eq!(count_ops(&parser, SectionId::Entries, Op::ExtInstImport), 1);
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[test]
fn test_undeclared_identifier() {
    assert_eq!(error_code("float4 PS() : SV_Target { return nope; }"), 3004);
}

#[test]
fn test_assignment_to_uniform_rejected() {
    let source = r#"
        float Gain = 1.0;
        float4 PS() : SV_Target { Gain = 2.0; return Gain; }
    "#;
    assert_eq!(error_code(source), 3025);
}

#[test]
fn test_repeated_swizzle_not_assignable() {
    let source = "float4 PS() : SV_Target { float4 v = 0; v.xx = float2(1, 2); return v; }";
    assert_eq!(error_code(source), 3025);
}

#[test]
fn test_implicit_truncation_rejected() {
    let source = "float4 PS() : SV_Target { float2 v = float4(1, 2, 3, 4); return v.xyxy; }";
    assert_eq!(error_code(source), 3017);
}

#[test]
fn test_explicit_cast_allows_truncation() {
    let source = "float4 PS() : SV_Target { float2 v = (float2)float4(1, 2, 3, 4); return v.xyxy; }";
    let parser = parse(source);
    assert!(parser.errors().is_empty(), "{}", parser.errors());
}

#[test]
fn test_bitwise_requires_integers() {
    let source = "float4 PS() : SV_Target { float a = 1.0; return a & 1; }";
    assert_eq!(error_code(source), 3082);
}

#[test]
fn test_constant_folding_of_literals() {
    let parser = parse("static const float3 k = float3(1, 2, 3); static const int n = -4;");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(count_ops(&parser, SectionId::Variables, Op::ConstantComposite), 1);
    assert_eq!(count_ops(&parser, SectionId::Temporary, Op::SNegate), 0);
}

// =============================================================================
// STATEMENTS
// =============================================================================

#[test]
fn test_loops_emit_structured_merges() {
    let parser = parse(
        r#"
        float4 PS() : SV_Target {
            float sum = 0;
            [unroll] for (int i = 0; i < 4; i++) { if (i == 2) continue; sum += i; }
            int j = 0;
            while (j < 3) { j++; if (j > 10) break; }
            do { j--; } while (j > 0);
            if (sum > 1) sum = 1; else sum = 0;
            return sum;
        }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::LoopMerge), 3);
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::SelectionMerge), 3);
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::FunctionEnd), 1);
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(error_code("void f() { break; }"), 3518);
}

#[test]
fn test_continue_outside_loop() {
    assert_eq!(error_code("void f() { continue; }"), 3518);
}

#[test]
fn test_unknown_attribute_warns() {
    let parser = parse("void f() { [fancy] for (int i = 0; i < 2; i++) {} }");
    assert!(!parser.diagnostics().has_errors(), "{}", parser.errors());
    assert_eq!(parser.diagnostics().warning_count(), 1);
    assert_eq!(parser.diagnostics().entries()[0].code, 3554);
}

#[test]
fn test_discard_and_void_return() {
    let parser = parse("void f(float x) { if (x < 0) discard; return; }");
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    assert_eq!(count_ops(&parser, SectionId::Functions, Op::Kill), 1);
}

#[test]
fn test_local_redefinition() {
    assert_eq!(error_code("void f() { float a = 1; float a = 2; }"), 3003);
}

// =============================================================================
// TEXTURES, SAMPLERS, TECHNIQUES
// =============================================================================

const RESOURCES: &str = r#"
texture ColorTex < string source = "color.png"; > { Width = 256; Height = 128; MipLevels = 20; Format = R8; SRGBTexture = true; };
texture TargetTex { Width = 64; Height = 64; Format = RGBA16F; };
sampler ColorSampler { Texture = ColorTex; MinFilter = POINT; AddressU = WRAP; MaxLOD = 4.0; };
"#;

#[test]
fn test_texture_and_sampler_reflection() {
    let parser = parse(RESOURCES);
    assert!(!parser.diagnostics().has_errors(), "{}", parser.errors());

    let textures = parser.textures();
    assert_eq!(textures.len(), 2);
    assert_eq!(textures[0].width, 256);
    assert_eq!(textures[0].height, 128);
    assert_eq!(textures[0].levels, 9);
    assert_eq!(textures[0].format, TextureFormat::R8);
    assert!(!textures[0].srgb_texture);
    assert_eq!(
        textures[0].annotations.get("source"),
        Some(&Variant::String("color.png".to_string()))
    );

    // Clamped mip levels and sRGB on R8
    assert_eq!(parser.diagnostics().warning_count(), 2);
    assert!(parser.diagnostics().entries().iter().all(|d| d.code == 4717));

    let sampler = &parser.samplers()[0];
    assert_eq!(sampler.texture, textures[0].definition);
    assert_eq!(sampler.min_filter, FilterMode::Point);
    assert_eq!(sampler.address_u, AddressMode::Wrap);
    assert_eq!(sampler.max_lod, 4.0);
}

#[test]
fn test_sampler_without_texture() {
    assert_eq!(error_code("sampler Lonely { MinFilter = LINEAR; };"), 3012);
}

#[test]
fn test_technique_and_pass_states() {
    let source = format!(
        "{}{}{}",
        RESOURCES,
        SHADERS,
        r#"
        technique Blur < int order = 2; > {
            pass First {
                VertexShader = VS;
                PixelShader = PS;
                RenderTarget = TargetTex;
                BlendEnable = true;
                SrcBlend = SRCALPHA;
                DestBlend = INVSRCALPHA;
                ColorWriteMask = 7;
            }
            pass { VertexShader = VS; PixelShader = PS; }
        }
        "#
    );
    let parser = parse(&source);
    assert!(!parser.diagnostics().has_errors(), "{}", parser.errors());

    let technique = &parser.techniques()[0];
    assert_eq!(technique.name, "Blur");
    assert_eq!(technique.annotations.get("order"), Some(&Variant::Int(2)));
    assert_eq!(technique.passes.len(), 2);

    let first = &technique.passes[0];
    assert_eq!(first.name.as_deref(), Some("First"));
    assert_eq!(first.render_targets[0], parser.textures()[1].definition);
    assert!(first.blend_enable);
    assert_eq!(first.src_blend, BlendFactor::SrcAlpha);
    assert_eq!(first.dest_blend, BlendFactor::InvSrcAlpha);
    assert_eq!(first.color_write_mask, 7);
    assert_eq!(first.vertex_shader, parser.functions()[0].definition);
    assert_eq!(technique.passes[1].name, None);

    // Shared shaders are declared as entry points once
    assert_eq!(count_ops(&parser, SectionId::Entries, Op::EntryPoint), 2);
}

#[test]
fn test_unknown_pass_state_single_diagnostic() {
    let source = format!(
        "{}technique T {{\n  pass {{\n    VertexShader = VS;\n    BogusState = 1;\n  }}\n}}\n",
        SHADERS
    );
    let parser = parse(&source);
    let entries = parser.diagnostics().entries();
    assert_eq!(entries.len(), 1, "{}", parser.errors());
    assert_eq!(entries[0].code, 3004);
    // SHADERS ends on line 3, the state sits on the fourth technique line
    assert_eq!(entries[0].location.line, 7);
    assert!(entries[0].message.contains("BogusState"));
}

#[test]
fn test_pass_without_pixel_shader() {
    let source = format!("{}technique T {{ pass {{ VertexShader = VS; }} }}", SHADERS);
    assert_eq!(error_code(&source), 3012);
}

#[test]
fn test_pass_state_wrong_value() {
    let source = format!(
        "{}technique T {{ pass {{ VertexShader = VS; PixelShader = PS; SrcBlend = SIDEWAYS; }} }}",
        SHADERS
    );
    assert_eq!(error_code(&source), 3020);
}

// =============================================================================
// DRIVER BEHAVIOUR
// =============================================================================

#[test]
fn test_rerun_discards_previous_state() {
    let mut parser = Parser::new();
    assert!(!parser.run("float x = ;"));
    assert!(!parser.errors().is_empty());

    assert!(parser.run("struct A { float a; };"));
    assert!(parser.errors().is_empty());
    assert_eq!(parser.structs().len(), 1);
    assert!(parser.uniforms().is_empty());
}

#[test]
fn test_errors_render_with_source_name() {
    let options = CompileOptions::named("blur.fx");
    let mut parser = Parser::with_options(options);
    assert!(!parser.run("float4 PS() : SV_Target { return nope; }"));
    let log = parser.errors();
    assert!(log.starts_with("blur.fx(1, "), "{}", log);
    assert!(log.contains("error X3004"), "{}", log);
}

#[test]
fn test_first_ids_start_at_one_hundred() {
    let parser = parse(SHADERS);
    let smallest = SectionId::ALL
        .iter()
        .flat_map(|s| parser.ir().section(*s))
        .filter(|n| n.result.is_some())
        .map(|n| n.result.0)
        .min();
    assert_eq!(smallest, Some(100));
}

#[test]
fn test_types_are_interned_once() {
    let parser = parse(
        r#"
        static const float a = 1.0;
        static const float b = 2.0;
        float4 PS() : SV_Target { float c = a + b; return c; }
        "#,
    );
    assert!(parser.errors().is_empty(), "{}", parser.errors());
    let float_types = parser
        .ir()
        .section(SectionId::Variables)
        .iter()
        .filter(|n| n.op == Op::TypeFloat && n.operands == [32])
        .count();
    assert_eq!(float_types, 1);
}

#[test]
fn test_reflection_serializes() {
    let source = format!(
        "{}{}technique T {{ pass {{ VertexShader = VS; PixelShader = PS; }} }}",
        RESOURCES, SHADERS
    );
    let effect = compile(&source, &CompileOptions::default()).unwrap();
    let reflection = effect.reflection();
    let json = serde_json::to_string(&reflection).unwrap();
    let back: shadefx::EffectReflection = serde_json::from_str(&json).unwrap();
    assert_eq!(back, reflection);
}

#[test]
fn test_compile_reports_failure_as_error() {
    match compile("technique { }", &CompileOptions::default()) {
        Err(Error::CompileFailed(log)) => assert!(log.contains("X3000"), "{}", log),
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}
