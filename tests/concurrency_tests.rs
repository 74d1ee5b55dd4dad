//! Concurrency tests for independent compiles
//!
//! Every parser owns its state, so compiles on separate threads must produce
//! exactly what a sequential compile produces.

use shadefx::{compile, compile_all, CompileOptions, Error, ParallelConfig, Parser};
use std::thread;

const BLUR: &str = r#"
texture SceneTex { Width = 1920; Height = 1080; Format = RGBA8; };
sampler Scene { Texture = SceneTex; AddressU = CLAMP; };

uniform float Radius < float ui_min = 0.0; float ui_max = 8.0; > = 2.0;

float4 VS(float4 pos : POSITION) : SV_Position { return pos; }

float4 PS() : SV_Target {
    float4 sum = 0;
    for (int i = 0; i < 8; i++) { sum += Radius * 0.125; }
    return sum;
}

technique Blur { pass { VertexShader = VS; PixelShader = PS; } }
"#;

const TONEMAP: &str = r#"
struct Curve { float toe; float shoulder; };

static const float Exposure = 1.5;

float3 apply(float3 color, Curve curve) {
    return color * Exposure / (color + curve.shoulder);
}

float4 VS(float4 pos : POSITION) : SV_Position { return pos; }
float4 PS() : SV_Target {
    Curve c;
    c.toe = 0.1;
    c.shoulder = 0.9;
    return float4(apply(float3(1, 1, 1), c), 1);
}

technique Tonemap { pass { VertexShader = VS; PixelShader = PS; } }
"#;

const BROKEN: &str = "float4 PS() : SV_Target { return missing; }";

fn sequential_dump(source: &str) -> String {
    let mut parser = Parser::new();
    assert!(parser.run(source), "{}", parser.errors());
    shadefx::ir::dump(parser.ir())
}

// =============================================================================
// Thread Tests
// =============================================================================

#[test]
fn test_parsers_on_threads_match_sequential() {
    let expected = [sequential_dump(BLUR), sequential_dump(TONEMAP)];

    let dumps: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let source = if i % 2 == 0 { BLUR } else { TONEMAP };
                scope.spawn(move || {
                    let mut parser = Parser::new();
                    assert!(parser.run(source), "{}", parser.errors());
                    shadefx::ir::dump(parser.ir())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, dump) in dumps.iter().enumerate() {
        assert_eq!(dump, &expected[i % 2]);
    }
}

#[test]
fn test_parser_moves_between_threads() {
    let mut parser = Parser::new();
    assert!(parser.run(BLUR));

    let parser = thread::spawn(move || {
        assert!(parser.run(TONEMAP), "{}", parser.errors());
        parser
    })
    .join()
    .unwrap();

    assert_eq!(parser.techniques()[0].name, "Tonemap");
    assert!(parser.textures().is_empty());
}

// =============================================================================
// Batch Compile Tests
// =============================================================================

#[test]
fn test_compile_all_matches_sequential() {
    let sources = [
        ("blur.fx", BLUR),
        ("tonemap.fx", TONEMAP),
        ("blur_copy.fx", BLUR),
    ];
    let config = ParallelConfig { max_parallelism: 3 };
    let results = compile_all(&sources, &CompileOptions::default(), &config).unwrap();

    for ((name, source), result) in sources.iter().zip(&results) {
        let parallel = result.as_ref().unwrap();
        let sequential = compile(source, &CompileOptions::named(*name)).unwrap();
        assert_eq!(parallel.dump(), sequential.dump());
        assert_eq!(parallel.reflection(), sequential.reflection());
    }
}

#[test]
fn test_compile_all_reports_failures_per_source() {
    let sources = [("blur.fx", BLUR), ("broken.fx", BROKEN), ("tonemap.fx", TONEMAP)];
    let results = compile_all(&sources, &CompileOptions::default(), &ParallelConfig::default()).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[2].is_ok());
    match &results[1] {
        Err(Error::CompileFailed(log)) => {
            assert!(log.starts_with("broken.fx("), "{}", log);
            assert!(log.contains("X3004"), "{}", log);
        }
        _ => panic!("broken.fx should fail"),
    }
}

#[test]
fn test_compile_all_single_thread() {
    let sources = [("a.fx", BLUR), ("b.fx", TONEMAP)];
    let config = ParallelConfig { max_parallelism: 1 };
    let results = compile_all(&sources, &CompileOptions::default(), &config).unwrap();

    let names: Vec<_> = results
        .iter()
        .map(|r| r.as_ref().unwrap().techniques[0].name.clone())
        .collect();
    assert_eq!(names, ["Blur", "Tonemap"]);
}
