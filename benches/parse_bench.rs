use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shadefx::{compile, compile_all, CompileOptions, Lexer, ParallelConfig};

const EFFECT: &str = r#"
texture ColorTex { Width = 1920; Height = 1080; Format = RGBA8; MipLevels = 4; };
sampler Color { Texture = ColorTex; MinFilter = LINEAR; MagFilter = LINEAR; };

uniform float Strength < float ui_min = 0.0; float ui_max = 1.0; string ui_label = "Strength"; > = 0.5;
uniform float3 Tint = float3(1.0, 0.9, 0.8);

struct Sample { float3 color; float weight; };

float luminance(float3 color) { return dot(color, float3(0.2126, 0.7152, 0.0722)); }

Sample weigh(float3 color, float weight) {
    Sample s;
    s.color = color * weight;
    s.weight = weight;
    return s;
}

float4 VS(float4 pos : POSITION) : SV_Position { return pos; }

float4 PS() : SV_Target {
    float3 total = 0;
    float weights = 0;
    [unroll] for (int i = 0; i < 8; i++) {
        Sample s = weigh(Tint, 1.0 / (i + 1));
        total += s.color;
        weights += s.weight;
    }
    float3 color = total / weights;
    if (luminance(color) > 0.5) color *= Strength;
    return float4(color, 1.0);
}

technique Bloom {
    pass Blur { VertexShader = VS; PixelShader = PS; RenderTarget = ColorTex; }
    pass Combine { VertexShader = VS; PixelShader = PS; BlendEnable = true; }
}
"#;

fn lexer_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize effect", |b| {
        b.iter(|| Lexer::new(black_box(EFFECT)).scan_tokens())
    });
}

fn compile_benchmark(c: &mut Criterion) {
    let options = CompileOptions::default();

    c.bench_function("compile effect", |b| {
        b.iter(|| compile(black_box(EFFECT), &options).unwrap())
    });
}

fn batch_benchmark(c: &mut Criterion) {
    let sources: Vec<(&str, &str)> = (0..16).map(|_| ("bloom.fx", EFFECT)).collect();
    let options = CompileOptions::default();
    let config = ParallelConfig::default();

    c.bench_function("compile 16 effects in parallel", |b| {
        b.iter(|| compile_all(black_box(&sources), &options, &config).unwrap())
    });
}

criterion_group!(benches, lexer_benchmark, compile_benchmark, batch_benchmark);
criterion_main!(benches);
