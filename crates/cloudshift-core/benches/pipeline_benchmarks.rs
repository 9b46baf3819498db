//! Benchmarks for the detection and transformation pipeline
//!
//! Measures parsing, detection and structural rewriting separately, plus the
//! whole request path, over modules of growing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cloudshift_core::detection::Detector;
use cloudshift_core::transform::Transformer;
use cloudshift_core::{
    Engine, JsAdapter, LanguageAdapter, LanguageVariant, PatternCatalog, ProviderId,
    PythonAdapter, TransformRequest,
};

const JS_HEADER: &str = "const AWS = require('aws-sdk');\nconst s3 = new AWS.S3();\n\n";

const PY_HEADER: &str = "import boto3\n\ns3 = boto3.client(\"s3\")\n\n";

fn catalog() -> PatternCatalog {
    PatternCatalog::from_sources(cloudshift_providers::builtin_catalog_sources())
        .expect("bundled catalog compiles")
}

/// JavaScript module with `n` upload functions
fn js_module(n: usize) -> String {
    let mut source = String::from(JS_HEADER);
    for i in 0..n {
        source.push_str(&format!(
            "async function upload{i}(body) {{\n  await s3.putObject({{ Bucket: 'bucket-{i}', Key: 'key-{i}', Body: body }}).promise();\n}}\n\n"
        ));
    }
    source
}

/// Python module with `n` upload functions
fn py_module(n: usize) -> String {
    let mut source = String::from(PY_HEADER);
    for i in 0..n {
        source.push_str(&format!(
            "\ndef upload_{i}(body):\n    s3.put_object(Bucket=\"bucket-{i}\", Key=\"key-{i}\", Body=body)\n\n"
        ));
    }
    source
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let js = JsAdapter::javascript();
    let py = PythonAdapter::new();

    for size in [10, 100] {
        let source = js_module(size);
        group.bench_with_input(BenchmarkId::new("javascript", size), &source, |b, s| {
            b.iter(|| js.parse(black_box(s)).unwrap())
        });
        let source = py_module(size);
        group.bench_with_input(BenchmarkId::new("python", size), &source, |b, s| {
            b.iter(|| py.parse(black_box(s)).unwrap())
        });
    }

    group.finish();
}

fn bench_detection_and_transform(c: &mut Criterion) {
    let catalog = catalog();
    let aws = ProviderId::new("aws");
    let azure = ProviderId::new("azure");
    let mapping = catalog.mapping(&aws, &azure).unwrap();
    let profile = catalog.provider(&aws).unwrap();
    let adapter = JsAdapter::javascript();

    let mut group = c.benchmark_group("detect_transform");
    for size in [10, 100, 500] {
        let tree = adapter.parse(&js_module(size)).unwrap();

        group.bench_with_input(BenchmarkId::new("detect", size), &tree, |b, tree| {
            b.iter(|| Detector::new(mapping, profile).detect(black_box(tree)))
        });

        let detection = Detector::new(mapping, profile).detect(&tree);
        group.bench_with_input(BenchmarkId::new("transform", size), &tree, |b, tree| {
            b.iter(|| Transformer::new(mapping).transform(&adapter, black_box(tree), &detection))
        });
    }
    group.finish();
}

fn bench_full_request(c: &mut Criterion) {
    let engine = Engine::new(catalog());
    let mut group = c.benchmark_group("transform_blocking");

    for (name, language, source) in [
        ("javascript", LanguageVariant::JavaScript, js_module(50)),
        ("python", LanguageVariant::Python, py_module(50)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                engine
                    .transform_blocking(TransformRequest::new(
                        black_box(source.as_str()),
                        language,
                        "aws",
                        "azure",
                    ))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_catalog_compile(c: &mut Criterion) {
    c.bench_function("catalog_compile", |b| b.iter(catalog));
}

criterion_group!(
    benches,
    bench_parsing,
    bench_detection_and_transform,
    bench_full_request,
    bench_catalog_compile
);

criterion_main!(benches);
