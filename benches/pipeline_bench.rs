//! Reflection pipeline benchmarks
//!
//! Measures the C++ front-end on its own and the full build (front-end,
//! annotation, merge and freeze) over generated translation units.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use declgraph::{CppFrontend, ReflectionPipeline, Settings, TranslationUnit};
use std::hint::black_box;
use std::sync::Arc;

/// A unit with `aggregates` classes, each with fields, bitfields and methods.
fn generate_unit(index: usize, aggregates: usize) -> String {
    let mut code = String::from("namespace bench {\n\nstruct header { int kind; long size; };\n\n");
    for n in 0..aggregates {
        code.push_str(&format!(
            "/// Record {n} of unit {index}.\n\
             class record_{index}_{n} {{\n\
             public:\n\
             \x20   record_{index}_{n}();\n\
             \x20   virtual int compute(int input, const char *label) const;\n\
             \x20   static record_{index}_{n} *create(unsigned count);\n\
             protected:\n\
             \x20   header head;\n\
             \x20   unsigned flags : 4;\n\
             \x20   unsigned mode : 3;\n\
             private:\n\
             \x20   double weights[4];\n\
             \x20   char name[16]; ///< Display name.\n\
             }};\n\n\
             int record_{index}_{n}::compute(int input, const char *label) const {{\n\
             \x20   int scaled = input * 2;\n\
             \x20   static int calls;\n\
             \x20   return scaled + calls;\n\
             }}\n\n"
        ));
    }
    code.push_str("template<typename T, int N = 8>\nstruct pool { T slots[N]; };\n\n");
    code.push_str("template<>\nstruct pool<int, 8> { int slots[8]; };\n\n}\n");
    code
}

fn parse_units(count: usize, aggregates: usize) -> Vec<TranslationUnit> {
    let mut frontend = CppFrontend::new().expect("Failed to create C++ front-end");
    (0..count)
        .map(|index| {
            frontend
                .parse_unit(&format!("unit_{index}.cpp"), &generate_unit(index, aggregates))
                .expect("Failed to parse generated unit")
        })
        .collect()
}

/// Benchmark lowering C++ source into front-end nodes
fn bench_frontend(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpp_frontend");

    for aggregates in [10, 100] {
        let code = generate_unit(0, aggregates);
        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("parse_unit", aggregates),
            &code,
            |b, code| {
                let mut frontend = CppFrontend::new().expect("Failed to create C++ front-end");
                b.iter(|| {
                    let unit = frontend
                        .parse_unit("unit.cpp", black_box(code))
                        .expect("Failed to parse");
                    black_box(unit)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the build from lowered units to a frozen database
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("reflection_pipeline");
    group.sample_size(20);

    for threads in [1, num_cpus::get().max(2)] {
        let units = parse_units(16, 25);
        let mut settings = Settings::default();
        settings.build.parallel_threads = threads;
        let pipeline = ReflectionPipeline::new(Arc::new(settings));

        group.throughput(Throughput::Elements(units.len() as u64));
        group.bench_with_input(BenchmarkId::new("run", threads), &units, |b, units| {
            b.iter(|| {
                let output = pipeline.run(black_box(units.clone())).expect("Build failed");
                black_box(output.database.len())
            });
        });
    }

    group.finish();
}

/// Benchmark queries against a built database
fn bench_queries(c: &mut Criterion) {
    let settings = Settings {
        build: declgraph::config::BuildConfig {
            parallel_threads: 1,
        },
        ..Settings::default()
    };
    let output = ReflectionPipeline::new(Arc::new(settings))
        .run(parse_units(4, 50))
        .expect("Build failed");
    let db = output.database;

    c.bench_function("find_declaration", |b| {
        b.iter(|| {
            let decl = db.find_declaration(black_box("bench::record_3_49::weights"));
            black_box(decl.map(|d| db.layout_of(d)))
        });
    });

    c.bench_function("stats", |b| b.iter(|| black_box(db.stats())));
}

criterion_group!(benches, bench_frontend, bench_pipeline, bench_queries);
criterion_main!(benches);
