//! Performance benchmarks for codesnap
//!
//! Run with: cargo bench

use codesnap::cancel::CancellationToken;
use codesnap::config::EngineConfig;
use codesnap::contents::{FileContents, split_into_pieces};
use codesnap::engine::{IndexServer, SearchParams};
use codesnap::paths::DirectoryName;
use codesnap::project::FileProjectDiscovery;
use codesnap::search::bndm::Bndm;
use codesnap::search::compiled::compile_search;
use codesnap::search::horspool::Horspool;
use codesnap::search::{SearchOptions, SearchProgress};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

fn sample_source(i: usize) -> String {
    format!(
        r#"// File {i}
fn function_{i}() {{
    println!("Hello from function {i}");
    let x = {i} * 2;
    let y = x + 1;
}}

struct Struct{i} {{
    field: i32,
    name: String,
}}

impl Struct{i} {{
    fn new() -> Self {{
        Self {{ field: {i}, name: "test".to_string() }}
    }}
}}
"#
    )
}

/// A project with sample files, indexed by a fresh server.
fn create_benchmark_server() -> (TempDir, PathBuf, IndexServer) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root_path = fs::canonicalize(temp_dir.path()).expect("Failed to canonicalize");
    fs::write(root_path.join("codesnap.project"), "").expect("Failed to write project file");

    for dir in 0..10 {
        let dir_path = root_path.join(format!("module_{dir}"));
        fs::create_dir_all(&dir_path).expect("Failed to create dir");
        for i in 0..50 {
            fs::write(dir_path.join(format!("file_{i}.rs")), sample_source(dir * 50 + i))
                .expect("Failed to write file");
        }
    }

    let server = IndexServer::new(EngineConfig::default(), Arc::new(FileProjectDiscovery::new()));
    server.register_root(&root_path).expect("Failed to register root");
    server.wait_until_idle();
    (temp_dir, root_path, server)
}

fn bench_literal_matchers(c: &mut Criterion) {
    let text: String = (0..2000).map(sample_source).collect();
    let bytes = text.as_bytes();
    let mut group = c.benchmark_group("literal");

    for pattern in ["field", "Hello from function", "name: \"test\".to_string()"] {
        if let Some(bndm) = Bndm::new(pattern.as_bytes(), false) {
            group.bench_with_input(BenchmarkId::new("bndm", pattern), bytes, |b, text| {
                b.iter(|| {
                    let mut count = 0;
                    bndm.find_all(black_box(text), |_| count += 1);
                    count
                })
            });
        }
        if let Some(horspool) = Horspool::new(pattern.as_bytes(), false) {
            group.bench_with_input(BenchmarkId::new("horspool", pattern), bytes, |b, text| {
                b.iter(|| {
                    let mut count = 0;
                    horspool.find_all(black_box(text), |_| count += 1);
                    count
                })
            });
        }
    }
    group.finish();
}

fn bench_compiled_piece(c: &mut Criterion) {
    let text: String = (0..2000).map(sample_source).collect();
    let contents = Arc::new(FileContents::from_bytes(text.into_bytes(), SystemTime::now(), 8192));
    let name = DirectoryName::new_root("/bench").child_file("big.rs");
    let pieces = split_into_pieces(0, &name, &contents, 100 * 1024);
    let progress = SearchProgress::new(CancellationToken::noop());

    let mut group = c.benchmark_group("compiled");
    let cases = [
        ("literal", "struct", SearchOptions::default()),
        (
            "whole_word",
            "field",
            SearchOptions {
                match_whole_word: true,
                ..SearchOptions::default()
            },
        ),
        (
            "regex",
            r"fn \w+_\d+\(",
            SearchOptions {
                use_regex: true,
                ..SearchOptions::default()
            },
        ),
    ];
    for (label, pattern, options) in cases {
        let search = compile_search(pattern, &options).expect("valid pattern");
        group.bench_function(label, |b| {
            b.iter(|| {
                pieces
                    .iter()
                    .map(|piece| search.find_all(piece, &progress).len())
                    .sum::<usize>()
            })
        });
    }
    group.finish();
}

fn bench_server_search(c: &mut Criterion) {
    let (_temp, _root, server) = create_benchmark_server();
    let mut group = c.benchmark_group("server");

    for query in ["println", "Struct42", "name"] {
        group.bench_with_input(BenchmarkId::new("contents", query), query, |b, query| {
            let params = SearchParams::new(query);
            b.iter(|| server.search_file_contents(black_box(&params)))
        });
    }
    group.finish();
}

fn bench_full_index(c: &mut Criterion) {
    c.bench_function("index_500_files", |b| {
        b.iter(|| {
            let (_temp, _root, server) = create_benchmark_server();
            server.current_database().searchable_file_count()
        })
    });
}

criterion_group!(
    benches,
    bench_literal_matchers,
    bench_compiled_piece,
    bench_server_search,
    bench_full_index
);
criterion_main!(benches);
