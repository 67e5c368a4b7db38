use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use onspd_enrich::ingest::{IngestOptions, Pipeline};
use onspd_enrich::lookup::{LookupTable, LookupTables};
use onspd_enrich::mapping::MappingTable;
use onspd_enrich::report::RunReport;
use tempfile::TempDir;

const HEADER: &str = "pcd,pcds,dointr,doterm,oseast1m,osnrth1m,osgrdind,ctry,oslaua,lat,long";

fn generate_extract(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("onspd.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "{HEADER}").expect("header");
    for i in 0..rows {
        let outward = format!("AB{}", i / 1000);
        let inward = format!("{}{:02}", i % 10, (i / 10) % 100);
        let doterm = if i % 7 == 0 { "201912" } else { "" };
        let northing = if i % 11 == 0 { 0 } else { 170_000 + i % 5000 };
        writeln!(
            file,
            "{outward}{inward},{outward} {inward},198001,{doterm},529090,{northing},1,E92000001,E09000033,51.5{i:05},-0.14{i:05}"
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn lookups() -> LookupTables {
    let mut tables = LookupTables::new();
    tables.insert(
        "countries",
        LookupTable::from_pairs([("E92000001", "England"), ("W92000004", "Wales")]),
    );
    tables.insert(
        "districts",
        LookupTable::from_pairs([("E09000033", "Westminster")]),
    );
    tables
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_extract(50_000);
    let mappings = MappingTable::onspd();
    let lookups = lookups();

    let mut group = c.benchmark_group("process_file");
    for chunk_size in [1_000, 10_000, 50_000] {
        let pipeline = Pipeline::new(
            &mappings,
            &lookups,
            IngestOptions {
                chunk_size,
                ..IngestOptions::default()
            },
        )
        .expect("pipeline");
        group.bench_function(format!("chunk_{chunk_size}"), |b| {
            b.iter_batched(
                RunReport::default,
                |mut report| {
                    pipeline
                        .process_file(&csv_path, &mut report)
                        .expect("process file");
                },
                BatchSize::SmallInput,
            );
        });
    }

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_chunk_sizes);
criterion_main!(benches);
