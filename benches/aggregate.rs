use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use sales_report::aggregate::{summarize_by_month, summarize_by_product};
use sales_report::columns::resolve_columns;
use sales_report::input::{InputOptions, load_table};
use sales_report::normalize::normalize_rows;
use tempfile::TempDir;

const PRODUCTS: &[&str] = &[
    "Camiseta", "Tênis", "Bermuda", "Meia", "Boné", "Jaqueta", "Calça", "Vestido",
];

fn generate_sales(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("sales.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "date,product,quantity,price").expect("header");
    for i in 0..rows {
        let month = (i % 12) + 1;
        let day = (i % 28) + 1;
        let product = PRODUCTS[i % PRODUCTS.len()];
        let quantity = (i % 7) + 1;
        let cents = 990 + (i % 50) * 100;
        writeln!(
            file,
            "2024-{month:02}-{day:02},{product},{quantity},{}.{:02}",
            cents / 100,
            cents % 100
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_pipeline(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_sales(50_000);
    let table = load_table(&csv_path, &InputOptions::default()).expect("load table");
    let columns = resolve_columns(&table.columns).expect("resolve columns");
    let rows = normalize_rows(&table, &columns).expect("normalize rows");

    let mut group = c.benchmark_group("sales_pipeline");

    group.bench_function("load_csv", |b| {
        b.iter(|| load_table(&csv_path, &InputOptions::default()).expect("load table"));
    });

    group.bench_function("normalize", |b| {
        b.iter(|| normalize_rows(&table, &columns).expect("normalize rows"));
    });

    group.bench_function("summarize_by_product", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| summarize_by_product(&rows),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("summarize_by_month", |b| {
        b.iter(|| summarize_by_month(&rows));
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
