use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;
use stridesync::{
    ActivityMerger, ActivityRecord, EfficiencyAnalyzer, ExportCsvImporter, PlanConfig, Predictor,
    RecordSource,
};

/// Performance benchmarks for the sync pipeline
///
/// Sizes range from a single plan to several years of daily running.

fn create_records(count: usize, source: RecordSource, id_offset: usize) -> Vec<ActivityRecord> {
    let start = NaiveDate::from_ymd_opt(2025, 12, 22).unwrap();
    (0..count)
        .map(|i| ActivityRecord {
            id: Some((i + id_offset).to_string()),
            date: start.checked_add_days(Days::new((i / 2) as u64)).unwrap(),
            name: format!("Run {}", i),
            distance_km: Decimal::new(5000 + (i as i64 % 20) * 500, 3),
            moving_seconds: 1500 + (i as u32 % 20) * 150,
            avg_heart_rate: if i % 5 == 0 { None } else { Some(140.0 + (i % 15) as f64) },
            source,
        })
        .collect()
}

fn create_export_csv(count: usize) -> String {
    let mut content = (0..32).map(|i| format!("c{}", i)).collect::<Vec<_>>().join(",");
    content.push('\n');
    let start = NaiveDate::from_ymd_opt(2025, 12, 22).unwrap();
    for i in 0..count {
        let date = start.checked_add_days(Days::new(i as u64)).unwrap();
        let mut fields = vec![String::new(); 32];
        fields[0] = i.to_string();
        fields[1] = format!("\"{}, 7:00:00 AM\"", date.format("%b %d, %Y"));
        fields[2] = "Easy".to_string();
        fields[3] = if i % 4 == 0 { "Ride" } else { "Run" }.to_string();
        fields[6] = format!("{:.2}", 8.0 + (i % 10) as f64);
        fields[16] = (2400 + i % 600).to_string();
        fields[31] = (140 + i % 20).to_string();
        content.push_str(&fields.join(","));
        content.push('\n');
    }
    content
}

fn bench_export_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("Export Import");
    let importer = ExportCsvImporter::default();

    for &size in &[100, 1000, 10000] {
        let csv = create_export_csv(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("import_reader", size), &csv, |b, csv| {
            b.iter(|| importer.import_reader(black_box(csv.as_bytes())));
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("Merge");

    for &size in &[100, 1000, 10000] {
        let export = create_records(size, RecordSource::Export, 0);
        // Half the API records share ids with the export, half are new
        let api = create_records(size, RecordSource::Api, size / 2);

        group.throughput(Throughput::Elements((size * 2) as u64));
        group.bench_with_input(
            BenchmarkId::new("merge_sources", size),
            &(export, api),
            |b, (export, api)| {
                b.iter(|| ActivityMerger::merge(black_box(export.clone()), black_box(api.clone())));
            },
        );
    }

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Efficiency Analysis");
    let config = PlanConfig::default();
    let analyzer = EfficiencyAnalyzer::new(&config);
    let predictor = Predictor::new(&config);

    for &size in &[50, 250, 1000] {
        let records = create_records(size, RecordSource::Api, 0);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("analyze_and_predict", size), &records, |b, records| {
            b.iter(|| {
                let analysis = analyzer.analyze(black_box(records));
                predictor.predict(&analysis)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_export_import, bench_merge, bench_analysis);
criterion_main!(benches);
