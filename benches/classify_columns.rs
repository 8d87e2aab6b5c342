use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use survey_prep::classify::classify_frame;
use survey_prep::frame::Frame;

/// Synthetic survey table with one column per classification outcome:
/// plain numbers, grouped numbers, categories, links, dates, and long text.
fn survey_rows(rows: usize) -> (Vec<String>, Vec<Vec<String>>) {
    let headers: Vec<String> = ["respondent", "city", "population", "homepage", "visited", "essay"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut records = Vec::with_capacity(rows);
    for i in 0..rows {
        let city = match i % 4 {
            0 => "Lima",
            1 => "Cusco",
            2 => "Iquitos",
            _ => "Arequipa",
        };
        records.push(vec![
            i.to_string(),
            city.to_string(),
            format!("{},{:03}", (i % 900) + 100, i % 1000),
            format!("www.site{i}.org"),
            format!("2023-{:02}-{:02}", (i / 28) % 12 + 1, i % 28 + 1),
            format!("free text answer number {i} with a little variation"),
        ]);
    }
    (headers, records)
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_frame");

    for rows in [1_000usize, 10_000] {
        let (headers, records) = survey_rows(rows);
        let frame = Frame::from_records(&headers, &records);
        group.bench_function(BenchmarkId::new("full_pass", rows), |b| {
            b.iter_batched(
                || frame.clone(),
                |mut frame| {
                    classify_frame(&mut frame);
                },
                BatchSize::SmallInput,
            );
        });
    }

    let (headers, records) = survey_rows(1_000);
    let mut tagged = Frame::from_records(&headers, &records);
    classify_frame(&mut tagged);
    group.bench_function("short_circuit", |b| {
        b.iter_batched(
            || tagged.clone(),
            |mut frame| {
                classify_frame(&mut frame);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
