use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lp_otlp_metrics::{Converter, Point, Schema};
use prost::Message;
use std::hint::black_box;

const BOUNDS: [&str; 10] = [
    "0.005", "0.01", "0.025", "0.05", "0.1", "0.25", "0.5", "1", "2.5", "5",
];

// One V1 histogram point per series, each carrying every bucket as a field.
fn v1_points(series: usize) -> Vec<Point> {
    (0..series)
        .map(|i| {
            let mut point = Point::new("http_request_duration_seconds")
                .tag("service.name", "bench")
                .tag("path", format!("/api/{i}"))
                .field("count", 1000.0)
                .field("sum", 123.5)
                .timestamp(1_700_000_000_000_000_000);
            for (n, bound) in BOUNDS.iter().enumerate() {
                point = point.field(*bound, (n as f64 + 1.0) * 90.0);
            }
            point
        })
        .collect()
}

// The same series split into V2 lines, delivered bucket lines first.
fn v2_points(series: usize) -> Vec<Point> {
    let mut points = Vec::with_capacity(series * (BOUNDS.len() + 2));
    for i in 0..series {
        let line = || {
            Point::new("prometheus")
                .tag("service.name", "bench")
                .tag("path", format!("/api/{i}"))
                .timestamp(1_700_000_000_000_000_000)
        };
        for (n, bound) in BOUNDS.iter().enumerate() {
            points.push(
                line()
                    .tag("le", *bound)
                    .field("http_request_duration_seconds_bucket", (n as f64 + 1.0) * 90.0),
            );
        }
        points.push(
            line()
                .tag("le", "+Inf")
                .field("http_request_duration_seconds_bucket", 1000.0),
        );
        points.push(
            line()
                .field("http_request_duration_seconds_count", 1000.0)
                .field("http_request_duration_seconds_sum", 123.5),
        );
    }
    points
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("Histogram_Ingest");
    for series in [10, 100, 1_000] {
        for (schema, points) in [
            (Schema::TelegrafPrometheusV1, v1_points(series)),
            (Schema::TelegrafPrometheusV2, v2_points(series)),
        ] {
            let converter = Converter::new(schema);
            group.throughput(Throughput::Elements(points.len() as u64));
            let id = BenchmarkId::new(schema.name(), format!("{series} series"));
            group.bench_with_input(id, &points, |b, points| {
                b.iter(|| {
                    let mut batch = converter.new_batch();
                    for point in points.iter().cloned() {
                        batch
                            .add_point(point)
                            .expect("benchmark points should convert");
                    }
                    black_box(batch.into_request().encoded_len())
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
