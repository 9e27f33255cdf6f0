use criterion::{black_box, BatchSize, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};
use serde_json::{json, Value};

use audit_replay::record::decode_line;
use audit_replay::{Record, RecordSchema, StateAccumulator, Timestamp};

const RECORDS_PER_ITER: usize = 10_000;

fn records(fields: usize) -> Vec<Record> {
    let start = Timestamp::parse("2016-01-09T00:00").expect("start");
    (0..RECORDS_PER_ITER)
        .map(|i| {
            let at = Timestamp::new(
                start.as_primitive() + time::Duration::milliseconds(i as i64 * 250),
            );
            let mut update = serde_json::Map::new();
            update.insert(format!("field{}", i % fields), json!(i));
            Record::new(at, update)
        })
        .collect()
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold");
    let target = Timestamp::parse("2016-01-10T00:00").expect("target");
    for &fields in &[8_usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(fields), &fields, |b, &fields| {
            b.iter_batched(
                || records(fields),
                |records| {
                    let mut acc = StateAccumulator::new(target);
                    for record in records {
                        acc.fold(black_box(record));
                    }
                    acc.applied()
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let schema = RecordSchema::default();
    let line: Value = json!({
        "changeTime": "2016-07-05T01:16:00.001282",
        "after": {"ambientTemp": 87.0, "lastAlertTs": "2016-07-05T01:16:00.001282"},
        "before": {"ambientTemp": 85.0},
    });
    let line = serde_json::to_string(&line).expect("encode");
    c.bench_function("decode_line", |b| {
        b.iter(|| decode_line(black_box(line.as_bytes()), &schema).expect("decode"))
    });
}

criterion_group!(benches, bench_fold, bench_decode);
criterion_main!(benches);
