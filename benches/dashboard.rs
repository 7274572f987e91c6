//! 看板计算性能基准测试

use std::hint::black_box;

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};

use funnelboard::services::dashboard::{Dataset, build_dashboard};
use funnelboard::services::enrichment::{ContactDirectory, enrich_rows};
use funnelboard::services::{DashboardFilter, DashboardQuery, DashboardSettings, DashboardSnapshot};
use funnelboard::storage::{
    CodeInputEvent, CodeOpen, ContactRecord, FieldsFilledSnapshot, RawSubmission, RowId,
};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn contacts(prefix: &str, n: usize) -> Vec<ContactRecord> {
    (0..n)
        .map(|i| ContactRecord {
            code: format!("{prefix}{i}"),
            name: Some(format!("Customer {i}")),
            email: Some(format!("customer{i}@example.com")),
            phone: (i % 3 == 0).then(|| format!("555-{i:04}")),
        })
        .collect()
}

/// 事件数约为 `codes` 的若干倍，分布在 30 天内
fn snapshot(codes: usize) -> DashboardSnapshot {
    let start = base_time();
    let code = |i: usize| {
        if i % 2 == 0 {
            format!("D{}", i % codes)
        } else {
            format!("R{}", i % codes)
        }
    };
    let ts = |i: usize| start + Duration::minutes((i * 37 % (30 * 24 * 60)) as i64);

    let opens = (0..codes * 4)
        .map(|i| CodeOpen {
            code: code(i),
            opened_at: ts(i),
        })
        .collect();
    let input_events = (0..codes * 10)
        .map(|i| CodeInputEvent {
            id: RowId::Int(i as i64),
            code: code(i),
            field_name: ["name", "email", "phone", "from_zip"][i % 4].to_string(),
            input_value: Some(format!("value {i}")),
            changed_at: ts(i),
        })
        .collect();
    let fields_filled = (0..codes)
        .map(|i| FieldsFilledSnapshot {
            id: RowId::Int(i as i64),
            code: code(i),
            filled_at: ts(i),
            field_snapshot: Value::Null,
        })
        .collect();
    let submissions = (0..codes / 2)
        .map(|i| RawSubmission {
            id: RowId::Int(i as i64),
            code: code(i),
            submitted_at: ts(i),
            submission_snapshot: Some(json!({"full_name": "Blob", "move_size": "2br"})),
            name: None,
            email: None,
            phone: None,
            from_zip: Some(json!("10001")),
            to_zip: None,
            move_date: None,
            move_size: None,
            has_discount: Some(Value::Bool(i % 2 == 0)),
        })
        .collect();

    DashboardSnapshot {
        discounts: Dataset::ok(contacts("D", codes)),
        referrals: Dataset::ok(contacts("R", codes)),
        opens: Dataset::ok(opens),
        input_events: Dataset::ok(input_events),
        fields_filled: Dataset::ok(fields_filled),
        submissions: Dataset::ok(submissions),
    }
}

fn bench_build_dashboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("dashboard/build");
    let settings = DashboardSettings::default();
    let now = base_time() + Duration::days(30);

    for codes in [100usize, 1_000, 5_000] {
        let data = snapshot(codes);
        group.throughput(Throughput::Elements((codes * 15) as u64));

        let unfiltered = DashboardQuery::default();
        let unfiltered_filter = DashboardFilter::from_query(&unfiltered, settings.offset).unwrap();
        group.bench_with_input(BenchmarkId::new("unfiltered", codes), &data, |b, data| {
            b.iter(|| build_dashboard(black_box(data), &unfiltered, &unfiltered_filter, &settings, now));
        });

        let filtered = DashboardQuery {
            from: Some("2024-03-05".to_string()),
            to: Some("2024-03-12".to_string()),
            code: Some("d1".to_string()),
            events_filter: Some("email".to_string()),
            ..Default::default()
        };
        let filtered_filter = DashboardFilter::from_query(&filtered, settings.offset).unwrap();
        group.bench_with_input(BenchmarkId::new("filtered", codes), &data, |b, data| {
            b.iter(|| build_dashboard(black_box(data), &filtered, &filtered_filter, &settings, now));
        });
    }

    group.finish();
}

fn bench_enrichment(c: &mut Criterion) {
    let mut group = c.benchmark_group("dashboard/enrich_rows");

    for codes in [1_000usize, 10_000] {
        let discounts = contacts("D", codes);
        let referrals = contacts("R", codes);
        let data = snapshot(codes);
        group.throughput(Throughput::Elements(data.opens.rows.len() as u64));

        group.bench_function(BenchmarkId::from_parameter(codes), |b| {
            b.iter(|| {
                let directory = ContactDirectory::build(&discounts, &referrals);
                enrich_rows(black_box(data.opens.rows.clone()), &directory)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_dashboard, bench_enrichment);
criterion_main!(benches);
