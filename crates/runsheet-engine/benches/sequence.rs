use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};

use runsheet_engine::{
    export, Column, ColumnId, Event, EventId, ExportFormat, ExportOptions, Item, ItemId, Owner,
    ReadableTime, Schedule, ScheduleId, Sequence, UserId,
};

fn marathon(items: usize) -> Schedule {
    let start = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let event = Event::new(EventId(1), "Marathon", "marathon", Owner::User(UserId(1)));
    let mut s = Schedule::new(ScheduleId(1), event, "Week", "week", "America/New_York", start);
    s.setup_time = Some(ReadableTime::new(0, 30, 0).unwrap());
    s.columns = vec![
        Column::new(ColumnId(1), 1, "Game"),
        Column::new(ColumnId(2), 2, "Runner"),
        Column::new(ColumnId(3), 3, "Category"),
    ];
    s.items = (0..items)
        .map(|i| {
            Item::new(
                ItemId(i as u64),
                i as u32,
                ReadableTime::from_seconds(600 + (i as u64 * 97) % 5400).unwrap(),
            )
            .with_value(ColumnId(1), format!("Game {i}"))
            .with_value(ColumnId(2), format!("Runner {}", i % 40))
            .with_value(ColumnId(3), "Any%, glitchless")
        })
        .collect();
    s
}

fn bench_sequence(c: &mut Criterion) {
    let s = marathon(1_000);
    c.bench_function("sequence_1000_items", |b| {
        b.iter(|| {
            let seq = Sequence::new(black_box(&s)).unwrap();
            black_box(seq.iter().last())
        })
    });
}

fn bench_exports(c: &mut Criterion) {
    let s = marathon(1_000);
    let options = ExportOptions::default();
    let mut group = c.benchmark_group("export_1000_items");
    for format in ExportFormat::ALL {
        group.bench_function(format.token(), |b| {
            b.iter(|| export(black_box(&s), format, options).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sequence, bench_exports);
criterion_main!(benches);
