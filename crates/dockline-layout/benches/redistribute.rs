//! Benchmarks for insertion and resize redistribution.
//!
//! Run with: cargo bench -p dockline-layout

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dockline_layout::{Layout, LayoutOptions, Location, NullHost, Size};
use std::hint::black_box;

/// Build a layout with `n` cells in alternating split directions.
fn make_layout(n: usize) -> Layout {
    let mut layout = Layout::new(
        Size::new(4000, 3000),
        LayoutOptions::default(),
        Box::new(NullHost::default()),
    );
    let mut previous: Option<String> = None;
    for i in 0..n {
        let frame = format!("frame-{i}");
        let location = match i % 4 {
            0 => Location::Right,
            1 => Location::Bottom,
            2 => Location::Left,
            _ => Location::Top,
        };
        layout
            .insert(&frame, location, previous.as_deref())
            .expect("bench layout insert");
        previous = Some(frame);
    }
    layout
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/insert");
    for n in [2, 8, 16, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(make_layout(n)))
        });
    }
    group.finish();
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/resize");
    for n in [2, 8, 16, 32] {
        let mut layout = make_layout(n);
        let mut grow = false;
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                grow = !grow;
                let size = if grow {
                    Size::new(4400, 3300)
                } else {
                    Size::new(4000, 3000)
                };
                layout.resize(black_box(size));
            })
        });
    }
    group.finish();
}

fn bench_check_sanity(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/check_sanity");
    for n in [8, 32] {
        let layout = make_layout(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(layout.check_sanity()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_resize, bench_check_sanity);
criterion_main!(benches);
