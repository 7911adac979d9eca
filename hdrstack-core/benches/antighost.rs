//! Benchmarks for stack conditioning and anti-ghosting.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use hdrstack_core::{
    auto_remove_ghosts, blend_from_reference, detect_ghosts, normalize_ev, CropRect, ExposureItem,
    ExposureStack, LdrImage, PixelBuffer, PixelData,
};

/// Create a gradient exposure at the given brightness.
fn create_exposure(width: u32, height: u32, brightness: f32) -> LdrImage {
    let mut img = LdrImage::new(width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            let t = 0.1 + 0.8 * (x as f32 / width.max(1) as f32);
            img.set(
                x,
                y,
                [
                    t * brightness,
                    t * brightness * 0.6,
                    t * brightness * 0.3,
                ],
            );
        }
    }
    img
}

/// Build a three-exposure stack with a moving object in the last exposure.
fn create_stack(width: u32, height: u32) -> ExposureStack {
    let mut stack = ExposureStack::new();
    let times = [0.4f32, 0.2, 0.1];
    for (i, &t) in times.iter().enumerate() {
        let mut img = create_exposure(width, height, 1.0 / (i + 1) as f32);
        if i == 2 {
            for y in 0..height / 8 {
                for x in 0..width / 8 {
                    img.set(x, y, [0.1, 0.8, 0.2]);
                }
            }
        }
        stack
            .append(ExposureItem::new(i, t, PixelData::Ldr(img)))
            .unwrap();
    }
    stack
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_ghosts");
    for size in [320u32, 640, 1280] {
        let stack = create_stack(size, size);
        group.throughput(Throughput::Elements(
            (size as u64) * (size as u64) * stack.len() as u64,
        ));
        group.bench_with_input(BenchmarkId::from_parameter(size), &stack, |b, stack| {
            b.iter(|| detect_ghosts(black_box(stack), black_box(0.2)).unwrap());
        });
    }
    group.finish();
}

fn bench_auto_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_remove_ghosts");
    for size in [320u32, 640] {
        group.throughput(Throughput::Elements((size as u64) * (size as u64)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || create_stack(size, size),
                |mut stack| auto_remove_ghosts(black_box(&mut stack), black_box(0.2)).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_manual_blend(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_from_reference");
    for size in [320u32, 640] {
        group.throughput(Throughput::Elements((size as u64) * (size as u64)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let mut stack = create_stack(size, size);
                    stack
                        .mask_mut(2)
                        .unwrap()
                        .fill_rect(&CropRect::new(0, 0, size / 4, size / 4), 255)
                        .unwrap();
                    stack
                },
                |mut stack| blend_from_reference(black_box(&mut stack), black_box(0)).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_normalize_ev(c: &mut Criterion) {
    c.bench_function("normalize_ev", |b| {
        b.iter_batched(
            || {
                let mut stack = ExposureStack::new();
                for (i, ev) in [5.0f32, 15.0, 8.0].iter().enumerate() {
                    stack
                        .append(ExposureItem::new(
                            i,
                            ev.exp2(),
                            PixelData::Ldr(LdrImage::new(64, 64).unwrap()),
                        ))
                        .unwrap();
                }
                stack
            },
            |mut stack| normalize_ev(black_box(&mut stack)).unwrap(),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_detect,
    bench_auto_remove,
    bench_manual_blend,
    bench_normalize_ev
);
criterion_main!(benches);
