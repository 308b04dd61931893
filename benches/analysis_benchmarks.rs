//! Benchmarks for crop analysis, recommendations, and GIF encoding.
//!
//! Run with: cargo bench
//! Run with parallel encoding: cargo bench --features rayon
//!
//! All inputs are synthesized in memory; no fixture files are needed.

use std::time::Duration;

use criterion::{BenchmarkId, Criterion};
use gifclip::{
    CropPlanner, Frame, GifAssembler, detect_black_borders, detect_watermark, recommend,
};
use image::{Rgb, RgbImage};

/// A 16:9 picture inside 2.39:1 letterbox bars with a white logo bottom-right.
fn letterboxed_frame(width: u32, height: u32, seed: u32) -> Frame {
    let bar = height / 8;
    let image = RgbImage::from_fn(width, height, |x, y| {
        if y < bar || y >= height - bar {
            return Rgb([0, 0, 0]);
        }
        if x > width * 9 / 10 && y > height * 8 / 10 && y < height - bar {
            return Rgb([250, 250, 250]);
        }
        let value = ((x + y + seed) % 160) as u8 + 40;
        Rgb([value, value / 2, 255 - value])
    });
    Frame::new(image, Duration::from_millis(u64::from(seed) * 100))
}

fn benchmark_border_detection(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("border detection");
    for (width, height) in [(640, 360), (1280, 720), (1920, 1080)] {
        let frame = letterboxed_frame(width, height, 0);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &frame,
            |bencher, frame| bencher.iter(|| detect_black_borders(frame, 30)),
        );
    }
    group.finish();
}

fn benchmark_watermark_detection(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("watermark detection");
    group.sample_size(20);
    for (width, height) in [(640, 360), (1280, 720)] {
        let frame = letterboxed_frame(width, height, 0);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &frame,
            |bencher, frame| bencher.iter(|| detect_watermark(frame, 0.15)),
        );
    }
    group.finish();
}

fn benchmark_crop_planning(criterion: &mut Criterion) {
    let samples: Vec<Frame> = (0..3).map(|i| letterboxed_frame(1280, 720, i * 20)).collect();
    let planner = CropPlanner::new(true, true);

    let mut group = criterion.benchmark_group("crop planning");
    group.sample_size(20);
    group.bench_function("3 samples at 1280x720", |bencher| {
        bencher.iter(|| planner.plan(&samples));
    });
    group.finish();
}

fn benchmark_recommendations(criterion: &mut Criterion) {
    criterion.bench_function("recommend 1920x1080", |bencher| {
        bencher.iter(|| recommend(1920, 1080, 6.0, 10));
    });
}

fn benchmark_gif_encoding(criterion: &mut Criterion) {
    let frames: Vec<Frame> = (0..10).map(|i| letterboxed_frame(640, 360, i)).collect();
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(error) => {
            eprintln!("Skipping benchmark: no temp dir ({error})");
            return;
        }
    };
    let output = dir.path().join("bench.gif");

    let mut group = criterion.benchmark_group("gif encoding");
    group.sample_size(10);
    for colors in [64, 128, 256] {
        let assembler = GifAssembler::new(320, 180, colors, 10);
        group.bench_with_input(
            BenchmarkId::new("10 frames 320x180", colors),
            &assembler,
            |bencher, assembler| {
                bencher.iter(|| assembler.assemble(frames.clone(), &output).unwrap());
            },
        );
    }
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_border_detection,
    benchmark_watermark_detection,
    benchmark_crop_planning,
    benchmark_recommendations,
    benchmark_gif_encoding,
);
criterion::criterion_main!(benches);
