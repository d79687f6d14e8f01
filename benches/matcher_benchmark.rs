use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use splat_capture_daemon::domain::{Frame, Roi};
use splat_capture_daemon::matcher::{HashMatcher, HsvMatcher, Matcher, MatcherRegistry};

fn solid_frame(width: u32, height: u32, bgr: [u8; 3]) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..(width * height) {
        data.extend_from_slice(&bgr);
    }
    Frame::new(width, height, data)
}

/// HSV ratio matching at the full-frame ROI sizes §4.1 calls out
/// (1920x1080, and the sub-ROI sizes typical of a HUD element).
fn benchmark_hsv_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hsv_matcher");
    for &(label, width, height) in &[("full_frame", 1920u32, 1080u32), ("hud_roi", 200, 60)] {
        let frame = solid_frame(width, height, [40, 120, 40]);
        let matcher = HsvMatcher {
            roi: Some(Roi { x: 0, y: 0, width, height }),
            mask: None,
            lower: [35, 80, 80],
            upper: [85, 255, 255],
            threshold: 0.5,
        };
        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| black_box(matcher.is_match(frame)));
        });
    }
    group.finish();
}

fn benchmark_hash_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_matcher");
    let frame = solid_frame(1920, 1080, [10, 10, 10]);
    // The reference digest doesn't need to match anything: the benchmark
    // measures `is_match`'s digest-over-the-frame cost, not its verdict.
    let matcher = HashMatcher { roi: None, reference_digest: 0 };
    group.bench_function("full_frame_digest", |b| {
        b.iter(|| black_box(matcher.is_match(&frame)));
    });
    group.finish();
}

/// Throughput of a populated registry's `is_match` dispatch, the hot path
/// the auto-recorder's per-frame standby/recording handlers drive (§4.5).
fn benchmark_registry_dispatch(c: &mut Criterion) {
    let registry = MatcherRegistry::builder()
        .leaf(
            "hud_green",
            Box::new(HsvMatcher {
                roi: Some(Roi { x: 0, y: 0, width: 200, height: 60 }),
                mask: None,
                lower: [35, 80, 80],
                upper: [85, 255, 255],
                threshold: 0.5,
            }),
        )
        .unwrap()
        .build()
        .unwrap();
    let frame = solid_frame(1920, 1080, [40, 120, 40]);

    c.bench_function("registry_is_match", |b| {
        b.iter(|| black_box(registry.is_match("hud_green", &frame).unwrap()));
    });
}

criterion_group!(benches, benchmark_hsv_matcher, benchmark_hash_matcher, benchmark_registry_dispatch);
criterion_main!(benches);
