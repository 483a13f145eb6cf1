//! Benchmark tests for kino-heartbeat operations
//!
//! Run with: cargo bench -p kino-heartbeat

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;

use kino_heartbeat::chapters::ChapterTable;
use kino_heartbeat::manifest::{dash_frame_rate, hls_frame_rate};
use kino_heartbeat::testing::ScriptedPlayer;
use kino_heartbeat::tracking::RecordingTracker;
use kino_heartbeat::{
    Bridge, EventKind, PlayerEvent, Projections, SourceDescriptor, TimelineMarker,
    TrackingConfig,
};

// ============================================================================
// Helpers
// ============================================================================

fn generate_markers(count: usize) -> Vec<TimelineMarker> {
    (0..count)
        .map(|i| TimelineMarker::new(i as f64 * 30.0, format!("Chapter {}", i + 1)))
        .collect()
}

/// HLS master playlist with N variants declaring frame rates
fn generate_hls_master(variant_count: usize) -> String {
    let mut m3u8 = String::from("#EXTM3U\n");
    let bandwidths = [400_000u64, 800_000, 1_400_000, 2_800_000, 5_000_000, 7_500_000];
    let rates = ["23.976", "25.000", "29.970", "30.000", "50.000", "59.940"];

    for i in 0..variant_count {
        let idx = i % bandwidths.len();
        m3u8.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},CODECS=\"avc1.640028,mp4a.40.2\",FRAME-RATE={}\n",
            bandwidths[idx], rates[idx]
        ));
        m3u8.push_str(&format!("variant_{}/playlist.m3u8\n", i));
    }

    m3u8
}

/// MPD with N video representations
fn generate_mpd(representation_count: usize) -> String {
    let mut mpd = String::from(
        "<?xml version=\"1.0\"?>\n<MPD xmlns=\"urn:mpeg:dash:schema:mpd:2011\">\n<Period>\n<AdaptationSet mimeType=\"video/mp4\">\n",
    );
    for i in 0..representation_count {
        let rate = if i % 2 == 0 { "30000/1001" } else { "25" };
        mpd.push_str(&format!(
            "<Representation id=\"v{}\" bandwidth=\"{}\" frameRate=\"{}\"/>\n",
            i,
            400_000 * (i + 1),
            rate
        ));
    }
    mpd.push_str("</AdaptationSet>\n</Period>\n</MPD>\n");
    mpd
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_chapter_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chapter Lookup");

    for &count in &[4, 16, 64] {
        let table = ChapterTable::from_markers(&generate_markers(count));
        let end = count as f64 * 30.0;

        group.bench_with_input(BenchmarkId::new("locate", count), &table, |b, table| {
            b.iter(|| {
                let mut hits = 0;
                let mut time = 0.0;
                while time < end {
                    if table.locate(black_box(time)).is_some() {
                        hits += 1;
                    }
                    time += 0.25;
                }
                black_box(hits)
            });
        });
    }

    group.finish();
}

fn bench_frame_rate_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame Rate Scan");

    for &count in &[3, 12, 40] {
        let master = generate_hls_master(count);
        group.bench_with_input(
            BenchmarkId::new("hls", format!("{}_variants", count)),
            &master,
            |b, master| b.iter(|| black_box(hls_frame_rate(black_box(master)).ok())),
        );

        let mpd = generate_mpd(count);
        group.bench_with_input(
            BenchmarkId::new("dash", format!("{}_representations", count)),
            &mpd,
            |b, mpd| b.iter(|| black_box(dash_frame_rate(black_box(mpd)).ok())),
        );
    }

    group.finish();
}

fn bench_session_replay(c: &mut Criterion) {
    c.bench_function("session_replay", |b| {
        b.iter(|| {
            let player = Rc::new(ScriptedPlayer::new());
            player.set_duration(300.0);
            player.set_markers(generate_markers(10));
            player.set_source(SourceDescriptor::titled("Bench"));

            let tracker = RecordingTracker::new();
            let bridge = Bridge::attach(
                TrackingConfig::new("metrics.example.com"),
                player.clone(),
                Projections::new(),
                tracker.clone(),
            )
            .unwrap();

            player.emit(EventKind::Playing);
            for second in 0..300 {
                player.emit(PlayerEvent::time_changed(second as f64));
                if second % 60 == 0 {
                    player.emit(EventKind::Seek);
                    player.emit(EventKind::Seeked);
                    player.emit(EventKind::Playing);
                }
            }
            player.emit(EventKind::PlaybackFinished);
            bridge.teardown();
            black_box(tracker.count())
        });
    });
}

criterion_group!(
    projection_benches,
    bench_chapter_lookup,
    bench_frame_rate_scan,
);

criterion_group!(
    bridge_benches,
    bench_session_replay,
);

criterion_main!(projection_benches, bridge_benches);
