//! Criterion benchmarks for the packet framers and chord decoding.
//!
//! A display at 9600 baud delivers under a thousand bytes per second, so
//! these numbers mostly guard against accidental quadratic behaviour when
//! resynchronising on noisy input.
//!
//! Run with:
//! ```bash
//! cargo bench --package brl-core --bench framer_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use brl_core::keymap::bindings::help_page;
use brl_core::keymap::{Key, KeyMask};
use brl_core::protocol::framer::{CurrentRules, Feed, Framer, HidRules, LegacyRules};
use brl_core::protocol::packets::cells_packet;

// ── Input fixtures ────────────────────────────────────────────────────────────

fn key_stream(repeats: usize) -> Vec<u8> {
    [0x71, 0x01, 0x71, 0x03, 0x72, 0x10, 0x72, 0x90, 0x71, 0x83, 0x71, 0x81].repeat(repeats)
}

fn configuration_stream(repeats: usize) -> Vec<u8> {
    let mut packet = vec![0x7F, 0x0B, 0x7E, 0x08];
    packet.extend(std::iter::repeat(0x7E).take(16));
    packet.repeat(repeats)
}

fn noisy_stream(repeats: usize) -> Vec<u8> {
    [0x20, 0x1B, b'I', b'X', 0x9F, 0x7F, 0x07, 0x00, 0x71, 0x02].repeat(repeats)
}

fn count_packets<R: brl_core::protocol::framer::FrameRules>(framer: &mut Framer<R>, bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&byte| matches!(framer.feed(byte), Feed::Complete(_))).count()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_current_framer(c: &mut Criterion) {
    let mut group = c.benchmark_group("current_framer");
    for (name, stream) in [
        ("keys", key_stream(100)),
        ("configuration", configuration_stream(60)),
        ("noise", noisy_stream(100)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &stream, |b, stream| {
            b.iter(|| {
                let mut framer = Framer::new(CurrentRules);
                count_packets(&mut framer, black_box(stream))
            })
        });
    }
    group.finish();
}

fn bench_legacy_and_hid_framers(c: &mut Criterion) {
    let legacy: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    c.bench_function("legacy_framer", |b| {
        b.iter(|| count_packets(&mut Framer::new(LegacyRules), black_box(&legacy)))
    });

    let hid = [0x04, 0x00, 0x73, 0x04, 0x00, 0xF3].repeat(500);
    c.bench_function("hid_framer", |b| {
        b.iter(|| count_packets(&mut Framer::new(HidRules), black_box(&hid)))
    });
}

fn bench_chord_lookup(c: &mut Criterion) {
    let page = help_page(1);
    let chords: Vec<KeyMask> = Key::ALL.iter().map(|key| key.mask() | Key::Home).collect();
    c.bench_function("chord_lookup_page_1", |b| {
        b.iter(|| chords.iter().filter(|&&chord| page.on_press(black_box(chord)).is_some()).count())
    });
}

fn bench_cells_packet(c: &mut Criterion) {
    let cells = [0xFFu8; 80];
    c.bench_function("cells_packet_80", |b| b.iter(|| cells_packet(black_box(5), black_box(&cells))));
}

criterion_group!(
    benches,
    bench_current_framer,
    bench_legacy_and_hid_framers,
    bench_chord_lookup,
    bench_cells_packet
);
criterion_main!(benches);
