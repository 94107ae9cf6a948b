// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for keyscribe
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Raw message decoding on the callback path
//! - Note-on/note-off correlation throughput
//! - Notation synthesis for long takes
//! - Standard MIDI file export

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keyscribe::midi::RawEvent;
use keyscribe::notation::{bucket_duration, spell_pitch};
use keyscribe::recording::{CompletedNote, MidiExporter, NoteCapture};
use keyscribe::synthesize;

/// Overlapping notes across the keyboard, like a busy two-handed passage
fn performance_events(count: usize) -> Vec<RawEvent> {
    let mut events = Vec::with_capacity(count * 2);
    for i in 0..count {
        let pitch = 36 + (i * 7 % 48) as u8;
        let start = i as u64 * 120;
        events.push(RawEvent::note_on(pitch, 64 + (i % 60) as u8, start));
        events.push(RawEvent::note_off(pitch, start + 90 + (i as u64 % 5) * 200));
    }
    events.sort_by_key(|e| e.timestamp);
    events
}

fn performance_notes(count: usize) -> Vec<CompletedNote> {
    (0..count)
        .map(|i| CompletedNote::new(36 + (i % 48) as u8, 100, i as u64 * 150, 100 + (i as u64 % 8) * 250))
        .collect()
}

/// Benchmark raw message decoding (device callback)
fn bench_decode(c: &mut Criterion) {
    let messages: [[u8; 3]; 4] = [[0x90, 60, 100], [0x80, 60, 0], [0x90, 60, 0], [0xB0, 64, 127]];

    c.bench_function("decode_messages", |b| {
        b.iter(|| {
            let mut decoded = 0;
            for message in &messages {
                if RawEvent::decode(black_box(message), 0).is_some() {
                    decoded += 1;
                }
            }
            black_box(decoded)
        })
    });
}

/// Benchmark the capture correlator
fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture");

    for size in [100, 1000, 10000].iter() {
        let events = performance_events(*size);
        group.bench_with_input(BenchmarkId::new("correlate", size), &events, |b, events| {
            b.iter(|| {
                let mut capture = NoteCapture::new(0);
                for event in events {
                    capture.on_event(*event);
                }
                black_box(capture.finish(u64::MAX).len())
            })
        });
    }

    group.finish();
}

/// Benchmark pitch spelling and duration bucketing
fn bench_quantization(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantization");

    group.bench_function("spell_all_pitches", |b| {
        b.iter(|| {
            let mut total = 0;
            for pitch in 0..=127u8 {
                total += spell_pitch(black_box(pitch)).len();
            }
            black_box(total)
        })
    });

    group.bench_function("bucket_durations", |b| {
        b.iter(|| {
            let mut total = 0u32;
            for ms in (0..4000u64).step_by(7) {
                total += bucket_duration(black_box(ms)) as u32;
            }
            black_box(total)
        })
    });

    group.finish();
}

/// Benchmark document synthesis
fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");

    for size in [10, 100, 1000].iter() {
        let notes = performance_notes(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &notes, |b, notes| {
            b.iter(|| black_box(synthesize(notes).as_str().len()))
        });
    }

    group.finish();
}

/// Benchmark Standard MIDI file export
fn bench_export(c: &mut Criterion) {
    let exporter = MidiExporter::new();
    let mut group = c.benchmark_group("smf_export");

    for size in [10, 100, 1000].iter() {
        let notes = performance_notes(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &notes, |b, notes| {
            b.iter(|| black_box(exporter.export_to_bytes(notes).len()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_capture,
    bench_quantization,
    bench_synthesize,
    bench_export,
);

criterion_main!(benches);
