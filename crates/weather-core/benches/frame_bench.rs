//! Criterion benchmarks for the hot paths of the modem bridge and the log.
//!
//! Every inbound notification is classified and parsed on the single service
//! task, so these bound how long one frame blocks the next.
//!
//! Run with:
//! ```bash
//! cargo bench --package weather-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weather_core::{
    classify, parse_notification, CircularLog, LogGeometry, ManualClock, MemoryEeprom, RxFrame,
    SAMPLE_WIDTH,
};

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn data_frame() -> RxFrame {
    RxFrame::complete(b"0,CONNECT\r\n\r\n+IPD,0,12:{\"index\": 7}".to_vec())
}

fn ok_frame() -> RxFrame {
    RxFrame::complete(b"AT+CIPSEND=0,120\r\r\nOK\r\n> ".to_vec())
}

fn noise_frame(len: usize) -> RxFrame {
    RxFrame::complete(vec![b'x'; len])
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let ok = ok_frame();
    group.bench_function("ok_response", |b| b.iter(|| classify(black_box(&ok))));
    for len in [32usize, 199] {
        let frame = noise_frame(len);
        group.bench_with_input(BenchmarkId::new("no_match", len), &frame, |b, f| {
            b.iter(|| classify(black_box(f)))
        });
    }
    group.finish();
}

fn bench_parse_notification(c: &mut Criterion) {
    let frame = data_frame();
    c.bench_function("parse_notification/data", |b| {
        b.iter(|| parse_notification(black_box(&frame)))
    });
}

fn bench_log(c: &mut Criterion) {
    let mut log: CircularLog<_, _, SAMPLE_WIDTH> = match CircularLog::new(
        MemoryEeprom::new(1024),
        ManualClock::default(),
        LogGeometry::for_medium(1024),
    ) {
        Ok(log) => log,
        Err(e) => panic!("bench geometry invalid: {e}"),
    };
    if let Err(e) = log.init() {
        panic!("bench init failed: {e}");
    }

    c.bench_function("circular_log/append", |b| {
        b.iter(|| log.append(black_box(&[21u8, 55, 80])))
    });
    c.bench_function("circular_log/read_by_index", |b| {
        b.iter(|| log.read_by_index(black_box(50)))
    });
}

criterion_group!(benches, bench_classify, bench_parse_notification, bench_log);
criterion_main!(benches);
