//! Codec benchmarks for beacon-protocol.

use beacon_protocol::{codec, Frame};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

fn stream_event() -> Frame {
    Frame::event(
        "observe",
        "stream:updated",
        json!({"id": "s1", "name": "orders", "stats": {"message_count": 1024}}),
    )
}

fn batch_event(size: usize) -> Frame {
    let messages: Vec<_> = (0..size)
        .map(|i| json!({"id": format!("m{i}"), "key": "orders.created", "seq": i}))
        .collect();
    Frame::event("observe", "messages:upserted", json!({ "messages": messages }))
}

fn bench_encode(c: &mut Criterion) {
    let frame = stream_event();

    let mut group = c.benchmark_group("encode");
    group.bench_function("stream_event", |b| b.iter(|| codec::encode(black_box(&frame))));
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let encoded = codec::encode(&batch_event(64)).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("batch_64", |b| b.iter(|| codec::decode(black_box(&encoded))));
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
