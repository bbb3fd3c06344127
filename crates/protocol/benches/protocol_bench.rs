use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tidekv_protocol::{Command, Reply};

fn bench_parse_get_command(c: &mut Criterion) {
    c.bench_function("parse_get_command", |b| {
        b.iter(|| Command::from_line(black_box(b"GET mykey".as_slice())).unwrap())
    });
}

fn bench_parse_set_multiword(c: &mut Criterion) {
    let line = b"SET mykey the quick brown fox jumps over the lazy dog".as_slice();

    c.bench_function("parse_set_multiword", |b| {
        b.iter(|| Command::from_line(black_box(line)).unwrap())
    });
}

fn bench_parse_set_1kb(c: &mut Criterion) {
    let line = format!("SET mykey {}", "x".repeat(1024));

    c.bench_function("parse_set_1kb", |b| {
        b.iter(|| Command::from_line(black_box(line.as_bytes())).unwrap())
    });
}

fn bench_encode_integer(c: &mut Criterion) {
    let reply = Reply::Integer(1_234_567);

    c.bench_function("encode_integer", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(64);
            black_box(&reply).encode(&mut buf);
            buf
        })
    });
}

fn bench_encode_bulk_1kb(c: &mut Criterion) {
    let reply = Reply::Bulk(Bytes::from(vec![b'x'; 1024]));

    c.bench_function("encode_bulk_1kb", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(2048);
            black_box(&reply).encode(&mut buf);
            buf
        })
    });
}

criterion_group!(
    benches,
    bench_parse_get_command,
    bench_parse_set_multiword,
    bench_parse_set_1kb,
    bench_encode_integer,
    bench_encode_bulk_1kb,
);
criterion_main!(benches);
