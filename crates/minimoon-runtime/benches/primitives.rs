//! Benchmarks for array growth and string building

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use minimoon_runtime::{ByteString, Runtime, ToByteString, TypedBuffer};

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");

    group.bench_function("typed_buffer_10k", |b| {
        b.iter(|| {
            let mut buffer = TypedBuffer::with_fill(0, 0i32).unwrap();
            for i in 0..10_000 {
                buffer.push(black_box(i)).unwrap();
            }
            black_box(buffer.len());
        });
    });

    group.bench_function("runtime_handle_10k", |b| {
        let rt = Runtime::new();
        b.iter(|| {
            let arr = rt.make_array(0, 0i32).unwrap();
            for i in 0..10_000 {
                rt.array_push(arr, black_box(i)).unwrap();
            }
            rt.release(arr).unwrap();
        });
    });

    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");

    let hello = ByteString::from_bytes(b"hello, ").unwrap();
    let world = ByteString::from_bytes(b"world").unwrap();

    group.bench_function("concat_short", |b| {
        b.iter(|| black_box(ByteString::concat(black_box(&hello), black_box(&world)).unwrap()));
    });

    group.bench_function("int_to_string", |b| {
        b.iter(|| black_box(black_box(-123_456i32).to_byte_string()));
    });

    group.bench_function("double_to_string", |b| {
        b.iter(|| black_box(black_box(6.02214076e23f64).to_byte_string()));
    });

    group.finish();
}

criterion_group!(benches, bench_push, bench_strings);
criterion_main!(benches);
