use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgsock::{
    encode, message, read_message, record, write_message, Decoded, MessageReader, Registry,
    SendQueue, StreamAssembler,
};
use std::io::Cursor;
use std::sync::Arc;

record! {
    #[derive(Clone)]
    pub struct Reading {
        pub sensor: u32,
        pub value: f64,
    }
}

message! {
    #[derive(Clone)]
    pub struct Telemetry [id = 1] {
        pub timestamp: u64,
        pub source: String,
        pub readings: Vec<Reading>,
    }
}

message! {
    #[derive(Clone)]
    pub struct Chat [id = 2] {
        pub id: u64,
        pub author: String,
        pub body: String,
    }
}

// Test data generation utilities
fn create_chat_messages(count: usize) -> Vec<Chat> {
    (0..count)
        .map(|i| Chat {
            id: i as u64,
            author: format!("client{}", i % 16),
            body: format!("benchmark message number {}", i),
        })
        .collect()
}

fn create_telemetry(count: usize, readings: usize) -> Vec<Telemetry> {
    (0..count)
        .map(|i| Telemetry {
            timestamp: 1_700_000_000 + i as u64,
            source: "sensor-array-north".to_string(),
            readings: (0..readings)
                .map(|r| Reading {
                    sensor: r as u32,
                    value: r as f64 * 0.25,
                })
                .collect(),
        })
        .collect()
}

fn registry() -> Arc<Registry> {
    let registry = Registry::builder()
        .register::<Telemetry>()
        .register::<Chat>()
        .build()
        .unwrap();
    Arc::new(registry)
}

// Benchmark configuration
const SMALL_MESSAGE_COUNT: usize = 100;
const HIGH_FREQUENCY_COUNT: usize = 1000;

fn bench_encode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("encode");

    let chats = create_chat_messages(SMALL_MESSAGE_COUNT);
    let total: usize = chats.iter().map(|m| encode(&registry, m).unwrap().len()).sum();
    group.throughput(Throughput::Bytes(total as u64));
    group.bench_function("chat_100_messages", |b| {
        let mut buffer = Vec::with_capacity(total);
        b.iter(|| {
            buffer.clear();
            for message in &chats {
                write_message(&registry, message, &mut buffer).unwrap();
            }
            black_box(&buffer);
        })
    });

    for readings in [8usize, 128, 1024] {
        let telemetry = create_telemetry(1, readings);
        let size = encode(&registry, &telemetry[0]).unwrap().len();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("telemetry", readings),
            &telemetry[0],
            |b, message| {
                let mut buffer = Vec::with_capacity(size);
                b.iter(|| {
                    buffer.clear();
                    write_message(&registry, message, &mut buffer).unwrap();
                    black_box(&buffer);
                })
            },
        );
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("decode");

    let mut stream = Vec::new();
    for message in create_chat_messages(HIGH_FREQUENCY_COUNT) {
        write_message(&registry, &message, &mut stream).unwrap();
    }
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("read_message_1000_chats", |b| {
        b.iter(|| {
            let mut offset = 0;
            while offset < stream.len() {
                match read_message(&registry, &stream, offset).unwrap() {
                    Decoded::Message { message, consumed } => {
                        black_box(message);
                        offset += consumed;
                    }
                    Decoded::Incomplete(_) => unreachable!(),
                }
            }
        })
    });

    group.bench_function("message_reader_1000_chats", |b| {
        b.iter(|| {
            let mut reader = MessageReader::new(Cursor::new(&stream), registry.clone());
            let mut count = 0;
            reader
                .process_all(|message| {
                    black_box(message);
                    count += 1;
                    Ok(())
                })
                .unwrap();
            assert_eq!(count, HIGH_FREQUENCY_COUNT);
        })
    });
    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("assemble");

    let mut stream = Vec::new();
    for message in create_telemetry(SMALL_MESSAGE_COUNT, 32) {
        write_message(&registry, &message, &mut stream).unwrap();
    }
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for chunk in [7usize, 64, 1460, 65536] {
        group.bench_with_input(BenchmarkId::new("chunked", chunk), &chunk, |b, &chunk| {
            let mut assembler = StreamAssembler::new(registry.clone(), 0);
            b.iter(|| {
                let mut count = 0;
                for piece in stream.chunks(chunk) {
                    assembler.feed(piece, |m| {
                        black_box(m);
                        count += 1;
                    })
                    .unwrap();
                }
                assert_eq!(count, SMALL_MESSAGE_COUNT);
            })
        });
    }
    group.finish();
}

fn bench_send_queue(c: &mut Criterion) {
    let registry = registry();
    let chats = create_chat_messages(SMALL_MESSAGE_COUNT);

    c.bench_function("send_queue_100_chats", |b| {
        let mut queue = SendQueue::new(registry.clone(), 1024);
        b.iter(|| {
            let mut written = 0;
            for message in &chats {
                if let Some(frame) = queue.enqueue(Box::new(message.clone())).unwrap() {
                    written += frame.len();
                }
            }
            while let Some(frame) = queue.complete().unwrap() {
                written += frame.len();
            }
            black_box(written);
        })
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_assemble,
    bench_send_queue
);
criterion_main!(benches);
