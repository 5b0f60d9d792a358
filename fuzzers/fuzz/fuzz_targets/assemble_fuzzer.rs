#![no_main]
use libfuzzer_sys::fuzz_target;
use msgsock::{message, record, MessageReader, Registry, StreamAssembler};
use std::io::Cursor;
use std::sync::Arc;

record! {
    pub struct Point {
        pub x: f32,
        pub y: f32,
    }
}

message! {
    pub struct Text [id = 0] {
        pub id: u64,
        pub body: Option<String>,
        pub tags: Option<Vec<String>>,
    }
}

message! {
    pub struct Shape [id = 1] {
        pub points: Vec<Point>,
        pub closed: bool,
        pub letter: char,
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(registry) = Registry::builder()
        .register::<Text>()
        .register::<Shape>()
        .build()
    else {
        return;
    };
    let registry = Arc::new(registry);

    // Split on the first byte so that carries get exercised too.
    let split = data.first().map_or(0, |b| *b as usize).min(data.len());
    let mut assembler = StreamAssembler::new(registry.clone(), 0);
    if assembler.feed(&data[..split], |_| {}).is_ok() {
        let _ = assembler.feed(&data[split..], |_| {});
    }

    let mut reader = MessageReader::new(Cursor::new(data), registry);
    let _ = reader.process_all(|_| Ok(()));
});
