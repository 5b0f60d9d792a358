use honggfuzz::fuzz;
use msgsock::{message, MessageReader, Registry};
use std::io::Cursor;
use std::sync::Arc;

message! {
    pub struct Text [id = 0] {
        pub id: u64,
        pub body: Option<String>,
        pub samples: Option<Vec<f64>>,
    }
}

fn main() {
    let registry = match Registry::builder().register::<Text>().build() {
        Ok(registry) => Arc::new(registry),
        Err(e) => panic!("registry: {e}"),
    };
    loop {
        fuzz!(|data: &[u8]| {
            let mut reader = MessageReader::new(Cursor::new(data), registry.clone());
            let _ = reader.process_all(|_| Ok(()));
        });
    }
}
