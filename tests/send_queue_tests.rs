use msgsock::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

mod harness {
    pub mod messages;
}
use harness::messages::*;

fn id_of(registry: &Registry, frame: &[u8]) -> u64 {
    match read_message(registry, frame, 0).unwrap() {
        Decoded::Message { message, consumed } => {
            assert_eq!(consumed, frame.len(), "one frame per write");
            message.downcast::<Hello>().unwrap().id
        }
        Decoded::Incomplete(frame) => panic!("partial frame handed to the transport: {frame:?}"),
    }
}

#[test]
fn submissions_during_a_write_go_out_in_order() {
    let registry = Arc::new(registry());
    let mut queue = SendQueue::new(registry.clone(), 256);
    let mut wire = Vec::new();

    let first = queue.enqueue(Box::new(hello(0))).unwrap().unwrap().to_vec();
    wire.push(id_of(&registry, &first));
    for i in 1..=3 {
        assert!(queue.enqueue(Box::new(hello(i))).unwrap().is_none());
    }
    while let Some(frame) = queue.complete().unwrap() {
        wire.push(id_of(&registry, frame));
    }
    assert_eq!(wire, [0, 1, 2, 3]);
}

#[test]
fn fifo_under_random_completion_timing() {
    let registry = Arc::new(registry());
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let mut queue = SendQueue::new(registry.clone(), 0);
        let mut wire = Vec::new();
        let mut in_flight: Option<u64> = None;
        let mut next = 0u64;

        while next < 100 || in_flight.is_some() {
            let submit = next < 100 && (in_flight.is_none() || rng.gen_bool(0.6));
            if submit {
                let frame = queue.enqueue(Box::new(hello(next))).unwrap();
                match (frame, in_flight) {
                    (Some(frame), None) => in_flight = Some(id_of(&registry, frame)),
                    (None, Some(_)) => {}
                    (frame, in_flight) => panic!(
                        "single-flight violated: frame {:?} while {:?} in flight",
                        frame.map(<[u8]>::len),
                        in_flight
                    ),
                }
                next += 1;
            } else if let Some(done) = in_flight.take() {
                wire.push(done);
                if let Some(frame) = queue.complete().unwrap() {
                    in_flight = Some(id_of(&registry, frame));
                }
            }
        }
        assert_eq!(wire, (0..100).collect::<Vec<_>>());
        assert!(!queue.is_in_flight());
    }
}

#[test]
fn mixed_message_types_share_one_queue() {
    let registry = Arc::new(registry());
    let mut queue = SendQueue::new(registry.clone(), 0);
    let mut frames = Vec::new();

    frames.push(queue.enqueue(Box::new(hello(1))).unwrap().unwrap().to_vec());
    queue.enqueue(Box::new(data(2))).unwrap();
    queue.enqueue(Box::new(data_struct(3))).unwrap();
    while let Some(frame) = queue.complete().unwrap() {
        frames.push(frame.to_vec());
    }

    let discriminators: Vec<u8> = frames.iter().map(|f| f[0]).collect();
    assert_eq!(discriminators, [0, 1, 2]);
}

#[test]
fn failed_write_discards_pending_messages() {
    let registry = Arc::new(registry());
    let mut queue = SendQueue::new(registry, 0);
    queue.enqueue(Box::new(hello(1))).unwrap();
    queue.enqueue(Box::new(hello(2))).unwrap();
    queue.enqueue(Box::new(hello(3))).unwrap();
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.fail(), 2);
    assert!(queue.is_empty());
    assert!(!queue.is_in_flight());
    assert!(queue.complete().unwrap().is_none());
}
