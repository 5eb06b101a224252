//! Bus ordering tests: global FIFO across producer threads and the
//! non-blocking empty pop.

use std::sync::Arc;
use std::thread;

use broker::{Address, Bus, Message};

fn data(tag: u8, seq: u32) -> Message {
    let mut payload = vec![tag];
    payload.extend_from_slice(&seq.to_le_bytes());
    Message::Data {
        src: Address::local(2),
        dest: Address::local(3),
        payload,
    }
}

fn unpack(msg: &Message) -> (u8, u32) {
    let Message::Data { payload, .. } = msg else {
        panic!("expected data message");
    };
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&payload[1..5]);
    (payload[0], u32::from_le_bytes(buf))
}

#[test]
fn single_thread_fifo() {
    let bus = Bus::new();
    for seq in 0..5 {
        bus.push(data(0, seq));
    }
    for seq in 0..5 {
        let msg = bus.pop().expect("pop");
        assert_eq!(unpack(&msg), (0, seq));
    }
    assert!(bus.pop().is_none());
}

#[test]
fn empty_pop_never_blocks_or_errors() {
    let bus = Bus::new();
    assert!(bus.pop().is_none());
    assert!(bus.is_empty());
}

#[test]
fn per_producer_order_survives_concurrent_pushes() {
    let bus = Arc::new(Bus::new());
    let threads = 4;
    let per_thread = 250u32;

    let mut handles = Vec::new();
    for tag in 0..threads {
        let bus = Arc::clone(&bus);
        handles.push(thread::spawn(move || {
            for seq in 0..per_thread {
                bus.push(data(tag, seq));
            }
        }));
    }
    for handle in handles {
        handle.join().expect("join");
    }

    assert_eq!(bus.len(), (threads as usize) * per_thread as usize);

    // A single-threaded drain must observe each producer's messages in its
    // push order, whatever the interleaving between producers was.
    let mut next_seq = vec![0u32; threads as usize];
    while let Some(msg) = bus.pop() {
        let (tag, seq) = unpack(&msg);
        assert_eq!(seq, next_seq[tag as usize]);
        next_seq[tag as usize] += 1;
    }
    assert!(next_seq.iter().all(|seq| *seq == per_thread));
}

#[test]
fn drain_respects_the_limit_and_keeps_order() {
    let bus = Bus::new();
    for seq in 0..10 {
        bus.push(data(0, seq));
    }
    let batch = bus.drain(4);
    assert_eq!(batch.len(), 4);
    for (idx, msg) in batch.iter().enumerate() {
        assert_eq!(unpack(msg), (0, idx as u32));
    }
    assert_eq!(bus.len(), 6);

    // Draining more than is queued returns what is there.
    let rest = bus.drain(100);
    assert_eq!(rest.len(), 6);
}

#[test]
fn clear_empties_the_bus() {
    let bus = Bus::new();
    for seq in 0..3 {
        bus.push(data(0, seq));
    }
    bus.clear();
    assert!(bus.pop().is_none());
}
