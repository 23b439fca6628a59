//! Tests for admitting fragments from several threads at once.

use std::{
    sync::{Arc, Mutex, OnceLock, Weak},
    thread,
};

use bytes::Bytes;
use segments::{AdmissionStatus, BytesDecoder, Reassembler};
use segments_testing::Collector;

const WORKERS: i64 = 8;
const TOTAL: i64 = 64;

#[test]
fn racing_admissions_complete_exactly_once() {
    let collector = Collector::new();
    let engine = Reassembler::builder(BytesDecoder)
        .shared_handler(collector.handler())
        .build();

    let statuses: Vec<AdmissionStatus> = thread::scope(|scope| {
        let workers: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let engine = &engine;
                scope.spawn(move || {
                    (1..=TOTAL)
                        .filter(|seq| seq % WORKERS == worker)
                        .map(|seq| {
                            engine
                                .admit("race", seq, TOTAL, vec![u8::try_from(seq).expect("seq fits u8")])
                                .expect("admit fragment")
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().expect("worker thread"))
            .collect()
    });

    let completed = statuses
        .iter()
        .filter(|status| **status == AdmissionStatus::Completed)
        .count();
    assert_eq!(completed, 1);
    let expected: Vec<u8> = (1..=TOTAL)
        .map(|seq| u8::try_from(seq).expect("seq fits u8"))
        .collect();
    assert_eq!(collector.take(), vec![Bytes::from(expected)]);
    assert_eq!(engine.session_count(), 0);
}

#[test]
fn distinct_identifiers_progress_in_parallel() {
    let collector = Collector::new();
    let engine = Reassembler::builder(BytesDecoder)
        .shared_handler(collector.handler())
        .build();

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let engine = &engine;
            scope.spawn(move || {
                let id = format!("w{worker}");
                for seq in (1..=4).rev() {
                    engine
                        .admit(id.as_str(), seq, 4, format!("{worker}:{seq};"))
                        .expect("admit fragment");
                }
            });
        }
    });

    let mut delivered = collector.take();
    delivered.sort();
    let expected: Vec<Bytes> = (0..WORKERS)
        .map(|worker| Bytes::from(format!("{worker}:1;{worker}:2;{worker}:3;{worker}:4;")))
        .collect();
    assert_eq!(delivered, expected);
}

#[test]
fn handler_may_feed_the_engine_that_called_it() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<OnceLock<Weak<Reassembler<BytesDecoder>>>> = Arc::new(OnceLock::new());

    let sink = Arc::clone(&delivered);
    let engine_slot = Arc::clone(&slot);
    let engine = Arc::new(
        Reassembler::builder(BytesDecoder)
            .handler(move |message: Bytes| {
                let forward = message.as_ref() == b"outer";
                sink.lock().expect("sink lock").push(message);
                if forward && let Some(engine) = engine_slot.get().and_then(Weak::upgrade) {
                    engine
                        .admit("inner", 1, 1, "inner")
                        .expect("re-entrant admission");
                }
            })
            .build(),
    );
    slot.set(Arc::downgrade(&engine))
        .expect("engine slot set once");

    engine.admit("outer", 2, 2, "ter").expect("admit 2");
    let status = engine.admit("outer", 1, 2, "ou").expect("admit 1");

    assert_eq!(status, AdmissionStatus::Completed);
    assert_eq!(
        *delivered.lock().expect("sink lock"),
        vec![Bytes::from_static(b"outer"), Bytes::from_static(b"inner")]
    );
    assert_eq!(engine.session_count(), 0);
}
