// Concurrent access through shared handles
use doclite_core::{Client, ClientConfig, Document, DocumentId, IdGeneration};
use serde_json::{json, Value as Json};

#[ctor::ctor]
fn init() {
    colog::init();
}

const THREADS: i64 = 8;
const PER_THREAD: i64 = 250;

#[test]
fn test_concurrent_inserts_get_unique_ids() {
    let client = Client::new(ClientConfig::new().with_id_generation(IdGeneration::AutoIncrement));
    let coll = client.database("test").unwrap().collection("events");

    let ids: Vec<DocumentId> = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let coll = coll.clone();
                s.spawn(move |_| {
                    (0..PER_THREAD)
                        .map(|i| coll.insert(Document::new().with("thread", t).with("seq", i)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let mut sorted: Vec<i64> = ids
        .iter()
        .map(|id| match id {
            DocumentId::Int(n) => *n,
            other => panic!("unexpected id {}", other),
        })
        .collect();
    sorted.sort_unstable();
    let expected: Vec<i64> = (1..=THREADS * PER_THREAD).collect();
    assert_eq!(sorted, expected);
    assert_eq!(coll.count(&Json::Null).unwrap(), (THREADS * PER_THREAD) as u64);
}

#[test]
fn test_concurrent_inc_loses_no_updates() {
    let coll = Client::default().database("test").unwrap().collection("counters");
    coll.insert(Document::new().with("_id", "hits").with("n", 0)).unwrap();

    crossbeam::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                for _ in 0..PER_THREAD {
                    coll.update(&json!({"_id": "hits"}), &json!({"$inc": {"n": 1}}), false, false)
                        .unwrap();
                }
            });
        }
    })
    .unwrap();

    let counter = coll.find_one(&json!({"_id": "hits"})).unwrap().unwrap();
    assert_eq!(counter.get_i64("n").unwrap(), THREADS * PER_THREAD);
}

#[test]
fn test_multi_update_is_atomic_for_readers() {
    let coll = Client::default().database("test").unwrap().collection("accounts");
    coll.insert_many((0..20).map(|i| Document::new().with("owner", i).with("version", 0)))
        .unwrap();

    crossbeam::scope(|s| {
        s.spawn(|_| {
            for _ in 0..200 {
                coll.update(&Json::Null, &json!({"$inc": {"version": 1}}), false, true)
                    .unwrap();
            }
        });

        s.spawn(|_| {
            for _ in 0..200 {
                // every snapshot sees all documents at the same version
                let versions: Vec<i64> = coll
                    .find(&Json::Null)
                    .unwrap()
                    .map(|d| d.get_i64("version").unwrap())
                    .collect();
                assert_eq!(versions.len(), 20);
                assert!(versions.iter().all(|v| *v == versions[0]));
            }
        });
    })
    .unwrap();

    assert_eq!(coll.count(&json!({"version": 200})).unwrap(), 20);
}

#[test]
fn test_registries_hand_out_shared_collections() {
    let client = Client::default();

    crossbeam::scope(|s| {
        for t in 0..THREADS {
            let client = client.clone();
            s.spawn(move |_| {
                let coll = client.database("shared").unwrap().collection("items");
                coll.insert(Document::new().with("thread", t)).unwrap();
            });
        }
    })
    .unwrap();

    let db = client.database("shared").unwrap();
    assert_eq!(db.collection_names(), vec!["items"]);
    assert_eq!(db.collection("items").count(&Json::Null).unwrap(), THREADS as u64);
}

#[test]
fn test_remove_while_reading() {
    let coll = Client::default().database("test").unwrap().collection("queue");
    coll.insert_many((0..500).map(|i| Document::new().with("n", i))).unwrap();

    let removed = crossbeam::scope(|s| {
        let remover = s.spawn(|_| {
            (0..500)
                .map(|i| coll.remove(&json!({"n": i})).unwrap().n)
                .sum::<u64>()
        });
        s.spawn(|_| {
            for _ in 0..50 {
                let count = coll.count(&Json::Null).unwrap();
                assert!(count <= 500);
            }
        });
        remover.join().unwrap()
    })
    .unwrap();

    assert_eq!(removed, 500);
    assert_eq!(coll.count(&Json::Null).unwrap(), 0);
}
