//! Ordering guarantees of the per-room serial executor

use discodj_playback::{PlaybackError, SerialExecutor};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[tokio::test]
async fn jobs_on_one_key_run_in_submission_order() {
    let executor = SerialExecutor::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut pending = Vec::new();
    for i in 0..10u64 {
        let log = Arc::clone(&log);
        pending.push(executor.run("room", async move {
            // Earlier jobs sleep longer; order must still hold
            tokio::time::sleep(Duration::from_millis(20 - i * 2)).await;
            log.lock().unwrap().push(i);
            i
        }));
    }

    for (i, job) in pending.into_iter().enumerate() {
        assert_eq!(job.await.unwrap(), i as u64);
    }
    assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn suspended_job_blocks_its_lane_only() {
    let executor = SerialExecutor::new();
    let gate = Arc::new(Notify::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let blocked = {
        let gate = Arc::clone(&gate);
        let log = Arc::clone(&log);
        executor.run("a", async move {
            gate.notified().await;
            log.lock().unwrap().push("a1");
        })
    };
    let queued = {
        let log = Arc::clone(&log);
        executor.run("a", async move {
            log.lock().unwrap().push("a2");
        })
    };
    let other = {
        let log = Arc::clone(&log);
        executor.run("b", async move {
            log.lock().unwrap().push("b1");
        })
    };

    other.await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["b1"]);
    assert!(executor.is_busy(&"a"));

    gate.notify_one();
    blocked.await.unwrap();
    queued.await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["b1", "a1", "a2"]);
}

#[tokio::test]
async fn failures_do_not_poison_the_lane() {
    let executor = SerialExecutor::new();

    let failed: Result<(), &str> = executor.run(1u32, async { Err("nope") }).await.unwrap();
    assert_eq!(failed, Err("nope"));

    let panicked = executor
        .run(1u32, async {
            panic!("job exploded");
        })
        .await;
    assert!(matches!(panicked, Err(PlaybackError::Executor(_))));

    assert_eq!(executor.run(1u32, async { 7 }).await.unwrap(), 7);
}

#[tokio::test]
async fn dropped_caller_does_not_cancel_job() {
    let executor = SerialExecutor::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let log = Arc::clone(&log);
        drop(executor.run("room", async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            log.lock().unwrap().push("first");
        }));
    }
    let log_second = Arc::clone(&log);
    executor
        .run("room", async move {
            log_second.lock().unwrap().push("second");
        })
        .await
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn drained_lanes_are_retired() {
    let executor = SerialExecutor::new();
    for key in ["a", "b", "c"] {
        executor.run(key, async {}).await.unwrap();
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(executor.active_lanes(), 0);

    // A retired key gets a fresh lane
    assert_eq!(executor.run("a", async { "again" }).await.unwrap(), "again");
}
