//! # Concurrency Scenarios
//!
//! Many tasks sharing one bus on a multi-threaded runtime.

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use herald_bus::{EventBus, Handler};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_publishers_deliver_everything() {
        let bus = EventBus::default();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        bus.subscribe(
            "metrics",
            &Handler::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let tasks = (0..8).map(|_| {
            let bus = bus.clone();
            tokio::spawn(async move {
                for n in 0..250 {
                    bus.publish("metrics", json!(n));
                }
            })
        });
        for result in join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 2000);
        assert_eq!(bus.stats().published, 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_each_get_their_answer() {
        let bus = EventBus::default();
        bus.respond("double", |payload| async move {
            let n = payload.as_i64().unwrap_or_default();
            tokio::time::sleep(Duration::from_millis((n % 5) as u64)).await;
            Ok(json!(n * 2))
        });

        let calls = (0..50).map(|n| {
            let bus = bus.clone();
            async move {
                bus.request("double", json!(n), Duration::from_secs(2))
                    .await
                    .map(|v| (n, v))
            }
        });

        for result in join_all(calls).await {
            let (n, value) = result.unwrap();
            assert_eq!(value, json!(n * 2));
        }
        assert_eq!(bus.pending_requests(), 0);
        assert_eq!(bus.stats().requests_responded, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_once_fires_once_under_contention() {
        let bus = EventBus::default();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        bus.subscribe("race", &Handler::new(|_| Ok(())));
        bus.once(
            "race",
            &Handler::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let tasks = (0..16).map(|n| {
            let bus = bus.clone();
            tokio::spawn(async move { bus.publish("race", json!(n)) })
        });
        for result in join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscribe_unsubscribe_churn() {
        let bus = EventBus::default();
        let tasks = (0..8).map(|n| {
            let bus = bus.clone();
            tokio::spawn(async move {
                let channel = format!("churn:{}", n % 2);
                for _ in 0..100 {
                    let handler = Handler::new(|_| Ok(()));
                    bus.subscribe(&channel, &handler);
                    bus.publish(&channel, json!(null));
                    bus.unsubscribe(&channel, Some(&handler));
                }
            })
        });
        for result in join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(bus.listener_count(None), 0);
        assert!(bus.event_names().is_empty());
    }
}
