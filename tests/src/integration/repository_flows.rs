//! # Repository and Provider Flows
//!
//! Lifecycle of named objects across crates:
//!
//! 1. **Single instance per name** under concurrent first lookups
//! 2. **Release** finalizes the old instance and a later lookup builds a new one
//! 3. **Atomic primitives** (counter, box, store) under contention

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use rand::Rng;
    use serde_json::json;
    use shared_bus::{
        BusContext, Communicator, CommunicatorError, CommunicatorKind, LocalCommunicator,
        MessageFilter,
    };
    use shared_objects::{ObjectKind, RepositoryError, SharedObjectId, SharedObjectRepository};
    use shared_runtime::{LocalSharedObjects, RuntimeConfig, SharedObjectProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn objects() -> Arc<LocalSharedObjects> {
        Arc::new(LocalSharedObjects::new(RuntimeConfig::default()).unwrap())
    }

    // =============================================================================
    // SINGLE INSTANCE
    // =============================================================================

    #[test]
    fn test_concurrent_first_lookup_builds_one_communicator() {
        let context = BusContext::local();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let repository = Arc::new(SharedObjectRepository::<CommunicatorKind>::with_factory(
            move |id: &SharedObjectId<CommunicatorKind>| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(LocalCommunicator::new(id.name(), &context)) as Arc<dyn Communicator>)
            },
        ));
        let barrier = Arc::new(Barrier::new(100));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let repository = Arc::clone(&repository);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    repository.get_shared_object("orders").unwrap()
                })
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn test_failed_construction_is_retried_next_lookup() {
        let context = BusContext::local();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let repository = SharedObjectRepository::<CommunicatorKind>::with_factory(move |id| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(RepositoryError::construction(
                    ObjectKind::Communicator,
                    id.name(),
                    "transport not ready",
                ));
            }
            Ok(id.create_default_implementation(&context))
        });

        assert!(matches!(
            repository.get_shared_object("events"),
            Err(RepositoryError::ConstructionFailure { .. })
        ));
        assert!(!repository.contains("events"));

        let bus = repository.get_shared_object("events").unwrap();
        assert_eq!(bus.name(), "events");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    // =============================================================================
    // RELEASE
    // =============================================================================

    #[tokio::test]
    async fn test_release_replaces_communicator() {
        let objects = objects();
        let old = objects.communicator("jobs").unwrap();
        let waiting = old.receive(MessageFilter::all());

        assert!(objects.release(ObjectKind::Communicator, "jobs"));
        assert_eq!(waiting.await, Err(CommunicatorError::Interrupted));

        let new = objects.communicator("jobs").unwrap();
        assert!(!Arc::ptr_eq(&old, &new));

        let mut inbox = new.create_message_box(MessageFilter::all());
        old.send_signal(json!("lost"));
        new.send_signal(json!("kept"));
        let message = inbox
            .recv_timeout(std::time::Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(message.payload(), &json!("kept"));
    }

    #[tokio::test]
    async fn test_release_all_clears_every_kind() {
        let objects = objects();
        objects.counter("c").unwrap().set(3);
        objects.shared_box("b").unwrap().set(json!("x"));
        objects.store("s").unwrap().put("k", json!(1));
        let pending = objects.communicator("m").unwrap().receive(MessageFilter::all());
        assert_eq!(objects.object_count(), 4);

        objects.release_all();

        assert_eq!(objects.object_count(), 0);
        assert_eq!(pending.await, Err(CommunicatorError::Interrupted));
        assert_eq!(objects.counter("c").unwrap().get(), 0);
        assert!(objects.shared_box("b").unwrap().get().is_none());
        assert!(objects.store("s").unwrap().is_empty());
    }

    // =============================================================================
    // CONTENTION
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_counter_from_many_tasks() {
        let objects = objects();

        let tasks = (0..16).map(|_| {
            let objects = Arc::clone(&objects);
            tokio::spawn(async move {
                let counter = objects.counter("ticks").unwrap();
                for _ in 0..500 {
                    counter.get_and_increment();
                }
            })
        });
        for task in join_all(tasks).await {
            task.unwrap();
        }

        assert_eq!(objects.counter("ticks").unwrap().get(), 16 * 500);
    }

    #[test]
    fn test_box_compare_and_set_loop() {
        let objects = objects();
        objects.shared_box("total").unwrap().set(json!(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let objects = Arc::clone(&objects);
                thread::spawn(move || {
                    let cell = objects.shared_box("total").unwrap();
                    let mut rng = rand::thread_rng();
                    let mut added = 0;
                    for _ in 0..100 {
                        let delta = rng.gen_range(1..=5);
                        loop {
                            let current = cell.get();
                            let n = current.as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
                            if cell.compare_and_set(current.as_ref(), json!(n + delta)) {
                                break;
                            }
                        }
                        added += delta;
                    }
                    added
                })
            })
            .collect();

        let expected: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(objects.shared_box("total").unwrap().get(), Some(json!(expected)));
    }

    #[test]
    fn test_store_put_if_absent_has_one_winner() {
        let objects = objects();
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let objects = Arc::clone(&objects);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let store = objects.store("leases").unwrap();
                    barrier.wait();
                    store.put_if_absent("leader", json!(i)).is_none()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(objects.store("leases").unwrap().keys(), vec!["leader".to_string()]);
    }
}
