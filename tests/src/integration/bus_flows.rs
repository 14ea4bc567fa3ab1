//! # Communicator Flows
//!
//! End-to-end behaviour of buses handed out by `LocalSharedObjects`:
//!
//! 1. **Request / reply under load**: many concurrent requesters, one responder
//! 2. **Filtered fan-out**: every box sees exactly the messages it asked for
//! 3. **Deadline cleanup**: timed-out receives leave no subscriptions behind
//! 4. **Plain threads**: blocking receives alongside async senders

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use serde_json::json;
    use shared_bus::{
        Communicator, CommunicatorError, IncomingMessage, MessageFilter, MessageType, Subscription,
    };
    use shared_runtime::{ExecutorMode, LocalSharedObjects, RuntimeConfig, SharedObjectProvider};
    use std::collections::HashSet;
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const WAIT: Duration = Duration::from_secs(2);

    fn local_objects() -> LocalSharedObjects {
        LocalSharedObjects::new(RuntimeConfig::default()).unwrap()
    }

    fn tokio_objects() -> LocalSharedObjects {
        let config = RuntimeConfig {
            executor: ExecutorMode::Tokio,
            ..RuntimeConfig::default()
        };
        LocalSharedObjects::new(config).unwrap()
    }

    /// Reply to `{"n": x}` requests with `{"square": x * x}`.
    fn square_responder(bus: &Arc<dyn Communicator>) -> Subscription {
        let weak: Weak<dyn Communicator> = Arc::downgrade(bus);
        bus.add_message_listener(
            Arc::new(move |request: &IncomingMessage| {
                let Some(bus) = weak.upgrade() else { return };
                let n = request.payload()["n"].as_i64().unwrap_or_default();
                bus.reply(request, json!({ "square": n * n }));
            }),
            MessageFilter::of_type(MessageType::Request),
        )
    }

    // =============================================================================
    // REQUEST / REPLY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_get_their_own_responses() {
        let objects = tokio_objects();
        let bus = objects.communicator("math").unwrap();
        let _responder = square_responder(&bus);

        let requests = (0..200i64).map(|n| {
            let bus = Arc::clone(&bus);
            async move {
                let response = bus.send_request(json!({ "n": n }), WAIT).await.unwrap();
                (n, response)
            }
        });

        let mut ids = HashSet::new();
        for (n, response) in join_all(requests).await {
            assert_eq!(response.message_type(), MessageType::Response);
            assert_eq!(response.payload(), &json!({ "square": n * n }));
            assert!(ids.insert(response.message_id()));
        }

        assert_eq!(ids.len(), 200);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_response_from_another_bus_is_not_seen() {
        let objects = local_objects();
        let left = objects.communicator("left").unwrap();
        let right = objects.communicator("right").unwrap();
        let _responder = square_responder(&right);

        let result = left
            .send_request(json!({ "n": 3 }), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(CommunicatorError::Timeout { .. })));
        assert_eq!(left.subscriber_count(), 0);

        let response = right.send_request(json!({ "n": 3 }), WAIT).await.unwrap();
        assert_eq!(response.payload(), &json!({ "square": 9 }));
    }

    // =============================================================================
    // FILTERED FAN-OUT
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_box_gets_exactly_its_messages() {
        const SENDERS: i64 = 4;
        const PER_SENDER: i64 = 250;

        let objects = tokio_objects();
        let bus = objects.communicator("fanout").unwrap();

        let mut boxes: Vec<_> = (0..SENDERS)
            .map(|tag| {
                bus.create_message_box(MessageFilter::custom(move |m| {
                    m.payload()["tag"] == json!(tag)
                }))
            })
            .collect();
        let mut everything = bus.create_message_box(MessageFilter::of_type(MessageType::Signal));

        let senders: Vec<_> = (0..SENDERS)
            .map(|tag| {
                let bus = Arc::clone(&bus);
                tokio::spawn(async move {
                    for seq in 0..PER_SENDER {
                        bus.send_signal(json!({ "tag": tag, "seq": seq }));
                    }
                })
            })
            .collect();
        for sender in join_all(senders).await {
            sender.unwrap();
        }

        for (tag, inbox) in boxes.iter_mut().enumerate() {
            let mut seen = HashSet::new();
            for _ in 0..PER_SENDER {
                let message = inbox.recv_timeout(WAIT).await.unwrap();
                assert_eq!(message.payload()["tag"], json!(tag));
                assert!(seen.insert(message.payload()["seq"].as_i64().unwrap()));
            }
            assert!(inbox.try_recv().is_none());
        }

        let mut total = 0;
        while everything.recv_timeout(Duration::from_millis(100)).await.is_ok() {
            total += 1;
        }
        assert_eq!(total, SENDERS * PER_SENDER);
        assert_eq!(bus.messages_sent() as i64, SENDERS * PER_SENDER);
    }

    #[tokio::test]
    async fn test_subscriber_sees_only_later_messages() {
        let objects = local_objects();
        let bus = objects.communicator("late").unwrap();

        bus.send_signal(json!("before"));
        let mut inbox = bus.create_message_box(MessageFilter::all());
        bus.send_signal(json!("after"));

        let message = inbox.recv_timeout(WAIT).await.unwrap();
        assert_eq!(message.payload(), &json!("after"));
        assert_eq!(
            inbox.recv_timeout(Duration::from_millis(50)).await,
            Err(CommunicatorError::Timeout {
                timeout: Duration::from_millis(50)
            })
        );
    }

    #[tokio::test]
    async fn test_listener_relays_through_same_bus() {
        let objects = local_objects();
        let bus = objects.communicator("relay").unwrap();

        let weak = Arc::downgrade(&bus);
        let _relay = bus.add_message_listener(
            Arc::new(move |m: &IncomingMessage| {
                if let Some(bus) = weak.upgrade() {
                    bus.send_message(json!({ "relayed": m.payload() }), MessageType::Signal);
                }
            }),
            MessageFilter::custom(|m| m.payload().get("relayed").is_none()),
        );
        let mut relayed =
            bus.create_message_box(MessageFilter::custom(|m| m.payload().get("relayed").is_some()));

        bus.send_signal(json!("hello"));
        let message = relayed.recv_timeout(WAIT).await.unwrap();
        assert_eq!(message.payload(), &json!({ "relayed": "hello" }));
    }

    #[tokio::test]
    async fn test_bounded_box_counts_overflow() {
        let config = RuntimeConfig {
            mailbox_capacity: 8,
            ..RuntimeConfig::default()
        };
        let objects = LocalSharedObjects::new(config).unwrap();
        let bus = objects.communicator("burst").unwrap();
        let mut inbox = objects.message_box("burst", MessageFilter::all()).unwrap();
        let mut marker = bus.create_message_box(MessageFilter::all());

        for n in 0..20 {
            bus.send_signal(json!(n));
        }
        // The marker box is behind the bounded box in the chain, so once it has
        // all 20 the bounded box has seen them too.
        for _ in 0..20 {
            marker.recv_timeout(WAIT).await.unwrap();
        }

        assert_eq!(inbox.dropped_count(), 12);
        let kept: Vec<_> = std::iter::from_fn(|| inbox.try_recv())
            .map(|m| m.payload().as_i64().unwrap())
            .collect();
        assert_eq!(kept, (0..8).collect::<Vec<_>>());
    }

    // =============================================================================
    // DEADLINE CLEANUP
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timed_out_receives_leave_chain_unchanged() {
        let objects = tokio_objects();
        let bus = objects.communicator("quiet").unwrap();
        let _listener = bus.add_message_listener(Arc::new(|_: &IncomingMessage| {}), MessageFilter::all());
        let baseline = bus.subscriber_count();

        let waits = (0..100).map(|i| {
            let bus = Arc::clone(&bus);
            async move {
                bus.receive_message(
                    MessageFilter::custom(|m| m.payload() == &json!("never")),
                    Duration::from_millis(10 + i % 20),
                )
                .await
            }
        });

        let results = join_all(waits).await;
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(CommunicatorError::Timeout { .. }))));
        assert_eq!(bus.subscriber_count(), baseline);
    }

    #[tokio::test]
    async fn test_dropped_pending_receives_unsubscribe() {
        let objects = local_objects();
        let bus = objects.communicator("cancel").unwrap();

        let pending: Vec<_> = (0..10).map(|_| bus.receive(MessageFilter::all())).collect();
        assert_eq!(bus.subscriber_count(), 10);

        drop(pending);
        assert_eq!(bus.subscriber_count(), 0);
    }

    // =============================================================================
    // PLAIN THREADS
    // =============================================================================

    #[test]
    fn test_blocking_receive_from_plain_threads() {
        let objects = local_objects();
        let bus = objects.communicator("threads").unwrap();

        let waiters: Vec<_> = (0..4i64)
            .map(|i| {
                let pending = bus.receive(MessageFilter::custom(move |m| m.payload() == &json!(i)));
                std::thread::spawn(move || pending.blocking_wait())
            })
            .collect();

        for i in (0..4i64).rev() {
            bus.send_signal(json!(i));
        }

        for (i, waiter) in waiters.into_iter().enumerate() {
            let message = waiter.join().unwrap().unwrap();
            assert_eq!(message.payload(), &json!(i));
        }
        assert_eq!(bus.subscriber_count(), 0);
    }
}
