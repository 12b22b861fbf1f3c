//! # Request/Response Scenarios
//!
//! Raw `request`/`respond` and the typed bindings talking to each other,
//! including the paths where no answer ever arrives.

#[cfg(test)]
mod tests {
    use herald_binding::{RequestBinding, ResponderBinding};
    use herald_bus::{BusError, EventBus, Handler, HandlerError, Message};
    use herald_types::{error_channel, response_channel, CorrelationId};
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Debug, Serialize, Deserialize)]
    struct Lookup {
        user_id: u64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        user_id: u64,
        name: String,
    }

    fn directory(bus: &EventBus) -> ResponderBinding {
        ResponderBinding::new(bus, "users:get", |req: Lookup| async move {
            match req.user_id {
                1 => Ok(Profile {
                    user_id: 1,
                    name: "alice".to_string(),
                }),
                id => Err(HandlerError::failed(format!("no user {id}"))),
            }
        })
    }

    #[tokio::test]
    async fn test_typed_client_against_raw_responder() {
        let bus = EventBus::default();
        bus.respond("users:get", |payload: Value| async move {
            Ok(json!({"user_id": payload["user_id"], "name": "raw"}))
        });
        let client = RequestBinding::<Lookup, Profile>::new(&bus, "users:get")
            .with_timeout(Duration::from_millis(500));

        let profile = client.call(&Lookup { user_id: 9 }).await.unwrap();
        assert_eq!(
            profile,
            Profile {
                user_id: 9,
                name: "raw".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_raw_client_against_typed_responder() {
        let bus = EventBus::default();
        let _directory = directory(&bus);

        let response = bus
            .request("users:get", json!({"user_id": 1}), Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(response, json!({"user_id": 1, "name": "alice"}));
    }

    #[tokio::test]
    async fn test_failure_is_published_on_error_channel() {
        let bus = EventBus::default();
        let ids = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ids);
        bus.subscribe(
            "users:get",
            &Handler::new(move |msg: &Message| {
                sink.lock().extend(msg.correlation_id);
                Ok(())
            }),
        );
        let _directory = directory(&bus);

        let outcome = bus
            .request("users:get", json!({"user_id": 2}), Duration::from_millis(100))
            .await;
        assert!(matches!(outcome, Err(BusError::RequestTimeout { .. })));

        let id: CorrelationId = ids.lock()[0];
        let errors = error_channel("users:get", &id);
        assert_eq!(bus.queued_len(&errors), 1);

        // Whoever listens later gets the error text replayed.
        let texts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&texts);
        bus.subscribe(
            &errors,
            &Handler::new(move |msg| {
                sink.lock().push(msg.payload.clone());
                Ok(())
            }),
        );
        assert_eq!(
            *texts.lock(),
            vec![Value::String("Handler failed: no user 2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_late_response_is_dropped_into_queue() {
        let bus = EventBus::default();
        bus.respond("slow", |payload: Value| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(payload)
        });

        let err = bus
            .request("slow", json!(1), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BusError::RequestTimeout {
                channel: "slow".to_string(),
                timeout_ms: 20
            }
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(bus.pending_requests(), 0);
        assert_eq!(bus.stats().requests_timed_out, 1);
        assert_eq!(bus.stats().requests_responded, 0);
    }

    #[tokio::test]
    async fn test_dropping_responder_stops_answers() {
        let bus = EventBus::default();
        let client = RequestBinding::<Lookup, Profile>::new(&bus, "users:get")
            .with_timeout(Duration::from_millis(50));
        {
            let _directory = directory(&bus);
            assert!(client.call(&Lookup { user_id: 1 }).await.is_ok());
        }

        let err = client.call(&Lookup { user_id: 1 }).await.unwrap_err();
        assert!(matches!(err, BusError::RequestTimeout { .. }));
        assert_eq!(bus.listener_count(Some("users:get")), 0);
    }

    #[tokio::test]
    async fn test_request_completes_within_bound() {
        let bus = EventBus::default();
        let _directory = directory(&bus);
        let client = RequestBinding::<Lookup, Profile>::new(&bus, "users:get");

        let profile = timeout(Duration::from_secs(1), client.call(&Lookup { user_id: 1 }))
            .await
            .expect("request should not hang")
            .unwrap();
        assert_eq!(profile.name, "alice");
    }

    #[tokio::test]
    async fn test_response_channel_naming_is_shared() {
        let bus = EventBus::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let bus_for_handler = bus.downgrade();
        bus.subscribe(
            "manual",
            &Handler::new(move |msg| {
                sink.lock().push(msg.correlation_id);
                if let (Some(bus), Some(id)) = (bus_for_handler.upgrade(), msg.correlation_id) {
                    bus.publish(&response_channel("manual", &id), json!("by hand"));
                }
                Ok(())
            }),
        );

        let response = bus
            .request("manual", json!(null), Duration::from_millis(200))
            .await
            .unwrap();

        assert_eq!(response, json!("by hand"));
        assert_eq!(seen.lock().len(), 1);
        assert!(seen.lock()[0].is_some());
    }
}
