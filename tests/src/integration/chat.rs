//! # Chat Room Scenarios
//!
//! Several owners bind to one room and come and go. Checks that delivery
//! follows the set of live bindings and that the offline queue bridges
//! gaps where nobody is bound.

#[cfg(test)]
mod tests {
    use herald_binding::{Binding, BindingOptions, BusProvider};
    use herald_bus::{BusConfig, EventBus, Handler};
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Arc;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Line {
        from: String,
        text: String,
    }

    fn line(from: &str, text: &str) -> Line {
        Line {
            from: from.to_string(),
            text: text.to_string(),
        }
    }

    type Inbox = Arc<Mutex<Vec<Line>>>;

    fn member(bus: &EventBus, room: &str) -> (Binding<Line>, Inbox) {
        let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        let binding = Binding::listen(bus, room, BindingOptions::default(), move |l: Line| {
            sink.lock().push(l);
            Ok(())
        });
        (binding, inbox)
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[test]
    fn test_two_members_see_each_other() {
        let bus = EventBus::default();
        let (alice, alice_inbox) = member(&bus, "room:1");
        let (bob, bob_inbox) = member(&bus, "room:1");

        alice.emit(&line("alice", "hi")).unwrap();
        bob.emit(&line("bob", "hey")).unwrap();

        let expected = vec![line("alice", "hi"), line("bob", "hey")];
        assert_eq!(*alice_inbox.lock(), expected);
        assert_eq!(*bob_inbox.lock(), expected);
    }

    #[test]
    fn test_late_joiner_gets_backlog_when_room_empty() {
        let bus = EventBus::default();
        let emitter = Binding::<Line>::new(&bus, "room:1", BindingOptions::default()).emitter();

        emitter.emit(&line("alice", "anyone?")).unwrap();
        emitter.emit(&line("alice", "hello?")).unwrap();
        let (_bob, bob_inbox) = member(&bus, "room:1");

        assert_eq!(
            *bob_inbox.lock(),
            vec![line("alice", "anyone?"), line("alice", "hello?")]
        );
        assert_eq!(bus.queued_len("room:1"), 0);
    }

    #[test]
    fn test_backlog_goes_to_first_joiner_only() {
        let bus = EventBus::default();
        bus.publish("room:1", json!({"from": "system", "text": "welcome"}));

        let (_first, first_inbox) = member(&bus, "room:1");
        let (_second, second_inbox) = member(&bus, "room:1");

        assert_eq!(first_inbox.lock().len(), 1);
        assert!(second_inbox.lock().is_empty());
    }

    #[test]
    fn test_gap_between_members_is_bridged() {
        let bus = EventBus::default();
        let (alice, _) = member(&bus, "room:1");
        let emitter = alice.emitter();
        drop(alice);

        // Emitters outlive the binding they came from.
        emitter.emit(&line("ghost", "still here")).unwrap();
        let (_bob, bob_inbox) = member(&bus, "room:1");

        assert_eq!(*bob_inbox.lock(), vec![line("ghost", "still here")]);
    }

    #[test]
    fn test_room_switch_keeps_emitter_channel() {
        let bus = EventBus::default();
        let (mut alice, alice_inbox) = member(&bus, "room:1");
        let (_bob, bob_inbox) = member(&bus, "room:1");
        let old_emitter = alice.emitter();

        alice.rebind("room:2");
        old_emitter.emit(&line("alice", "bye room 1")).unwrap();
        alice.emit(&line("alice", "hi room 2")).unwrap();

        assert_eq!(*bob_inbox.lock(), vec![line("alice", "bye room 1")]);
        assert_eq!(*alice_inbox.lock(), vec![line("alice", "hi room 2")]);
    }

    #[test]
    fn test_bounded_backlog_keeps_newest() {
        let bus = EventBus::new(BusConfig::default().with_max_queue_size(2)).unwrap();
        for text in ["one", "two", "three"] {
            bus.publish("room:1", serde_json::to_value(line("sys", text)).unwrap());
        }

        let (_member, inbox) = member(&bus, "room:1");

        assert_eq!(*inbox.lock(), vec![line("sys", "two"), line("sys", "three")]);
        assert_eq!(bus.stats().evicted, 1);
    }

    #[test]
    fn test_rooms_are_isolated_under_scope() {
        let bus = EventBus::default();
        let (r1, r1_inbox, r2_inbox) = BusProvider::sync_scope(bus.clone(), || {
            let r1_inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
            let r2_inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
            let s1 = Arc::clone(&r1_inbox);
            let s2 = Arc::clone(&r2_inbox);
            let r1 = Binding::listen_in_scope("room:1", BindingOptions::default(), move |l: Line| {
                s1.lock().push(l);
                Ok(())
            })
            .unwrap();
            let r2 = Binding::listen_in_scope("room:2", BindingOptions::default(), move |l: Line| {
                s2.lock().push(l);
                Ok(())
            })
            .unwrap();
            r2.emit(&line("carol", "room two only")).unwrap();
            (r1, r1_inbox, r2_inbox)
        });

        assert!(r1_inbox.lock().is_empty());
        assert_eq!(r2_inbox.lock().len(), 1);
        drop(r1);
        assert_eq!(bus.event_names(), Vec::<String>::new());
    }

    #[test]
    fn test_failing_member_does_not_silence_room() {
        let bus = EventBus::default();
        let broken = Handler::new(|_| panic!("renderer crashed"));
        bus.subscribe("room:1", &broken);
        let (alice, alice_inbox) = member(&bus, "room:1");

        alice.emit(&line("alice", "still works")).unwrap();

        assert_eq!(alice_inbox.lock().len(), 1);
        assert_eq!(bus.stats().handler_failures, 1);
    }
}
