//! Demo scenarios. Each one runs against the bus it is given and reports
//! what it observed through `tracing`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use herald_binding::{Binding, BindingOptions, BusProvider, RequestBinding, ResponderBinding};
use herald_bus::{BusError, EventBus, Handler, HandlerError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// A chat line exchanged on `room:1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub text: String,
}

impl ChatMessage {
    fn new(from: &str, text: &str) -> Self {
        Self {
            from: from.to_string(),
            text: text.to_string(),
        }
    }
}

/// Price lookup request used by the request/response scenario.
#[derive(Debug, Serialize, Deserialize)]
pub struct PriceQuery {
    pub symbol: String,
}

/// Two participants in one room. Each sees the other's lines and its own.
pub fn chat_room(bus: &EventBus) -> Result<()> {
    let received = Arc::new(AtomicUsize::new(0));

    let participant = |name: &'static str| {
        let received = Arc::clone(&received);
        Binding::listen(bus, "room:1", BindingOptions::default(), move |msg: ChatMessage| {
            received.fetch_add(1, Ordering::SeqCst);
            info!(participant = name, from = %msg.from, text = %msg.text, "Chat line");
            Ok(())
        })
    };

    let alice = participant("alice");
    let bob = participant("bob");

    alice.emit(&ChatMessage::new("alice", "hi bob"))?;
    bob.emit(&ChatMessage::new("bob", "hi alice"))?;

    ensure!(received.load(Ordering::SeqCst) == 4, "every participant sees every line");

    drop(bob);
    alice.emit(&ChatMessage::new("alice", "bob left"))?;
    ensure!(received.load(Ordering::SeqCst) == 5, "departed participant no longer listens");

    drop(alice);
    info!(listeners = bus.listener_count(Some("room:1")), "Chat room closed");
    Ok(())
}

/// A once-listener alongside a persistent one.
pub fn once_listener(bus: &EventBus) -> Result<()> {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let keep = Handler::new(|_| Ok(()));
    let once = Handler::new(move |msg| {
        counter.fetch_add(1, Ordering::SeqCst);
        info!(payload = %msg.payload, "Once-listener fired");
        Ok(())
    });

    bus.subscribe("ticker", &keep);
    bus.once("ticker", &once);
    bus.publish("ticker", json!(1));
    bus.publish("ticker", json!(2));
    bus.unsubscribe("ticker", None);

    ensure!(fired.load(Ordering::SeqCst) == 1, "once-listener fires exactly once");
    Ok(())
}

/// Messages published before anyone listens are replayed to the first
/// subscriber.
pub fn offline_replay(bus: &EventBus) -> Result<()> {
    for n in 1..=3 {
        bus.publish("inbox", json!({ "n": n }));
    }
    info!(queued = bus.queued_len("inbox"), "Published with nobody listening");

    let replayed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&replayed);
    let handler = Handler::new(move |msg| {
        counter.fetch_add(1, Ordering::SeqCst);
        info!(payload = %msg.payload, "Replayed");
        Ok(())
    });
    bus.subscribe("inbox", &handler);
    bus.unsubscribe("inbox", Some(&handler));

    ensure!(replayed.load(Ordering::SeqCst) == 3, "backlog replayed in order");
    ensure!(bus.queued_len("inbox") == 0, "backlog drained");
    Ok(())
}

/// A typed round trip, then a request nobody answers.
pub async fn request_response(bus: EventBus) -> Result<()> {
    BusProvider::scope(bus, async {
        let _prices = ResponderBinding::from_scope("prices:get", |query: PriceQuery| async move {
            match query.symbol.as_str() {
                "HRLD" => Ok(42.5_f64),
                other => Err(HandlerError::failed(format!("unknown symbol {other}"))),
            }
        })?;

        let lookup = RequestBinding::<PriceQuery, f64>::from_scope("prices:get")?
            .with_timeout(Duration::from_millis(500));
        let price = lookup
            .call(&PriceQuery {
                symbol: "HRLD".to_string(),
            })
            .await
            .context("price lookup")?;
        info!(price, "Price received");

        let unanswered = RequestBinding::<PriceQuery, f64>::from_scope("prices:get")?
            .with_timeout(Duration::from_millis(200));
        match unanswered
            .call(&PriceQuery {
                symbol: "NOPE".to_string(),
            })
            .await
        {
            Err(err @ BusError::RequestTimeout { .. }) => info!(error = %err, "Request timed out"),
            other => anyhow::bail!("expected a timeout, got {other:?}"),
        }

        Ok::<(), anyhow::Error>(())
    })
    .await
}
