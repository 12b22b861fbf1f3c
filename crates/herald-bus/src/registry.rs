//! # Channel Registry
//!
//! Maps channel names to the ordered set of persistent handlers and the
//! ordered set of once handlers. Insertion order is delivery order.
//!
//! The registry is pure data: it never invokes a handler. The bus takes a
//! [`Dispatch`] snapshot under its lock and runs handlers after releasing it.

use crate::handler::Handler;
use std::collections::{BTreeSet, HashMap};

/// Registration mode of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Invoked on every publish until removed.
    Persistent,
    /// Invoked on the next publish only.
    Once,
}

/// Handlers selected for one delivery, persistent ones first.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub persistent: Vec<Handler>,
    pub once: Vec<Handler>,
}

impl Dispatch {
    /// Total handlers in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.persistent.len() + self.once.len()
    }

    /// Whether the snapshot selected nobody.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All handlers in delivery order.
    pub fn handlers(&self) -> impl Iterator<Item = &Handler> {
        self.persistent.iter().chain(self.once.iter())
    }
}

/// Per-channel handler sets.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    persistent: HashMap<String, Vec<Handler>>,
    once: HashMap<String, Vec<Handler>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set_mut(&mut self, mode: Mode) -> &mut HashMap<String, Vec<Handler>> {
        match mode {
            Mode::Persistent => &mut self.persistent,
            Mode::Once => &mut self.once,
        }
    }

    /// Register `handler`. Returns `false` if it was already registered in
    /// this mode on this channel.
    pub fn add(&mut self, channel: &str, handler: &Handler, mode: Mode) -> bool {
        let handlers = self.set_mut(mode).entry(channel.to_string()).or_default();
        if handlers.iter().any(|h| h.same(handler)) {
            return false;
        }
        handlers.push(handler.clone());
        true
    }

    /// Remove `handler` from both sets. Returns `true` if anything was removed.
    pub fn remove(&mut self, channel: &str, handler: &Handler) -> bool {
        let mut removed = false;
        for mode in [Mode::Persistent, Mode::Once] {
            let set = self.set_mut(mode);
            if let Some(handlers) = set.get_mut(channel) {
                let before = handlers.len();
                handlers.retain(|h| !h.same(handler));
                removed |= handlers.len() != before;
                if handlers.is_empty() {
                    set.remove(channel);
                }
            }
        }
        removed
    }

    /// Remove every handler of `channel`. Returns how many were removed.
    pub fn remove_channel(&mut self, channel: &str) -> usize {
        let persistent = self.persistent.remove(channel).map_or(0, |h| h.len());
        let once = self.once.remove(channel).map_or(0, |h| h.len());
        persistent + once
    }

    /// Snapshot handlers for a delivery.
    ///
    /// Persistent handlers are copied; once handlers are moved out so that
    /// no later delivery can reach them.
    pub fn take_dispatch(&mut self, channel: &str) -> Dispatch {
        Dispatch {
            persistent: self.persistent.get(channel).cloned().unwrap_or_default(),
            once: self.once.remove(channel).unwrap_or_default(),
        }
    }

    /// Handlers registered on `channel`, or across all channels.
    #[must_use]
    pub fn count(&self, channel: Option<&str>) -> usize {
        match channel {
            Some(channel) => {
                self.persistent.get(channel).map_or(0, Vec::len)
                    + self.once.get(channel).map_or(0, Vec::len)
            }
            None => {
                self.persistent.values().map(Vec::len).sum::<usize>()
                    + self.once.values().map(Vec::len).sum::<usize>()
            }
        }
    }

    /// Whether `channel` has any handler of either kind.
    #[must_use]
    pub fn has_listeners(&self, channel: &str) -> bool {
        self.count(Some(channel)) > 0
    }

    /// Channels with at least one handler, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.persistent
            .keys()
            .chain(self.once.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn clear(&mut self) {
        self.persistent.clear();
        self.once.clear();
    }
}
