// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trigger registry and derived channel index.
//!
//! Triggers are keyed by their stable webhook id and survive for the
//! lifetime of the gateway process. The channel index is derived: it is
//! rebuilt from scratch on every mutation into a fresh `Arc` and swapped in,
//! so a router holding the previous `Arc` never observes a half-built index.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use chatgate_protocol::message::{Trigger, TriggerKind};

/// Channel key matching every channel.
pub const ALL_CHANNELS: &str = "all";

/// Derived map from channel id (or [`ALL_CHANNELS`]) to the active triggers
/// listening on it.
#[derive(Debug, Default)]
pub struct ChannelIndex {
    buckets: HashMap<String, Vec<Trigger>>,
}

impl ChannelIndex {
    fn build(triggers: &HashMap<String, Trigger>) -> Self {
        let mut buckets: HashMap<String, Vec<Trigger>> = HashMap::new();
        for trigger in triggers.values() {
            if !trigger.active {
                continue;
            }
            for channel_id in &trigger.channel_ids {
                buckets
                    .entry(channel_id.clone())
                    .or_default()
                    .push(trigger.clone());
            }
        }
        // Stable order within a bucket
        for bucket in buckets.values_mut() {
            bucket.sort_by(|a, b| a.id.cmp(&b.id));
        }
        Self { buckets }
    }

    /// Triggers listening on the given channel, including the "all" bucket,
    /// deduplicated by id.
    pub fn candidates(&self, channel_id: &str) -> Vec<&Trigger> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for bucket_key in [channel_id, ALL_CHANNELS] {
            if let Some(bucket) = self.buckets.get(bucket_key) {
                for trigger in bucket {
                    if !seen.contains(&&trigger.id) {
                        seen.push(&trigger.id);
                        out.push(trigger);
                    }
                }
            }
        }
        out
    }

    /// Every (channel key, trigger) pair, deduplicated by trigger id keeping
    /// the first bucket encountered. Used by member-scoped events that are
    /// not tied to one channel.
    pub fn all_entries(&self) -> Vec<(&str, &Trigger)> {
        let mut keys: Vec<&String> = self.buckets.keys().collect();
        keys.sort();
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for key in keys {
            for trigger in &self.buckets[key] {
                if !seen.contains(&&trigger.id) {
                    seen.push(&trigger.id);
                    out.push((key.as_str(), trigger));
                }
            }
        }
        out
    }

    /// Number of channel buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

struct RegistryInner {
    triggers: HashMap<String, Trigger>,
    index: Arc<ChannelIndex>,
}

/// Process-lifetime store of trigger definitions.
pub struct TriggerRegistry {
    inner: RwLock<RegistryInner>,
}

impl TriggerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(RegistryInner {
                triggers: HashMap::new(),
                index: Arc::new(ChannelIndex::default()),
            }),
        })
    }

    /// Insert or replace a trigger definition and rebuild the channel index.
    ///
    /// Empty `channel_ids` is normalized to `["all"]`. Inactive triggers are
    /// retained in the registry but excluded from the rebuilt index.
    pub async fn upsert(&self, mut trigger: Trigger) {
        if trigger.channel_ids.is_empty() {
            trigger.channel_ids = vec![ALL_CHANNELS.to_string()];
        }

        let mut inner = self.inner.write().await;
        debug!(trigger_id = %trigger.id, active = trigger.active, "trigger upsert");
        inner.triggers.insert(trigger.id.clone(), trigger);
        inner.index = Arc::new(ChannelIndex::build(&inner.triggers));
    }

    /// Mark a trigger inactive (delivery-failure recovery) and rebuild.
    ///
    /// Returns true when the trigger existed and was a command trigger, so
    /// the caller can re-batch command registration.
    pub async fn deactivate(&self, trigger_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(trigger) = inner.triggers.get_mut(trigger_id) else {
            return false;
        };
        debug!(%trigger_id, "trigger deactivated");
        trigger.active = false;
        let was_command = trigger.kind == TriggerKind::Command;
        inner.index = Arc::new(ChannelIndex::build(&inner.triggers));
        was_command
    }

    /// Current channel index snapshot.
    pub async fn index(&self) -> Arc<ChannelIndex> {
        self.inner.read().await.index.clone()
    }

    /// Look up a trigger by id.
    pub async fn get(&self, trigger_id: &str) -> Option<Trigger> {
        self.inner.read().await.triggers.get(trigger_id).cloned()
    }

    /// All active command-kind triggers, sorted by id.
    pub async fn active_commands(&self) -> Vec<Trigger> {
        let inner = self.inner.read().await;
        let mut commands: Vec<Trigger> = inner
            .triggers
            .values()
            .filter(|t| t.active && t.kind == TriggerKind::Command)
            .cloned()
            .collect();
        commands.sort_by(|a, b| a.id.cmp(&b.id));
        commands
    }

    /// Number of registered triggers (active and inactive).
    pub async fn len(&self) -> usize {
        self.inner.read().await.triggers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.triggers.is_empty()
    }
}
