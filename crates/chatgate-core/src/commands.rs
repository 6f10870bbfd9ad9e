// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command registration debouncer.
//!
//! Re-registering slash commands is a heavyweight bulk call, so trigger
//! mutations that touch command triggers are batched: each mutation resets a
//! quiescent timer, and one flush registers the full current command set.
//! Compiled specs are cached by shape so unchanged commands are reused.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chatgate_protocol::message::CommandSpec;

use crate::chat::ChatPort;
use crate::registry::TriggerRegistry;

/// Quiescent window before a flush fires.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Batches command registrations behind a debounce window.
pub struct CommandDebouncer {
    registry: Arc<TriggerRegistry>,
    chat: Arc<dyn ChatPort>,
    pending: Mutex<Option<JoinHandle<()>>>,
    cache: Mutex<HashMap<String, CommandSpec>>,
}

impl CommandDebouncer {
    pub fn new(registry: Arc<TriggerRegistry>, chat: Arc<dyn ChatPort>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            chat,
            pending: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Schedule a flush after the debounce window.
    ///
    /// A mutation arriving within the window resets the timer rather than
    /// firing twice.
    pub async fn schedule(self: &Arc<Self>) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let debouncer = self.clone();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_WINDOW).await;
            debouncer.flush().await;
        }));
    }

    /// Drop any pending flush without firing it.
    pub async fn cancel_pending(&self) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// Fire immediately, cancelling any pending timer.
    pub async fn flush_now(&self) {
        self.cancel_pending().await;
        self.flush().await;
    }

    async fn flush(&self) {
        let commands = self.registry.active_commands().await;

        if commands.is_empty() {
            // Clear stale commands and start the cache over
            debug!("no command triggers remain, clearing registered commands");
            self.cache.lock().await.clear();
            if let Err(e) = self.chat.register_commands(&[]).await {
                warn!(error = %e, "failed to clear registered commands");
            }
            return;
        }

        let mut cache = self.cache.lock().await;
        let mut parsed = Vec::with_capacity(commands.len());
        for trigger in &commands {
            let (Some(name), Some(description)) =
                (&trigger.command_name, &trigger.command_description)
            else {
                continue;
            };

            let field_kind = trigger
                .command_field
                .as_ref()
                .map(|f| format!("{:?}", f.kind))
                .unwrap_or_default();
            let cache_key = format!("{}-{}-{}", name, description, field_kind);

            if let Some(cached) = cache.get(&cache_key) {
                parsed.push(cached.clone());
                continue;
            }

            let spec = CommandSpec {
                name: name.clone(),
                description: description.clone(),
                field: trigger.command_field.clone(),
            };
            cache.insert(cache_key, spec.clone());
            parsed.push(spec);
        }
        drop(cache);

        debug!(count = parsed.len(), "registering command batch");
        if let Err(e) = self.chat.register_commands(&parsed).await {
            warn!(error = %e, "bulk command registration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChat;
    use chatgate_protocol::message::{CommandField, CommandFieldKind, Trigger, TriggerKind};

    fn command_trigger(id: &str, name: &str) -> Trigger {
        let mut trigger = Trigger::new(id, TriggerKind::Command);
        trigger.command_name = Some(name.to_string());
        trigger.command_description = Some(format!("{} command", name));
        trigger.active = true;
        trigger
    }

    async fn setup() -> (Arc<TriggerRegistry>, Arc<MockChat>, Arc<CommandDebouncer>) {
        let registry = TriggerRegistry::new();
        let chat = MockChat::new();
        let debouncer = CommandDebouncer::new(registry.clone(), chat.clone());
        (registry, chat, debouncer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_within_window_flush_once() {
        let (registry, chat, debouncer) = setup().await;

        for i in 0..5 {
            registry
                .upsert(command_trigger(&format!("wh-{}", i), &format!("cmd{}", i)))
                .await;
            debouncer.schedule().await;
        }

        tokio::time::sleep(Duration::from_millis(700)).await;

        let batches = chat.command_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_beyond_window_flush_each() {
        let (registry, chat, debouncer) = setup().await;

        for i in 0..3 {
            registry
                .upsert(command_trigger(&format!("wh-{}", i), &format!("cmd{}", i)))
                .await;
            debouncer.schedule().await;
            tokio::time::sleep(Duration::from_millis(700)).await;
        }

        assert_eq!(chat.command_batches().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_command_set_clears_registration() {
        let (registry, chat, debouncer) = setup().await;

        registry.upsert(command_trigger("wh-1", "deploy")).await;
        debouncer.flush_now().await;
        assert_eq!(chat.command_batches().len(), 1);
        assert_eq!(chat.command_batches()[0].len(), 1);

        // Deactivating the last command trigger flushes an empty set
        registry.deactivate("wh-1").await;
        debouncer.schedule().await;
        tokio::time::sleep(Duration::from_millis(700)).await;

        let batches = chat.command_batches();
        assert_eq!(batches.len(), 2);
        assert!(batches[1].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_suppresses_flush() {
        let (registry, chat, debouncer) = setup().await;

        registry.upsert(command_trigger("wh-1", "deploy")).await;
        debouncer.schedule().await;
        debouncer.cancel_pending().await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(chat.command_batches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_reuses_unchanged_specs() {
        let (registry, chat, debouncer) = setup().await;

        let mut trigger = command_trigger("wh-1", "deploy");
        trigger.command_field = Some(CommandField {
            description: "target".into(),
            required: true,
            kind: CommandFieldKind::Text,
        });
        registry.upsert(trigger.clone()).await;
        debouncer.flush_now().await;

        // Re-upsert with an unchanged shape; the compiled spec is identical
        registry.upsert(trigger).await;
        debouncer.flush_now().await;

        let batches = chat.command_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], batches[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_missing_name_or_description_skipped() {
        let (registry, chat, debouncer) = setup().await;

        let mut nameless = Trigger::new("wh-bad", TriggerKind::Command);
        nameless.active = true;
        registry.upsert(nameless).await;
        registry.upsert(command_trigger("wh-good", "deploy")).await;

        debouncer.flush_now().await;

        let batches = chat.command_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].name, "deploy");
    }
}
