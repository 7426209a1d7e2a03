//! Channel-backed event transport.
//!
//! The dispatcher only knows `EventSource` and `ReplySink`. This module is
//! the seam where a concrete messaging client plugs in: it pushes inbound
//! events into the channel's `Sender` and implements `ReplySink` with real
//! deliveries. Until one is wired up, replies land in the log.

use async_trait::async_trait;
use memestash_core::MediaResult;
use memestash_services::{EventSource, InboundEvent, ReplySink};
use tokio::sync::mpsc;

pub struct ChannelEventSource {
    rx: mpsc::Receiver<InboundEvent>,
}

/// Build a transport pair. The `Sender` side belongs to the messaging
/// adapter; the source side feeds the dispatch loop.
pub fn channel(buffer: usize) -> (mpsc::Sender<InboundEvent>, ChannelEventSource) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, ChannelEventSource { rx })
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<InboundEvent> {
        self.rx.recv().await
    }
}

pub struct LoggingReplySink;

#[async_trait]
impl ReplySink for LoggingReplySink {
    async fn send_text(&self, sender_id: &str, text: &str) {
        tracing::info!(sender = %sender_id, %text, "reply");
    }

    async fn send_results(&self, sender_id: &str, results: Vec<MediaResult>) {
        tracing::info!(sender = %sender_id, count = results.len(), "inline results");
    }
}
