//! Bot event model and command dispatch.
//!
//! The messaging transport is an external collaborator: it feeds
//! `InboundEvent`s through an `EventSource` and receives replies through a
//! `ReplySink`. The dispatcher runs the authorization interceptor before
//! every handler, so a newly added command cannot forget the check.

use crate::ingest::{format_dump, IngestOutcome, IngestionPipeline};
use crate::search::SearchEngine;
use async_trait::async_trait;
use memestash_core::{token, AppError, MediaRecord, MediaResult};
use std::collections::HashSet;
use std::sync::Arc;

const HELP_TEXT: &str = "Hi! I'm your personal meme storage bot. \
    Send me a meme and I'll save it for you. \
    You can also use inline mode to search for your memes by tags.";
const UNAUTHORIZED_TEXT: &str = "You are not authorized to use this bot.";
const CLEAR_PROMPT: &str = "Are you sure you want to clear the entire meme database? \
    This action cannot be undone. Repeat the command with confirmation to proceed.";

/// Operator commands, beyond plain photo and query events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Dump,
    Clear { confirmed: bool },
    RegenerateThumbnails,
    Rescan,
    Retag,
}

/// One event delivered by the messaging transport.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    Photo {
        sender_id: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
    InlineQuery {
        sender_id: String,
        text: String,
    },
    Command {
        sender_id: String,
        command: Command,
    },
}

impl InboundEvent {
    pub fn sender_id(&self) -> &str {
        match self {
            InboundEvent::Photo { sender_id, .. }
            | InboundEvent::InlineQuery { sender_id, .. }
            | InboundEvent::Command { sender_id, .. } => sender_id,
        }
    }
}

/// Inbound side of the transport seam.
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` when the transport has shut down.
    async fn next_event(&mut self) -> Option<InboundEvent>;
}

/// Outbound side of the transport seam.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_text(&self, sender_id: &str, text: &str);
    async fn send_results(&self, sender_id: &str, results: Vec<MediaResult>);
}

/// Builds signed, expiring links for search results.
#[derive(Clone)]
pub struct LinkMinter {
    public_url: String,
    secret: Vec<u8>,
}

impl LinkMinter {
    pub fn new(public_url: String, secret: Vec<u8>) -> Self {
        Self { public_url, secret }
    }

    /// One token authorizes the asset name; both routes accept it.
    pub fn mint(&self, record: &MediaRecord) -> MediaResult {
        let token = token::issue(&record.asset_name, &self.secret);
        MediaResult {
            id: record.id,
            photo_url: format!("{}/memes/{}", self.public_url, token),
            thumbnail_url: format!("{}/thumbnails/{}", self.public_url, token),
        }
    }
}

pub struct Dispatcher {
    pipeline: IngestionPipeline,
    search: SearchEngine,
    links: LinkMinter,
    /// `None` means unrestricted (logged loudly at startup).
    allowed_senders: Option<HashSet<String>>,
}

impl Dispatcher {
    pub fn new(
        pipeline: IngestionPipeline,
        search: SearchEngine,
        links: LinkMinter,
        allowed_senders: Option<HashSet<String>>,
    ) -> Self {
        Self {
            pipeline,
            search,
            links,
            allowed_senders,
        }
    }

    fn is_authorized(&self, sender_id: &str) -> bool {
        match &self.allowed_senders {
            Some(allowed) => allowed.contains(sender_id),
            None => true,
        }
    }

    /// Handle one event end to end. The authorization check runs first
    /// for every event kind; inline queries get empty results instead of
    /// a denial message so the client UI stays quiet.
    pub async fn handle(&self, event: InboundEvent, sink: &dyn ReplySink) {
        let sender_id = event.sender_id().to_string();
        if !self.is_authorized(&sender_id) {
            tracing::warn!(sender = %sender_id, "unauthorized access denied");
            match event {
                InboundEvent::InlineQuery { .. } => sink.send_results(&sender_id, Vec::new()).await,
                _ => sink.send_text(&sender_id, UNAUTHORIZED_TEXT).await,
            }
            return;
        }

        match event {
            InboundEvent::Photo { bytes, caption, .. } => {
                self.handle_photo(&sender_id, &bytes, caption.as_deref(), sink)
                    .await
            }
            InboundEvent::InlineQuery { text, .. } => {
                self.handle_query(&sender_id, &text, sink).await
            }
            InboundEvent::Command { command, .. } => {
                self.handle_command(&sender_id, command, sink).await
            }
        }
    }

    async fn handle_photo(
        &self,
        sender_id: &str,
        bytes: &[u8],
        caption: Option<&str>,
        sink: &dyn ReplySink,
    ) {
        match self.pipeline.ingest(bytes, caption).await {
            Ok(IngestOutcome::Stored { tags, .. }) => {
                let joined = tags.iter().cloned().collect::<Vec<_>>().join(", ");
                sink.send_text(sender_id, &format!("Meme saved with tags: {}", joined))
                    .await;
            }
            Ok(IngestOutcome::Duplicate) => {
                sink.send_text(sender_id, "This meme is already saved.").await;
            }
            Err(e) => {
                tracing::error!(sender = %sender_id, error = %e, "ingestion failed");
                sink.send_text(sender_id, e.user_message()).await;
            }
        }
    }

    async fn handle_query(&self, sender_id: &str, text: &str, sink: &dyn ReplySink) {
        match self.search.search_text(text).await {
            Ok(records) => {
                let results = records.iter().map(|r| self.links.mint(r)).collect();
                sink.send_results(sender_id, results).await;
            }
            Err(e) => {
                tracing::error!(sender = %sender_id, error = %e, "search failed");
                sink.send_results(sender_id, Vec::new()).await;
            }
        }
    }

    async fn handle_command(&self, sender_id: &str, command: Command, sink: &dyn ReplySink) {
        let reply = match command {
            Command::Start => HELP_TEXT.to_string(),
            Command::Dump => match self.pipeline.repository().list_all().await {
                Ok(records) => format_dump(&records),
                Err(e) => self.log_and_message(sender_id, e),
            },
            Command::Clear { confirmed: false } => CLEAR_PROMPT.to_string(),
            Command::Clear { confirmed: true } => {
                match self.pipeline.repository().clear().await {
                    Ok(()) => "Database cleared.".to_string(),
                    Err(e) => self.log_and_message(sender_id, e),
                }
            }
            Command::RegenerateThumbnails => match self.pipeline.regenerate_thumbnails().await {
                Ok(report) => format!(
                    "Thumbnail regeneration complete.\nGenerated: {}\nSkipped: {}\nMissing originals: {}\nFailed: {}",
                    report.generated, report.skipped_existing, report.missing_original, report.failed
                ),
                Err(e) => self.log_and_message(sender_id, e),
            },
            Command::Rescan => match self.pipeline.rescan().await {
                Ok(report) => format!(
                    "Rescan complete.\nAdded: {}\nAlready known: {}\nFailed: {}",
                    report.added, report.already_known, report.failed
                ),
                Err(e) => self.log_and_message(sender_id, e),
            },
            Command::Retag => match self.pipeline.retag_all().await {
                Ok(report) => format!(
                    "Retag complete.\nRetagged: {}\nSkipped (missing file): {}",
                    report.retagged, report.skipped_missing
                ),
                Err(e) => self.log_and_message(sender_id, e),
            },
        };
        sink.send_text(sender_id, &reply).await;
    }

    fn log_and_message(&self, sender_id: &str, e: AppError) -> String {
        tracing::error!(sender = %sender_id, error = %e, "command failed");
        e.user_message().to_string()
    }
}

/// Drive the dispatch loop until the source closes. Every event is an
/// independent task so slow work (OCR, thumbnailing) never blocks the
/// loop's ability to accept the next event.
pub async fn run_dispatch_loop<S: EventSource>(
    dispatcher: Arc<Dispatcher>,
    mut source: S,
    sink: Arc<dyn ReplySink>,
) {
    while let Some(event) = source.next_event().await {
        let dispatcher = Arc::clone(&dispatcher);
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            dispatcher.handle(event, sink.as_ref()).await;
        });
    }
    tracing::info!("event source closed, dispatch loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use memestash_db::{open_in_memory, MemeRepository};
    use memestash_ocr::DisabledExtractor;
    use memestash_storage::AssetStore;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingSink {
        texts: Mutex<Vec<(String, String)>>,
        results: Mutex<Vec<(String, Vec<MediaResult>)>>,
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send_text(&self, sender_id: &str, text: &str) {
            self.texts
                .lock()
                .unwrap()
                .push((sender_id.to_string(), text.to_string()));
        }
        async fn send_results(&self, sender_id: &str, results: Vec<MediaResult>) {
            self.results
                .lock()
                .unwrap()
                .push((sender_id.to_string(), results));
        }
    }

    async fn dispatcher(allowed: Option<&[&str]>) -> (tempfile::TempDir, Dispatcher) {
        let dir = tempdir().unwrap();
        let store = AssetStore::new(dir.path()).await.unwrap();
        let repo = MemeRepository::new(open_in_memory().await.unwrap());
        let pipeline =
            IngestionPipeline::new(repo.clone(), store, Arc::new(DisabledExtractor));
        let search = SearchEngine::new(repo);
        let links = LinkMinter::new("https://memes.example.com".into(), b"secret".to_vec());
        let allowed_senders =
            allowed.map(|ids| ids.iter().map(|s| s.to_string()).collect::<HashSet<_>>());
        (
            dir,
            Dispatcher::new(pipeline, search, links, allowed_senders),
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([1, 2, 3, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn unlisted_sender_denied_for_every_event_kind() {
        let (_dir, dispatcher) = dispatcher(Some(&["42"])).await;
        let sink = RecordingSink::default();

        dispatcher
            .handle(
                InboundEvent::Photo {
                    sender_id: "99".into(),
                    bytes: png_bytes(),
                    caption: None,
                },
                &sink,
            )
            .await;
        dispatcher
            .handle(
                InboundEvent::Command {
                    sender_id: "99".into(),
                    command: Command::Dump,
                },
                &sink,
            )
            .await;
        dispatcher
            .handle(
                InboundEvent::InlineQuery {
                    sender_id: "99".into(),
                    text: "cat".into(),
                },
                &sink,
            )
            .await;

        let texts = sink.texts.lock().unwrap();
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|(_, t)| t == UNAUTHORIZED_TEXT));
        // Inline queries answer with empty results, not a message.
        let results = sink.results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_empty());
    }

    #[tokio::test]
    async fn listed_sender_saves_and_searches() {
        let (_dir, dispatcher) = dispatcher(Some(&["42"])).await;
        let sink = RecordingSink::default();

        dispatcher
            .handle(
                InboundEvent::Photo {
                    sender_id: "42".into(),
                    bytes: png_bytes(),
                    caption: Some("funny cat".into()),
                },
                &sink,
            )
            .await;
        {
            let texts = sink.texts.lock().unwrap();
            assert!(texts[0].1.starts_with("Meme saved with tags:"));
            assert!(texts[0].1.contains("cat"));
        }

        dispatcher
            .handle(
                InboundEvent::InlineQuery {
                    sender_id: "42".into(),
                    text: "cat".into(),
                },
                &sink,
            )
            .await;
        let results = sink.results.lock().unwrap();
        let (_, found) = &results[0];
        assert_eq!(found.len(), 1);
        assert!(found[0].photo_url.starts_with("https://memes.example.com/memes/"));
        assert!(found[0].thumbnail_url.contains("/thumbnails/"));
    }

    #[tokio::test]
    async fn duplicate_photo_reports_already_saved() {
        let (_dir, dispatcher) = dispatcher(None).await;
        let sink = RecordingSink::default();
        let bytes = png_bytes();

        for _ in 0..2 {
            dispatcher
                .handle(
                    InboundEvent::Photo {
                        sender_id: "7".into(),
                        bytes: bytes.clone(),
                        caption: None,
                    },
                    &sink,
                )
                .await;
        }

        let texts = sink.texts.lock().unwrap();
        assert_eq!(texts[1].1, "This meme is already saved.");
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let (_dir, dispatcher) = dispatcher(None).await;
        let sink = RecordingSink::default();
        dispatcher
            .pipeline
            .repository()
            .insert("h1", "a.jpg", &Default::default())
            .await
            .unwrap();

        dispatcher
            .handle(
                InboundEvent::Command {
                    sender_id: "7".into(),
                    command: Command::Clear { confirmed: false },
                },
                &sink,
            )
            .await;
        assert_eq!(
            dispatcher.pipeline.repository().list_all().await.unwrap().len(),
            1
        );

        dispatcher
            .handle(
                InboundEvent::Command {
                    sender_id: "7".into(),
                    command: Command::Clear { confirmed: true },
                },
                &sink,
            )
            .await;
        assert!(dispatcher
            .pipeline
            .repository()
            .list_all()
            .await
            .unwrap()
            .is_empty());

        let texts = sink.texts.lock().unwrap();
        assert_eq!(texts[1].1, "Database cleared.");
    }

    #[tokio::test]
    async fn minted_links_verify_back_to_the_asset_name() {
        let links = LinkMinter::new("https://x".into(), b"secret".to_vec());
        let record = MediaRecord {
            id: 1,
            content_hash: "h".into(),
            asset_name: "abc.jpg".into(),
            tags: Default::default(),
        };

        let result = links.mint(&record);
        let token = result.photo_url.rsplit('/').next().unwrap();
        assert_eq!(token::verify(token, b"secret").unwrap(), "abc.jpg");
    }
}
