//! Service layer: the ingestion pipeline and its maintenance passes, tag
//! search, and the bot command dispatcher.

pub mod bot;
pub mod ingest;
pub mod search;

pub use bot::{Dispatcher, EventSource, InboundEvent, LinkMinter, ReplySink};
pub use ingest::{IngestOutcome, IngestionPipeline};
pub use search::SearchEngine;
