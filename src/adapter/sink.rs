//! Query sinks
//!
//! Streaming operations push results into a [`QuerySink`]; the caller
//! consumes them from the paired [`QueryStream`]. Sinks are cheap to clone
//! and safe to share between concurrent aggregated tasks.

use crate::error::QueryError;
use crate::item::Item;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;

/// One result of a streaming query
#[derive(Debug, Clone)]
pub enum QueryEvent {
    Item(Item),
    Error(QueryError),
}

/// Sending half of a streaming query
#[derive(Debug, Clone)]
pub struct QuerySink {
    tx: mpsc::UnboundedSender<QueryEvent>,
}

/// Receiving half of a streaming query
#[derive(Debug)]
pub struct QueryStream {
    rx: mpsc::UnboundedReceiver<QueryEvent>,
}

/// Everything a finished query produced
#[derive(Debug, Default)]
pub struct QueryResults {
    pub items: Vec<Item>,
    pub errors: Vec<QueryError>,
}

/// Create a connected sink/stream pair
pub fn query_channel() -> (QuerySink, QueryStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QuerySink { tx }, QueryStream { rx })
}

impl QuerySink {
    /// Push an item. Returns `false` once the receiving side is gone.
    pub fn send_item(&self, item: Item) -> bool {
        self.tx.send(QueryEvent::Item(item)).is_ok()
    }

    /// Push an error. Returns `false` once the receiving side is gone.
    pub fn send_error(&self, error: QueryError) -> bool {
        self.tx.send(QueryEvent::Error(error)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl QueryStream {
    pub async fn next(&mut self) -> Option<QueryEvent> {
        self.rx.recv().await
    }

    /// Drain the stream until every sink is dropped
    pub async fn collect(mut self) -> QueryResults {
        let mut results = QueryResults::default();
        while let Some(event) = self.rx.recv().await {
            match event {
                QueryEvent::Item(item) => results.items.push(item),
                QueryEvent::Error(error) => results.errors.push(error),
            }
        }
        results
    }

    pub fn into_stream(self) -> impl Stream<Item = QueryEvent> {
        stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}
