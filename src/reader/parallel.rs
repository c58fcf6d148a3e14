//! Optional high-throughput wrapper: queues produced rows through a bounded
//! channel between a single producer thread and the consumer. Backpressure
//! comes from the channel's capacity alone — an optimization, not a
//! correctness boundary.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::JoinHandle;

use crate::error::TabqlError;
use crate::types::Row;

enum Message {
    Row(Row),
    Done,
    Error(String),
}

/// Drives a `Reader`'s iterator on a background thread, handing rows to the
/// consumer through a bounded `mpsc` channel — plain `std::sync` primitives,
/// no extra channel crate needed for a single bounded producer/consumer.
pub struct ParallelIterator {
    rx: Option<Receiver<Message>>,
    handle: Option<JoinHandle<()>>,
    done: bool,
}

impl ParallelIterator {
    /// `capacity` bounds how many produced-but-not-yet-consumed rows may
    /// queue up before the producer blocks.
    pub fn spawn<I>(capacity: usize, rows: I) -> Self
    where
        I: Iterator<Item = Row> + Send + 'static,
    {
        let (tx, rx): (SyncSender<Message>, Receiver<Message>) = mpsc::sync_channel(capacity.max(1));
        let handle = std::thread::spawn(move || {
            for row in rows {
                if tx.send(Message::Row(row)).is_err() {
                    // consumer dropped — stop producing.
                    return;
                }
            }
            let _ = tx.send(Message::Done);
        });
        Self { rx: Some(rx), handle: Some(handle), done: false }
    }
}

impl Iterator for ParallelIterator {
    type Item = std::result::Result<Row, TabqlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let recv_result = self.rx.as_ref().map(|rx| rx.recv());
        match recv_result {
            Some(Ok(Message::Row(row))) => Some(Ok(row)),
            Some(Ok(Message::Done)) => {
                self.done = true;
                self.join_producer();
                None
            }
            Some(Ok(Message::Error(e))) => {
                self.done = true;
                self.join_producer();
                Some(Err(TabqlError::IoError(std::io::Error::other(e))))
            }
            Some(Err(_)) | None => {
                self.done = true;
                self.join_producer();
                None
            }
        }
    }
}

impl ParallelIterator {
    fn join_producer(&mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for ParallelIterator {
    fn drop(&mut self) {
        // Drop the receiver first so a producer still blocked in `send`
        // observes a disconnected channel and returns, instead of joining
        // on a thread that can never finish.
        self.rx.take();
        self.join_producer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use crate::types::Value;

    #[test]
    fn streams_all_rows_in_order() {
        let rows = (0..5).map(|i| {
            let mut r: Row = IndexMap::new();
            r.insert("i".to_string(), Value::Integer(i));
            r
        });
        let collected: Vec<_> = ParallelIterator::spawn(2, rows).filter_map(|r| r.ok()).collect();
        assert_eq!(collected.len(), 5);
        assert!(matches!(collected[0].get("i"), Some(Value::Integer(0))));
    }
}
