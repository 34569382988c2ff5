//! Output streaming: per-item validation and newline-delimited encoding.
//!
//! Items are pulled one at a time, only when the consumer asks for the next
//! chunk. An item failing validation is either skipped or ends the stream;
//! the response status is never changed once streaming started.

use std::future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use hapic_core::{ChunkIter, ProcessError, Processor};
use serde_json::Value;

/// Per-stream settings shared by the async and blocking encoders.
#[derive(Debug, Clone)]
pub(crate) struct ItemEncoder {
    processor: Option<Arc<dyn Processor>>,
    ignore_on_error: bool,
    controller: Arc<str>,
}

impl ItemEncoder {
    /// Validates every item with `processor`.
    pub(crate) fn new(
        processor: Arc<dyn Processor>,
        ignore_on_error: bool,
        controller: &str,
    ) -> Self {
        Self {
            processor: Some(processor),
            ignore_on_error,
            controller: controller.into(),
        }
    }

    /// Encodes items as they come, without validation.
    pub(crate) fn passthrough(controller: &str) -> Self {
        Self {
            processor: None,
            ignore_on_error: false,
            controller: controller.into(),
        }
    }

    fn encode(&self, item: &Value) -> Result<Bytes, ProcessError> {
        let dumped = match &self.processor {
            Some(processor) => processor.dump_output(item)?,
            None => item.clone(),
        };
        let mut line = dumped.to_string().into_bytes();
        line.push(b'\n');
        Ok(Bytes::from(line))
    }

    fn encode_logged(&self, item: &Value) -> Option<Bytes> {
        match self.encode(item) {
            Ok(chunk) => Some(chunk),
            Err(err) => {
                if self.ignore_on_error {
                    tracing::warn!(controller = %self.controller, error = %err, "skipping invalid stream item");
                } else {
                    tracing::warn!(controller = %self.controller, error = %err, "invalid stream item, ending stream");
                }
                None
            }
        }
    }

    /// Encodes an async item stream.
    pub(crate) fn encode_stream(self, items: BoxStream<'static, Value>) -> BoxStream<'static, Bytes> {
        let ignore_on_error = self.ignore_on_error;
        let encoded = items.map(move |item| self.encode_logged(&item));
        if ignore_on_error {
            encoded.filter_map(future::ready).boxed()
        } else {
            // take_while stops polling upstream at the first invalid item.
            encoded
                .take_while(|chunk| future::ready(chunk.is_some()))
                .filter_map(future::ready)
                .boxed()
        }
    }

    /// Encodes a blocking item iterator.
    pub(crate) fn encode_iter(self, items: Box<dyn Iterator<Item = Value> + Send>) -> ChunkIter {
        let ignore_on_error = self.ignore_on_error;
        let encoded = items.map(move |item| self.encode_logged(&item));
        if ignore_on_error {
            Box::new(encoded.flatten())
        } else {
            Box::new(encoded.map_while(|chunk| chunk))
        }
    }
}
