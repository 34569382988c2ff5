//! Values returned by decorated handlers.

use std::fmt;

use futures_util::stream::{BoxStream, Stream, StreamExt};
use hapic_core::HapicFile;
use serde::Serialize;
use serde_json::Value;

/// What a handler hands back to the pipeline.
///
/// Which variant is expected depends on the output decorator: `output_body`
/// takes a [`Reply::Value`], `output_stream` a [`Reply::Stream`],
/// [`Reply::Iter`] or a JSON array, `output_file` a [`Reply::File`]. A
/// [`Reply::Response`] always bypasses output processing.
pub enum Reply<R> {
    /// A JSON value.
    Value(Value),
    /// A file payload.
    File(HapicFile),
    /// Items produced asynchronously.
    Stream(BoxStream<'static, Value>),
    /// Items produced by a blocking iterator.
    Iter(Box<dyn Iterator<Item = Value> + Send>),
    /// A ready framework response.
    Response(R),
}

impl<R> Reply<R> {
    /// Serializes `value` into a [`Reply::Value`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::Value(serde_json::to_value(value)?))
    }

    /// Wraps an item stream.
    pub fn stream<S>(items: S) -> Self
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        Self::Stream(items.boxed())
    }

    /// Wraps an item iterator. Items are pulled lazily.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::Iter(Box::new(items.into_iter()))
    }

    /// Variant name, for logs and errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::File(_) => "file",
            Self::Stream(_) => "stream",
            Self::Iter(_) => "iterator",
            Self::Response(_) => "response",
        }
    }
}

impl<R> From<Value> for Reply<R> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<R> From<HapicFile> for Reply<R> {
    fn from(file: HapicFile) -> Self {
        Self::File(file)
    }
}

impl<R> fmt::Debug for Reply<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::File(file) => f.debug_tuple("File").field(file).finish(),
            other => write!(f, "Reply::{}", other.kind()),
        }
    }
}
