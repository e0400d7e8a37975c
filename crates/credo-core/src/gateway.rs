//! Port to the external generation backend.
//!
//! The gateway is the single choke point for model calls. It holds no
//! session-affine state and is safe to share across sessions and requests;
//! one instance is constructed at process start and passed by reference.

use futures::stream::BoxStream;

use crate::conversation::Turn;
use crate::error::Result;
use crate::schema::SchemaNode;

/// Lazy, finite sequence of response fragments from a streaming call.
///
/// Pull-based: consuming the stream is what drives delivery from the
/// backend. The concatenation of all `Ok` items is the complete model turn;
/// an `Err` item means the stream broke and no further items follow.
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// Operations over the external generation backend.
///
/// Structured and streaming calls are separate operations rather than one
/// call with a flag: one consumer wants a typed terminal value with
/// failure-is-no-result semantics, the other wants incremental delivery
/// where a broken stream is reported by incomplete output.
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    /// Single-shot non-streaming call: an instructional context plus prior
    /// turns, answered with the full response text.
    ///
    /// Transient backend failures are retried inside the gateway; a
    /// returned error is final. Callers that must degrade gracefully do so
    /// at their own level rather than receiving a sentinel string.
    async fn complete_once(&self, context: &str, turns: &[Turn]) -> Result<String>;

    /// One generation constrained to `schema`, parsed from the raw response
    /// text into structured data.
    ///
    /// Any transport, decode, or schema failure surfaces as an error
    /// carrying the reason; there is no automatic retry. An error means
    /// "extraction failed", never "empty result".
    async fn complete_structured(
        &self,
        context: &str,
        instruction: &str,
        schema: &SchemaNode,
    ) -> Result<serde_json::Value>;

    /// Opens a streaming call seeded with the full turn history.
    ///
    /// Not restartable; each call opens a new backend stream.
    async fn complete_streaming(&self, turns: &[Turn]) -> Result<ChunkStream>;
}
