//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, Mutex};
use tracing::{info_span, warn};
use tracing_futures::Instrument;
use uuid::Uuid;

use crate::config::{ClientConfig, NULL_VALUE};
use crate::error::{IllegalArgument, RevisionedStreamError, TruncatedData};
use crate::revision::{revision_after, Revision};
use crate::segment::{PendingEvent, SegmentMetadata, SegmentReader, SegmentWriter};
use crate::serializer::Serializer;
use crate::stream_iterator::StreamIterator;

/// The reader and writer handles a `RevisionedStreamClient` exclusively owns
/// for its lifetime, serialized behind a single guard so that `submit ->
/// flush -> await` on an append and the `(starting_offset, write_offset)`
/// snapshot a new iterator takes are never interleaved with each other.
///
/// The metadata handle lives outside this guard (see `RevisionedStreamClient::
/// metadata`) so that `oldest_revision()` -- a single, self-contained metadata
/// read -- never blocks behind a slow in-flight append holding this lock.
pub(crate) struct Inner {
    pub(crate) reader: Box<dyn SegmentReader>,
    pub(crate) writer: Box<dyn SegmentWriter>,
}

/// A durable, single-segment log of typed, strongly-ordered values.
///
/// Bound to exactly one backing segment and one user-supplied serializer for
/// its whole lifetime. Thread-safe for concurrent callers on one instance --
/// every operation that touches the reader or writer handle takes the same
/// internal guard, mirroring the donor crate's own preference for a single
/// `tokio::sync::Mutex` over the resources a reactor owns rather than
/// fine-grained locking. The metadata handle is reached independently of that
/// guard so a bare metadata read never queues up behind an in-flight append.
pub struct RevisionedStreamClient<T, S: Serializer<T>> {
    inner: Arc<Mutex<Inner>>,
    metadata: Arc<dyn SegmentMetadata>,
    segment_id: u128,
    client_id: Uuid,
    config: ClientConfig,
    serializer: Arc<S>,
    runtime_handle: Handle,
    _marker: PhantomData<T>,
}

impl<T, S> RevisionedStreamClient<T, S>
where
    S: Serializer<T>,
{
    /// Binds a client to one segment's three handles. Not exposed to
    /// downstream callers directly -- in a full deployment a client factory
    /// (analogous to the donor's `ClientFactory::create_byte_stream_writer`)
    /// would open these handles against the real segment store and call
    /// this constructor; tests wire it up against `mock::InMemorySegment`.
    pub fn new(
        segment_id: u128,
        reader: Box<dyn SegmentReader>,
        writer: Box<dyn SegmentWriter>,
        metadata: Box<dyn SegmentMetadata>,
        serializer: S,
        config: ClientConfig,
        runtime_handle: Handle,
    ) -> Self {
        RevisionedStreamClient {
            inner: Arc::new(Mutex::new(Inner { reader, writer })),
            metadata: Arc::from(metadata),
            segment_id,
            client_id: Uuid::new_v4(),
            config,
            serializer: Arc::new(serializer),
            runtime_handle,
            _marker: PhantomData,
        }
    }

    /// Unconditionally appends `value`. Returns once the append has been
    /// durably acknowledged by the segment provider.
    pub async fn write(&self, value: &T) -> Result<(), RevisionedStreamError> {
        let payload = self.serializer.serialize(value)?;
        self.check_payload_size(&payload)?;

        // Submit, flush, and await the completion all under the same guard
        // that `read_from`'s snapshot and `write_if_at`'s offset check use, so
        // the three never interleave on one client instance.
        let inner = self.inner.lock().await;
        let (tx, rx) = oneshot::channel();
        inner
            .writer
            .submit(PendingEvent::Unconditional {
                payload,
                completion: tx,
            })
            .await?;
        inner.writer.flush().await?;
        let span = info_span!("append", client_id = %self.client_id, segment_id = %self.segment_id);
        let result = await_completion(rx).instrument(span).await;
        drop(inner);
        result
    }

    /// Appends `value` only if `expected` is still the latest revision at
    /// commit time. Returns the new revision on success, or `None` if another
    /// writer raced ahead -- that is a legitimate outcome, not an error.
    pub async fn write_if_at(
        &self,
        expected: Revision,
        value: &T,
    ) -> Result<Option<Revision>, RevisionedStreamError> {
        if expected.segment_id() != self.segment_id {
            return IllegalArgument {
                operation: "write_if_at",
                error_msg: "expected revision belongs to a different segment".to_owned(),
            }
            .fail();
        }

        let payload = self.serializer.serialize(value)?;
        self.check_payload_size(&payload)?;
        let payload_size = payload.len();

        // Submit, flush, and await the completion all under the same guard
        // that `read_from`'s snapshot and `write`'s append use, so the three
        // never interleave on one client instance.
        let inner = self.inner.lock().await;
        let (tx, rx) = oneshot::channel();
        inner
            .writer
            .submit(PendingEvent::Conditional {
                payload,
                expected_offset: expected.byte_offset(),
                completion: tx,
            })
            .await?;
        inner.writer.flush().await?;
        let span = info_span!("conditional_append", client_id = %self.client_id, segment_id = %self.segment_id);
        let committed = await_conditional_completion(rx).instrument(span).await;
        drop(inner);
        let committed = committed?;

        if committed {
            Ok(Some(revision_after(
                self.segment_id,
                expected.byte_offset(),
                payload_size,
                self.config.frame_overhead(),
            )))
        } else {
            Ok(None)
        }
    }

    /// Returns a snapshot-bounded iterator over `[start, write_offset_now)`.
    /// Records appended after this call are not visible through the returned
    /// iterator; call `read_from` again to see them.
    pub async fn read_from(&self, start: Revision) -> Result<StreamIterator<T, S>, RevisionedStreamError> {
        if start.segment_id() != self.segment_id {
            return IllegalArgument {
                operation: "read_from",
                error_msg: "start revision belongs to a different segment".to_owned(),
            }
            .fail();
        }

        let inner = self.inner.lock().await;
        let info = self.metadata.get_segment_info().await?;
        drop(inner);

        if start.byte_offset() < info.starting_offset {
            return TruncatedData {
                requested_offset: start.byte_offset(),
                starting_offset: info.starting_offset,
            }
            .fail();
        }

        Ok(StreamIterator {
            inner: self.inner.clone(),
            segment_id: self.segment_id,
            serializer: self.serializer.clone(),
            cursor: start.byte_offset(),
            upper_bound: info.write_offset,
            runtime_handle: self.runtime_handle.clone(),
            _marker: PhantomData,
        })
    }

    /// The revision at the current write offset -- the most recently
    /// committed position in the segment.
    pub async fn latest_revision(&self) -> Result<Revision, RevisionedStreamError> {
        let inner = self.inner.lock().await;
        let offset = self.metadata.fetch_current_write_offset().await?;
        drop(inner);
        Ok(Revision::new(self.segment_id, offset))
    }

    /// The revision at the current starting offset -- the oldest position
    /// still readable after any prior truncation. Does not take the guard: a
    /// single metadata read needs no coordination with reader/writer state.
    pub async fn oldest_revision(&self) -> Result<Revision, RevisionedStreamError> {
        let info = self.metadata.get_segment_info().await?;
        Ok(Revision::new(self.segment_id, info.starting_offset))
    }

    /// Fetches the persisted mark, or `None` if it has never been set.
    pub async fn get_mark(&self) -> Result<Option<Revision>, RevisionedStreamError> {
        let inner = self.inner.lock().await;
        let raw = self.metadata.fetch_attribute(self.config.mark_attribute_id()).await?;
        drop(inner);
        Ok(decode_mark(self.segment_id, raw))
    }

    /// Compare-and-sets the mark. Returns `true` iff the persisted slot held
    /// `expected` at the moment of the call, in which case it now holds
    /// `new`. The client does not enforce monotonicity -- composing CAS calls
    /// to do so is the caller's responsibility.
    pub async fn compare_and_set_mark(
        &self,
        expected: Option<Revision>,
        new: Option<Revision>,
    ) -> Result<bool, RevisionedStreamError> {
        if let Some(r) = expected {
            self.assert_same_segment(r, "compare_and_set_mark")?;
        }
        if let Some(r) = new {
            self.assert_same_segment(r, "compare_and_set_mark")?;
        }

        let expected_raw = expected.map_or(NULL_VALUE, |r| r.byte_offset());
        let new_raw = new.map_or(NULL_VALUE, |r| r.byte_offset());

        let inner = self.inner.lock().await;
        let result = self
            .metadata
            .compare_and_set_attribute(self.config.mark_attribute_id(), expected_raw, new_raw)
            .await;
        drop(inner);
        result
    }

    /// Truncates the segment's prefix up to `r`. After this returns, every
    /// revision strictly below `r` is unreadable; iterators already
    /// constructed over now-truncated bytes will raise `TruncatedData` on
    /// their next step.
    pub async fn truncate_to(&self, r: Revision) -> Result<(), RevisionedStreamError> {
        self.assert_same_segment(r, "truncate_to")?;
        let inner = self.inner.lock().await;
        let result = self.metadata.truncate(r.byte_offset()).await;
        drop(inner);
        result
    }

    /// Closes the writer, metadata handle, and reader, in that order. A
    /// sealed-segment report from the writer's close is logged as a warning
    /// and does not fail the call -- at minimum, double-close of the
    /// underlying handles must not panic the process.
    pub async fn close(&self) -> Result<(), RevisionedStreamError> {
        let inner = self.inner.lock().await;
        if let Err(e) = inner.writer.close().await {
            warn!(client_id = %self.client_id, "writer close reported sealed segment, ignoring: {}", e);
        }
        self.metadata.close().await?;
        inner.reader.close().await?;
        Ok(())
    }

    fn assert_same_segment(&self, r: Revision, operation: &str) -> Result<(), RevisionedStreamError> {
        if r.segment_id() != self.segment_id {
            return IllegalArgument {
                operation: operation.to_owned(),
                error_msg: "revision belongs to a different segment".to_owned(),
            }
            .fail();
        }
        Ok(())
    }

    fn check_payload_size(&self, payload: &[u8]) -> Result<(), RevisionedStreamError> {
        if payload.len() > self.config.max_record_size() {
            return IllegalArgument {
                operation: "write",
                error_msg: format!(
                    "serialized payload of {} bytes exceeds max_record_size {}",
                    payload.len(),
                    self.config.max_record_size()
                ),
            }
            .fail();
        }
        Ok(())
    }
}

fn decode_mark(segment_id: u128, raw: i64) -> Option<Revision> {
    if raw == NULL_VALUE {
        None
    } else {
        Some(Revision::new(segment_id, raw))
    }
}

async fn await_completion(rx: oneshot::Receiver<Result<(), RevisionedStreamError>>) -> Result<(), RevisionedStreamError> {
    match rx.await {
        Ok(result) => result,
        Err(_) => crate::error::Unknown {
            operation: "await append completion",
            error_msg: "completion channel dropped without a reply".to_owned(),
        }
        .fail(),
    }
}

async fn await_conditional_completion(
    rx: oneshot::Receiver<Result<bool, RevisionedStreamError>>,
) -> Result<bool, RevisionedStreamError> {
    match rx.await {
        Ok(result) => result,
        Err(_) => crate::error::Unknown {
            operation: "await conditional append completion",
            error_msg: "completion channel dropped without a reply".to_owned(),
        }
        .fail(),
    }
}
