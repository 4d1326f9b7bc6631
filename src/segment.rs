//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! Trait contracts for the segment store the `RevisionedStreamClient` is
//! layered on. Everything in this module is a collaborator the client
//! *consumes*: append, read-at-offset, seal detection, truncation, and
//! attribute CAS. The wire framing and network transport behind a real
//! implementation of these traits live in the segment store's own client, not
//! here -- see `mock::InMemorySegment` for a reference implementation used by
//! this crate's own tests.

use async_trait::async_trait;
use derive_new::new;
#[cfg(test)]
use mockall::automock;
use tokio::sync::oneshot;

use crate::error::RevisionedStreamError;

/// A framed read returned by `SegmentReader::read`.
#[derive(Debug, Clone, new)]
pub struct ReadResult {
    pub data: Vec<u8>,
    pub end_of_segment: bool,
}

/// Point-in-time metadata snapshot for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct SegmentInfo {
    pub starting_offset: i64,
    pub write_offset: i64,
    pub is_sealed: bool,
}

/// Resolves to `true` when a conditional append committed, `false` when the
/// write offset had moved and the append was rejected.
pub type ConditionalCompletion = oneshot::Receiver<Result<bool, RevisionedStreamError>>;
/// Resolves once an unconditional append has been durably acknowledged.
pub type UnconditionalCompletion = oneshot::Receiver<Result<(), RevisionedStreamError>>;

/// One event handed to the segment writer: a payload plus the promise the
/// writer resolves once the append commits (or is rejected, for conditional
/// events), and an optional expected write offset that turns the append
/// conditional.
pub enum PendingEvent {
    Unconditional {
        payload: Vec<u8>,
        completion: oneshot::Sender<Result<(), RevisionedStreamError>>,
    },
    Conditional {
        payload: Vec<u8>,
        expected_offset: i64,
        completion: oneshot::Sender<Result<bool, RevisionedStreamError>>,
    },
}

/// Consumed segment writer: submit pending events, flush, close.
///
/// `submit` enqueues; `flush` is the point at which the provider is asked to
/// actually commit whatever has been submitted. A real implementation batches
/// and pipelines across the network; the reference `mock::InMemorySegment`
/// commits synchronously on `flush`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SegmentWriter: Send + Sync {
    async fn submit(&self, event: PendingEvent) -> Result<(), RevisionedStreamError>;
    async fn flush(&self) -> Result<(), RevisionedStreamError>;
    /// May resolve to `Err(RevisionedStreamError::SealedOnClose { .. })`; the
    /// client logs that case as a warning rather than propagating it.
    async fn close(&self) -> Result<(), RevisionedStreamError>;
}

/// Consumed segment reader: seek, read one frame, report current position.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SegmentReader: Send + Sync {
    async fn set_offset(&self, offset: i64) -> Result<(), RevisionedStreamError>;
    async fn read(&self) -> Result<ReadResult, RevisionedStreamError>;
    async fn get_offset(&self) -> Result<i64, RevisionedStreamError>;
    async fn close(&self) -> Result<(), RevisionedStreamError>;
}

/// Consumed segment metadata handle: info, write offset, attribute CAS,
/// truncation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SegmentMetadata: Send + Sync {
    async fn get_segment_info(&self) -> Result<SegmentInfo, RevisionedStreamError>;
    async fn fetch_current_write_offset(&self) -> Result<i64, RevisionedStreamError> {
        Ok(self.get_segment_info().await?.write_offset)
    }
    async fn fetch_attribute(&self, slot: i64) -> Result<i64, RevisionedStreamError>;
    async fn compare_and_set_attribute(
        &self,
        slot: i64,
        expected: i64,
        new: i64,
    ) -> Result<bool, RevisionedStreamError>;
    async fn truncate(&self, offset: i64) -> Result<(), RevisionedStreamError>;
    async fn close(&self) -> Result<(), RevisionedStreamError>;
}
