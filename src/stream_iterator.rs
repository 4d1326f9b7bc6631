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

use crate::client::Inner;
use crate::error::{InvariantViolation, NoSuchElement, RevisionedStreamError};
use crate::revision::Revision;
use crate::serializer::Serializer;

/// A lazy, snapshot-bounded reader over `[start, write_offset_at_creation)`.
///
/// Single-pass and not restartable: once `has_next()` is `false` the iterator
/// is done for good, even if the backing segment grows afterwards -- call
/// `RevisionedStreamClient::read_from` again to see newer data. Re-seeking
/// (`set_offset`/`get_offset` on the shared reader) happens only internally,
/// driven by the iterator's own cursor.
///
/// Implements `std::iter::Iterator` for idiomatic `for` loops and combinator
/// use; `has_next`/`next_value` remain available for callers that need to
/// distinguish "exhausted" from "error" before advancing, the way the source
/// Java iterator's `hasNext()`/`next()` pair does.
pub struct StreamIterator<T, S: Serializer<T>> {
    pub(crate) inner: Arc<tokio::sync::Mutex<Inner>>,
    pub(crate) segment_id: u128,
    pub(crate) serializer: Arc<S>,
    pub(crate) cursor: i64,
    pub(crate) upper_bound: i64,
    pub(crate) runtime_handle: Handle,
    pub(crate) _marker: PhantomData<T>,
}

impl<T, S: Serializer<T>> StreamIterator<T, S> {
    /// `true` iff the cursor is strictly below the snapshot upper bound
    /// captured when this iterator was created.
    pub fn has_next(&self) -> bool {
        self.cursor < self.upper_bound
    }

    /// Advances the iterator one record. Raises `NoSuchElement` if
    /// `has_next()` is `false` rather than silently looping back.
    pub fn next_value(&mut self) -> Result<(Revision, T), RevisionedStreamError> {
        if !self.has_next() {
            return NoSuchElement { offset: self.cursor }.fail();
        }
        let handle = self.runtime_handle.clone();
        let (revision, value, new_cursor) = handle.block_on(self.read_one())?;
        self.cursor = new_cursor;
        Ok((revision, value))
    }

    async fn read_one(&self) -> Result<(Revision, T, i64), RevisionedStreamError> {
        let inner = self.inner.lock().await;
        inner.reader.set_offset(self.cursor).await?;
        let read = inner.reader.read().await?;
        if read.end_of_segment {
            return InvariantViolation {
                operation: "iterate revisioned stream",
                error_msg: format!(
                    "segment ended at offset {} before the snapshot upper bound {}",
                    self.cursor, self.upper_bound
                ),
            }
            .fail();
        }
        let new_offset = inner.reader.get_offset().await?;
        drop(inner);

        let revision = Revision::new(self.segment_id, new_offset);
        let value = self.serializer.deserialize(&read.data)?;
        Ok((revision, value, new_offset))
    }
}

impl<T, S: Serializer<T>> Iterator for StreamIterator<T, S> {
    type Item = Result<(Revision, T), RevisionedStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        Some(self.next_value())
    }
}
