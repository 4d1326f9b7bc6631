//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! An in-memory, single-process implementation of the `SegmentReader` /
//! `SegmentWriter` / `SegmentMetadata` contracts, used to exercise every
//! `RevisionedStreamClient` invariant without a real segment store. Framing,
//! truncation, sealing, and attribute CAS are modeled faithfully enough for
//! tests; there is no persistence, no network, and no sharing across
//! processes.
//!
//! Record framing on the wire: `[tag: u32 LE][len: u32 LE][payload]`, giving a
//! fixed `FRAME_OVERHEAD` of 8 bytes, matching `ClientConfig::default()`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::NULL_VALUE;
use crate::error::{CorruptedState, IllegalArgument, RevisionedStreamError, SealedOnClose, TruncatedData};
use crate::segment::{PendingEvent, ReadResult, SegmentInfo, SegmentMetadata, SegmentReader, SegmentWriter};

const RECORD_TAG: u32 = 1;
pub const FRAME_OVERHEAD: i64 = 8;

struct SharedState {
    /// Bytes from absolute offset 0 up to `write_offset`. Truncation never
    /// physically frees this buffer in the reference implementation; it only
    /// advances `starting_offset`, which is enough to enforce the contract.
    buffer: Vec<u8>,
    starting_offset: i64,
    write_offset: i64,
    sealed: bool,
    attributes: HashMap<i64, i64>,
}

impl SharedState {
    fn new() -> Self {
        SharedState {
            buffer: Vec::new(),
            starting_offset: 0,
            write_offset: 0,
            sealed: false,
            attributes: HashMap::new(),
        }
    }

    fn append_frame(&mut self, payload: &[u8]) {
        self.buffer.extend_from_slice(&RECORD_TAG.to_le_bytes());
        self.buffer.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.buffer.extend_from_slice(payload);
        self.write_offset = self.buffer.len() as i64;
    }
}

/// A single logical in-memory segment. Clone cheaply (it is just a handle to
/// shared, mutex-guarded state) and mint independent reader/writer/metadata
/// handles from it the way a real client factory mints handles bound to one
/// `ScopedSegment`.
#[derive(Clone)]
pub struct InMemorySegment {
    segment_id: u128,
    shared: Arc<Mutex<SharedState>>,
}

impl InMemorySegment {
    pub fn new(segment_id: u128) -> Self {
        InMemorySegment {
            segment_id,
            shared: Arc::new(Mutex::new(SharedState::new())),
        }
    }

    pub fn segment_id(&self) -> u128 {
        self.segment_id
    }

    pub fn writer(&self) -> InMemorySegmentWriter {
        InMemorySegmentWriter {
            segment_id: self.segment_id,
            shared: self.shared.clone(),
        }
    }

    pub fn reader(&self) -> InMemorySegmentReader {
        InMemorySegmentReader {
            segment_id: self.segment_id,
            shared: self.shared.clone(),
            offset: Mutex::new(0),
        }
    }

    pub fn metadata(&self) -> InMemorySegmentMetadata {
        InMemorySegmentMetadata {
            shared: self.shared.clone(),
        }
    }

    /// Seals the segment out of band, simulating what a concurrent sealing
    /// writer or an administrative action would do.
    pub async fn seal(&self) {
        self.shared.lock().await.sealed = true;
    }
}

pub struct InMemorySegmentWriter {
    segment_id: u128,
    shared: Arc<Mutex<SharedState>>,
}

#[async_trait]
impl SegmentWriter for InMemorySegmentWriter {
    async fn submit(&self, event: PendingEvent) -> Result<(), RevisionedStreamError> {
        let mut state = self.shared.lock().await;
        if state.sealed {
            let err = || {
                CorruptedState {
                    segment_id: format!("{:x}", self.segment_id),
                    source_msg: "segment sealed before append could be committed".to_owned(),
                }
                .build()
            };
            match event {
                PendingEvent::Unconditional { completion, .. } => {
                    let _ = completion.send(Err(err()));
                }
                PendingEvent::Conditional { completion, .. } => {
                    let _ = completion.send(Err(err()));
                }
            }
            return Ok(());
        }
        match event {
            PendingEvent::Unconditional { payload, completion } => {
                state.append_frame(&payload);
                let _ = completion.send(Ok(()));
            }
            PendingEvent::Conditional {
                payload,
                expected_offset,
                completion,
            } => {
                if state.write_offset == expected_offset {
                    state.append_frame(&payload);
                    let _ = completion.send(Ok(true));
                } else {
                    let _ = completion.send(Ok(false));
                }
            }
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), RevisionedStreamError> {
        // The reference provider commits synchronously in `submit`; flush is
        // a no-op barrier, same role it plays once real pipelining is
        // introduced by a networked implementation.
        Ok(())
    }

    async fn close(&self) -> Result<(), RevisionedStreamError> {
        let state = self.shared.lock().await;
        if state.sealed {
            return SealedOnClose {
                segment_id: format!("{:x}", self.segment_id),
            }
            .fail();
        }
        Ok(())
    }
}

pub struct InMemorySegmentReader {
    segment_id: u128,
    shared: Arc<Mutex<SharedState>>,
    offset: Mutex<i64>,
}

#[async_trait]
impl SegmentReader for InMemorySegmentReader {
    async fn set_offset(&self, offset: i64) -> Result<(), RevisionedStreamError> {
        *self.offset.lock().await = offset;
        Ok(())
    }

    async fn read(&self) -> Result<ReadResult, RevisionedStreamError> {
        let mut cursor = self.offset.lock().await;
        let state = self.shared.lock().await;

        if *cursor < state.starting_offset {
            return TruncatedData {
                requested_offset: *cursor,
                starting_offset: state.starting_offset,
            }
            .fail();
        }
        if *cursor >= state.write_offset {
            return Ok(ReadResult {
                data: Vec::new(),
                end_of_segment: true,
            });
        }

        let pos = *cursor as usize;
        let tag = u32::from_le_bytes(state.buffer[pos..pos + 4].try_into().expect("4 bytes"));
        if tag != RECORD_TAG {
            return IllegalArgument {
                operation: format!("read segment {:x}", self.segment_id),
                error_msg: "corrupt frame tag".to_owned(),
            }
            .fail();
        }
        let len = u32::from_le_bytes(state.buffer[pos + 4..pos + 8].try_into().expect("4 bytes")) as usize;
        let payload_start = pos + 8;
        let payload = state.buffer[payload_start..payload_start + len].to_vec();
        *cursor = (payload_start + len) as i64;

        Ok(ReadResult {
            data: payload,
            end_of_segment: false,
        })
    }

    async fn get_offset(&self) -> Result<i64, RevisionedStreamError> {
        Ok(*self.offset.lock().await)
    }

    async fn close(&self) -> Result<(), RevisionedStreamError> {
        Ok(())
    }
}

pub struct InMemorySegmentMetadata {
    shared: Arc<Mutex<SharedState>>,
}

#[async_trait]
impl SegmentMetadata for InMemorySegmentMetadata {
    async fn get_segment_info(&self) -> Result<SegmentInfo, RevisionedStreamError> {
        let state = self.shared.lock().await;
        Ok(SegmentInfo {
            starting_offset: state.starting_offset,
            write_offset: state.write_offset,
            is_sealed: state.sealed,
        })
    }

    async fn fetch_attribute(&self, slot: i64) -> Result<i64, RevisionedStreamError> {
        let state = self.shared.lock().await;
        Ok(*state.attributes.get(&slot).unwrap_or(&NULL_VALUE))
    }

    async fn compare_and_set_attribute(
        &self,
        slot: i64,
        expected: i64,
        new: i64,
    ) -> Result<bool, RevisionedStreamError> {
        let mut state = self.shared.lock().await;
        let current = *state.attributes.get(&slot).unwrap_or(&NULL_VALUE);
        if current == expected {
            state.attributes.insert(slot, new);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn truncate(&self, offset: i64) -> Result<(), RevisionedStreamError> {
        let mut state = self.shared.lock().await;
        if offset > state.write_offset {
            return IllegalArgument {
                operation: "truncate segment",
                error_msg: format!(
                    "truncation offset {} exceeds write offset {}",
                    offset, state.write_offset
                ),
            }
            .fail();
        }
        if offset > state.starting_offset {
            state.starting_offset = offset;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), RevisionedStreamError> {
        Ok(())
    }
}
