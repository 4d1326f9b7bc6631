//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{IllegalArgument, RevisionedStreamError};

/// `generation` is reserved for future use; this design always stamps 0.
const GENERATION: u32 = 0;

/// An opaque, totally ordered position within one segment.
///
/// Revisions are plain values: cheaply copyable, serializable, and they
/// outlive the client that produced them. Callers must never synthesize a
/// `Revision` directly (there is no public constructor) -- the only ways to
/// obtain one are a successful append, `latest_revision()`/`oldest_revision()`,
/// or deserializing one a client previously handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    segment_id: u128,
    byte_offset: i64,
    generation: u32,
}

impl Revision {
    pub(crate) fn new(segment_id: u128, byte_offset: i64) -> Self {
        Revision {
            segment_id,
            byte_offset,
            generation: GENERATION,
        }
    }

    /// The byte offset this revision points to: the boundary immediately
    /// after the record it addresses.
    pub fn byte_offset(&self) -> i64 {
        self.byte_offset
    }

    /// Identifies the backing segment. Constant across every revision a given
    /// client ever produces.
    pub fn segment_id(&self) -> u128 {
        self.segment_id
    }

    /// Ordered comparison against another revision bound to the same segment.
    /// Cross-segment comparison is a caller error; see `checked_cmp`.
    pub fn checked_cmp(&self, other: &Revision) -> Result<Ordering, RevisionedStreamError> {
        if self.segment_id != other.segment_id {
            return IllegalArgument {
                operation: "compare revisions",
                error_msg: format!(
                    "revisions belong to different segments ({} vs {})",
                    self.segment_id, other.segment_id
                ),
            }
            .fail();
        }
        Ok(self.byte_offset.cmp(&other.byte_offset))
    }
}

/// Within one segment, ordering is by offset alone. Cross-segment comparisons
/// fall back to `false`/`Greater`-ish defaults rather than panicking, since
/// `Ord` cannot fail; use `checked_cmp` when segment identity must be
/// asserted.
impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Revision) -> Option<Ordering> {
        if self.segment_id != other.segment_id {
            None
        } else {
            Some(self.byte_offset.cmp(&other.byte_offset))
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision(segment={:x}, offset={})", self.segment_id, self.byte_offset)
    }
}

/// `revision_after(base_offset, payload_size) = base_offset + payload_size + FRAME_OVERHEAD`.
///
/// This is the only way a `Revision` is ever minted after a successful
/// append: the client never round-trips to the segment to learn the new
/// offset, it computes it.
pub(crate) fn revision_after(segment_id: u128, base_offset: i64, payload_size: usize, frame_overhead: i64) -> Revision {
    Revision::new(segment_id, base_offset + payload_size as i64 + frame_overhead)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_offset_within_segment() {
        let r1 = Revision::new(1, 10);
        let r2 = Revision::new(1, 20);
        assert!(r1 < r2);
        assert_eq!(r1.checked_cmp(&r2).unwrap(), Ordering::Less);
    }

    #[test]
    fn cross_segment_comparison_is_rejected() {
        let r1 = Revision::new(1, 10);
        let r2 = Revision::new(2, 10);
        assert!(r1.checked_cmp(&r2).is_err());
        assert_eq!(r1.partial_cmp(&r2), None);
    }

    #[test]
    fn revision_after_applies_frame_overhead() {
        let r = revision_after(7, 100, 4, 8);
        assert_eq!(r.segment_id(), 7);
        assert_eq!(r.byte_offset(), 112);
    }

    #[test]
    fn equality_requires_all_fields() {
        let r1 = Revision::new(1, 10);
        let r2 = Revision::new(1, 10);
        assert_eq!(r1, r2);
    }
}
