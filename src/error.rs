//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use snafu::Snafu;

/// Errors surfaced by the `RevisionedStreamClient` and its `StreamIterator`.
///
/// Conditional-append rejection is represented separately (`Option<Revision>`,
/// never an error variant here) since losing a race is an expected outcome,
/// not a fault.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum RevisionedStreamError {
    #[snafu(display("segment {} was sealed while appending: {}", segment_id, source_msg))]
    CorruptedState { segment_id: String, source_msg: String },

    #[snafu(display(
        "requested revision at offset {} is below the segment's starting offset {}",
        requested_offset,
        starting_offset
    ))]
    TruncatedData {
        requested_offset: i64,
        starting_offset: i64,
    },

    #[snafu(display("iterator has no more elements past offset {}", offset))]
    NoSuchElement { offset: i64 },

    #[snafu(display("illegal argument while performing {}: {}", operation, error_msg))]
    IllegalArgument { operation: String, error_msg: String },

    #[snafu(display(
        "segment provider violated its contract during {}: {}",
        operation,
        error_msg
    ))]
    InvariantViolation { operation: String, error_msg: String },

    #[snafu(display("unclassified failure while performing {}: {}", operation, error_msg))]
    Unknown { operation: String, error_msg: String },

    /// Reported by a writer's `close()` when the segment was already sealed.
    /// The RSC logs this at `warn!` and does not propagate it to the caller.
    #[snafu(display("segment {} was already sealed on close", segment_id))]
    SealedOnClose { segment_id: String },
}

pub type Result<T, E = RevisionedStreamError> = std::result::Result<T, E>;
