//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! A durable, single-segment revisioned stream client.
//!
//! [`RevisionedStreamClient`] layers strongly-ordered, typed values, optimistic
//! concurrency (`write_if_at`), a CAS'd bookmark (the "mark"), and prefix
//! truncation on top of an append-only byte segment. It is meant as the
//! primitive higher-level replicated state objects -- configuration
//! registries, coordinator state, reader-group membership -- are built on,
//! the way the donor crate's own `TableSynchronizer` backs its
//! `ReaderGroupState`.
//!
//! The segment store itself (append, read, seal, truncate, attribute CAS) is
//! an external collaborator, modeled here as the [`segment`] module's trait
//! contracts. [`mock::InMemorySegment`] is a faithful in-process reference
//! implementation used by this crate's own tests.

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod revision;
pub mod segment;
pub mod serializer;
pub mod stream_iterator;

pub use client::RevisionedStreamClient;
pub use config::ClientConfig;
pub use error::RevisionedStreamError;
pub use revision::Revision;
pub use serializer::{CborSerializer, Serializer};
pub use stream_iterator::StreamIterator;
