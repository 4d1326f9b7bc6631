//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

/// The default well-known attribute slot the mark is stored under, used when
/// a `ClientConfig` doesn't override `mark_attribute_id`. Shared by every
/// `RevisionedStreamClient` bound to the same segment, the way Pravega's own
/// `SegmentAttribute` reserves specific UUID-derived ids for internal use.
pub const MARK_SLOT: i64 = 0;

/// Sentinel returned by `fetch_attribute` when a slot has never been set.
pub const NULL_VALUE: i64 = i64::MIN;

/// Tunables the client needs from its segment provider. Everything else
/// (connection details, retry policy, auth) belongs to the segment store's own
/// client config, not this one -- the RSC only cares about framing constants
/// and the mark's attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Fixed per-record header width the segment provider prepends to every
    /// append (a type tag plus a length prefix, in the reference provider).
    pub(crate) frame_overhead: i64,
    /// Upper bound on one serialized record, used to reject oversized
    /// payloads before they ever reach the segment writer.
    pub(crate) max_record_size: usize,
    /// The well-known numeric attribute slot the mark is persisted under.
    pub(crate) mark_attribute_id: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            frame_overhead: 8,
            max_record_size: 8 * 1024 * 1024,
            mark_attribute_id: MARK_SLOT,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn frame_overhead(&self) -> i64 {
        self.frame_overhead
    }

    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }

    pub fn mark_attribute_id(&self) -> i64 {
        self.mark_attribute_id
    }
}

/// Builder mirroring the donor's `ClientConfigBuilder` fluent style.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    frame_overhead: Option<i64>,
    max_record_size: Option<usize>,
    mark_attribute_id: Option<i64>,
}

impl ClientConfigBuilder {
    pub fn frame_overhead(mut self, frame_overhead: i64) -> Self {
        self.frame_overhead = Some(frame_overhead);
        self
    }

    pub fn max_record_size(mut self, max_record_size: usize) -> Self {
        self.max_record_size = Some(max_record_size);
        self
    }

    pub fn mark_attribute_id(mut self, mark_attribute_id: i64) -> Self {
        self.mark_attribute_id = Some(mark_attribute_id);
        self
    }

    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            frame_overhead: self.frame_overhead.unwrap_or(defaults.frame_overhead),
            max_record_size: self.max_record_size.unwrap_or(defaults.max_record_size),
            mark_attribute_id: self.mark_attribute_id.unwrap_or(defaults.mark_attribute_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ClientConfig::default();
        assert_eq!(config.frame_overhead(), 8);
        assert!(config.max_record_size() > 0);
        assert_eq!(config.mark_attribute_id(), MARK_SLOT);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ClientConfig::builder().frame_overhead(16).build();
        assert_eq!(config.frame_overhead(), 16);
        assert_eq!(config.max_record_size(), ClientConfig::default().max_record_size());
        assert_eq!(config.mark_attribute_id(), ClientConfig::default().mark_attribute_id());
    }

    #[test]
    fn builder_overrides_mark_attribute_id() {
        let config = ClientConfig::builder().mark_attribute_id(42).build();
        assert_eq!(config.mark_attribute_id(), 42);
    }
}
