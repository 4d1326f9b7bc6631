//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;

use crate::error::{IllegalArgument, RevisionedStreamError};

/// Symmetric serialize/deserialize pair injected into the client. Must be
/// deterministic and produce output no larger than the configured
/// `max_record_size`; the client does not retry or patch up serializer
/// failures.
pub trait Serializer<T> {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, RevisionedStreamError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<T, RevisionedStreamError>;
}

/// Default serializer backed by CBOR, the way the donor crate defaults its
/// own `TableMap` key/value encoding to a compact binary format (there,
/// `bincode2`; here, `serde_cbor`, already a root dependency of the donor).
#[derive(Debug, Clone, Copy, Default)]
pub struct CborSerializer<T> {
    _marker: PhantomData<T>,
}

impl<T> CborSerializer<T> {
    pub fn new() -> Self {
        CborSerializer { _marker: PhantomData }
    }
}

impl<T> Serializer<T> for CborSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, RevisionedStreamError> {
        serde_cbor::to_vec(value).map_err(|e| {
            IllegalArgument {
                operation: "serialize value",
                error_msg: e.to_string(),
            }
            .build()
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, RevisionedStreamError> {
        serde_cbor::from_slice(bytes).map_err(|e| {
            IllegalArgument {
                operation: "deserialize value",
                error_msg: e.to_string(),
            }
            .build()
        })
    }
}
