//! The access list: lookup key to wrapped access key.

use std::collections::BTreeMap;

use alloy_primitives::B256;
use apiary_primitives::SwarmAddress;
use apiary_storage::{Cancellation, Getter, PipelineOptions, Putter, Splitter};
use bytes::{Buf, BufMut, BytesMut};

use crate::{AccessControlError, Result};

const RECORD_SIZE: usize = 64;

/// A sorted map from lookup keys to wrapped access keys.
///
/// Stored as `count (u32 BE) ‖ (lookup ‖ wrapped)*` through the splitter, in
/// key order, so equal lists always have the same root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    entries: BTreeMap<B256, B256>,
}

impl AccessList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped access key stored under `lookup`.
    pub fn get(&self, lookup: &B256) -> Option<&B256> {
        self.entries.get(lookup)
    }

    /// Store a wrapped access key, replacing any previous one.
    pub fn put(&mut self, lookup: B256, wrapped: B256) {
        self.entries.insert(lookup, wrapped);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn encode(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(4 + self.entries.len() * RECORD_SIZE);
        out.put_u32(self.entries.len() as u32);
        for (lookup, wrapped) in &self.entries {
            out.put_slice(lookup.as_slice());
            out.put_slice(wrapped.as_slice());
        }
        out
    }

    fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(AccessControlError::malformed("access list", "missing record count"));
        }
        let count = data.get_u32() as usize;
        if data.len() != count * RECORD_SIZE {
            return Err(AccessControlError::malformed(
                "access list",
                format!("{count} records in {} bytes", data.len()),
            ));
        }
        let entries = data
            .chunks_exact(RECORD_SIZE)
            .map(|record| (B256::from_slice(&record[..32]), B256::from_slice(&record[32..])))
            .collect();
        Ok(Self { entries })
    }

    /// Store the list and return its root.
    pub fn save(
        &self,
        cx: &Cancellation,
        putter: &mut dyn Putter,
        splitter: &dyn Splitter,
    ) -> Result<SwarmAddress> {
        Ok(splitter.split(cx, putter, &self.encode(), PipelineOptions::default())?)
    }

    /// Load the list stored under `root`.
    pub fn load(
        cx: &Cancellation,
        getter: &dyn Getter,
        splitter: &dyn Splitter,
        root: &SwarmAddress,
    ) -> Result<Self> {
        Self::decode(&splitter.join(cx, getter, root)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_order_independent() {
        let mut a = AccessList::new();
        a.put(B256::repeat_byte(2), B256::repeat_byte(20));
        a.put(B256::repeat_byte(1), B256::repeat_byte(10));

        let mut b = AccessList::new();
        b.put(B256::repeat_byte(1), B256::repeat_byte(10));
        b.put(B256::repeat_byte(2), B256::repeat_byte(20));

        assert_eq!(a.encode(), b.encode());
        assert_eq!(AccessList::decode(&a.encode()).unwrap(), b);
    }

    #[test]
    fn rejects_truncated_records() {
        let mut list = AccessList::new();
        list.put(B256::repeat_byte(1), B256::repeat_byte(2));
        let encoded = list.encode();
        assert!(AccessList::decode(&encoded[..encoded.len() - 1]).is_err());
        assert!(AccessList::decode(&[0, 0]).is_err());
    }
}
