//! Deterministic mapping from a service identifier to a topic partition.
//!
//! All messages of one service must land on the same partition so that Kafka
//! keeps them ordered. The mapping is a 32-bit FNV-1a hash of the identifier
//! bytes reduced modulo the partition count, so it is stable across restarts
//! and across producers.
use std::num::NonZeroU32;

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over `bytes`.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV32_PRIME);
    }
    hash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionAssigner {
    partitions: NonZeroU32,
}

impl PartitionAssigner {
    pub fn new(partitions: NonZeroU32) -> Self {
        Self { partitions }
    }

    pub fn partitions(&self) -> NonZeroU32 {
        self.partitions
    }

    /// Return the partition index for `service`, in `[0, partitions)`.
    pub fn assign(&self, service: &str) -> i32 {
        let index = fnv1a32(service.as_bytes()) % self.partitions.get();
        // Kafka partition ids are i32; any count that fits a topic fits here.
        i32::try_from(index).unwrap_or(i32::MAX)
    }
}
