//! Traditional SYSV ELF hash table (`DT_HASH`).
//!
//! ```text
//! u32 nbucket
//! u32 nchain
//! u32 buckets[nbucket]
//! u32 chains[nchain]
//! ```
//!
//! `buckets[i]` is the first symbol index of chain `i`, `chains[k]` the index that
//! follows `k` in its chain. `STN_UNDEF` ends a chain.

use super::traits::ElfHashTable;
use crate::elf::{ModuleMemory, STN_UNDEF};

const HEADER_SIZE: usize = 2 * size_of::<u32>();

/// SYSV ELF hash table implementation
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElfHash<'a> {
    memory: ModuleMemory<'a>,
    /// Number of bucket entries in the hash table
    nbucket: u32,
    /// Number of chain entries in the hash table
    nchain: u32,
    /// Offset of the bucket array
    buckets: usize,
    /// Offset of the chain array
    chains: usize,
}

impl ElfHash<'_> {
    #[inline]
    fn bucket(&self, idx: u32) -> Option<u32> {
        self.memory.read_at(self.buckets, idx as usize)
    }

    #[inline]
    fn chain(&self, idx: u32) -> Option<u32> {
        if idx >= self.nchain {
            return None;
        }
        self.memory.read_at(self.chains, idx as usize)
    }
}

impl<'a> ElfHashTable<'a> for ElfHash<'a> {
    type Indices = ElfHashIndices<'a>;

    fn parse(memory: ModuleMemory<'a>, offset: usize) -> Option<Self> {
        let nbucket: u32 = memory.read(offset)?;
        let nchain: u32 = memory.read(offset.checked_add(size_of::<u32>())?)?;
        let buckets = offset.checked_add(HEADER_SIZE)?;
        let chains = buckets.checked_add(nbucket as usize * size_of::<u32>())?;
        Some(ElfHash {
            memory,
            nbucket,
            nchain,
            buckets,
            chains,
        })
    }

    #[inline]
    fn count_syms(&self) -> usize {
        self.nchain as usize
    }

    #[inline]
    fn indices(&self) -> Self::Indices {
        ElfHashIndices {
            table: *self,
            bucket: 0,
            next: STN_UNDEF,
        }
    }
}

pub(crate) struct ElfHashIndices<'a> {
    table: ElfHash<'a>,
    bucket: u32,
    next: u32,
}

impl Iterator for ElfHashIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.next == STN_UNDEF {
            if self.bucket >= self.table.nbucket {
                return None;
            }
            self.next = self.table.bucket(self.bucket).unwrap_or(STN_UNDEF);
            self.bucket += 1;
        }
        let idx = self.next;
        // An unreadable chain slot ends the chain.
        self.next = self.table.chain(idx).unwrap_or(STN_UNDEF);
        Some(idx as usize)
    }
}
