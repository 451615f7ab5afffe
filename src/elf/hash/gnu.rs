//! GNU ELF hash table (`DT_GNU_HASH`).
//!
//! ```text
//! u32   nbucket
//! u32   symbias
//! u32   nbloom
//! u32   nshift
//! usize blooms[nbloom]
//! u32   buckets[nbucket]
//! u32   chains[]
//! ```
//!
//! Symbols of one chain are contiguous in the symbol table starting at `buckets[i]`;
//! `chains[k - symbias]` has bit 0 set on the last symbol of a chain.

use super::traits::ElfHashTable;
use crate::elf::ModuleMemory;

const HEADER_SIZE: usize = 4 * size_of::<u32>();

#[derive(Debug, Clone, Copy)]
pub(crate) struct ElfGnuHash<'a> {
    memory: ModuleMemory<'a>,
    nbucket: u32,
    symbias: u32,
    buckets: usize,
    chains: usize,
}

impl ElfGnuHash<'_> {
    #[inline]
    fn bucket(&self, idx: u32) -> Option<u32> {
        self.memory.read_at(self.buckets, idx as usize)
    }

    #[inline]
    fn chain(&self, sym_idx: u32) -> Option<u32> {
        let idx = sym_idx.checked_sub(self.symbias)?;
        self.memory.read_at(self.chains, idx as usize)
    }
}

impl<'a> ElfHashTable<'a> for ElfGnuHash<'a> {
    type Indices = ElfGnuHashIndices<'a>;

    fn parse(memory: ModuleMemory<'a>, offset: usize) -> Option<Self> {
        let nbucket: u32 = memory.read(offset)?;
        let symbias: u32 = memory.read_at(offset, 1)?;
        let nbloom: u32 = memory.read_at(offset, 2)?;
        let blooms = offset.checked_add(HEADER_SIZE)?;
        let buckets = blooms.checked_add(nbloom as usize * size_of::<usize>())?;
        let chains = buckets.checked_add(nbucket as usize * size_of::<u32>())?;
        Some(ElfGnuHash {
            memory,
            nbucket,
            symbias,
            buckets,
            chains,
        })
    }

    fn count_syms(&self) -> usize {
        let mut nsym = (0..self.nbucket)
            .filter_map(|idx| self.bucket(idx))
            .max()
            .unwrap_or(0);
        if nsym == 0 {
            return self.symbias as usize;
        }
        while let Some(hash) = self.chain(nsym) {
            if hash & 1 != 0 {
                break;
            }
            nsym += 1;
        }
        nsym as usize + 1
    }

    #[inline]
    fn indices(&self) -> Self::Indices {
        ElfGnuHashIndices {
            table: *self,
            bucket: 0,
            next: None,
        }
    }
}

pub(crate) struct ElfGnuHashIndices<'a> {
    table: ElfGnuHash<'a>,
    bucket: u32,
    next: Option<u32>,
}

impl Iterator for ElfGnuHashIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(idx) = self.next.take() {
                if let Some(hash) = self.table.chain(idx) {
                    if hash & 1 == 0 {
                        self.next = idx.checked_add(1);
                    }
                }
                return Some(idx as usize);
            }
            if self.bucket >= self.table.nbucket {
                return None;
            }
            let start = self.table.bucket(self.bucket).unwrap_or(0);
            self.bucket += 1;
            // Empty buckets hold 0; indices below symbias have no chain slot.
            if start != 0 && start >= self.table.symbias {
                self.next = Some(start);
            }
        }
    }
}
