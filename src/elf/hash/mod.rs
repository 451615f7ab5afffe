//! ELF symbol hash tables.
//!
//! Both the traditional SYSV table (`.hash`) and the GNU table (`.gnu.hash`) are
//! supported. They are only used to enumerate the exported symbols of a module.

use crate::elf::{HashTableLocation, ModuleMemory};
use gnu::{ElfGnuHash, ElfGnuHashIndices};
use sysv::{ElfHash, ElfHashIndices};
use traits::ElfHashTable;

mod gnu;
mod sysv;
mod traits;

/// An enumeration of supported ELF hash table types.
#[derive(Debug, Clone, Copy)]
pub(crate) enum HashTable<'a> {
    /// GNU hash table (.gnu.hash section)
    Gnu(ElfGnuHash<'a>),
    /// Traditional SYSV hash table (.hash section)
    Elf(ElfHash<'a>),
}

impl<'a> HashTable<'a> {
    /// Parse the table the dynamic section points at.
    pub(crate) fn parse(memory: ModuleMemory<'a>, location: HashTableLocation) -> Option<Self> {
        match location {
            HashTableLocation::Sysv(off) => ElfHash::parse(memory, off).map(HashTable::Elf),
            HashTableLocation::Gnu(off) => ElfGnuHash::parse(memory, off).map(HashTable::Gnu),
        }
    }

    /// Get the number of symbols in the hash table.
    #[inline]
    pub(crate) fn count_syms(&self) -> usize {
        match self {
            HashTable::Gnu(hashtab) => hashtab.count_syms(),
            HashTable::Elf(hashtab) => hashtab.count_syms(),
        }
    }

    /// Iterate symbol indices in bucket-major, chain order.
    #[inline]
    pub(crate) fn indices(&self) -> HashIndices<'a> {
        match self {
            HashTable::Gnu(hashtab) => HashIndices::Gnu(hashtab.indices()),
            HashTable::Elf(hashtab) => HashIndices::Elf(hashtab.indices()),
        }
    }
}

/// Iterator returned by [`HashTable::indices`].
pub(crate) enum HashIndices<'a> {
    Gnu(ElfGnuHashIndices<'a>),
    Elf(ElfHashIndices<'a>),
}

impl Iterator for HashIndices<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        match self {
            HashIndices::Gnu(iter) => iter.next(),
            HashIndices::Elf(iter) => iter.next(),
        }
    }
}
