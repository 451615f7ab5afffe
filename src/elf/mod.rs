//! ELF (Executable and Linkable Format) data structures for loaded modules.

mod defs;
mod dynamic;
mod hash;
mod memory;
mod symbol;

pub(crate) use hash::HashTable;

pub use defs::{ElfDyn, ElfPhdr, ElfSymbol, Pod, STN_UNDEF};
pub use dynamic::{DynamicSection, DynamicTables, HashTableLocation};
pub use memory::ModuleMemory;
pub use symbol::{SymbolMatch, SymbolTable};
/// ELF ABI constants and definitions from the elf crate.
pub use elf::abi::*;
