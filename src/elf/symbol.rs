//! Address-to-symbol resolution over a module's dynamic symbol table.
use super::{DynamicSection, DynamicTables, ElfSymbol, HashTable, ModuleMemory};
use core::ffi::CStr;

/// The exported symbols of one module.
#[derive(Debug, Clone, Copy)]
pub struct SymbolTable<'a> {
    memory: ModuleMemory<'a>,
    /// DT_HASH or DT_GNU_HASH
    hashtab: HashTable<'a>,
    /// DT_SYMTAB
    symtab: usize,
    /// DT_STRTAB
    strtab: usize,
}

/// A symbol whose range contains the address that was looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMatch<'a> {
    /// Index in the dynamic symbol table.
    pub index: usize,
    /// Absolute start address.
    pub addr: usize,
    /// Size in bytes.
    pub size: usize,
    /// Name from the string table; empty if the name offset is out of range.
    pub name: &'a CStr,
}

impl<'a> SymbolTable<'a> {
    /// Builds the table from offsets located in the dynamic section.
    ///
    /// Returns `None` if the hash table header is unreadable.
    pub fn new(memory: ModuleMemory<'a>, tables: DynamicTables) -> Option<Self> {
        let hashtab = HashTable::parse(memory, tables.hashtab)?;
        Some(SymbolTable {
            memory,
            hashtab,
            symtab: tables.symtab,
            strtab: tables.strtab,
        })
    }

    /// Builds the table of the module `dynamic` belongs to.
    #[inline]
    pub fn from_dynamic(dynamic: &DynamicSection<'a>) -> Option<Self> {
        Self::new(dynamic.memory(), dynamic.tables()?)
    }

    /// Number of symbol table entries, including the null symbol at index 0.
    #[inline]
    pub fn count_syms(&self) -> usize {
        self.hashtab.count_syms()
    }

    /// Copies the symbol at `idx`.
    #[inline]
    pub fn symbol(&self, idx: usize) -> Option<ElfSymbol> {
        self.memory.read_at(self.symtab, idx)
    }

    /// Looks up the name of `symbol` in the string table.
    #[inline]
    pub fn name(&self, symbol: &ElfSymbol) -> Option<&'a CStr> {
        self.strtab
            .checked_add(symbol.st_name())
            .and_then(|off| self.memory.cstr(off))
    }

    /// Finds the symbol whose `[addr, addr + size)` range contains `addr`.
    ///
    /// Every chain of the hash table is scanned in bucket-major order and the first
    /// defined match wins; imports are skipped. The cost is linear in the number of
    /// exported symbols.
    pub fn lookup_addr(&self, addr: usize) -> Option<SymbolMatch<'a>> {
        let base = self.memory.base();
        self.hashtab.indices().find_map(|index| {
            let symbol = self.symbol(index)?;
            if symbol.is_undef() || !symbol.contains(base, addr) {
                return None;
            }
            Some(SymbolMatch {
                index,
                addr: base.wrapping_add(symbol.st_value()),
                size: symbol.st_size(),
                name: self.name(&symbol).unwrap_or(c""),
            })
        })
    }
}
