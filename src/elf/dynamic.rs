//! Reading the `.dynamic` section of a loaded module.
use super::{ElfDyn, ModuleMemory};
use elf::abi::{DT_GNU_HASH, DT_HASH, DT_NULL, DT_STRTAB, DT_SYMTAB};

/// Which symbol hash table a module carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashTableLocation {
    /// `DT_HASH`, the SysV table.
    Sysv(usize),
    /// `DT_GNU_HASH`, used when `DT_HASH` is absent.
    Gnu(usize),
}

/// The three tables symbol resolution needs, as offsets into module memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicTables {
    /// DT_STRTAB
    pub strtab: usize,
    /// DT_SYMTAB
    pub symtab: usize,
    /// DT_HASH or DT_GNU_HASH
    pub hashtab: HashTableLocation,
}

/// The dynamic section of a module, described by its `PT_DYNAMIC` header.
#[derive(Debug, Clone, Copy)]
pub struct DynamicSection<'a> {
    memory: ModuleMemory<'a>,
    offset: usize,
    count: usize,
}

impl<'a> DynamicSection<'a> {
    /// `offset` and `size` are the `p_vaddr` and `p_memsz` of the `PT_DYNAMIC` header.
    #[inline]
    pub fn new(memory: ModuleMemory<'a>, offset: usize, size: usize) -> Self {
        Self {
            memory,
            offset,
            count: size / ElfDyn::SIZE,
        }
    }

    /// The module image this section belongs to.
    #[inline]
    pub fn memory(&self) -> ModuleMemory<'a> {
        self.memory
    }

    /// Iterates the entries up to, but not including, `DT_NULL`.
    pub fn entries(&self) -> impl Iterator<Item = ElfDyn> + 'a {
        let memory = self.memory;
        let offset = self.offset;
        (0..self.count)
            .map_while(move |idx| memory.read_at::<ElfDyn>(offset, idx))
            .take_while(|entry| entry.d_tag() != DT_NULL)
    }

    /// Returns the raw value of the first entry with `tag`.
    pub fn search_tag(&self, tag: i64) -> Option<usize> {
        self.entries()
            .find(|entry| entry.d_tag() == tag)
            .map(|entry| entry.d_val())
    }

    /// Returns the image offset the pointer-valued entry `tag` refers to.
    #[inline]
    pub fn search_ptr(&self, tag: i64) -> Option<usize> {
        self.search_tag(tag)
            .and_then(|value| self.memory.offset_of(value))
    }

    /// Locates the string table, symbol table, and hash table.
    ///
    /// Returns `None` if any of them is missing or points outside the image.
    pub fn tables(&self) -> Option<DynamicTables> {
        let strtab = self.search_ptr(DT_STRTAB)?;
        let symtab = self.search_ptr(DT_SYMTAB)?;
        let hashtab = match self.search_ptr(DT_HASH) {
            Some(off) => HashTableLocation::Sysv(off),
            None => HashTableLocation::Gnu(self.search_ptr(DT_GNU_HASH)?),
        };
        Some(DynamicTables {
            strtab,
            symtab,
            hashtab,
        })
    }
}
