//! ELF64 record definitions.
//!
//! The records are thin `#[repr(transparent)]` wrappers over the `elf` crate's raw
//! structures, which match the platform ABI bit for bit. They are only ever obtained
//! by copying them out of a [`ModuleMemory`](super::ModuleMemory).
use core::ops::Deref;
use elf::abi::SHN_UNDEF;

pub(crate) type Phdr = elf::segment::Elf64_Phdr;
pub(crate) type Dyn = elf::dynamic::Elf64_Dyn;
pub(crate) type Sym = elf::symbol::Elf64_Sym;

/// End of a SysV hash chain, and the reserved null symbol.
pub const STN_UNDEF: u32 = 0;

/// Plain-old-data that may be copied out of module memory.
///
/// # Safety
/// Every bit pattern of the right size must be a valid value of the type.
pub unsafe trait Pod: Sized {}

unsafe impl Pod for u32 {}
unsafe impl Pod for usize {}
unsafe impl Pod for ElfPhdr {}
unsafe impl Pod for ElfDyn {}
unsafe impl Pod for ElfSymbol {}

/// ELF symbol table entry.
#[repr(transparent)]
pub struct ElfSymbol {
    sym: Sym,
}

impl ElfSymbol {
    /// Size in bytes of one symbol table entry.
    pub const SIZE: usize = size_of::<Sym>();

    /// Returns the symbol value, relative to the module base.
    #[inline]
    pub fn st_value(&self) -> usize {
        self.sym.st_value as usize
    }

    /// Returns the symbol size.
    #[inline]
    pub fn st_size(&self) -> usize {
        self.sym.st_size as usize
    }

    /// Returns the symbol name index.
    #[inline]
    pub fn st_name(&self) -> usize {
        self.sym.st_name as usize
    }

    /// Returns the section index.
    #[inline]
    pub fn st_shndx(&self) -> usize {
        self.sym.st_shndx as usize
    }

    /// Returns true if the symbol is undefined in this module.
    #[inline]
    pub fn is_undef(&self) -> bool {
        self.st_shndx() == SHN_UNDEF as usize
    }

    /// Returns true if `addr` falls inside `[base + value, base + value + size)`.
    #[inline]
    pub fn contains(&self, base: usize, addr: usize) -> bool {
        let start = base.wrapping_add(self.st_value());
        addr.checked_sub(start)
            .is_some_and(|delta| delta < self.st_size())
    }
}

/// ELF dynamic section entry.
#[repr(transparent)]
pub struct ElfDyn {
    dyn_: Dyn,
}

impl ElfDyn {
    /// Size in bytes of one dynamic entry.
    pub const SIZE: usize = size_of::<Dyn>();

    #[inline]
    pub fn d_tag(&self) -> i64 {
        self.dyn_.d_tag
    }

    #[inline]
    pub fn d_val(&self) -> usize {
        self.dyn_.d_un as usize
    }
}

/// ELF program header.
#[derive(Debug)]
#[repr(transparent)]
pub struct ElfPhdr {
    phdr: Phdr,
}

impl Deref for ElfPhdr {
    type Target = Phdr;

    fn deref(&self) -> &Self::Target {
        &self.phdr
    }
}
