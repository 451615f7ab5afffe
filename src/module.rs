//! Enumerating the modules the dynamic linker has loaded.
use crate::elf::{DynamicSection, ElfPhdr, ModuleMemory, PT_DYNAMIC, PT_LOAD, SymbolTable};
use core::{
    ffi::{CStr, c_int, c_void},
    ops::ControlFlow,
};

/// How the module that should own an address is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleSelection {
    /// The first module, in the dynamic linker's order, whose load base is not above
    /// the address. No upper bound is checked, so an address can be attributed to the
    /// wrong module when modules are not listed in address order.
    #[default]
    FirstBase,
    /// The module with a `PT_LOAD` segment that contains the address.
    Containing,
}

impl ModuleSelection {
    /// The selection the crash handler uses.
    pub const fn for_handler() -> Self {
        if cfg!(feature = "strict-module-range") {
            ModuleSelection::Containing
        } else {
            ModuleSelection::FirstBase
        }
    }

    /// Whether `module` is a candidate for `addr`.
    #[inline]
    pub fn accepts(&self, module: &LoadedModule<'_>, addr: usize) -> bool {
        match self {
            ModuleSelection::FirstBase => module.base() <= addr,
            ModuleSelection::Containing => module.contains(addr),
        }
    }
}

/// A symbol resolved for an instruction address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSymbol<'a> {
    /// Absolute address of the symbol.
    pub addr: usize,
    /// Load base of the owning module.
    pub base: usize,
    /// Symbol name, borrowed from the module's string table.
    pub name: &'a CStr,
    /// Path of the owning module; empty for the main program.
    pub module: &'a CStr,
}

/// One module as reported by the dynamic linker.
#[derive(Debug, Clone, Copy)]
pub struct LoadedModule<'a> {
    base: usize,
    name: &'a CStr,
    phdrs: &'a [ElfPhdr],
}

impl<'a> LoadedModule<'a> {
    /// Describes a module mapped at `base` with the given program headers.
    ///
    /// # Safety
    /// Every `PT_LOAD` segment described by `phdrs`, relocated by `base`, must stay
    /// mapped and readable for `'a`.
    #[inline]
    pub const unsafe fn new(base: usize, name: &'a CStr, phdrs: &'a [ElfPhdr]) -> Self {
        Self { base, name, phdrs }
    }

    /// Drops the borrow on the dynamic linker's module list.
    ///
    /// # Safety
    /// The module must not be unloaded while the result is in use.
    unsafe fn detach(&self) -> LoadedModule<'static> {
        unsafe {
            LoadedModule::new(
                self.base,
                &*(self.name as *const CStr),
                &*(self.phdrs as *const [ElfPhdr]),
            )
        }
    }

    /// The load base.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// The module path, empty for the main program.
    #[inline]
    pub fn name(&self) -> &'a CStr {
        self.name
    }

    /// The program headers.
    #[inline]
    pub fn phdrs(&self) -> &'a [ElfPhdr] {
        self.phdrs
    }

    fn loads(&self) -> impl Iterator<Item = &'a ElfPhdr> {
        self.phdrs.iter().filter(|phdr| phdr.p_type == PT_LOAD)
    }

    /// Whether a `PT_LOAD` segment of this module contains `addr`.
    pub fn contains(&self, addr: usize) -> bool {
        self.loads().any(|phdr| {
            let start = self.base.wrapping_add(phdr.p_vaddr as usize);
            addr.checked_sub(start)
                .is_some_and(|delta| delta < phdr.p_memsz as usize)
        })
    }

    /// The `PT_LOAD` segments as a bounds-checked view.
    #[inline]
    pub fn memory(&self) -> Option<ModuleMemory<'a>> {
        unsafe { ModuleMemory::from_phdrs(self.base, self.phdrs) }
    }

    /// The dynamic section described by the `PT_DYNAMIC` header.
    pub fn dynamic(&self) -> Option<DynamicSection<'a>> {
        let memory = self.memory()?;
        self.phdrs
            .iter()
            .find(|phdr| phdr.p_type == PT_DYNAMIC)
            .map(|phdr| DynamicSection::new(memory, phdr.p_vaddr as usize, phdr.p_memsz as usize))
    }

    /// The exported symbol table, if the module has one.
    #[inline]
    pub fn symbols(&self) -> Option<SymbolTable<'a>> {
        SymbolTable::from_dynamic(&self.dynamic()?)
    }

    /// Resolves `addr` against this module's exported symbols.
    pub fn resolve(&self, addr: usize) -> Option<ResolvedSymbol<'a>> {
        let found = self.symbols()?.lookup_addr(addr)?;
        Some(ResolvedSymbol {
            addr: found.addr,
            base: self.base,
            name: found.name,
            module: self.name,
        })
    }
}

/// Calls `f` for every loaded module until it returns [`ControlFlow::Break`].
///
/// The main program comes first, followed by the shared objects in load order.
pub fn for_each_module<F>(mut f: F)
where
    F: FnMut(&LoadedModule<'_>) -> ControlFlow<()>,
{
    unsafe extern "C" fn callback<F>(
        info: *mut libc::dl_phdr_info,
        _size: libc::size_t,
        data: *mut c_void,
    ) -> c_int
    where
        F: FnMut(&LoadedModule<'_>) -> ControlFlow<()>,
    {
        let f = unsafe { &mut *data.cast::<F>() };
        let info = unsafe { &*info };
        let name = if info.dlpi_name.is_null() {
            c""
        } else {
            unsafe { CStr::from_ptr(info.dlpi_name) }
        };
        let phdrs: &[ElfPhdr] = if info.dlpi_phdr.is_null() {
            &[]
        } else {
            unsafe {
                core::slice::from_raw_parts(info.dlpi_phdr.cast(), info.dlpi_phnum as usize)
            }
        };
        let module = unsafe { LoadedModule::new(info.dlpi_addr as usize, name, phdrs) };
        match f(&module) {
            ControlFlow::Continue(()) => 0,
            ControlFlow::Break(()) => 1,
        }
    }

    unsafe {
        libc::dl_iterate_phdr(Some(callback::<F>), (&mut f as *mut F).cast());
    }
}

/// Resolves an instruction address to the exported symbol that contains it.
///
/// Only the first module accepted by `selection` is searched; if it has no
/// symbol tables or no containing symbol, the address is unresolved.
///
/// # Safety
/// The returned names borrow dynamic-linker memory. No module may be unloaded while
/// the result is in use.
pub unsafe fn lookup(addr: usize, selection: ModuleSelection) -> Option<ResolvedSymbol<'static>> {
    let mut found = None;
    for_each_module(|module| {
        if !selection.accepts(module, addr) {
            return ControlFlow::Continue(());
        }
        found = unsafe { module.detach() }.resolve(addr);
        ControlFlow::Break(())
    });
    found
}
