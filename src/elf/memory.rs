use super::{ElfPhdr, PT_LOAD, Pod};
use core::{ffi::CStr, marker::PhantomData, ptr};

/// A bounds-checked view of a loaded module's image.
///
/// Offsets are relative to the module's load base. Reads are only allowed inside
/// `[start, end)`. A view built from program headers further requires every read to
/// lie inside a single `PT_LOAD` segment, so the unmapped gaps between segments are
/// never touched. Nothing behind the view is ever written.
#[derive(Debug, Clone, Copy)]
pub struct ModuleMemory<'a> {
    base: usize,
    start: usize,
    end: usize,
    loads: &'a [ElfPhdr],
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> ModuleMemory<'a> {
    /// Views a byte slice as a module loaded at the slice's address.
    #[inline]
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            base: bytes.as_ptr() as usize,
            start: 0,
            end: bytes.len(),
            loads: &[],
            _marker: PhantomData,
        }
    }

    /// Views the module loaded at `base`, restricted to its `PT_LOAD` segments.
    ///
    /// Returns `None` if there is no `PT_LOAD` header.
    ///
    /// # Safety
    /// Every `PT_LOAD` segment, relocated by `base`, must stay mapped and readable
    /// for `'a`.
    pub unsafe fn from_phdrs(base: usize, phdrs: &'a [ElfPhdr]) -> Option<Self> {
        let loads = phdrs.iter().filter(|phdr| phdr.p_type == PT_LOAD);
        let start = loads.clone().map(|phdr| phdr.p_vaddr as usize).min()?;
        let end = loads
            .map(|phdr| (phdr.p_vaddr as usize).saturating_add(phdr.p_memsz as usize))
            .max()?;
        Some(Self {
            base,
            start,
            end,
            loads: phdrs,
            _marker: PhantomData,
        })
    }

    /// End of the readable region that contains `offset`.
    fn limit(&self, offset: usize) -> Option<usize> {
        if offset < self.start || offset >= self.end {
            return None;
        }
        if self.loads.is_empty() {
            return Some(self.end);
        }
        self.loads
            .iter()
            .filter(|phdr| phdr.p_type == PT_LOAD)
            .find_map(|phdr| {
                let vaddr = phdr.p_vaddr as usize;
                let end = vaddr.saturating_add(phdr.p_memsz as usize);
                (vaddr <= offset && offset < end).then_some(end)
            })
    }

    /// The load base that module-relative addresses are added to.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Whether the module-relative `offset` lies inside the image.
    #[inline]
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.limit(offset).is_some()
    }

    /// Whether the absolute address `addr` lies inside the image.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr.checked_sub(self.base)
            .is_some_and(|offset| self.contains_offset(offset))
    }

    /// Converts a pointer-valued dynamic tag into an offset inside the image.
    ///
    /// Some dynamic linkers relocate the in-memory dynamic section, leaving absolute
    /// addresses where the file has module-relative ones. Both forms are accepted.
    pub fn offset_of(&self, value: usize) -> Option<usize> {
        if self.base != 0 && self.contains(value) {
            return Some(value - self.base);
        }
        self.contains_offset(value).then_some(value)
    }

    /// Copies a `T` out of the image at `offset`.
    #[inline]
    pub fn read<T: Pod>(&self, offset: usize) -> Option<T> {
        let end = offset.checked_add(size_of::<T>())?;
        if end > self.limit(offset)? {
            return None;
        }
        let src = self.base.wrapping_add(offset) as *const T;
        Some(unsafe { ptr::read_unaligned(src) })
    }

    /// Copies the `index`-th element of a `T` array that starts at `offset`.
    #[inline]
    pub fn read_at<T: Pod>(&self, offset: usize, index: usize) -> Option<T> {
        let offset = index
            .checked_mul(size_of::<T>())
            .and_then(|delta| offset.checked_add(delta))?;
        self.read(offset)
    }

    /// Borrows the NUL-terminated string at `offset`.
    ///
    /// Returns `None` if the terminator is not found inside the same segment.
    pub fn cstr(&self, offset: usize) -> Option<&'a CStr> {
        let limit = self.limit(offset)?;
        let start = self.base.wrapping_add(offset) as *const u8;
        let len = (0..limit - offset).find(|&i| unsafe { start.add(i).read() } == 0)?;
        let bytes = unsafe { core::slice::from_raw_parts(start, len + 1) };
        Some(unsafe { CStr::from_bytes_with_nul_unchecked(bytes) })
    }
}
