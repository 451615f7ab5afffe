#![allow(dead_code)]

use crash_unwind::elf::{
    DT_GNU_HASH, DT_HASH, DT_NULL, DT_STRTAB, DT_SYMTAB, ElfPhdr, ModuleMemory, PT_DYNAMIC,
    PT_LOAD, STB_GLOBAL, STT_FUNC,
};
use std::ffi::CStr;
use std::process::{Command, Output};

/// Which hash table the synthetic module carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStyle {
    Sysv,
    Gnu,
    None,
}

/// How pointer-valued dynamic tags are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStyle {
    /// Module-relative, as in the file.
    Relative,
    /// Already relocated by the load base.
    Absolute,
}

pub struct SymbolSpec {
    pub name: &'static str,
    /// Offset of the symbol inside the text area.
    pub offset: usize,
    pub size: usize,
    /// Whether the symbol is defined in this module rather than imported.
    pub defined: bool,
}

pub const fn sym(name: &'static str, offset: usize, size: usize) -> SymbolSpec {
    SymbolSpec {
        name,
        offset,
        size,
        defined: true,
    }
}

/// An import: carries a size, but `st_shndx` is `SHN_UNDEF`.
pub const fn import(name: &'static str, offset: usize, size: usize) -> SymbolSpec {
    SymbolSpec {
        name,
        offset,
        size,
        defined: false,
    }
}

const PHDR_SIZE: usize = 56;
const SYM_SIZE: usize = 24;
const DYN_SIZE: usize = 16;
pub const TEXT_SIZE: usize = 0x400;
const SYSV_NBUCKET: usize = 3;

/// A minimal in-memory module image: two program headers, `.dynstr`, `.dynsym`,
/// a hash table, `.dynamic`, and a text area the symbols point into.
pub struct SyntheticModule {
    words: Vec<u64>,
    pub phdr_off: usize,
    pub dynamic_off: usize,
    pub dynamic_size: usize,
    pub text_off: usize,
}

fn align8(value: usize) -> usize {
    (value + 7) & !7
}

impl SyntheticModule {
    pub fn build(symbols: &[SymbolSpec], hash: HashStyle, tags: TagStyle) -> Self {
        let mut strtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for spec in symbols {
            name_offsets.push(strtab.len());
            strtab.extend_from_slice(spec.name.as_bytes());
            strtab.push(0);
        }
        let nsyms = symbols.len() + 1;

        let phdr_off = 0;
        let strtab_off = phdr_off + 2 * PHDR_SIZE;
        let symtab_off = align8(strtab_off + strtab.len());
        let hash_off = align8(symtab_off + nsyms * SYM_SIZE);
        let hash_size = match hash {
            HashStyle::Sysv => 8 + 4 * (SYSV_NBUCKET + nsyms),
            HashStyle::Gnu => 16 + 8 + 4 + 4 * symbols.len(),
            HashStyle::None => 0,
        };
        let dynamic_off = align8(hash_off + hash_size);
        let dynamic_size = 4 * DYN_SIZE;
        let text_off = align8(dynamic_off + dynamic_size);
        let total = text_off + TEXT_SIZE;

        let mut module = SyntheticModule {
            words: vec![0u64; total / 8],
            phdr_off,
            dynamic_off,
            dynamic_size,
            text_off,
        };
        let base = module.base();
        let tag = |off: usize| match tags {
            TagStyle::Relative => off as u64,
            TagStyle::Absolute => (base + off) as u64,
        };

        module.write_phdr(phdr_off, PT_LOAD, 0, total);
        module.write_phdr(phdr_off + PHDR_SIZE, PT_DYNAMIC, dynamic_off, dynamic_size);
        module.bytes_mut()[strtab_off..strtab_off + strtab.len()].copy_from_slice(&strtab);

        for (idx, spec) in symbols.iter().enumerate() {
            let off = symtab_off + (idx + 1) * SYM_SIZE;
            module.put_u32(off, name_offsets[idx] as u32);
            module.bytes_mut()[off + 4] = (STB_GLOBAL << 4) | STT_FUNC;
            module.put_u16(off + 6, spec.defined as u16);
            module.put_u64(off + 8, (text_off + spec.offset) as u64);
            module.put_u64(off + 16, spec.size as u64);
        }

        match hash {
            HashStyle::Sysv => {
                // Link each symbol at the head of bucket `idx % nbucket`.
                let buckets = hash_off + 8;
                let chains = buckets + 4 * SYSV_NBUCKET;
                module.put_u32(hash_off, SYSV_NBUCKET as u32);
                module.put_u32(hash_off + 4, nsyms as u32);
                for idx in 1..nsyms {
                    let bucket = buckets + 4 * (idx % SYSV_NBUCKET);
                    let head = module.get_u32(bucket);
                    module.put_u32(chains + 4 * idx, head);
                    module.put_u32(bucket, idx as u32);
                }
            }
            HashStyle::Gnu => {
                // One bucket holding every symbol from index 1 on.
                let blooms = hash_off + 16;
                let buckets = blooms + 8;
                let chains = buckets + 4;
                module.put_u32(hash_off, 1);
                module.put_u32(hash_off + 4, 1);
                module.put_u32(hash_off + 8, 1);
                module.put_u32(hash_off + 12, 6);
                module.put_u64(blooms, u64::MAX);
                module.put_u32(buckets, if symbols.is_empty() { 0 } else { 1 });
                for idx in 0..symbols.len() {
                    let last = idx + 1 == symbols.len();
                    module.put_u32(chains + 4 * idx, 2 * idx as u32 + 2 + last as u32);
                }
            }
            HashStyle::None => {}
        }

        let mut entries = vec![
            (DT_STRTAB, tag(strtab_off)),
            (DT_SYMTAB, tag(symtab_off)),
        ];
        match hash {
            HashStyle::Sysv => entries.push((DT_HASH, tag(hash_off))),
            HashStyle::Gnu => entries.push((DT_GNU_HASH, tag(hash_off))),
            HashStyle::None => {}
        }
        entries.push((DT_NULL, 0));
        for (idx, (d_tag, d_val)) in entries.into_iter().enumerate() {
            let off = dynamic_off + idx * DYN_SIZE;
            module.put_u64(off, d_tag as u64);
            module.put_u64(off + 8, d_val);
        }
        module
    }

    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast(), self.words.len() * 8) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast(), self.words.len() * 8)
        }
    }

    pub fn memory(&self) -> ModuleMemory<'_> {
        ModuleMemory::from_slice(self.bytes())
    }

    pub fn phdrs(&self) -> &[ElfPhdr] {
        unsafe {
            std::slice::from_raw_parts(self.bytes().as_ptr().add(self.phdr_off).cast(), 2)
        }
    }

    /// Absolute address of `offset` inside the text area.
    pub fn text_addr(&self, offset: usize) -> usize {
        self.base() + self.text_off + offset
    }

    pub fn put_u64(&mut self, off: usize, value: u64) {
        self.bytes_mut()[off..off + 8].copy_from_slice(&value.to_ne_bytes());
    }

    fn put_u32(&mut self, off: usize, value: u32) {
        self.bytes_mut()[off..off + 4].copy_from_slice(&value.to_ne_bytes());
    }

    fn put_u16(&mut self, off: usize, value: u16) {
        self.bytes_mut()[off..off + 2].copy_from_slice(&value.to_ne_bytes());
    }

    fn get_u32(&self, off: usize) -> u32 {
        u32::from_ne_bytes(self.bytes()[off..off + 4].try_into().unwrap())
    }

    fn write_phdr(&mut self, off: usize, p_type: u32, vaddr: usize, memsz: usize) {
        self.put_u32(off, p_type);
        self.put_u64(off + 16, vaddr as u64);
        self.put_u64(off + 24, vaddr as u64);
        self.put_u64(off + 40, memsz as u64);
    }
}

/// Program headers for `PT_LOAD` segments given as `(vaddr, memsz)`.
pub fn load_headers(loads: &[(usize, usize)]) -> Vec<u64> {
    let mut words = vec![0u64; loads.len() * PHDR_SIZE / 8];
    for (idx, &(vaddr, memsz)) in loads.iter().enumerate() {
        let entry = &mut words[idx * PHDR_SIZE / 8..];
        entry[0] = PT_LOAD as u64;
        entry[2] = vaddr as u64;
        entry[3] = vaddr as u64;
        entry[5] = memsz as u64;
    }
    words
}

pub fn as_phdrs(words: &[u64]) -> &[ElfPhdr] {
    unsafe { std::slice::from_raw_parts(words.as_ptr().cast(), words.len() * 8 / PHDR_SIZE) }
}

pub fn cstr_eq(s: &CStr, expected: &str) -> bool {
    s.to_bytes() == expected.as_bytes()
}

/// Environment variable that tells a re-executed test binary to run the crash scenario.
pub const CHILD_ENV: &str = "CRASH_UNWIND_CHILD";

/// Whether this process is the re-executed child.
pub fn is_child() -> bool {
    std::env::var_os(CHILD_ENV).is_some()
}

/// Re-runs the current test binary with only `test_name`, marked as the child.
pub fn run_child(test_name: &str) -> Output {
    let exe = std::env::current_exe().expect("current test binary");
    Command::new(exe)
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("failed to spawn child test process")
}
