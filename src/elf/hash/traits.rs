use crate::elf::ModuleMemory;

/// A trait for ELF hash table implementations.
///
/// Resolution here is keyed by address rather than by name, so the tables are never
/// probed with a hash value. Instead every chain is visited in bucket-major order.
pub(crate) trait ElfHashTable<'a>: Sized {
    /// Iterator over symbol table indices in bucket-major, chain order.
    type Indices: Iterator<Item = usize>;

    /// Parse the table that starts at `offset`.
    ///
    /// Returns `None` if the header lies outside the image.
    fn parse(memory: ModuleMemory<'a>, offset: usize) -> Option<Self>;

    /// Get the number of symbols in the hash table.
    ///
    /// # Returns
    /// The number of symbol table entries the table covers, including the null symbol.
    fn count_syms(&self) -> usize;

    /// Visit every symbol index reachable from some bucket.
    fn indices(&self) -> Self::Indices;
}
