//! Memory mapping types.

use std::fmt;

use super::Address;

/// Size of a target page, in bytes.
///
/// Boundary searches and partial transfers step in units of this size. It is
/// the classic 4 KiB page; targets with larger pages are still probed
/// correctly, just with more reads than strictly necessary.
pub const PAGE_SIZE: u64 = 0x1000;

/// Lowest address a userland mapping can normally start at (`vm.mmap_min_addr`).
pub const MMAP_MIN_ADDR: u64 = 0x8000;

/// Round `address` down to the start of its page.
///
/// ```rust
/// use vantage_core::types::page_align;
///
/// assert_eq!(page_align(0x7fff_1234), 0x7fff_1000);
/// ```
pub const fn page_align(address: u64) -> u64
{
    address & !(PAGE_SIZE - 1)
}

/// Permission bits of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Permissions
{
    /// Pages can be read
    pub read: bool,
    /// Pages can be written
    pub write: bool,
    /// Pages can be executed
    pub execute: bool,
}

impl Permissions
{
    /// Parse an `rwx`-style permission string (`"r-x"`, `"rw-p"`, ...).
    ///
    /// Only the first three characters are considered; anything other than
    /// the expected letter in a position clears that bit.
    pub fn parse(text: &str) -> Self
    {
        let bytes = text.as_bytes();
        Self {
            read: bytes.first() == Some(&b'r'),
            write: bytes.get(1) == Some(&b'w'),
            execute: bytes.get(2) == Some(&b'x'),
        }
    }
}

impl fmt::Display for Permissions
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' }
        )
    }
}

/// One entry of the target's memory map
///
/// Produced by [`crate::dbg::Process::vmmap`] and only ever used for
/// containment tests; nothing in this crate mutates it.
///
/// ## Example
///
/// ```rust
/// use vantage_core::types::{Address, MemoryPage, Permissions};
///
/// let stack = MemoryPage::new(
///     Address::from(0x7ffd_0000),
///     Address::from(0x7ffe_0000),
///     Permissions::parse("rw-"),
///     Some("[stack]".to_string()),
/// );
/// assert!(stack.contains(Address::from(0x7ffd_8000)));
/// assert!(!stack.contains(Address::from(0x7ffe_0000)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPage
{
    /// First address of the mapping (inclusive)
    pub start: Address,
    /// End of the mapping (exclusive)
    pub end: Address,
    /// Access permissions
    pub permissions: Permissions,
    /// Backing object (`"[heap]"`, a file path, ...), if the engine knows it
    pub objfile: Option<String>,
}

impl MemoryPage
{
    /// Create a new mapping entry.
    ///
    /// `end <= start` is accepted and yields an empty mapping.
    pub fn new(start: Address, end: Address, permissions: Permissions, objfile: Option<String>) -> Self
    {
        Self {
            start,
            end,
            permissions,
            objfile,
        }
    }

    /// Size in bytes, or 0 if `end <= start`.
    pub fn size(&self) -> u64
    {
        self.end.value().saturating_sub(self.start.value())
    }

    /// Whether `address` lies within `[start, end)`.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }
}

impl fmt::Display for MemoryPage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}-{} {}", self.start, self.end, self.permissions)?;
        if let Some(objfile) = &self.objfile {
            write!(f, " {objfile}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_page_align()
    {
        assert_eq!(page_align(0), 0);
        assert_eq!(page_align(0xfff), 0);
        assert_eq!(page_align(0x1000), 0x1000);
        assert_eq!(page_align(0xdead_beef), 0xdead_b000);
    }

    #[test]
    fn test_permissions_round_trip_display()
    {
        assert_eq!(Permissions::parse("r-x").to_string(), "r-x");
        assert_eq!(Permissions::parse("rw-p").to_string(), "rw-");
        assert_eq!(Permissions::parse("").to_string(), "---");
    }

    #[test]
    fn test_memory_page_size_and_contains()
    {
        let page = MemoryPage::new(Address::from(0x2000), Address::from(0x1000), Permissions::default(), None);
        assert_eq!(page.size(), 0);
        assert!(!page.contains(Address::from(0x1800)));

        let page = MemoryPage::new(Address::from(0x1000), Address::from(0x3000), Permissions::parse("r--"), None);
        assert_eq!(page.size(), 0x2000);
        assert!(page.contains(Address::from(0x1000)));
        assert!(page.contains(Address::from(0x2fff)));
        assert!(!page.contains(Address::from(0x3000)));
    }
}
