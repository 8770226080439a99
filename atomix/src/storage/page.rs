//! Fixed-size pages.
//!
//! Every node page starts with an 8-byte header:
//!
//! ```text
//! 0      page type
//! 1      flags (zero)
//! 2..6   CRC32 of the page with this field zeroed, little-endian
//! 6..8   reserved
//! ```
//!
//! Page 0 is the superblock, which has its own layout and checksum.

use std::ops::Range;

/// Page size in bytes (8KB).
pub const PAGE_SIZE: usize = 8192;

/// Page size as u64 for offset calculations.
pub const PAGE_SIZE_U64: u64 = PAGE_SIZE as u64;

/// A page identifier. Page 0 is never a node, so 0 doubles as "no page".
pub type PageId = u64;

const CHECKSUM: Range<usize> = 2..6;

/// Page type tags stored in the first byte of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    /// B-tree internal node
    BTreeInternal = 0x03,
    /// B-tree leaf node
    BTreeLeaf = 0x04,
}

impl TryFrom<u8> for PageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x03 => Ok(Self::BTreeInternal),
            0x04 => Ok(Self::BTreeLeaf),
            _ => Err(value),
        }
    }
}

/// The parsed header of a node page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub checksum: u32,
}

impl PageHeader {
    /// Size of the page header in bytes.
    pub const SIZE: usize = 8;

    /// A header for a page that has not been sealed yet.
    #[must_use]
    pub const fn new(page_type: PageType) -> Self {
        Self {
            page_type,
            checksum: 0,
        }
    }

    pub fn write_to(self, page: &mut Page) {
        page.write_bytes(0, &[0; Self::SIZE]);
        page.write_u8(0, self.page_type as u8);
        page.write_u32(CHECKSUM.start, self.checksum);
    }

    /// Parse the header at the start of `page`.
    pub fn read(page: &Page) -> Result<Self, PageError> {
        let page_type = PageType::try_from(page.read_u8(0)).map_err(PageError::InvalidPageType)?;
        Ok(Self {
            page_type,
            checksum: page.stored_checksum(),
        })
    }
}

/// A raw page buffer.
#[derive(Clone)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    #[must_use]
    pub fn read_bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(offset, N));
        out
    }

    #[must_use]
    pub fn read_u8(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    /// Integers are little-endian; keys never go through these.
    #[must_use]
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes(self.array(offset))
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    #[must_use]
    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.array(offset))
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    #[must_use]
    pub fn read_u64(&self, offset: usize) -> u64 {
        u64::from_le_bytes(self.array(offset))
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    /// CRC32 of the whole page with the header checksum field read as zero.
    #[must_use]
    pub fn compute_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.data[..CHECKSUM.start]);
        hasher.update(&[0u8; CHECKSUM.end - CHECKSUM.start]);
        hasher.update(&self.data[CHECKSUM.end..]);
        hasher.finalize()
    }

    #[must_use]
    pub fn stored_checksum(&self) -> u32 {
        self.read_u32(CHECKSUM.start)
    }

    /// Compute the checksum and store it in the header.
    pub fn seal(&mut self) {
        let checksum = self.compute_checksum();
        self.write_u32(CHECKSUM.start, checksum);
    }

    /// Check the stored checksum against the page contents.
    pub fn verify_checksum(&self) -> Result<(), PageError> {
        let expected = self.stored_checksum();
        let actual = self.compute_checksum();
        if expected == actual {
            Ok(())
        } else {
            Err(PageError::ChecksumMismatch { expected, actual })
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("type", &self.read_u8(0))
            .field("checksum", &self.stored_checksum())
            .finish_non_exhaustive()
    }
}

/// Errors related to page operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Invalid page type byte.
    InvalidPageType(u8),
    /// Checksum mismatch.
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageType(v) => write!(f, "invalid page type: 0x{v:02x}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected:#010x}, got {actual:#010x}")
            }
        }
    }
}

impl std::error::Error for PageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_written_and_read() {
        let mut page = Page::new();
        page.write_bytes(0, &[0xAA; PageHeader::SIZE]);
        PageHeader {
            page_type: PageType::BTreeInternal,
            checksum: 0xDEAD_BEEF,
        }
        .write_to(&mut page);

        let header = PageHeader::read(&page).expect("should parse");
        assert_eq!(header.page_type, PageType::BTreeInternal);
        assert_eq!(header.checksum, 0xDEAD_BEEF);
        // Flags and reserved bytes are cleared
        assert_eq!(page.read_u8(1), 0);
        assert_eq!(page.read_u16(6), 0);
    }

    #[test]
    fn test_integer_fields_are_little_endian() {
        let mut page = Page::new();
        page.write_u16(50, 0xBEEF);
        page.write_u32(100, 0x1234_5678);
        page.write_u64(200, 0x0102_0304_0506_0708);

        assert_eq!(page.read_bytes(50, 2), &[0xEF, 0xBE]);
        assert_eq!(page.read_u32(100), 0x1234_5678);
        assert_eq!(page.read_u64(200), 0x0102_0304_0506_0708);
        assert_eq!(page.read_u8(200), 0x08);
    }

    #[test]
    fn test_page_type_conversion() {
        assert_eq!(PageType::try_from(0x03), Ok(PageType::BTreeInternal));
        assert_eq!(PageType::try_from(0x04), Ok(PageType::BTreeLeaf));
        assert_eq!(PageType::try_from(0x01), Err(0x01));
        assert!(matches!(
            PageHeader::read(&Page::new()),
            Err(PageError::InvalidPageType(0))
        ));
    }

    #[test]
    fn test_checksum_seal_and_verify() {
        let mut page = Page::new();
        PageHeader::new(PageType::BTreeLeaf).write_to(&mut page);
        page.write_bytes(100, b"payload");
        page.seal();
        assert!(page.verify_checksum().is_ok());
        assert_eq!(PageHeader::read(&page).map(|h| h.checksum), Ok(page.compute_checksum()));

        page.write_u8(PAGE_SIZE - 1, 0x7f);
        assert!(matches!(
            page.verify_checksum(),
            Err(PageError::ChecksumMismatch { .. })
        ));
    }
}
