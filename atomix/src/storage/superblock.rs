//! The superblock: page 0 of a page file.
//!
//! ```text
//! 0..8    magic "ATOMIXDB"
//! 8..12   format version
//! 12..16  page size
//! 16..24  total page count, superblock included
//! 24..32  root page, 0 when the tree is empty
//! 32..36  CRC32 of bytes 0..32
//! ```
//!
//! Integers are little-endian. The rest of the page is zero.

// PAGE_SIZE is a compile-time constant that fits in u32.
#![allow(clippy::cast_possible_truncation)]

use crate::storage::page::{PAGE_SIZE, Page, PageId};

/// Magic number identifying an atomix database file: "ATOMIXDB"
pub const MAGIC: [u8; 8] = *b"ATOMIXDB";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Page size as u32 for storage in superblock.
const PAGE_SIZE_U32: u32 = PAGE_SIZE as u32;

mod offsets {
    pub const MAGIC: usize = 0;
    pub const FORMAT_VERSION: usize = 8;
    pub const PAGE_SIZE: usize = 12;
    pub const TOTAL_PAGE_COUNT: usize = 16;
    pub const ROOT_PAGE: usize = 24;
    pub const CHECKSUM: usize = 32;
}

/// The superblock contains all metadata about the database file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Format version number.
    pub format_version: u32,
    /// Page size in bytes (should always be `PAGE_SIZE`).
    pub page_size: u32,
    /// Total number of pages in the file, superblock included.
    pub total_page_count: u64,
    /// Root page of the tree, or 0 for an empty database.
    pub root_page: PageId,
}

impl Superblock {
    /// Create a new superblock with default values for a fresh database.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            page_size: PAGE_SIZE_U32,
            total_page_count: 1,
            root_page: 0,
        }
    }

    fn checksum(page: &Page) -> u32 {
        crc32fast::hash(page.read_bytes(0, offsets::CHECKSUM))
    }

    /// Serialize into a fresh page with its checksum filled in.
    #[must_use]
    pub fn to_page(&self) -> Page {
        let mut page = Page::new();
        page.write_bytes(offsets::MAGIC, &MAGIC);
        page.write_u32(offsets::FORMAT_VERSION, self.format_version);
        page.write_u32(offsets::PAGE_SIZE, self.page_size);
        page.write_u64(offsets::TOTAL_PAGE_COUNT, self.total_page_count);
        page.write_u64(offsets::ROOT_PAGE, self.root_page);
        page.write_u32(offsets::CHECKSUM, Self::checksum(&page));
        page
    }

    /// Parse and validate page 0.
    ///
    /// Checks run in order: magic, checksum, version, page size, root.
    pub fn from_page(page: &Page) -> Result<Self, SuperblockError> {
        let mut magic = [0u8; MAGIC.len()];
        magic.copy_from_slice(page.read_bytes(offsets::MAGIC, MAGIC.len()));
        if magic != MAGIC {
            return Err(SuperblockError::InvalidMagic(magic));
        }

        let expected = page.read_u32(offsets::CHECKSUM);
        let actual = Self::checksum(page);
        if expected != actual {
            return Err(SuperblockError::ChecksumMismatch { expected, actual });
        }

        let format_version = page.read_u32(offsets::FORMAT_VERSION);
        if format_version != FORMAT_VERSION {
            return Err(SuperblockError::UnsupportedVersion(format_version));
        }

        let page_size = page.read_u32(offsets::PAGE_SIZE);
        if page_size != PAGE_SIZE_U32 {
            return Err(SuperblockError::InvalidPageSize(page_size));
        }

        let total_page_count = page.read_u64(offsets::TOTAL_PAGE_COUNT);
        let root_page = page.read_u64(offsets::ROOT_PAGE);
        if root_page >= total_page_count {
            return Err(SuperblockError::InvalidRoot {
                root_page,
                total_page_count,
            });
        }

        Ok(Self {
            format_version,
            page_size,
            total_page_count,
            root_page,
        })
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when reading a superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperblockError {
    /// Invalid magic number.
    InvalidMagic([u8; 8]),
    /// Unsupported format version.
    UnsupportedVersion(u32),
    /// Invalid page size.
    InvalidPageSize(u32),
    /// The header checksum does not match its contents.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// The root page lies outside the file.
    InvalidRoot {
        root_page: PageId,
        total_page_count: u64,
    },
}

impl std::fmt::Display for SuperblockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "invalid magic number: {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::InvalidPageSize(s) => write!(f, "invalid page size: {s}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidRoot {
                root_page,
                total_page_count,
            } => write!(
                f,
                "root page {root_page} out of bounds (total pages: {total_page_count})"
            ),
        }
    }
}

impl std::error::Error for SuperblockError {}
