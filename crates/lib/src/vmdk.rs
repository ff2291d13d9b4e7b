//! Rewriting of monolithic sparse VMDK images.
//!
//! A sparse extent normally describes itself entirely through the header in
//! sector 0. Readers also accept a variant where the header's grain directory
//! offset is set to [`GD_AT_END`], meaning the authoritative metadata lives in
//! a footer near the end of the file:
//!
//! ```text
//! | header (gdOffset = GD_AT_END) | ... grains ... | marker | footer | EOS |
//! ```
//!
//! The marker sector carries type [`MARKER_FOOTER`], the footer is a copy of
//! the original header, and the final sector is an all-zero end-of-stream
//! marker.

use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Every structural region of the format is aligned to this.
pub const SECTOR_SIZE: usize = 512;

/// Byte offset of the 64-bit `gdOffset` field within the header sector.
pub const GD_OFFSET_FIELD: u64 = 56;

/// `gdOffset` value telling readers to consult the footer instead.
pub const GD_AT_END: u64 = u64::MAX;

/// Byte offset of the 32-bit type field within a marker sector.
pub const MARKER_TYPE_FIELD: u64 = 12;

/// Marker type introducing the footer.
pub const MARKER_FOOTER: u32 = 3;

/// Marker, footer, end-of-stream.
const FOOTER_REGION_SECTORS: usize = 3;

/// Length in bytes of the region appended by [`footerify`].
pub const FOOTER_REGION_LEN: u64 = (FOOTER_REGION_SECTORS * SECTOR_SIZE) as u64;

/// Positioned reads and writes over a seekable stream. Each operation either
/// transfers every byte or returns an error.
#[derive(Debug)]
struct PositionedIo<F> {
    inner: F,
}

impl<F: Read + Write + Seek> PositionedIo<F> {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buf)
    }

    /// Append `len` zero bytes, returning the new length.
    fn append_zeroes(&mut self, len: usize) -> io::Result<u64> {
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.write_all(&vec![0u8; len])?;
        self.inner.stream_position()
    }
}

/// Convert a header-only sparse image held in `f` to the footer layout.
///
/// The header is neither parsed nor validated. A stream shorter than one
/// sector fails with [`io::ErrorKind::UnexpectedEof`] before anything is
/// written; any later error leaves the stream partially converted.
///
/// This is not idempotent: running it twice produces a footer that itself
/// carries [`GD_AT_END`].
pub fn footerify<F: Read + Write + Seek>(f: F) -> io::Result<()> {
    let mut io = PositionedIo { inner: f };

    let mut header = [0u8; SECTOR_SIZE];
    io.read_exact_at(0, &mut header)?;

    io.write_all_at(GD_OFFSET_FIELD, &GD_AT_END.to_le_bytes())?;

    let end = io.append_zeroes(FOOTER_REGION_SECTORS * SECTOR_SIZE)?;
    let marker = end - FOOTER_REGION_LEN;
    let footer = marker + SECTOR_SIZE as u64;
    io.write_all_at(marker + MARKER_TYPE_FIELD, &MARKER_FOOTER.to_le_bytes())?;
    io.write_all_at(footer, &header)?;
    // The last sector stays zeroed as the end-of-stream marker.

    io.inner.flush()
}

/// Convert the image file at `path` in place; see [`footerify`].
pub fn footerify_file(path: &Path) -> io::Result<()> {
    let mut f = OpenOptions::new().read(true).write(true).open(path)?;
    footerify(&mut f)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const SECTOR: usize = SECTOR_SIZE;
    const FIELD: std::ops::Range<usize> = 56..64;

    fn sample_header() -> Vec<u8> {
        let mut buf = vec![0xABu8; SECTOR];
        buf[FIELD].fill(0);
        buf
    }

    fn convert(buf: &[u8]) -> Vec<u8> {
        let mut c = Cursor::new(buf.to_vec());
        footerify(&mut c).unwrap();
        c.into_inner()
    }

    #[test]
    fn test_single_sector_scenario() {
        let orig = sample_header();
        let out = convert(&orig);

        assert_eq!(out.len(), 2048);
        assert_eq!(&out[FIELD], &[0xFF; 8]);
        assert!(out[..56].iter().all(|&b| b == 0xAB));
        assert!(out[64..SECTOR].iter().all(|&b| b == 0xAB));

        let marker = &out[512..1024];
        assert_eq!(&marker[12..16], &[3, 0, 0, 0]);
        assert!(marker[..12].iter().all(|&b| b == 0));
        assert!(marker[16..].iter().all(|&b| b == 0));

        let footer = &out[1024..1536];
        assert!(footer[..56].iter().all(|&b| b == 0xAB));
        assert_eq!(&footer[FIELD], &[0u8; 8]);
        assert!(footer[64..].iter().all(|&b| b == 0xAB));

        assert!(out[1536..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_footer_preserves_original_gd_offset() {
        let mut orig = sample_header();
        orig[FIELD].copy_from_slice(&0x0000_0000_0001_2345u64.to_le_bytes());
        // Trailing data that is not sector aligned
        orig.extend((0..1000u32).map(|i| (i % 251) as u8));
        let out = convert(&orig);

        let len = out.len();
        assert_eq!(len, orig.len() + FOOTER_REGION_LEN as usize);
        assert_eq!(&out[len - 1024..len - 512], &orig[..SECTOR]);
        assert_eq!(&out[SECTOR..orig.len()], &orig[SECTOR..]);
        assert_eq!(
            u64::from_le_bytes(out[FIELD].try_into().unwrap()),
            GD_AT_END
        );
        let marker = &out[len - 1536..len - 1024];
        assert_eq!(u32::from_le_bytes(marker[12..16].try_into().unwrap()), 3);
        assert!(out[len - 512..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_input_is_untouched() {
        let orig = vec![0x11u8; 100];
        let mut c = Cursor::new(orig.clone());
        let e = footerify(&mut c).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(c.into_inner(), orig);
    }

    #[test]
    fn test_second_run_corrupts_footer() {
        let orig = sample_header();
        let once = convert(&orig);
        let twice = convert(&once);

        assert_eq!(twice.len(), orig.len() + 2 * FOOTER_REGION_LEN as usize);
        let len = twice.len();
        let footer = &twice[len - 1024..len - 512];
        // The snapshot was taken after the first run set the sentinel, so the
        // footer no longer carries the real grain directory offset.
        assert_eq!(&footer[FIELD], &[0xFF; 8]);
        assert_ne!(footer, &orig[..]);
    }

    #[test]
    fn test_footerify_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let orig = sample_header();
        std::fs::write(tmp.path(), &orig).unwrap();

        footerify_file(tmp.path()).unwrap();

        let out = std::fs::read(tmp.path()).unwrap();
        assert_eq!(out, convert(&orig));
    }

    #[test]
    fn test_footerify_missing_file() {
        let td = tempfile::tempdir().unwrap();
        let e = footerify_file(&td.path().join("absent.vmdk")).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);
    }
}
