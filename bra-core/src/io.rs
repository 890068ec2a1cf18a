//! Archive stream I/O — spec §4.H.
//!
//! Thin procedures over a `Read`/`Write`/`Seek` handle that read and
//! write the on-disk structures [`crate::format`] defines, and drive the
//! [`crate::chunk`] pipeline for file payloads. No directory walking, no
//! tree bookkeeping, no overwrite policy — that belongs to
//! [`crate::session`], which calls these in sequence.
//!
//! Every per-entry CRC-32C is computed over the entry's serialized prefix
//! (attribute byte, name, type-specific tail) combined with the logical
//! payload CRC the chunk pipeline reports — not over the literal on-disk
//! payload bytes, since a COMPRESSED payload's encoded bytes never appear
//! verbatim on either side of the comparison (spec §4.F step 4/7).

use std::io::{Read, Seek, SeekFrom, Write};

use crate::chunk;
use crate::crc32c;
use crate::error::{Error, Result};
use crate::format::{Compression, EntryMeta, EntryType, Footer, Header, ENTRY_CRC_SIZE, FOOTER_SIZE, HEADER_SIZE};

pub fn write_header(dst: &mut impl Write, header: Header) -> Result<()> {
    dst.write_all(&header.to_bytes())?;
    Ok(())
}

pub fn read_header(src: &mut impl Read) -> Result<Header> {
    let mut buf = [0u8; HEADER_SIZE];
    src.read_exact(&mut buf)?;
    Header::from_bytes(&buf).ok_or(Error::BadMagic { context: "archive header" })
}

pub fn write_footer(dst: &mut impl Write, footer: Footer) -> Result<()> {
    dst.write_all(&footer.to_bytes())?;
    Ok(())
}

/// Locate and read the footer, which always occupies the final
/// [`FOOTER_SIZE`] bytes of the file regardless of any SFX stub prefix
/// that may precede the archive proper.
pub fn read_footer(src: &mut (impl Read + Seek)) -> Result<Footer> {
    let end = src.seek(SeekFrom::End(0))?;
    if end < FOOTER_SIZE as u64 {
        return Err(Error::Truncated { context: "archive footer", expected: FOOTER_SIZE, got: end as usize });
    }
    src.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
    let mut buf = [0u8; FOOTER_SIZE];
    src.read_exact(&mut buf)?;
    let footer = Footer::from_bytes(&buf).ok_or(Error::BadMagic { context: "archive footer" })?;
    if footer.header_offset <= 0 || footer.header_offset as u64 + HEADER_SIZE as u64 > end - FOOTER_SIZE as u64 {
        return Err(Error::BadMagic { context: "archive footer offset" });
    }
    Ok(footer)
}

/// Seek to the header the footer points to and read it, leaving the
/// stream positioned right after the header, at the start of the first
/// entry record.
pub fn locate_header(src: &mut (impl Read + Seek)) -> Result<Header> {
    let footer = read_footer(src)?;
    src.seek(SeekFrom::Start(footer.header_offset as u64))?;
    read_header(src)
}

/// Write a directory entry (`Dir` or `Subdir`, which carry no payload):
/// prefix, then trailing CRC over the prefix alone.
pub fn write_dir_entry(dst: &mut impl Write, meta: &EntryMeta) -> Result<()> {
    debug_assert!(matches!(meta.entry_type(), EntryType::Dir | EntryType::Subdir));
    let bytes = meta.to_bytes()?;
    let crc = crc32c::compute(&bytes);
    dst.write_all(&bytes)?;
    dst.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Write one FILE entry: a placeholder prefix (data_size unknown until
/// compression is attempted), the payload via the chunk pipeline — falling
/// back from COMPRESSED to STORED in place if compression didn't shrink
/// the data (spec §4.F step 6, which is why this restarts the entry
/// instead of patching just the payload: the attribute byte the CRC
/// covers changes too) — then the patched-in final prefix and trailing
/// entry CRC. `dst` and `src` must both be seekable.
pub fn write_file_entry(
    dst: &mut (impl Write + Seek),
    mut src: impl Read + Seek,
    name: &str,
    orig_len: u64,
    want_compress: bool,
) -> Result<Compression> {
    let entry_start = dst.stream_position()?;

    let placeholder_compression = if want_compress { Compression::Compressed } else { Compression::Stored };
    let placeholder = (EntryMeta::File { name: name.to_string(), compression: placeholder_compression, data_size: 0 }).to_bytes()?;
    dst.write_all(&placeholder)?;
    let payload_start = dst.stream_position()?;

    let (final_compression, payload_len, payload_crc, logical_len) = if want_compress {
        let src_start = src.stream_position()?;
        let compressed = chunk::compress_stream(&mut src, orig_len, &mut *dst)?;
        if compressed.stream_len < orig_len {
            (Compression::Compressed, compressed.stream_len, compressed.crc, compressed.logical_len)
        } else {
            dst.seek(SeekFrom::Start(payload_start))?;
            src.seek(SeekFrom::Start(src_start))?;
            let crc = chunk::copy_stream(&mut src, orig_len, &mut *dst)?;
            (Compression::Stored, orig_len, crc, orig_len)
        }
    } else {
        let crc = chunk::copy_stream(&mut src, orig_len, &mut *dst)?;
        (Compression::Stored, orig_len, crc, orig_len)
    };

    let payload_end = dst.stream_position()?;

    let final_prefix = (EntryMeta::File { name: name.to_string(), compression: final_compression, data_size: payload_len }).to_bytes()?;
    debug_assert_eq!(final_prefix.len(), placeholder.len(), "data_size is a fixed-width field; patching must not resize the prefix");
    dst.seek(SeekFrom::Start(entry_start))?;
    dst.write_all(&final_prefix)?;
    dst.seek(SeekFrom::Start(payload_end))?;

    let prefix_crc = crc32c::compute(&final_prefix);
    let entry_crc = crc32c::combine(prefix_crc, payload_crc, logical_len);
    dst.write_all(&entry_crc.to_le_bytes())?;

    Ok(final_compression)
}

/// Read one entry's prefix (attribute byte, name, type-specific tail).
/// Leaves the stream positioned at the start of the payload (for `File`)
/// or the trailing CRC (for `Dir`/`Subdir`, which have no payload).
/// Rejects `Symlink` as unsupported per spec §4.A/§9 Open Question 3.
pub fn read_entry_meta(src: &mut impl Read) -> Result<EntryMeta> {
    let meta = EntryMeta::read_from(src)?;
    if matches!(meta.entry_type(), EntryType::Symlink) {
        return Err(Error::Unsupported { what: "symlink entries" });
    }
    Ok(meta)
}

/// Verify a `Dir`/`Subdir` entry's trailing CRC against its prefix.
pub fn read_dir_entry_crc(src: &mut impl Read, meta: &EntryMeta) -> Result<()> {
    let expected = crc32c::compute(&meta.to_bytes()?);
    let mut buf = [0u8; ENTRY_CRC_SIZE];
    src.read_exact(&mut buf)?;
    let stored = u32::from_le_bytes(buf);
    if stored != expected {
        return Err(Error::CrcMismatch { entry: Some(meta.name().to_string()), expected, got: stored });
    }
    Ok(())
}

/// Decode a FILE entry's payload to `dst`, verifying the trailing entry
/// CRC. Used by both `extract` (where `dst` keeps the bytes) and `test`
/// (where `dst` is `io::sink()`).
pub fn read_file_entry(src: &mut impl Read, meta: &EntryMeta, dst: &mut impl Write) -> Result<()> {
    let EntryMeta::File { compression, data_size, .. } = meta else {
        unreachable!("read_file_entry called with a non-File EntryMeta")
    };

    let prefix_crc = crc32c::compute(&meta.to_bytes()?);
    let (payload_crc, logical_len) = match compression {
        Compression::Stored => {
            let crc = chunk::copy_stream(&mut *src, *data_size, &mut *dst)?;
            (crc, *data_size)
        }
        Compression::Compressed => chunk::decompress_stream(&mut *src, *data_size, &mut *dst)?,
    };
    let entry_crc = crc32c::combine(prefix_crc, payload_crc, logical_len);

    let mut crc_buf = [0u8; ENTRY_CRC_SIZE];
    src.read_exact(&mut crc_buf)?;
    let stored_crc = u32::from_le_bytes(crc_buf);
    if stored_crc != entry_crc {
        return Err(Error::CrcMismatch { entry: Some(meta.name().to_string()), expected: entry_crc, got: stored_crc });
    }
    Ok(())
}

/// Skip a FILE entry's payload and trailing CRC without decoding it (the
/// `list` path, which only needs metadata already captured in `meta`).
/// Returns the trailing CRC as stored on disk, for callers (e.g. `list`)
/// that print it without verifying.
pub fn skip_file_entry(src: &mut (impl Read + Seek), meta: &EntryMeta) -> Result<u32> {
    let EntryMeta::File { data_size, .. } = meta else {
        unreachable!("skip_file_entry called with a non-File EntryMeta")
    };
    src.seek(SeekFrom::Current(*data_size as i64))?;
    let mut crc_buf = [0u8; ENTRY_CRC_SIZE];
    src.read_exact(&mut crc_buf)?;
    Ok(u32::from_le_bytes(crc_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_footer_round_trip_through_stream() {
        let mut buf: Vec<u8> = Vec::new();
        write_header(&mut buf, Header { num_files: 7 }).unwrap();
        let header_offset = 0u64;
        buf.extend_from_slice(b"pretend entry bytes");
        write_footer(&mut buf, Footer { header_offset: header_offset as i64 }).unwrap();

        let mut cursor = Cursor::new(buf);
        let header = locate_header(&mut cursor).unwrap();
        assert_eq!(header.num_files, 7);
    }

    #[test]
    fn locate_header_skips_leading_sfx_stub() {
        let stub = b"#!/bin/sh\nexec-a-self-extractor-stub\n";
        let mut buf: Vec<u8> = Vec::new();
        buf.extend_from_slice(stub);
        let header_offset = buf.len() as u64;
        write_header(&mut buf, Header { num_files: 1 }).unwrap();
        buf.extend_from_slice(b"entrydata");
        write_footer(&mut buf, Footer { header_offset: header_offset as i64 }).unwrap();

        let mut cursor = Cursor::new(buf);
        let header = locate_header(&mut cursor).unwrap();
        assert_eq!(header.num_files, 1);
    }

    #[test]
    fn footer_rejects_offset_that_does_not_leave_room_for_header() {
        let mut buf: Vec<u8> = Vec::new();
        write_footer(&mut buf, Footer { header_offset: 1_000_000 }).unwrap();
        let mut cursor = Cursor::new(buf);
        let err = read_footer(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::BadMagic { .. }));
    }

    #[test]
    fn footer_rejects_nonpositive_offset() {
        let mut buf: Vec<u8> = Vec::new();
        write_footer(&mut buf, Footer { header_offset: 0 }).unwrap();
        let mut cursor = Cursor::new(buf);
        let err = read_footer(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::BadMagic { .. }));
    }

    fn roundtrip_file(data: &[u8], want_compress: bool) -> (Vec<u8>, Compression) {
        let mut archive = Cursor::new(Vec::new());
        let compression = write_file_entry(&mut archive, Cursor::new(data), "f.bin", data.len() as u64, want_compress).unwrap();
        (archive.into_inner(), compression)
    }

    #[test]
    fn compressible_file_entry_round_trips() {
        let data = vec![b'q'; 20_000];
        let (bytes, compression) = roundtrip_file(&data, true);
        assert_eq!(compression, Compression::Compressed);

        let mut cursor = Cursor::new(bytes);
        let meta = read_entry_meta(&mut cursor).unwrap();
        assert_eq!(meta.name(), "f.bin");
        let mut out = Vec::new();
        read_file_entry(&mut cursor, &meta, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn incompressible_file_entry_falls_back_to_stored() {
        let data = b"x".to_vec();
        let (bytes, compression) = roundtrip_file(&data, true);
        assert_eq!(compression, Compression::Stored);

        let mut cursor = Cursor::new(bytes);
        let meta = read_entry_meta(&mut cursor).unwrap();
        let mut out = Vec::new();
        read_file_entry(&mut cursor, &meta, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn uncompressed_request_stores_directly() {
        let data = vec![0u8; 5000];
        let (bytes, compression) = roundtrip_file(&data, false);
        assert_eq!(compression, Compression::Stored);
        let mut cursor = Cursor::new(bytes);
        let meta = read_entry_meta(&mut cursor).unwrap();
        let mut out = Vec::new();
        read_file_entry(&mut cursor, &meta, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn file_entry_detects_payload_corruption() {
        let data = vec![1u8, 2, 3, 4, 5];
        let (mut bytes, _) = roundtrip_file(&data, false);
        *bytes.last_mut().unwrap() ^= 0xFF; // flip a CRC byte
        let mut cursor = Cursor::new(bytes);
        let meta = read_entry_meta(&mut cursor).unwrap();
        let mut out = Vec::new();
        let err = read_file_entry(&mut cursor, &meta, &mut out).unwrap_err();
        assert!(matches!(err, Error::CrcMismatch { .. }));
    }

    #[test]
    fn skip_file_entry_advances_past_payload_and_crc() {
        let data = vec![b'z'; 2000];
        let (bytes, _) = roundtrip_file(&data, false);
        let mut cursor = Cursor::new(bytes);
        let meta = read_entry_meta(&mut cursor).unwrap();
        skip_file_entry(&mut cursor, &meta).unwrap();
        assert_eq!(cursor.position(), cursor.get_ref().len() as u64);
    }

    #[test]
    fn dir_entry_round_trips_through_stream() {
        let meta = EntryMeta::Dir { name: "subdir".to_string() };
        let mut buf = Vec::new();
        write_dir_entry(&mut buf, &meta).unwrap();

        let mut cursor = Cursor::new(buf);
        let back = read_entry_meta(&mut cursor).unwrap();
        assert_eq!(back, meta);
        read_dir_entry_crc(&mut cursor, &back).unwrap();
    }

    #[test]
    fn dir_entry_detects_corruption() {
        let meta = EntryMeta::Subdir { name: "b".to_string(), parent_index: 1 };
        let mut buf = Vec::new();
        write_dir_entry(&mut buf, &meta).unwrap();
        *buf.last_mut().unwrap() ^= 0xFF;

        let mut cursor = Cursor::new(buf);
        let back = read_entry_meta(&mut cursor).unwrap();
        let err = read_dir_entry_crc(&mut cursor, &back).unwrap_err();
        assert!(matches!(err, Error::CrcMismatch { .. }));
    }

    #[test]
    fn read_entry_meta_rejects_symlink() {
        let meta = EntryMeta::Symlink { name: "link".to_string(), data_size: 3 };
        let mut buf = meta.to_bytes().unwrap();
        buf.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(buf);
        let err = read_entry_meta(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
