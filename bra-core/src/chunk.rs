//! Chunk pipeline — spec §4.F.
//!
//! Applies BWT → MTF → Huffman (forward) or the inverse in a file's
//! content one 64 KiB chunk at a time. Each chunk is self-delimiting (it
//! carries its own [`ChunkHeader`]), so a reader never needs to know how
//! many chunks a file contains up front — only the total stream length.
//!
//! This module owns the codec composition only. The STORED-vs-COMPRESSED
//! decision and the scratch-then-compare dance live in [`crate::session`],
//! which already owns the destination file handle the fallback needs to
//! rewind.

use std::io::{Read, Write};

use crate::crc32c;
use crate::error::{Error, Result};
use crate::format::{ChunkHeader, CHUNK_HEADER_FIXED_SIZE, CHUNK_SIZE};
use crate::{bwt, huffman, mtf};

/// Result of compressing a file's content into a self-delimiting stream.
pub struct CompressResult {
    /// Total bytes written to `dst` (all chunk headers + payloads).
    pub stream_len: u64,
    /// CRC-32C over (chunk header bytes, then original chunk bytes) for
    /// every chunk, in serialization order — the quantity a reader will
    /// reproduce while decoding, per spec §4.F step 4.
    pub crc: u32,
    /// Byte length of the string `crc` was computed over: the sum of
    /// `CHUNK_HEADER_FIXED_SIZE + orig_size` across every chunk. Entry-level
    /// CRC combination (spec §4.F step 7) needs this, not `stream_len`,
    /// since `crc` is not a CRC of the on-disk encoded bytes.
    pub logical_len: u64,
}

/// Compress `length` bytes read from `src`, writing the chunked,
/// self-delimiting COMPRESSED stream to `dst`.
pub fn compress_stream(mut src: impl Read, length: u64, mut dst: impl Write) -> Result<CompressResult> {
    let mut remaining = length;
    let mut crc = 0u32;
    let mut stream_len = 0u64;
    let mut logical_len = 0u64;
    let mut buf = vec![0u8; CHUNK_SIZE];

    while remaining > 0 {
        let take = remaining.min(CHUNK_SIZE as u64) as usize;
        src.read_exact(&mut buf[..take])?;
        let chunk = &buf[..take];

        let (bwt_out, primary) = bwt::encode(chunk);
        let mtf_out = mtf::encode(&bwt_out);
        let huff = huffman::encode(&mtf_out);

        let header = ChunkHeader {
            encoded_size: huff.encoded,
            orig_size: take as u32,
            code_lengths: huff.code_lengths,
            primary_index: primary,
        };
        let header_bytes = header.to_bytes();

        crc = crc32c::update(crc, &header_bytes);
        crc = crc32c::update(crc, chunk);
        logical_len += (header_bytes.len() + take) as u64;

        dst.write_all(&header_bytes)?;
        dst.write_all(&huff.payload)?;
        stream_len += (header_bytes.len() + huff.payload.len()) as u64;

        remaining -= take as u64;
    }

    Ok(CompressResult { stream_len, crc, logical_len })
}

/// Decompress a COMPRESSED stream of exactly `stream_length` bytes read
/// from `src`, writing the reconstructed original bytes to `dst`.
/// Returns the CRC-32C accumulated the same way the writer computed it
/// (`crc`) and the byte length it was computed over (`logical_len`), for
/// the caller to verify/combine against the entry's stored CRC.
pub fn decompress_stream(mut src: impl Read, stream_length: u64, mut dst: impl Write) -> Result<(u32, u64)> {
    let mut remaining = stream_length;
    let mut crc = 0u32;
    let mut logical_len = 0u64;

    while remaining > 0 {
        if remaining < CHUNK_HEADER_FIXED_SIZE as u64 {
            return Err(Error::Truncated {
                context: "chunk header",
                expected: CHUNK_HEADER_FIXED_SIZE,
                got: remaining as usize,
            });
        }

        let mut header_buf = vec![0u8; CHUNK_HEADER_FIXED_SIZE];
        src.read_exact(&mut header_buf)?;
        remaining -= CHUNK_HEADER_FIXED_SIZE as u64;

        let header = ChunkHeader::from_bytes(&header_buf)
            .expect("fixed-size buffer always parses");

        if header.orig_size == 0 || header.orig_size as usize > CHUNK_SIZE {
            return Err(Error::OversizedField {
                field: "orig_size",
                value: header.orig_size as u64,
                limit: CHUNK_SIZE as u64,
            });
        }
        if header.encoded_size == 0 || header.encoded_size as usize > CHUNK_SIZE {
            return Err(Error::OversizedField {
                field: "encoded_size",
                value: header.encoded_size as u64,
                limit: CHUNK_SIZE as u64,
            });
        }
        if header.encoded_size as u64 > remaining {
            return Err(Error::Truncated {
                context: "chunk payload",
                expected: header.encoded_size as usize,
                got: remaining as usize,
            });
        }

        let mut payload = vec![0u8; header.encoded_size as usize];
        src.read_exact(&mut payload)?;
        remaining -= header.encoded_size as u64;

        crc = crc32c::update(crc, &header_buf);
        logical_len += header_buf.len() as u64;

        let mtf_out = huffman::decode(&header.code_lengths, &payload, header.encoded_size, header.orig_size)?;
        let bwt_out = mtf::decode(&mtf_out);
        let decoded = bwt::decode(&bwt_out, header.orig_size as usize, header.primary_index)?;

        crc = crc32c::update(crc, &decoded);
        logical_len += decoded.len() as u64;
        dst.write_all(&decoded)?;
    }

    Ok((crc, logical_len))
}

/// Plain chunked copy (the STORED path): no transform, CRC over the
/// copied bytes directly.
pub fn copy_stream(mut src: impl Read, length: u64, mut dst: impl Write) -> Result<u32> {
    let mut remaining = length;
    let mut crc = 0u32;
    let mut buf = vec![0u8; CHUNK_SIZE];

    while remaining > 0 {
        let take = remaining.min(CHUNK_SIZE as u64) as usize;
        src.read_exact(&mut buf[..take])?;
        crc = crc32c::update(crc, &buf[..take]);
        dst.write_all(&buf[..take])?;
        remaining -= take as u64;
    }

    Ok(crc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn compress_then_decompress_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(200);
        let mut compressed = Vec::new();
        let res = compress_stream(Cursor::new(&data), data.len() as u64, &mut compressed).unwrap();
        assert_eq!(res.stream_len, compressed.len() as u64);

        let mut decompressed = Vec::new();
        let (crc, logical_len) = decompress_stream(Cursor::new(&compressed), compressed.len() as u64, &mut decompressed).unwrap();
        assert_eq!(decompressed, data);
        assert_eq!(crc, res.crc);
        assert_eq!(logical_len, res.logical_len);
    }

    #[test]
    fn multi_chunk_round_trip() {
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 123).map(|i| (i % 251) as u8).collect();
        let mut compressed = Vec::new();
        let res = compress_stream(Cursor::new(&data), data.len() as u64, &mut compressed).unwrap();

        let mut decompressed = Vec::new();
        let (crc, logical_len) = decompress_stream(Cursor::new(&compressed), compressed.len() as u64, &mut decompressed).unwrap();
        assert_eq!(decompressed, data);
        assert_eq!(crc, res.crc);
        assert_eq!(logical_len, res.logical_len);
    }

    #[test]
    fn copy_stream_round_trips_and_matches_crc() {
        let data = b"store me as-is".to_vec();
        let mut dst = Vec::new();
        let crc = copy_stream(Cursor::new(&data), data.len() as u64, &mut dst).unwrap();
        assert_eq!(dst, data);
        assert_eq!(crc, crc32c::compute(&data));
    }

    #[test]
    fn decompress_rejects_oversized_orig_size() {
        let mut bad = ChunkHeader {
            encoded_size: 1,
            orig_size: (CHUNK_SIZE + 1) as u32,
            code_lengths: [0u8; huffman::NUM_SYMBOLS],
            primary_index: 0,
        }
        .to_bytes();
        bad.push(0); // one payload byte
        let err = decompress_stream(Cursor::new(&bad), bad.len() as u64, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::OversizedField { .. }));
    }

    #[test]
    fn decompress_rejects_truncated_header() {
        let short = vec![0u8; 10];
        let err = decompress_stream(Cursor::new(&short), short.len() as u64, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn logical_len_accounts_for_chunk_headers_not_encoded_bytes() {
        let data = vec![0u8; 10_000];
        let mut compressed = Vec::new();
        let res = compress_stream(Cursor::new(&data), data.len() as u64, &mut compressed).unwrap();
        assert_eq!(res.logical_len, CHUNK_HEADER_FIXED_SIZE as u64 + data.len() as u64);
        assert_ne!(res.logical_len, res.stream_len);
    }

    #[test]
    fn compressible_data_shrinks() {
        let data = vec![0u8; 10_000];
        let mut compressed = Vec::new();
        compress_stream(Cursor::new(&data), data.len() as u64, &mut compressed).unwrap();
        assert!(compressed.len() < 200, "expected strong compression of all-zero input, got {} bytes", compressed.len());
    }
}
