//! Canonical Huffman codec over the 256 byte values — spec §4.E.
//!
//! The encoder builds a Huffman tree purely to derive code *lengths*
//! (ties broken by lower symbol first, then lower accumulated weight, per
//! spec §9 Open Question 2); the actual bit codes are then rebuilt
//! canonically from those lengths, the same way on both the encode and
//! decode side, so only the length table — not the tree shape — needs to
//! cross the wire.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{Error, Result};

pub const NUM_SYMBOLS: usize = 256;

/// Result of a forward Huffman pass over one chunk.
pub struct Encoded {
    pub code_lengths: [u8; NUM_SYMBOLS],
    pub payload: Vec<u8>,
    pub orig: u32,
    pub encoded: u32,
}

struct Node {
    weight: u64,
    first_sym: u8,
    seq: u32,
    left: i32,
    right: i32,
    leaf: Option<u8>,
}

/// Build code lengths for every symbol with nonzero frequency.
fn build_lengths(freq: &[u64; NUM_SYMBOLS]) -> [u8; NUM_SYMBOLS] {
    let mut lengths = [0u8; NUM_SYMBOLS];

    let present: Vec<u8> = (0..NUM_SYMBOLS).filter(|&s| freq[s] > 0).map(|s| s as u8).collect();

    if present.is_empty() {
        return lengths;
    }
    if present.len() == 1 {
        lengths[present[0] as usize] = 1;
        return lengths;
    }

    let mut nodes: Vec<Node> = Vec::with_capacity(2 * present.len());
    let mut heap: BinaryHeap<Reverse<(u64, u8, u32, usize)>> = BinaryHeap::new();

    for &sym in &present {
        let idx = nodes.len();
        nodes.push(Node {
            weight: freq[sym as usize],
            first_sym: sym,
            seq: sym as u32,
            left: -1,
            right: -1,
            leaf: Some(sym),
        });
        heap.push(Reverse((freq[sym as usize], sym, sym as u32, idx)));
    }

    let mut seq = NUM_SYMBOLS as u32;
    while heap.len() > 1 {
        let Reverse((w1, s1, _, i1)) = heap.pop().unwrap();
        let Reverse((w2, s2, _, i2)) = heap.pop().unwrap();
        let parent = nodes.len();
        let weight = w1 + w2;
        let first_sym = s1.min(s2);
        nodes.push(Node {
            weight,
            first_sym,
            seq,
            left: i1 as i32,
            right: i2 as i32,
            leaf: None,
        });
        heap.push(Reverse((weight, first_sym, seq, parent)));
        seq += 1;
    }

    let root = heap.pop().unwrap().0 .3;

    // iterative depth walk to avoid recursion depth concerns for pathological trees
    let mut stack = vec![(root, 0u8)];
    while let Some((idx, depth)) = stack.pop() {
        let node = &nodes[idx];
        if let Some(sym) = node.leaf {
            lengths[sym as usize] = depth.max(1);
        } else {
            stack.push((node.left as usize, depth + 1));
            stack.push((node.right as usize, depth + 1));
        }
    }

    lengths
}

/// Rebuild canonical `(code, length)` pairs from a length table. Shared by
/// encode and decode so both sides derive identical bit patterns.
fn canonical_codes(lengths: &[u8; NUM_SYMBOLS]) -> Result<[Option<(u32, u8)>; NUM_SYMBOLS]> {
    let mut order: Vec<(u8, u8)> = (0..NUM_SYMBOLS)
        .filter(|&s| lengths[s] > 0)
        .map(|s| (lengths[s], s as u8))
        .collect();
    order.sort_unstable();

    for &(len, _) in &order {
        if len == 0 || len > 31 {
            return Err(Error::InvalidCodes { reason: "code length out of range" });
        }
    }

    let mut codes: [Option<(u32, u8)>; NUM_SYMBOLS] = [None; NUM_SYMBOLS];
    let mut code: u32 = 0;
    let mut prev_len = 0u8;
    for (len, sym) in order {
        if len > prev_len {
            code <<= (len - prev_len) as u32;
            prev_len = len;
        }
        if code >= (1u32 << len) {
            return Err(Error::InvalidCodes { reason: "lengths do not satisfy Kraft inequality" });
        }
        codes[sym as usize] = Some((code, len));
        code += 1;
    }

    Ok(codes)
}

struct BitWriter {
    buf: Vec<u8>,
    cur: u8,
    nbits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self { buf: Vec::new(), cur: 0, nbits: 0 }
    }

    fn push(&mut self, code: u32, len: u8) {
        for i in (0..len).rev() {
            let bit = ((code >> i) & 1) as u8;
            self.cur = (self.cur << 1) | bit;
            self.nbits += 1;
            if self.nbits == 8 {
                self.buf.push(self.cur);
                self.cur = 0;
                self.nbits = 0;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.buf.push(self.cur);
        }
        self.buf
    }
}

/// Forward pass: frequency count, length assignment, canonical codes,
/// MSB-first bit packing.
pub fn encode(data: &[u8]) -> Encoded {
    let mut freq = [0u64; NUM_SYMBOLS];
    for &b in data {
        freq[b as usize] += 1;
    }

    let code_lengths = build_lengths(&freq);
    let codes = canonical_codes(&code_lengths).expect("lengths derived from a valid tree");

    let mut writer = BitWriter::new();
    for &b in data {
        let (code, len) = codes[b as usize].expect("every byte present has a nonzero length");
        writer.push(code, len);
    }
    let payload = writer.finish();

    Encoded {
        code_lengths,
        encoded: payload.len() as u32,
        orig: data.len() as u32,
        payload,
    }
}

struct Trie {
    // children[node][bit]; -1 means absent
    children: Vec<[i32; 2]>,
    symbol: Vec<Option<u8>>,
}

impl Trie {
    fn build(codes: &[Option<(u32, u8)>; NUM_SYMBOLS]) -> Self {
        let mut children = vec![[-1i32, -1]];
        let mut symbol = vec![None];

        for sym in 0..NUM_SYMBOLS {
            let Some((code, len)) = codes[sym] else { continue };
            let mut node = 0usize;
            for i in (0..len).rev() {
                let bit = ((code >> i) & 1) as usize;
                if children[node][bit] == -1 {
                    children.push([-1, -1]);
                    symbol.push(None);
                    children[node][bit] = (children.len() - 1) as i32;
                }
                node = children[node][bit] as usize;
            }
            symbol[node] = Some(sym as u8);
        }

        Self { children, symbol }
    }
}

/// Inverse pass: rebuild canonical codes from the length table, walk the
/// bitstream MSB-first through the resulting trie, emit `orig` symbols.
pub fn decode(code_lengths: &[u8; NUM_SYMBOLS], payload: &[u8], encoded: u32, orig: u32) -> Result<Vec<u8>> {
    if orig == 0 {
        return Ok(Vec::new());
    }
    if payload.len() != encoded as usize {
        return Err(Error::Truncated {
            context: "huffman payload",
            expected: encoded as usize,
            got: payload.len(),
        });
    }

    let present = code_lengths.iter().filter(|&&l| l > 0).count();
    if present == 0 {
        return Err(Error::InvalidCodes { reason: "no symbols have a nonzero code length" });
    }

    // single-symbol special case: one bit ('0') per occurrence
    if present == 1 {
        let sym = code_lengths.iter().position(|&l| l > 0).unwrap() as u8;
        if code_lengths[sym as usize] != 1 {
            return Err(Error::InvalidCodes { reason: "single-symbol length must be 1" });
        }
        return Ok(vec![sym; orig as usize]);
    }

    let codes = canonical_codes(code_lengths)?;
    let trie = Trie::build(&codes);

    let mut out = Vec::with_capacity(orig as usize);
    let mut node = 0usize;
    let mut byte_idx = 0usize;
    let mut bit_idx = 0u8; // 0 = MSB

    while out.len() < orig as usize {
        if byte_idx >= payload.len() {
            return Err(Error::Truncated {
                context: "huffman bitstream",
                expected: orig as usize,
                got: out.len(),
            });
        }
        let bit = (payload[byte_idx] >> (7 - bit_idx)) & 1;
        let next = trie.children[node][bit as usize];
        if next == -1 {
            return Err(Error::InvalidCodes { reason: "bitstream does not match a valid code" });
        }
        node = next as usize;

        bit_idx += 1;
        if bit_idx == 8 {
            bit_idx = 0;
            byte_idx += 1;
        }

        if let Some(sym) = trie.symbol[node] {
            out.push(sym);
            node = 0;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round_trip(data: &[u8]) {
        let enc = encode(data);
        let dec = decode(&enc.code_lengths, &enc.payload, enc.encoded, enc.orig).unwrap();
        assert_eq!(dec, data);
    }

    #[test]
    fn round_trip_single_symbol() {
        round_trip(&vec![42u8; 1000]);
    }

    #[test]
    fn single_symbol_code_length_is_one() {
        let enc = encode(&vec![7u8; 10]);
        assert_eq!(enc.code_lengths[7], 1);
        assert_eq!(enc.code_lengths.iter().filter(|&&l| l > 0).count(), 1);
    }

    #[test]
    fn round_trip_two_symbols() {
        round_trip(b"ababababababab");
    }

    #[test]
    fn round_trip_all_byte_values_uniform() {
        let data: Vec<u8> = (0..=255u8).collect();
        round_trip(&data);
    }

    #[test]
    fn round_trip_skewed_distribution() {
        let mut data = vec![b'a'; 1000];
        data.extend(vec![b'b'; 10]);
        data.push(b'c');
        round_trip(&data);
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let enc = encode(b"hello world, hello again");
        let err = decode(&enc.code_lengths, &enc.payload[..enc.payload.len() - 1], enc.encoded, enc.orig);
        assert!(err.is_err());
    }

    #[test]
    fn decode_rejects_all_zero_lengths() {
        let lengths = [0u8; NUM_SYMBOLS];
        let err = decode(&lengths, &[], 0, 5).unwrap_err();
        assert!(matches!(err, Error::InvalidCodes { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn prop_round_trip(data in prop::collection::vec(any::<u8>(), 1..3000)) {
            let enc = encode(&data);
            let dec = decode(&enc.code_lengths, &enc.payload, enc.encoded, enc.orig).unwrap();
            prop_assert_eq!(dec, data);
        }
    }
}
