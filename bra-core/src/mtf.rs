//! Move-to-Front transform — spec §4.D.

/// Forward MTF: for each input byte, emit its current index in the
/// 256-entry permutation table, then move that symbol to the front.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut out = Vec::with_capacity(input.len());

    for &byte in input {
        let idx = table.iter().position(|&s| s == byte).expect("table is a permutation of all bytes");
        out.push(idx as u8);
        table.copy_within(0..idx, 1);
        table[0] = byte;
    }

    out
}

/// Inverse MTF: for each index, emit the symbol currently at that
/// position, then move it to the front.
pub fn decode(input: &[u8]) -> Vec<u8> {
    let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut out = Vec::with_capacity(input.len());

    for &idx in input {
        let idx = idx as usize;
        let byte = table[idx];
        out.push(byte);
        table.copy_within(0..idx, 1);
        table[0] = byte;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trip_empty() {
        assert_eq!(decode(&encode(b"")), b"");
    }

    #[test]
    fn round_trip_repeated_byte() {
        let data = vec![b'x'; 5000];
        assert_eq!(decode(&encode(&data)), data);
    }

    #[test]
    fn round_trip_all_byte_values() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&data)), data);
    }

    #[test]
    fn length_preserved() {
        let data = b"the quick brown fox jumps over the lazy dog";
        assert_eq!(encode(data).len(), data.len());
    }

    #[test]
    fn recent_symbol_encodes_small_index() {
        // after seeing 'b' once, a second 'b' right after should encode to 0
        let out = encode(b"ab");
        assert_eq!(out[1], 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip(data: Vec<u8>) {
            let encoded = encode(&data);
            prop_assert_eq!(encoded.len(), data.len());
            prop_assert_eq!(decode(&encoded), data);
        }
    }
}
