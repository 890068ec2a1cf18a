//! Burrows-Wheeler Transform — spec §4.C.
//!
//! The forward transform sorts the `n` cyclic rotations of the input and
//! returns their last column plus the row index of the unrotated input
//! (`primary`). Rotation order is found with a doubling suffix-array
//! construction (O(n log^2 n)) rather than an O(n^2 log n) comparison
//! sort of full rotations, per spec §9's rearchitecture note; this stays
//! comfortably inside the 64 KiB chunk budget.

use crate::error::{Error, Result};

/// Forward BWT. Returns `(last_column, primary_row)`.
pub fn encode(data: &[u8]) -> (Vec<u8>, u32) {
    let n = data.len();
    if n == 0 {
        return (Vec::new(), 0);
    }
    if n == 1 {
        return (data.to_vec(), 0);
    }

    let sa = cyclic_suffix_array(data);

    let mut last_col = vec![0u8; n];
    let mut primary = 0u32;
    for (row, &start) in sa.iter().enumerate() {
        if start == 0 {
            primary = row as u32;
        }
        let prev = (start as usize + n - 1) % n;
        last_col[row] = data[prev];
    }

    (last_col, primary)
}

/// Build the sorted order of the `n` cyclic rotations of `data` via
/// prefix doubling: `rank[i]` converges to the rank of the rotation
/// starting at `i` among all rotations, refined `log2(n)` times by
/// comparing `(rank[i], rank[(i+k) % n])` pairs.
fn cyclic_suffix_array(data: &[u8]) -> Vec<u32> {
    let n = data.len();
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = data.iter().map(|&b| b as u32).collect();
    let mut tmp = vec![0u32; n];
    let mut k = 1usize;

    loop {
        let key = |i: u32| -> (u32, u32) {
            let i = i as usize;
            (rank[i], rank[(i + k) % n])
        };
        sa.sort_by(|&a, &b| key(a).cmp(&key(b)));

        tmp[sa[0] as usize] = 0;
        for i in 1..n {
            let bump = if key(sa[i - 1]) < key(sa[i]) { 1 } else { 0 };
            tmp[sa[i] as usize] = tmp[sa[i - 1] as usize] + bump;
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[n - 1] as usize] as usize == n - 1 {
            break;
        }
        if k >= n {
            break;
        }
        k <<= 1;
    }

    sa
}

/// Inverse BWT via the classic LF-mapping reconstruction (as used by
/// bzip2): bucket each row's last-column byte into first-occurrence
/// order, then walk the resulting permutation `n` times starting from
/// `primary`.
pub fn decode(last_col: &[u8], n: usize, primary: u32) -> Result<Vec<u8>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    if last_col.len() != n {
        return Err(Error::Truncated {
            context: "bwt chunk",
            expected: n,
            got: last_col.len(),
        });
    }
    if primary as usize >= n {
        return Err(Error::OversizedField {
            field: "primary_index",
            value: primary as u64,
            limit: n as u64 - 1,
        });
    }

    let mut count = [0u32; 256];
    for &b in last_col {
        count[b as usize] += 1;
    }
    let mut cftab = [0u32; 256];
    let mut running = 0u32;
    for c in 0..256 {
        cftab[c] = running;
        running += count[c];
    }

    let mut next_free = cftab;
    let mut lf = vec![0u32; n];
    for (i, &b) in last_col.iter().enumerate() {
        let c = b as usize;
        lf[next_free[c] as usize] = i as u32;
        next_free[c] += 1;
    }

    let mut pos = lf[primary as usize];
    let mut out = vec![0u8; n];
    for slot in out.iter_mut() {
        *slot = last_col[pos as usize];
        pos = lf[pos as usize];
    }

    Ok(out)
}
