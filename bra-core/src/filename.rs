//! Archive file-name extension conventions — spec §6.
//!
//! `bra-core` never requires a particular extension for correctness (an
//! archive's identity lives entirely in its on-disk bytes, located via
//! magic numbers and, for SFX, the trailing footer), but spec.md
//! explicitly asks the core to expose this convention as "helper
//! adjusters" so the CLI layer doesn't hand-roll it: plain archives take
//! `.BRa`; SFX archives add a platform executable extension on top of
//! that; opening an archive the user named ambiguously probes a fixed
//! order of candidate extensions, mirroring the original program's
//! `parseArgs_adjustFilename`/`filename_archive_adjust` fallback chain.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const ARCHIVE_EXTENSION: &str = "BRa";

/// Default SFX extension for the host platform (spec §6).
#[cfg(unix)]
pub const SFX_EXTENSION: &str = "brx";
#[cfg(windows)]
pub const SFX_EXTENSION: &str = "exe";

/// Both SFX extensions recognized when *opening* an archive, regardless
/// of host platform: an SFX stub built for one platform is still just
/// bytes with a footer to locate on another.
const SFX_EXTENSIONS_TO_PROBE: [&str; 2] = ["brx", "exe"];

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(ext);
    let mut out = path.to_path_buf();
    out.set_file_name(name);
    out
}

/// Append `.BRa` to `path` unless it's already there.
pub fn adjust_archive_name(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION) {
        path.to_path_buf()
    } else {
        with_appended_extension(path, ARCHIVE_EXTENSION)
    }
}

/// Append `.BRa.<sfx>` (the host's SFX extension) for a `create --sfx`
/// output name, first stripping an existing SFX extension so re-running
/// on an already-adjusted name doesn't double it up.
pub fn adjust_sfx_name(path: &Path) -> PathBuf {
    let stripped = if path.extension().and_then(|e| e.to_str()) == Some(SFX_EXTENSION) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    with_appended_extension(&adjust_archive_name(&stripped), SFX_EXTENSION)
}

/// Candidate paths to probe, in order, when opening an archive the user
/// named without (or with an ambiguous) extension: `.BRa` first, then
/// each SFX variant on top of that. The caller should use the first
/// candidate that exists on disk, falling back to the literal,
/// unadjusted path if none do — so a subsequent "no such file" error
/// names exactly what the user typed, matching the original program's
/// behavior.
pub fn open_candidates(path: &Path) -> Vec<PathBuf> {
    let with_bra = adjust_archive_name(path);
    let mut out = vec![with_bra.clone()];
    for ext in SFX_EXTENSIONS_TO_PROBE {
        out.push(with_appended_extension(&with_bra, ext));
    }
    out
}
