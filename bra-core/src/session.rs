//! Archive Session — spec §4.I, the top-level driver that wires
//! components A–H together into `create`/`extract`/`list`/`test`.
//!
//! This module owns directory walking, overwrite policy, and CWD
//! switching during extraction; everything byte-level is delegated to
//! [`crate::io`]. No process-global state: the overwrite policy is a
//! value the caller owns and threads through, and logging goes through
//! the `log` facade rather than any sink this module constructs itself.

use std::cell::Cell;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::format::{Compression, EntryMeta, EntryType, Footer, Header};
use crate::io as archive_io;
use crate::path::{self, SanitizedPath};
use crate::tree::Tree;

/// Compression mode requested for FILE entries during `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionRequest {
    Stored,
    Compressed,
}

/// What an overwrite callback decided for one colliding path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteDecision {
    Overwrite,
    Skip,
}

/// Shared overwrite policy state (spec §6), escalated by the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    Ask,
    AlwaysYes,
    AlwaysNo,
}

/// Holds the overwrite policy for one session and lets the callback
/// escalate it. `Rc<Cell<_>>` rather than `&mut` because the callback
/// itself is a boxed closure the caller supplies and may want to share.
#[derive(Clone)]
pub struct OverwriteController {
    policy: Rc<Cell<OverwritePolicy>>,
    ask: Rc<dyn Fn(&Path) -> (OverwriteDecision, Option<OverwritePolicy>)>,
}

impl OverwriteController {
    pub fn new(
        initial: OverwritePolicy,
        ask: impl Fn(&Path) -> (OverwriteDecision, Option<OverwritePolicy>) + 'static,
    ) -> Self {
        OverwriteController { policy: Rc::new(Cell::new(initial)), ask: Rc::new(ask) }
    }

    /// A controller that never asks: useful for non-interactive callers.
    pub fn fixed(policy: OverwritePolicy) -> Self {
        OverwriteController::new(policy, |_| (OverwriteDecision::Overwrite, None))
    }

    fn decide(&self, path: &Path) -> OverwriteDecision {
        match self.policy.get() {
            OverwritePolicy::AlwaysYes => OverwriteDecision::Overwrite,
            OverwritePolicy::AlwaysNo => OverwriteDecision::Skip,
            OverwritePolicy::Ask => {
                let (decision, escalate) = (self.ask)(path);
                if let Some(new_policy) = escalate {
                    self.policy.set(new_policy);
                }
                decision
            }
        }
    }
}

/// Options for [`create`].
pub struct CreateOptions {
    pub sfx: bool,
    pub recursive: bool,
    pub compression: CompressionRequest,
    /// Path to an executable stub to prepend; required when `sfx` is set.
    pub stub_path: Option<PathBuf>,
}

/// Options for [`extract`].
pub struct ExtractOptions {
    pub overwrite: OverwriteController,
}

/// One entry from the flat archive directory tree, ready to be emitted:
/// either a directory node (DIR/SUBDIR) or a file directly inside a node.
enum Emission<'a> {
    Directory(u32),
    File(u32, &'a str),
}

/// Walk `inputs` (already sanitized) relative to `cwd`, inserting every
/// directory into `tree` and recording plain files against their parent.
/// Directories among `inputs` are recursed into only when `recursive` is
/// set; a directory passed non-recursively contributes only itself (an
/// empty DIR entry).
fn build_tree(cwd: &Path, inputs: &[SanitizedPath], recursive: bool, tree: &mut Tree) -> Result<()> {
    for input in inputs {
        let abs = cwd.join(input.display());
        let meta = fs::symlink_metadata(&abs)?;

        if meta.is_dir() {
            let node = tree.insert(input.components());
            if recursive {
                walk_dir(cwd, input.components(), node, tree)?;
            }
        } else if meta.is_file() {
            let parent = tree.insert(input.parent_components());
            tree.add_file(parent, input.file_name().to_string());
        } else {
            return Err(Error::Unsupported { what: "non-regular, non-directory input (e.g. a symlink)" });
        }
    }
    Ok(())
}

/// Recursively add the contents of the directory `node` already
/// represents (at `components`, relative to `cwd`) into `tree`.
fn walk_dir(cwd: &Path, components: &[String], node: u32, tree: &mut Tree) -> Result<()> {
    let abs = cwd.join(components.join("/"));
    let mut names: Vec<_> = fs::read_dir(&abs)?.collect::<io::Result<Vec<_>>>()?;
    names.sort_by_key(|e| e.file_name());

    for entry in names {
        let file_name = entry.file_name();
        let name = file_name.to_str().ok_or(Error::PathUnsafe {
            path: entry.path().display().to_string(),
            reason: "non-UTF-8 directory entry name",
        })?;
        let child_meta = entry.metadata()?;

        if child_meta.is_dir() {
            let child_node = tree.insert_at_parent(node, name);
            let mut child_components = components.to_vec();
            child_components.push(name.to_string());
            walk_dir(cwd, &child_components, child_node, tree)?;
        } else if child_meta.is_file() {
            tree.add_file(node, name.to_string());
        }
        // Symlinks and other non-regular files encountered during a
        // recursive walk are silently skipped (spec §9 Open Question 3:
        // SYMLINK is reserved, not implemented).
    }
    Ok(())
}

/// Depth-first pre-order emission list: each directory node (root
/// excluded, since root is never itself an entry), immediately followed
/// by its own files, before descending into its children — matching
/// spec §4.I step 4 and the ordering spec §8 scenario 4 spells out.
fn emission_order(tree: &Tree) -> Vec<Emission<'_>> {
    let mut out = Vec::new();
    fn visit<'a>(tree: &'a Tree, node: u32, out: &mut Vec<Emission<'a>>) {
        if node != Tree::ROOT {
            out.push(Emission::Directory(node));
        }
        let n = tree.find_by_index(node).expect("node exists");
        for file in &n.files {
            out.push(Emission::File(node, file));
        }
        for &child in &n.children {
            visit(tree, child, out);
        }
    }
    visit(tree, Tree::ROOT, &mut out);
    out
}

/// Create an archive at `output` from `inputs` (paths relative to `cwd`,
/// already sanitized by the caller — spec §4.A is the caller's job, this
/// function trusts its input). On any error, nothing is left behind for
/// SFX outputs (spec §7); plain archives may retain a partial prefix.
pub fn create(cwd: &Path, output: &Path, inputs: &[SanitizedPath], options: &CreateOptions) -> Result<()> {
    let mut tree = Tree::new();
    build_tree(cwd, inputs, options.recursive, &mut tree)?;

    let entries = emission_order(&tree);
    let num_files = entries.len();
    if num_files > u32::MAX as usize {
        return Err(Error::TooManyEntries { count: num_files as u64 });
    }

    let result = if options.sfx {
        create_sfx(output, options, &tree, &entries, num_files as u32, cwd)
    } else {
        create_plain(output, options, &tree, &entries, num_files as u32, cwd)
    };

    if result.is_err() && options.sfx {
        let _ = fs::remove_file(output);
    }
    result
}

fn create_plain(
    output: &Path,
    options: &CreateOptions,
    tree: &Tree,
    entries: &[Emission],
    num_files: u32,
    cwd: &Path,
) -> Result<()> {
    let mut file = fs::File::create(output)?;
    archive_io::write_header(&mut file, Header { num_files })?;
    write_entries(&mut file, tree, entries, options, cwd)?;
    Ok(())
}

fn create_sfx(
    output: &Path,
    options: &CreateOptions,
    tree: &Tree,
    entries: &[Emission],
    num_files: u32,
    cwd: &Path,
) -> Result<()> {
    let stub_path = options.stub_path.as_deref().ok_or(Error::Unsupported { what: "SFX creation without a stub path" })?;
    fs::copy(stub_path, output)?;

    let mut file = fs::OpenOptions::new().read(true).write(true).open(output)?;
    let header_offset = file.seek(SeekFrom::End(0))?;

    archive_io::write_header(&mut file, Header { num_files })?;
    write_entries(&mut file, tree, entries, options, cwd)?;
    archive_io::write_footer(&mut file, Footer { header_offset: header_offset as i64 })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        let mode = perms.mode();
        perms.set_mode(mode | 0o111);
        fs::set_permissions(output, perms)?;
    }

    Ok(())
}

fn write_entries(
    file: &mut fs::File,
    tree: &Tree,
    entries: &[Emission],
    options: &CreateOptions,
    cwd: &Path,
) -> Result<()> {
    let want_compress = options.compression == CompressionRequest::Compressed;

    for emission in entries {
        match *emission {
            Emission::Directory(node) => {
                let n = tree.find_by_index(node).expect("node exists");
                let meta = match n.parent {
                    Some(0) | None => EntryMeta::Dir { name: n.name.clone() },
                    Some(parent) => EntryMeta::Subdir { name: n.name.clone(), parent_index: parent },
                };
                archive_io::write_dir_entry(file, &meta)?;
            }
            Emission::File(parent, name) => {
                let mut components: Vec<String> = Vec::new();
                collect_path(tree, parent, &mut components);
                components.push(name.to_string());
                let rel = components.join("/");
                let abs = cwd.join(&rel);

                let src = fs::File::open(&abs)?;
                let orig_len = src.metadata()?.len();
                archive_io::write_file_entry(file, src, name, orig_len, want_compress)?;
            }
        }
    }
    Ok(())
}

fn collect_path(tree: &Tree, node: u32, out: &mut Vec<String>) {
    if node == Tree::ROOT {
        return;
    }
    let n = tree.find_by_index(node).expect("node exists");
    if let Some(parent) = n.parent {
        collect_path(tree, parent, out);
    }
    out.push(n.name.clone());
}

/// Open an archive, locating the header whether it is a plain archive
/// (header at offset 0) or an SFX (header located via the trailing
/// footer). Returns the opened file positioned right after the header,
/// and the header itself.
fn open_archive(archive: &Path) -> Result<(fs::File, Header)> {
    let mut file = fs::File::open(archive)?;
    let is_sfx = {
        let len = file.metadata()?.len();
        len >= crate::format::FOOTER_SIZE as u64 && {
            file.seek(SeekFrom::End(-(crate::format::FOOTER_SIZE as i64)))?;
            let mut magic = [0u8; 4];
            let ok = file.read_exact(&mut magic).is_ok()
                && u32::from_le_bytes(magic) == crate::format::FOOTER_MAGIC;
            file.seek(SeekFrom::Start(0))?;
            ok
        }
    };

    let header = if is_sfx {
        archive_io::locate_header(&mut file)?
    } else {
        file.seek(SeekFrom::Start(0))?;
        archive_io::read_header(&mut file)?
    };
    Ok((file, header))
}

/// Extract `archive` into `output_dir` (created if absent). Each
/// directory is materialized before the files it contains can collide
/// with anything, per spec §4.I's extract flow.
///
/// FILE entries carry no `parent_index` of their own on disk (spec §3):
/// a writer always emits a directory's own DIR/SUBDIR entry, then that
/// directory's files, before descending into children (§4.I step 4), so
/// a reader attributes every FILE entry to whichever DIR/SUBDIR entry it
/// read most recently — tracked here as `current_dir`.
pub fn extract(archive: &Path, output_dir: &Path, options: &ExtractOptions) -> Result<()> {
    let (mut file, header) = open_archive(archive)?;
    fs::create_dir_all(output_dir)?;

    let mut tree = Tree::new();
    let mut current_dir = Tree::ROOT;

    for _ in 0..header.num_files {
        let meta = archive_io::read_entry_meta(&mut file)?;
        match meta.entry_type() {
            EntryType::Dir => {
                archive_io::read_dir_entry_crc(&mut file, &meta)?;
                let node = tree.insert_at_parent(Tree::ROOT, meta.name());
                materialize_dir(output_dir, &tree, node, &options.overwrite)?;
                current_dir = node;
            }
            EntryType::Subdir => {
                let parent_index = match &meta {
                    EntryMeta::Subdir { parent_index, .. } => *parent_index,
                    _ => unreachable!(),
                };
                if tree.find_by_index(parent_index).is_none() {
                    return Err(Error::InvalidCodes { reason: "SUBDIR parent_index refers to a node not yet seen" });
                }
                archive_io::read_dir_entry_crc(&mut file, &meta)?;
                let node = tree.insert_at_parent(parent_index, meta.name());
                materialize_dir(output_dir, &tree, node, &options.overwrite)?;
                current_dir = node;
            }
            EntryType::File => {
                let rel = tree.reconstruct_path(current_dir);
                let rel = if rel.is_empty() { meta.name().to_string() } else { format!("{rel}/{}", meta.name()) };
                extract_file(&mut file, output_dir, &rel, &meta, &options.overwrite)?;
            }
            EntryType::Symlink => unreachable!("read_entry_meta rejects symlinks"),
        }
    }

    Ok(())
}

fn materialize_dir(output_dir: &Path, tree: &Tree, node: u32, overwrite: &OverwriteController) -> Result<()> {
    let rel = tree.reconstruct_path(node);
    let abs = output_dir.join(&rel);
    if abs.is_file() {
        match overwrite.decide(&abs) {
            OverwriteDecision::Skip => return Err(Error::UserAbort),
            OverwriteDecision::Overwrite => fs::remove_file(&abs)?,
        }
    }
    fs::create_dir_all(&abs)?;
    Ok(())
}

/// Decode one FILE entry's payload to `output_dir/rel`, consulting the
/// overwrite policy if the destination already exists.
fn extract_file(
    file: &mut fs::File,
    output_dir: &Path,
    rel: &str,
    meta: &EntryMeta,
    overwrite: &OverwriteController,
) -> Result<()> {
    let dest = output_dir.join(rel);

    if dest.exists() {
        match overwrite.decide(&dest) {
            OverwriteDecision::Skip => {
                // Still consume the payload and verify its CRC so the
                // stream stays positioned at the next entry, but keep
                // the existing file on disk untouched.
                archive_io::read_file_entry(file, meta, &mut io::sink())?;
                return Ok(());
            }
            OverwriteDecision::Overwrite => {}
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = fs::File::create(&dest)?;
    archive_io::read_file_entry(file, meta, &mut out)?;
    Ok(())
}

/// One line of [`list`] output.
pub struct ListEntry {
    pub path: String,
    pub entry_type: EntryType,
    pub compression: Compression,
    pub data_size: u64,
    pub crc: u32,
}

/// List `archive`'s entries without extracting anything: metadata only,
/// payload bytes are skipped rather than decoded (spec §4.H
/// `skip_payload`).
pub fn list(archive: &Path) -> Result<Vec<ListEntry>> {
    let (mut file, header) = open_archive(archive)?;
    let mut tree = Tree::new();
    let mut current_dir = Tree::ROOT;
    let mut out = Vec::with_capacity(header.num_files as usize);

    for _ in 0..header.num_files {
        let meta = archive_io::read_entry_meta(&mut file)?;
        match meta.entry_type() {
            EntryType::Dir => {
                archive_io::read_dir_entry_crc(&mut file, &meta)?;
                current_dir = tree.insert_at_parent(Tree::ROOT, meta.name());
                out.push(ListEntry {
                    path: tree.reconstruct_path(current_dir),
                    entry_type: EntryType::Dir,
                    compression: Compression::Stored,
                    data_size: 0,
                    crc: 0,
                });
            }
            EntryType::Subdir => {
                let parent_index = match &meta {
                    EntryMeta::Subdir { parent_index, .. } => *parent_index,
                    _ => unreachable!(),
                };
                archive_io::read_dir_entry_crc(&mut file, &meta)?;
                current_dir = tree.insert_at_parent(parent_index, meta.name());
                out.push(ListEntry {
                    path: tree.reconstruct_path(current_dir),
                    entry_type: EntryType::Subdir,
                    compression: Compression::Stored,
                    data_size: 0,
                    crc: 0,
                });
            }
            EntryType::File => {
                let crc = archive_io::skip_file_entry(&mut file, &meta)?;
                let dir_rel = tree.reconstruct_path(current_dir);
                let path = if dir_rel.is_empty() { meta.name().to_string() } else { format!("{dir_rel}/{}", meta.name()) };
                out.push(ListEntry {
                    path,
                    entry_type: EntryType::File,
                    compression: meta.compression(),
                    data_size: meta.data_size(),
                    crc,
                });
            }
            EntryType::Symlink => unreachable!("read_entry_meta rejects symlinks"),
        }
    }

    Ok(out)
}

/// Verify `archive`'s integrity without writing anything to disk: the
/// full decode pipeline still runs (so a corrupt compressed payload is
/// caught), but decoded bytes are discarded (spec §4.I test flow).
pub fn test(archive: &Path) -> Result<()> {
    let (mut file, header) = open_archive(archive)?;
    let mut tree = Tree::new();

    for _ in 0..header.num_files {
        let meta = archive_io::read_entry_meta(&mut file)?;
        match meta.entry_type() {
            EntryType::Dir => {
                archive_io::read_dir_entry_crc(&mut file, &meta)?;
                tree.insert_at_parent(Tree::ROOT, meta.name());
            }
            EntryType::Subdir => {
                let parent_index = match &meta {
                    EntryMeta::Subdir { parent_index, .. } => *parent_index,
                    _ => unreachable!(),
                };
                archive_io::read_dir_entry_crc(&mut file, &meta)?;
                tree.insert_at_parent(parent_index, meta.name());
            }
            EntryType::File => {
                archive_io::read_file_entry(&mut file, &meta, &mut io::sink())?;
            }
            EntryType::Symlink => unreachable!("read_entry_meta rejects symlinks"),
        }
    }

    Ok(())
}
