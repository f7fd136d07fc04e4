use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::cli::{Mode, Options};
use crate::config::BatchPolicy;
use crate::png::builder::serialize;
use crate::png::edit::EditError;
use crate::png::raw::PngError;
use crate::png::reader::{parse_with, PngContainer};
use crate::png::text::decode;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("unable to open input file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write output file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write to the output stream: {0}")]
    Output(#[source] std::io::Error),
    #[error("input path '{}' has no file name", .path.display())]
    NoFileName { path: PathBuf },
    #[error("broken input file '{}': {source}", .path.display())]
    Png { path: PathBuf, source: PngError },
    #[error("unable to edit '{}': {source}", .path.display())]
    Edit { path: PathBuf, source: EditError },
    #[error("internal invariant violated for '{}': {reason}, this is a bug", .path.display())]
    Invariant { path: PathBuf, reason: String },
}

// Expected effect of an edit on the file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeChange {
    Grow,
    Shrink,
    Any,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
}

pub fn output_path(input: &Path, out_dir: Option<&Path>) -> Result<PathBuf, ProcessError> {
    match out_dir {
        None => Ok(input.to_path_buf()),
        Some(dir) => input
            .file_name()
            .map(|name| dir.join(name))
            .ok_or_else(|| ProcessError::NoFileName {
                path: input.to_path_buf(),
            }),
    }
}

// Go through a temp file in the destination directory so an in place
// rewrite is never left half written. An existing target is written
// through any symlink and keeps its permissions.
fn write_output(path: &Path, data: &[u8]) -> Result<(), ProcessError> {
    let to_err = |source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    };

    let (target, permissions) = match fs::metadata(path) {
        Ok(meta) => (fs::canonicalize(path).map_err(to_err)?, Some(meta.permissions())),
        Err(e) if e.kind() == ErrorKind::NotFound => (path.to_path_buf(), None),
        Err(e) => return Err(to_err(e)),
    };

    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(to_err)?;
    file.write_all(data).map_err(to_err)?;
    if let Some(permissions) = permissions {
        file.as_file().set_permissions(permissions).map_err(to_err)?;
    }
    file.persist(&target).map_err(|e| to_err(e.error))?;
    Ok(())
}

fn check_size(
    path: &Path,
    container: &PngContainer,
    before: usize,
    after: usize,
    change: SizeChange,
) -> Result<(), ProcessError> {
    let reason = if after != container.encoded_len() {
        format!(
            "serialized {} bytes but the chunks add up to {}",
            after,
            container.encoded_len()
        )
    } else if after == before && change != SizeChange::Any {
        "resulting file size is equal to original file size".to_string()
    } else if change == SizeChange::Grow && after < before {
        format!("file shrank from {} to {} bytes after adding chunks", before, after)
    } else if change == SizeChange::Shrink && after > before {
        format!("file grew from {} to {} bytes after removing chunks", before, after)
    } else {
        return Ok(());
    };

    Err(ProcessError::Invariant {
        path: path.to_path_buf(),
        reason,
    })
}

/// Write one line per tEXt chunk, malformed ones are skipped with a warning
pub fn dump<W: Write>(container: &PngContainer, human: bool, out: &mut W) -> std::io::Result<usize> {
    let mut count = 0;

    for (idx, chunk) in container.text_chunks() {
        let entry = match decode(chunk) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping chunk {}: {}", idx, e);
                continue;
            }
        };

        if human {
            writeln!(
                out,
                "chunk: {} ({} bytes): {}: {}",
                idx,
                chunk.length(),
                entry.keyword_lossy(),
                entry.text_lossy()
            )?;
        } else {
            writeln!(
                out,
                "chunk: {} {} {} {}",
                idx,
                chunk.length(),
                entry.keyword_lossy(),
                entry.text_lossy()
            )?;
        }
        count += 1;
    }

    Ok(count)
}

/// Read, parse, edit and write back a single file
pub fn process_file<W: Write>(
    input: &Path,
    options: &Options,
    out: &mut W,
) -> Result<(), ProcessError> {
    let buffer = fs::read(input).map_err(|source| ProcessError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let mut container =
        parse_with(&buffer, options.verify_crc).map_err(|source| ProcessError::Png {
            path: input.to_path_buf(),
            source,
        })?;
    let before = container.encoded_len();
    let edit_err = |source| ProcessError::Edit {
        path: input.to_path_buf(),
        source,
    };

    match &options.mode {
        Mode::Dump { human } => {
            writeln!(out, "file: {}", input.display()).map_err(ProcessError::Output)?;
            let count = dump(&container, *human, out).map_err(ProcessError::Output)?;
            debug!("dumped {} text chunks", count);
        }

        Mode::Add { entries, exclusive } => {
            let outfile = output_path(input, options.out_dir.as_deref())?;
            let change = if *exclusive {
                let (removed, added) = container.exclusive_replace(entries).map_err(edit_err)?;
                info!("replaced {} text chunks with {}", removed, added);
                SizeChange::Any
            } else {
                container.add_entries(entries).map_err(edit_err)?;
                SizeChange::Grow
            };

            let data = serialize(&container).map_err(|source| ProcessError::Write {
                path: outfile.clone(),
                source,
            })?;
            check_size(&outfile, &container, before, data.len(), change)?;
            write_output(&outfile, &data)?;

            writeln!(out, "success: Done adding text chunk to '{}'", outfile.display())
                .map_err(ProcessError::Output)?;
        }

        Mode::Remove { indices, types } => {
            let outfile = output_path(input, options.out_dir.as_deref())?;

            // Resolve indices before the type filter shifts positions
            let mut removed = container.remove_by_index(indices).map_err(edit_err)?;
            removed += container.remove_by_type(types);

            let data = serialize(&container).map_err(|source| ProcessError::Write {
                path: outfile.clone(),
                source,
            })?;
            let change = if removed > 0 { SizeChange::Shrink } else { SizeChange::Any };
            check_size(&outfile, &container, before, data.len(), change)?;
            write_output(&outfile, &data)?;

            writeln!(
                out,
                "success: Removed {} chunk(s) from '{}'",
                removed,
                outfile.display()
            )
            .map_err(ProcessError::Output)?;
        }
    }

    Ok(())
}

/// Process every file in order, the batch policy decides what a failure does.
///
/// Under [`BatchPolicy::Continue`] each failure is reported on `err` and the
/// batch moves on.
pub fn run<W: Write, E: Write>(
    options: &Options,
    out: &mut W,
    err: &mut E,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::default();

    for input in options.files.iter() {
        info!("processing '{}'", input.display());

        match process_file(input, options, out) {
            Ok(()) => report.processed += 1,
            Err(e) if options.on_error == BatchPolicy::Continue => {
                writeln!(err, "pngmeta: {}", e).map_err(ProcessError::Output)?;
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}
