//! Output path construction shared by the engines

use std::path::{Path, PathBuf};

use crate::format::COMPRESSION_EXTENSIONS;
use crate::FileFormat;

/// File name of `path` without its compression suffix and format extension
///
/// `data/reads.fastq.gz` and `data/reads.fastq` both yield `reads`.
#[must_use]
pub fn file_stem(path: &Path) -> String {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return String::new();
    };
    let mut stem = name;
    if let Some((head, ext)) = stem.rsplit_once('.') {
        if COMPRESSION_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            stem = head;
        }
    }
    match stem.rsplit_once('.') {
        Some((head, _)) if !head.is_empty() => head.to_string(),
        _ => stem.to_string(),
    }
}

/// Builds `<dir of input>/<input stem><suffix><format extension>`
#[must_use]
pub fn derived_output_path(input: &Path, suffix: &str, format: FileFormat) -> PathBuf {
    let name = format!("{}{suffix}{}", file_stem(input), format.extension());
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Inserts `suffix` between the file stem and the extension of `path`
///
/// `out/reads.fastq` with `_R1` becomes `out/reads_R1.fastq`; a path without an
/// extension simply gets the suffix appended.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// One-based numbered sibling of `base`: `out/part.fastq` → `out/part_<index>.fastq`
#[must_use]
pub fn numbered(base: &Path, index: usize) -> PathBuf {
    let mut buffer = itoa::Buffer::new();
    let mut suffix = String::with_capacity(8);
    suffix.push('_');
    suffix.push_str(buffer.format(index));
    with_suffix(base, &suffix)
}

/// Read-1 / read-2 variants of an output path
#[must_use]
pub fn mate_paths(path: &Path) -> (PathBuf, PathBuf) {
    (with_suffix(path, "_R1"), with_suffix(path, "_R2"))
}

/// Reduces a query key to characters that are safe in a file name
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`; an empty key becomes `_`.
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
