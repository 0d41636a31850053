//! Destination path handling
//!
//! `target_loc` and the uploaded file name both come from the client. They
//! are reduced to plain path segments here before anything touches the
//! filesystem, and the resolved directory is checked against the storage
//! root after symlinks are followed.

use super::UploadError;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Characters escaped in a path segment of a served URL
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A destination directory below the storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Normalized segments relative to the root
    pub segments: Vec<String>,
    /// `root` joined with `segments`
    pub dir: PathBuf,
}

impl Destination {
    /// Slash-joined relative form, empty for the root itself
    pub fn relative(&self) -> String {
        self.segments.join("/")
    }

    /// URL path serving `file_name` from this directory
    pub fn served_path(&self, file_name: &str) -> String {
        let mut served = String::from("/");
        for segment in &self.segments {
            served.extend(utf8_percent_encode(segment, SEGMENT));
            served.push('/');
        }
        served.extend(utf8_percent_encode(file_name, SEGMENT));
        served
    }
}

/// Resolve a client-supplied `target_loc` against `root`
///
/// Empty and `.` segments are dropped and leading separators are ignored,
/// so `/docs`, `docs/` and `./docs` all name `root/docs`. Any `..` segment
/// is rejected outright rather than clamped.
pub fn resolve_destination(root: &Path, target: &str) -> Result<Destination, UploadError> {
    let invalid = |reason: &str| UploadError::InvalidDestination {
        target: target.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    for segment in target.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid("parent directory segments are not allowed")),
            s if s.contains('\0') => return Err(invalid("NUL bytes are not allowed")),
            s if !is_plain_segment(s) => return Err(invalid("unsupported path segment")),
            s => segments.push(s.to_string()),
        }
    }

    let dir = segments.iter().fold(root.to_path_buf(), |dir, s| dir.join(s));
    Ok(Destination { segments, dir })
}

/// Reduce an uploaded file name to its final segment
///
/// Browsers may send a full client-side path; only the last `/` or `\`
/// separated component is kept.
pub fn sanitize_file_name(name: &str) -> Result<String, UploadError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') || !is_plain_segment(base)
    {
        return Err(UploadError::InvalidFileName(name.to_string()));
    }
    Ok(base.to_string())
}

/// Check that `dir`, once symlinks are resolved, stays under `root`
///
/// `dir` need not exist yet; its deepest existing ancestor is checked. `root`
/// must exist.
pub fn is_within_root(root: &Path, dir: &Path) -> io::Result<bool> {
    let root = root.canonicalize()?;

    let mut existing = dir;
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(false),
        }
    }

    Ok(existing.canonicalize()?.starts_with(&root))
}

/// A single normal path component (no drive prefix, root, or dot entries)
pub(crate) fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
