//! Which settled paths are worth converting, and where their output goes.

use std::path::{Path, PathBuf};

/// Extension of files we convert (compared case-insensitively).
pub const SOURCE_EXTENSION: &str = "webp";

/// Extension substituted on the converted sibling.
pub const TARGET_EXTENSION: &str = "png";

/// True when `path` names a WebP file.
///
/// Only the final extension counts, so `a.b.webp` qualifies and `a.webp.part`
/// does not. The comparison is ASCII case-insensitive (`IMG.WEBP` qualifies).
/// No filesystem access.
pub fn is_convertible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
        .unwrap_or(false)
}

/// Same directory, same file stem, `.png` extension.
pub fn output_path_for(path: &Path) -> PathBuf {
    path.with_extension(TARGET_EXTENSION)
}
