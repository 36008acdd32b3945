//! Resolution of `include` directives in configuration content.
//!
//! A scanned file's content is searched for `include <args>;` directives.
//! Each argument resolves to zero or more concrete files: relative paths are
//! joined onto the configuration root, glob patterns are expanded against
//! the filesystem, and anything that is missing or a directory is skipped.
//! Matching runs on raw bytes so a stray non-UTF-8 sequence elsewhere in a
//! file cannot hide its directives.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::bytes::Regex;
use smallvec::SmallVec;
use tracing::{debug, warn};

use nw_core::ConfigPaths;

/// Matches `include <args>;` directives in configuration content.
static INCLUDE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"include\s+([^;]+);").ok());

/// Metacharacters of the `glob` crate; their presence marks an include
/// argument as a pattern rather than a literal path.
const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Collects the files referenced by the `include` directives in `content`.
///
/// Targets are returned in directive order; a glob's matches are expanded in
/// alphabetical order. Only existing non-directory paths are returned, so
/// callers can recurse without re-checking.
pub(crate) fn include_targets(
    content: &[u8],
    paths: &ConfigPaths,
) -> SmallVec<[Utf8PathBuf; 4]> {
    let mut targets = SmallVec::new();
    let Some(re) = INCLUDE_RE.as_ref() else {
        return targets;
    };

    for caps in re.captures_iter(content) {
        let Some(arg) = caps.get(1) else { continue };
        let Ok(raw) = std::str::from_utf8(arg.as_bytes()) else {
            warn!("Skipping non-UTF-8 include argument");
            continue;
        };
        let arg = raw.trim();
        if arg.is_empty() {
            continue;
        }

        let resolved = paths.resolve(arg);
        if arg.contains(GLOB_CHARS) {
            expand_glob(&resolved, &mut targets);
        } else if is_scannable_file(&resolved) {
            targets.push(resolved);
        } else {
            debug!(path = %resolved, "Include target absent or not a file, skipping");
        }
    }
    targets
}

/// Expands one glob pattern, appending every matching file to `targets`.
fn expand_glob(pattern: &Utf8Path, targets: &mut SmallVec<[Utf8PathBuf; 4]>) {
    let entries = match glob::glob(pattern.as_str()) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(pattern = %pattern, error = %error, "Invalid include glob pattern");
            return;
        }
    };

    for entry in entries {
        match entry {
            Ok(path) => {
                let utf8_path = match Utf8PathBuf::try_from(path) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(
                            path = %e.into_path_buf().display(),
                            "Skipping non-UTF-8 glob match"
                        );
                        continue;
                    }
                };
                if is_scannable_file(&utf8_path) {
                    targets.push(utf8_path);
                }
            }
            Err(error) => {
                warn!(pattern = %pattern, error = %error, "Failed to read glob match");
            }
        }
    }
}

/// Returns `true` if the path exists and is not a directory.
///
/// Follows symlinks, so an enabled-site symlink counts as a file.
fn is_scannable_file(path: &Utf8Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| !m.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_root() -> (TempDir, ConfigPaths) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, ConfigPaths::new(root))
    }

    #[test]
    fn test_plain_relative_include() {
        let (_dir, paths) = test_root();
        fs::write(paths.root().join("mime.types"), "types {}\n").expect("write failed");

        let targets = include_targets(b"include mime.types;\n", &paths);
        assert_eq!(targets.as_slice(), &[paths.root().join("mime.types")]);
    }

    #[test]
    fn test_absolute_include() {
        let (_dir, paths) = test_root();
        let extra = paths.root().join("extra.conf");
        fs::write(&extra, "server {}\n").expect("write failed");

        let content = format!("include {extra};\n");
        let targets = include_targets(content.as_bytes(), &paths);
        assert_eq!(targets.as_slice(), &[extra]);
    }

    #[test]
    fn test_glob_include_expands_sorted() {
        let (_dir, paths) = test_root();
        let enabled = paths.sites_enabled();
        fs::create_dir_all(&enabled).expect("mkdir failed");
        fs::write(enabled.join("b.conf"), "server {}\n").expect("write failed");
        fs::write(enabled.join("a.conf"), "server {}\n").expect("write failed");

        let targets = include_targets(b"include sites-enabled/*.conf;\n", &paths);
        assert_eq!(
            targets.as_slice(),
            &[enabled.join("a.conf"), enabled.join("b.conf")]
        );
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let (_dir, paths) = test_root();
        let targets = include_targets(b"include not-there.conf;\n", &paths);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_directory_target_is_skipped() {
        let (_dir, paths) = test_root();
        fs::create_dir_all(paths.sites_enabled()).expect("mkdir failed");

        let targets = include_targets(b"include sites-enabled;\n", &paths);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_argument_whitespace_is_trimmed() {
        let (_dir, paths) = test_root();
        fs::write(paths.root().join("mime.types"), "types {}\n").expect("write failed");

        let targets = include_targets(b"include   mime.types ;\n", &paths);
        assert_eq!(targets.as_slice(), &[paths.root().join("mime.types")]);
    }

    #[test]
    fn test_multiple_directives_in_order() {
        let (_dir, paths) = test_root();
        fs::write(paths.root().join("first.conf"), "").expect("write failed");
        fs::write(paths.root().join("second.conf"), "").expect("write failed");

        let content = b"include second.conf;\nhttp {\n  include first.conf;\n}\n";
        let targets = include_targets(content, &paths);
        assert_eq!(
            targets.as_slice(),
            &[
                paths.root().join("second.conf"),
                paths.root().join("first.conf"),
            ]
        );
    }

    #[test]
    fn test_invalid_glob_pattern_is_skipped() {
        let (_dir, paths) = test_root();
        let targets = include_targets(b"include sites-[.conf;\n", &paths);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_content_without_directives() {
        let (_dir, paths) = test_root();
        let targets = include_targets(b"worker_processes 1;\nevents {}\n", &paths);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_glob_with_question_mark_is_detected() {
        let (_dir, paths) = test_root();
        let enabled = paths.sites_enabled();
        fs::create_dir_all(&enabled).expect("mkdir failed");
        fs::write(enabled.join("a.conf"), "").expect("write failed");

        let targets = include_targets(b"include sites-enabled/?.conf;\n", &paths);
        assert_eq!(targets.as_slice(), &[enabled.join("a.conf")]);
    }
}
