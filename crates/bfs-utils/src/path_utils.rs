//! Helpers for the slash-separated logical paths used as metadata keys.
//!
//! A normalized path always starts with `/`. A directory path ends with `/`,
//! a file path never does. These are key-space strings, not OS paths.

pub const SEPARATOR: char = '/';

/// Normalize a client-supplied path.
///
/// Prefixes a missing leading `/` and collapses repeated separators. Returns
/// `None` for paths that cannot name a file or directory: empty input, NUL
/// bytes, or `.` / `..` segments.
pub fn normalize(path: &str) -> Option<String> {
    if path.is_empty() || path.contains('\0') {
        return None;
    }
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split(SEPARATOR) {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return None;
        }
        out.push(SEPARATOR);
        out.push_str(segment);
    }
    if out.is_empty() || path.ends_with(SEPARATOR) {
        out.push(SEPARATOR);
    }
    Some(out)
}

/// Whether the path names a directory.
pub fn is_dir_path(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

/// Return the parent directory of a normalized path, with trailing `/`.
///
/// `"/a/b/c"` and `"/a/b/c/"` both yield `"/a/b/"`; the root has no parent.
pub fn parent_dir(path: &str) -> Option<&str> {
    split_entry(path).map(|(parent, _)| parent)
}

/// Split a normalized path into its parent directory and the entry name
/// under that parent.
///
/// Directory entries keep their trailing `/`, so `"/a/b/"` splits into
/// `("/a/", "b/")` and `"/a/b"` into `("/a/", "b")`.
pub fn split_entry(path: &str) -> Option<(&str, &str)> {
    if path.len() <= 1 || !path.starts_with(SEPARATOR) {
        return None;
    }
    let trimmed = path.strip_suffix(SEPARATOR).unwrap_or(path);
    let pos = trimmed.rfind(SEPARATOR)?;
    Some(path.split_at(pos + 1))
}

/// Join a directory path and an entry name as returned by a directory listing.
pub fn join_entry(dir: &str, name: &str) -> String {
    let mut out = String::with_capacity(dir.len() + name.len() + 1);
    out.push_str(dir);
    if !dir.ends_with(SEPARATOR) {
        out.push(SEPARATOR);
    }
    out.push_str(name.trim_start_matches(SEPARATOR));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/b.jpg").as_deref(), Some("/a/b.jpg"));
        assert_eq!(normalize("/a//b/").as_deref(), Some("/a/b/"));
        assert_eq!(normalize("/").as_deref(), Some("/"));
        assert_eq!(normalize("///").as_deref(), Some("/"));
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("/a/../b"), None);
        assert_eq!(normalize("/a/./b"), None);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/a/b/c"), Some("/a/b/"));
        assert_eq!(parent_dir("/a/b/c/"), Some("/a/b/"));
        assert_eq!(parent_dir("/a"), Some("/"));
        assert_eq!(parent_dir("/a/"), Some("/"));
        assert_eq!(parent_dir("/"), None);
        assert_eq!(parent_dir("a/b"), None);
    }

    #[test]
    fn test_split_entry() {
        assert_eq!(split_entry("/a/b/c/d"), Some(("/a/b/c/", "d")));
        assert_eq!(split_entry("/a/b/"), Some(("/a/", "b/")));
        assert_eq!(split_entry("/x"), Some(("/", "x")));
    }

    #[test]
    fn test_join_entry() {
        assert_eq!(join_entry("/a/", "b/"), "/a/b/");
        assert_eq!(join_entry("/a", "c.txt"), "/a/c.txt");
        assert_eq!(join_entry("/", "x"), "/x");
    }

    #[test]
    fn test_is_dir_path() {
        assert!(is_dir_path("/a/"));
        assert!(!is_dir_path("/a"));
    }
}
