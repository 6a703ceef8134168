//! Container path handling for layer filters.
//!
//! Paths here are always `/`-separated container paths, independent of the
//! host platform, so these helpers work on strings rather than
//! [`std::path::Path`].

use crate::consts::APP_DIR;

/// Lexically clean a `/`-separated path.
///
/// Collapses repeated separators, removes `.` segments and resolves `..`
/// against the preceding segment. `..` cannot climb above the root of an
/// absolute path. An empty result becomes `.` (relative) or `/` (absolute).
pub fn clean_path(path: &str) -> String {
  let rooted = path.starts_with('/');
  let mut segments: Vec<&str> = Vec::new();

  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => match segments.last() {
        Some(last) if *last != ".." => {
          segments.pop();
        }
        _ if rooted => {}
        _ => segments.push(".."),
      },
      other => segments.push(other),
    }
  }

  let joined = segments.join("/");
  match (rooted, joined.is_empty()) {
    (true, _) => format!("/{}", joined),
    (false, true) => ".".to_string(),
    (false, false) => joined,
  }
}

/// Join `tail` onto `base` and clean the result. An absolute `tail` does not
/// replace `base`.
pub fn join_path(base: &str, tail: &str) -> String {
  clean_path(&format!("{}/{}", base, tail))
}

/// Last element of a cleaned path (`"foo/bar.txt"` → `"bar.txt"`).
pub fn base_name(path: &str) -> String {
  let cleaned = clean_path(path);
  if cleaned == "/" {
    return cleaned;
  }
  cleaned.rsplit('/').next().unwrap_or(".").to_string()
}

/// True when the path refers to the filesystem root.
pub fn is_root(path: &str) -> bool {
  clean_path(path) == "/"
}

/// Cleaned form with a trailing separator so prefix checks respect segment
/// boundaries (`/app-foo/` does not start with `/app/`).
fn with_trailing_separator(path: &str) -> String {
  let cleaned = clean_path(path);
  if cleaned.ends_with('/') { cleaned } else { format!("{}/", cleaned) }
}

/// Whether any path in `a` equals, contains or is contained by any path in `b`.
///
/// ```
/// use layerkit_lib::lower::paths::paths_overlap;
///
/// assert!(paths_overlap(&["/app/dist"], &["/app"]));
/// assert!(!paths_overlap(&["/app-foo"], &["/app"]));
/// ```
pub fn paths_overlap<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
  let b: Vec<String> = b.iter().map(|p| with_trailing_separator(p.as_ref())).collect();

  a.iter().any(|p1| {
    let p1 = with_trailing_separator(p1.as_ref());
    b.iter().any(|p2| p1.starts_with(p2.as_str()) || p2.starts_with(p1.as_str()))
  })
}

/// Resolve a container path against the application root.
///
/// `.`, `/app` and `/app/` all become `/app`; absolute paths are kept (cleaned);
/// relative paths are rooted at `/app`.
pub fn container_path(path: &str) -> String {
  if path.starts_with('/') {
    clean_path(path)
  } else {
    join_path(APP_DIR, path)
  }
}

/// Source and destination of the copy emitted for one include entry.
///
/// Local entries keep their host path as the source and land at
/// `/app/<basename>`, discarding directory structure. Container entries are
/// copied to the same path they are read from.
pub fn resolve_src_dest(include: &str, is_local: bool) -> (String, String) {
  if is_local {
    return (include.to_string(), join_path(APP_DIR, &base_name(include)));
  }

  if include == "." || include == APP_DIR || include == format!("{}/", APP_DIR) {
    return (APP_DIR.to_string(), APP_DIR.to_string());
  }

  if include.starts_with('/') {
    return (include.to_string(), include.to_string());
  }

  let joined = join_path(APP_DIR, include);
  (joined.clone(), joined)
}
