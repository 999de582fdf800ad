//! String-level path helpers. Every path inside mdref is a root-relative
//! string with `/` separators, so these never touch the filesystem.

/// Normalize a relative path: backslashes become `/`, empty and `.` segments
/// are dropped (which also removes a leading `./` and duplicate separators),
/// and `..` pops the previous segment. A `..` with nothing left to pop is kept.
///
/// `normalize(&normalize(p)) == normalize(p)` for every input.
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        push_normalized_segment(&mut segments, segment);
    }
    return segments.join("/");
}

/// Handle a single segment during normalization.
fn push_normalized_segment<'a>(segments: &mut Vec<&'a str>, segment: &'a str) {
    match segment {
        "" | "." => {},
        ".." => {
            let can_pop = segments.last().is_some_and(|last| return *last != "..");
            if can_pop {
                segments.pop();
            } else {
                segments.push(segment);
            }
        },
        other => segments.push(other),
    }
    return;
}

/// Extension of the final segment, without the dot. Dotfiles such as
/// `.gitignore` have no extension.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    return match name.rfind('.') {
        None | Some(0) => None,
        Some(dot) => name.get(dot.saturating_add(1)..).filter(|ext| return !ext.is_empty()),
    };
}

/// Final segment of the path.
pub fn file_name(path: &str) -> &str {
    return path.rsplit('/').next().unwrap_or(path);
}

/// Join `relative` onto directory `dir` and normalize the result.
pub fn join(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        return normalize(relative);
    }
    return normalize(&format!("{dir}/{relative}"));
}

/// Everything before the final segment, or `""` for a top-level path.
pub fn parent(path: &str) -> &str {
    return path.rfind('/').and_then(|slash| return path.get(..slash)).unwrap_or("");
}

/// The path with the final segment's extension removed.
pub fn strip_extension(path: &str) -> &str {
    let Some(ext) = extension(path) else {
        return path;
    };
    let cut = path.len().saturating_sub(ext.len()).saturating_sub(1);
    return path.get(..cut).unwrap_or(path);
}
