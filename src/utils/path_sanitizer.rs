// SPDX-License-Identifier: GPL-3.0-only

/// Longest file or directory name most filesystems accept, in bytes
const MAX_COMPONENT_LEN: usize = 255;

/// Bytes a partial download adds around a filename: `.{name}.{32 hex}.part`
const PARTIAL_NAME_OVERHEAD: usize = 39;

/// Longest document filename, leaving room for its partial-download sibling
const MAX_FILENAME_LEN: usize = MAX_COMPONENT_LEN - PARTIAL_NAME_OVERHEAD;

/// Extensions longer than this are treated as part of the stem when truncating
const MAX_EXTENSION_LEN: usize = 16;

/// Characters rejected by at least one of the common filesystems
fn is_path_incompatible(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Turn a category display name into a single safe directory component.
///
/// Path-incompatible characters become `_`, surrounding whitespace and
/// trailing dots are removed. Spaces and case are preserved so the folder
/// reads like the published name. Returns `None` when nothing usable is left.
pub fn sanitize_dir_name(name: &str) -> Option<String> {
    let replaced: String = name
        .chars()
        .map(|c| if is_path_incompatible(c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    finish_component(trimmed)
}

/// Reduce a published filename to its final component and make it safe.
///
/// Any directory part (either separator style) is discarded first, so a
/// filename can never place a file outside its category directory. Names
/// over [`MAX_FILENAME_LEN`] bytes are shortened in the stem, keeping the
/// extension.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let replaced: String = last
        .chars()
        .map(|c| if is_path_incompatible(c) { '_' } else { c })
        .collect();

    let candidate = replaced.trim();
    if is_reserved(candidate) {
        return None;
    }
    Some(truncate_keeping_extension(candidate, MAX_FILENAME_LEN))
}

fn finish_component(candidate: &str) -> Option<String> {
    if is_reserved(candidate) {
        return None;
    }

    Some(truncate_to_boundary(candidate, MAX_COMPONENT_LEN).to_string())
}

fn is_reserved(candidate: &str) -> bool {
    candidate.is_empty() || candidate == "." || candidate == ".."
}

fn truncate_keeping_extension(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN => {
            let (stem, extension) = name.split_at(dot);
            let stem = truncate_to_boundary(stem, max_len - extension.len()).trim_end();
            format!("{}{}", stem, extension)
        }
        _ => truncate_to_boundary(name, max_len).to_string(),
    }
}

fn truncate_to_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
