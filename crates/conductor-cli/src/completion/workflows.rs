//! Local workflow file discovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use conductor_core::has_top_level_name;
use tracing::trace;

use super::{Completion, Directive};

/// Deepest directory level searched below the starting directory.
pub const MAX_DEPTH: usize = 2;

/// Most workflow files offered at once.
pub const MAX_WORKFLOW_CANDIDATES: usize = 100;

/// Remote workflow reference scheme.
pub const GITHUB_PREFIX: &str = "github:";

/// Workflow files under `root` whose relative path starts with `prefix`,
/// newest first.
///
/// Only regular `*.yaml`/`*.yml` files with a top-level `name:` key count.
/// Dot-directories and symlinks are skipped. The cap applies after the
/// prefix match.
pub fn discover_workflows(root: &Path, prefix: &str) -> Vec<String> {
    let mut found = Vec::new();
    walk(root, root, 0, &mut found);

    let mut matching: Vec<(SystemTime, String)> = found
        .into_iter()
        .map(|(modified, path)| (modified, path.to_string_lossy().replace('\\', "/")))
        .filter(|(_, path)| path.starts_with(prefix))
        .collect();
    matching.sort_by(|(a_time, a_path), (b_time, b_path)| {
        b_time.cmp(a_time).then_with(|| a_path.cmp(b_path))
    });
    matching.truncate(MAX_WORKFLOW_CANDIDATES);
    matching.into_iter().map(|(_, path)| path).collect()
}

fn walk(root: &Path, dir: &Path, depth: usize, found: &mut Vec<(SystemTime, PathBuf)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            trace!(dir = %dir.display(), "skipping unreadable directory: {}", e);
            return;
        }
    };

    for entry in entries.flatten() {
        // file_type() does not follow symlinks
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() {
            continue;
        }

        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if file_type.is_dir() {
            if !hidden && depth < MAX_DEPTH {
                walk(root, &path, depth + 1, found);
            }
            continue;
        }
        if !file_type.is_file() || !is_yaml(&path) || !is_workflow(&path) {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if let Ok(relative) = path.strip_prefix(root) {
            found.push((modified, relative.to_path_buf()));
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn is_workflow(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| has_top_level_name(&content))
        .unwrap_or(false)
}

fn is_github_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && (GITHUB_PREFIX.starts_with(prefix) || prefix.starts_with(GITHUB_PREFIX))
}

/// Workflow candidates for `prefix`.
///
/// A prefix on the way to `github:` short-circuits to that scheme without a
/// trailing space. With no local match, `github:` is offered as well.
pub fn complete_workflows(root: &Path, prefix: &str) -> Completion {
    if is_github_prefix(prefix) {
        return Completion::new(vec![GITHUB_PREFIX.to_string()], Directive::NO_SPACE);
    }

    let candidates = discover_workflows(root, prefix);

    if candidates.is_empty() {
        Completion::new(vec![GITHUB_PREFIX.to_string()], Directive::NO_SPACE)
    } else {
        Completion::values(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_prefixes() {
        for prefix in ["g", "gi", "git", "github", "github:", "github:acme/flows"] {
            assert!(is_github_prefix(prefix), "{}", prefix);
        }
        for prefix in ["", "gx", "workflows/", "gh"] {
            assert!(!is_github_prefix(prefix), "{}", prefix);
        }
    }

    #[test]
    fn test_yaml_extensions() {
        assert!(is_yaml(Path::new("a/flow.yaml")));
        assert!(is_yaml(Path::new("flow.yml")));
        assert!(!is_yaml(Path::new("flow.json")));
        assert!(!is_yaml(Path::new("yaml")));
    }
}
