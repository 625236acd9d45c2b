use std::path::{Path, PathBuf};

/// Last segment of the worktree path, or `unknown` when there is none.
pub fn project_name_from_worktree(worktree: &str) -> String {
    worktree
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub fn default_error_log_path(dir: &Path) -> PathBuf {
    dir.join(".opencode").join("TTrack").join("error.log")
}
