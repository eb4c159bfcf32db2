use std::path::PathBuf;

use dirs_next::home_dir;

/// Expands a leading `~` to the current user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Interprets a CLI source argument as a `file://` URI, an `http(s)://` URI,
/// or a filesystem path.
pub fn source_to_uri(source: &str) -> String {
    let trimmed = source.trim();
    if trimmed.contains("://") {
        return trimmed.to_string();
    }
    let path = expand_tilde(trimmed);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir().map(|dir| dir.join(&path)).unwrap_or(path)
    };
    format!("file://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_uris_untouched() {
        assert_eq!(source_to_uri("https://lists.invalid/a.json"), "https://lists.invalid/a.json");
        assert_eq!(source_to_uri(" file:///tmp/a.json "), "file:///tmp/a.json");
    }

    #[test]
    fn turns_absolute_paths_into_file_uris() {
        assert_eq!(source_to_uri("/tmp/list.json"), "file:///tmp/list.json");
    }

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(expand_tilde("relative/dir"), PathBuf::from("relative/dir"));
    }
}
