//! File discovery helpers.

use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use tracing::{debug, warn};

/// Find files matching `pattern` directly inside `base_dir/module_name/`.
///
/// Returns an empty list when the module directory does not exist or nothing
/// matches. Directories are never returned. Results are sorted by path.
pub fn locate(base_dir: &Path, module_name: &str, pattern: &str) -> Vec<PathBuf> {
    let root = base_dir.join(module_name);
    if !root.is_dir() {
        debug!("Module directory {} does not exist", root.display());
        return Vec::new();
    }
    glob_files(&root, pattern)
}

/// Find files matching `pattern` anywhere below `base_dir`.
pub fn locate_recursive(base_dir: &Path, pattern: &str) -> Vec<PathBuf> {
    if !base_dir.is_dir() {
        return Vec::new();
    }
    glob_files(base_dir, &format!("**/{}", pattern))
}

fn glob_files(root: &Path, pattern: &str) -> Vec<PathBuf> {
    // Only the pattern part may contain glob metacharacters.
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let full_pattern = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);

    let entries = match glob(&full_pattern) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Invalid glob pattern '{}': {}", pattern, e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    debug!("Pattern {} matched {} files", full_pattern, files.len());
    files
}

/// Create a directory and its parents if missing.
pub fn ensure_directory(directory: &Path) -> std::io::Result<&Path> {
    std::fs::create_dir_all(directory)?;
    Ok(directory)
}

/// Human-readable size, e.g. `"1.50 KB"`.
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("conta_corrente");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join("EXTRATO_BANCARIO_CC_02.csv"), "a").unwrap();
        fs::write(module_dir.join("EXTRATO_BANCARIO_CC_01.csv"), "a").unwrap();
        fs::write(module_dir.join("outro_ficheiro.txt"), "a").unwrap();
        dir
    }

    #[test]
    fn test_locate_matches_sorted() {
        let dir = fixture();
        let files = locate(dir.path(), "conta_corrente", "EXTRATO_BANCARIO_CC*.csv");

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["EXTRATO_BANCARIO_CC_01.csv", "EXTRATO_BANCARIO_CC_02.csv"]
        );
    }

    #[test]
    fn test_locate_txt() {
        let dir = fixture();
        let files = locate(dir.path(), "conta_corrente", "*.txt");
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("outro_ficheiro.txt"));
    }

    #[test]
    fn test_locate_no_match() {
        let dir = fixture();
        assert!(locate(dir.path(), "conta_corrente", "*.pdf").is_empty());
    }

    #[test]
    fn test_locate_missing_module() {
        let dir = fixture();
        assert!(locate(dir.path(), "investimentos", "*.csv").is_empty());
    }

    #[test]
    fn test_locate_skips_directories() {
        let dir = fixture();
        fs::create_dir_all(dir.path().join("conta_corrente").join("EXTRATO_BANCARIO_CC_dir.csv"))
            .unwrap();
        let files = locate(dir.path(), "conta_corrente", "EXTRATO_BANCARIO_CC*.csv");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_locate_is_not_recursive() {
        let dir = fixture();
        let nested = dir.path().join("conta_corrente").join("2024");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("EXTRATO_BANCARIO_CC_03.csv"), "a").unwrap();

        assert_eq!(locate(dir.path(), "conta_corrente", "*.csv").len(), 2);
        assert_eq!(locate_recursive(dir.path(), "*.csv").len(), 3);
    }

    #[test]
    fn test_locate_escapes_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("dados [2024]");
        fs::create_dir_all(base.join("remessas")).unwrap();
        fs::write(base.join("remessas").join("r1.txt"), "x").unwrap();

        assert_eq!(locate(&base, "remessas", "*.txt").len(), 1);
    }

    #[test]
    fn test_ensure_directory_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        ensure_directory(&target).unwrap();
        ensure_directory(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512.00 B");
        assert_eq!(human_size(1536), "1.50 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00 MB");
    }
}
