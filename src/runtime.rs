use std::fs;
use std::path::Path;

use log::debug;
use walkdir::WalkDir;

const RELEASE_FILE: &str = "release";
const VERSION_KEY: &str = "JAVA_RUNTIME_VERSION=";

/// An already-installed runtime found under the storage root.
///
/// Absence is represented by empty strings so the values can be printed
/// directly as shell assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledRuntime {
    pub version: String,
    /// Directory holding the `release` file, relative to the storage root.
    pub subpath: String,
}

impl InstalledRuntime {
    /// Major component of the installed version (the part before the first dot).
    pub fn major(&self) -> Option<String> {
        (!self.version.is_empty())
            .then(|| self.version.split('.').next().unwrap_or_default().to_owned())
    }
}

/// Scan `root` for a `release` metadata file and pull the runtime version out of it.
///
/// Entries are visited in lexical order so repeated runs over a root holding
/// several runtimes always report the same one. Unreadable files are skipped.
pub fn detect(root: &Path) -> InstalledRuntime {
    if !root.is_dir() {
        return InstalledRuntime::default();
    }
    let walker = WalkDir::new(root).sort_by_file_name();
    for entry in walker.into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || entry.file_name() != RELEASE_FILE {
            continue;
        }
        let Ok(bytes) = fs::read(entry.path()) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        if let Some(version) = parse_runtime_version(&text) {
            let subpath = entry
                .path()
                .parent()
                .and_then(|dir| dir.strip_prefix(root).ok())
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            debug!(
                "runtime: found {} in {}",
                version,
                entry.path().display()
            );
            return InstalledRuntime { version, subpath };
        }
    }
    InstalledRuntime::default()
}

/// Extract the value of a `JAVA_RUNTIME_VERSION=` line (quotes optional).
fn parse_runtime_version(text: &str) -> Option<String> {
    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix(VERSION_KEY) else {
            continue;
        };
        let rest = rest.strip_prefix(['"', '\'']).unwrap_or(rest);
        let version: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
            .collect();
        if !version.is_empty() {
            return Some(version);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_release(dir: &Path, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("release"), contents).unwrap();
    }

    #[test]
    fn parses_quoted_and_bare_versions() {
        assert_eq!(
            parse_runtime_version("JAVA_RUNTIME_VERSION=\"21.0.1+12\"\n"),
            Some("21.0.1+12".to_owned())
        );
        assert_eq!(
            parse_runtime_version("  JAVA_RUNTIME_VERSION='17.0.9'\n"),
            Some("17.0.9".to_owned())
        );
        assert_eq!(
            parse_runtime_version("IMPLEMENTOR=\"Eclipse\"\nJAVA_RUNTIME_VERSION=21+35\n"),
            Some("21+35".to_owned())
        );
        assert_eq!(parse_runtime_version("JAVA_VERSION=\"21\"\n"), None);
        assert_eq!(parse_runtime_version(""), None);
    }

    #[test]
    fn finds_release_file_below_root() {
        let root = tempfile::tempdir().unwrap();
        write_release(
            &root.path().join("jdk-21.0.1+12-jre"),
            "JAVA_RUNTIME_VERSION=\"21.0.1+12\"\n",
        );

        let installed = detect(root.path());
        assert_eq!(installed.version, "21.0.1+12");
        assert_eq!(installed.subpath, "jdk-21.0.1+12-jre");
        assert_eq!(installed.major(), Some("21".to_owned()));
    }

    #[test]
    fn missing_root_yields_empty_result() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        let installed = detect(&missing);
        assert_eq!(installed, InstalledRuntime::default());
        assert_eq!(installed.major(), None);
    }

    #[test]
    fn picks_lexically_first_runtime() {
        let root = tempfile::tempdir().unwrap();
        write_release(
            &root.path().join("b-jdk-21"),
            "JAVA_RUNTIME_VERSION=\"21.0.1+12\"\n",
        );
        write_release(
            &root.path().join("a-jdk-17"),
            "JAVA_RUNTIME_VERSION=\"17.0.9+9\"\n",
        );

        let installed = detect(root.path());
        assert_eq!(installed.subpath, "a-jdk-17");
        assert_eq!(installed.version, "17.0.9+9");
    }

    #[test]
    fn skips_release_files_without_version_line() {
        let root = tempfile::tempdir().unwrap();
        write_release(&root.path().join("broken"), "IMPLEMENTOR=\"x\"\n");
        write_release(
            &root.path().join("good"),
            "JAVA_RUNTIME_VERSION=\"21.0.1+12\"\n",
        );

        let installed = detect(root.path());
        assert_eq!(installed.subpath, "good");
    }
}
