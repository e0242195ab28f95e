use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "/jDownloader2";
const DEFAULT_MAJOR: &str = "21";

/// Environment-driven settings for a single run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the runtime is installed under (`<DATA_DIR>/runtime`).
    pub runtime_root: PathBuf,
    /// Optional GitHub token for authenticated metadata requests.
    pub token: Option<String>,
    /// Requested version string, defaulting to "latest".
    pub request: String,
    /// When set, checksum problems are fatal instead of warnings.
    pub strict: bool,
    /// Major version used when nothing is installed and the request is "latest".
    pub default_major: String,
    /// Owner applied to extracted files when both UID and GID parse as integers.
    pub owner: Option<(u32, u32)>,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = non_empty_var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self {
            runtime_root: data_dir.join("runtime"),
            token: non_empty_var("GITHUB_TOKEN"),
            request: non_empty_var("JRE_VERSION")
                .map(|v| v.trim().to_owned())
                .unwrap_or_else(|| "latest".to_owned()),
            strict: env::var("FORCE_SHA_CHECK")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            default_major: non_empty_var("DEFAULT_TEMURIN_MAJOR")
                .unwrap_or_else(|| DEFAULT_MAJOR.to_owned()),
            owner: owner_from_env(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn owner_from_env() -> Option<(u32, u32)> {
    let uid = env::var("UID").ok()?.trim().parse().ok()?;
    let gid = env::var("GID").ok()?.trim().parse().ok()?;
    Some((uid, gid))
}
