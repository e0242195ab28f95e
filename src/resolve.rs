use crate::util::leading_major;

const TAG_PREFIX: &str = "jdk-";

/// Concrete release to query, derived from the raw request and any installed runtime.
///
/// Either `use_latest` is set and `tag` is empty, or `tag` is a full
/// `jdk-...` release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    /// GitHub repository serving the binaries for the resolved major.
    pub repo: String,
    pub use_latest: bool,
    pub tag: String,
    pub major: String,
}

impl ReleaseTarget {
    fn latest(major: String) -> Self {
        Self {
            repo: repo_for(&major),
            use_latest: true,
            tag: String::new(),
            major,
        }
    }

    fn tagged(tag: String, major: String) -> Self {
        Self {
            repo: repo_for(&major),
            use_latest: false,
            tag,
            major,
        }
    }
}

fn repo_for(major: &str) -> String {
    format!("adoptium/temurin{major}-binaries")
}

/// Map a free-form version request onto a release target.
///
/// Empty, "latest" and unrecognized requests track the installed major (or the
/// configured default). A bare major number also means "latest of that major";
/// anything more specific pins an exact `jdk-` tag.
pub fn decide_target(
    request: &str,
    installed_major: Option<&str>,
    default_major: &str,
) -> ReleaseTarget {
    let request = request.trim();
    if request.is_empty() || request.eq_ignore_ascii_case("latest") {
        let major = installed_major.unwrap_or(default_major);
        return ReleaseTarget::latest(major.to_owned());
    }
    if let Some(version) = request.strip_prefix(TAG_PREFIX) {
        return ReleaseTarget::tagged(request.to_owned(), leading_major(version).to_owned());
    }
    if request.starts_with(|c: char| c.is_ascii_digit()) {
        let major = leading_major(request).to_owned();
        if request.chars().all(|c| c.is_ascii_digit()) {
            return ReleaseTarget::latest(major);
        }
        return ReleaseTarget::tagged(format!("{TAG_PREFIX}{request}"), major);
    }
    // Unrecognized request: behave like "latest".
    let major = installed_major.unwrap_or(default_major);
    ReleaseTarget::latest(major.to_owned())
}
