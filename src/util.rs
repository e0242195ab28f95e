/// Quote a value so the stdout assignment survives `eval` in a POSIX shell.
#[must_use]
pub fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

/// Leading digit run of a version string (the part before the first `+`, `.` or `-`).
#[must_use]
pub fn leading_major(version: &str) -> &str {
    version.split(['+', '.', '-']).next().unwrap_or("")
}
