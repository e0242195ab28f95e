use std::env;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::assets;
use crate::checksum;
use crate::config::Config;
use crate::extract;
use crate::github::FeedClient;
use crate::resolve;
use crate::runtime;

/// The two values printed as shell assignments on success.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunOutputs {
    /// Version that was installed before this run started (possibly empty).
    pub installed_jre: String,
    /// Directory of the runtime under the storage root after this run.
    pub runtime_name: String,
}

/// Run the whole resolve-fetch-verify-extract pipeline.
pub async fn run(config: &Config) -> Result<RunOutputs, String> {
    let root = &config.runtime_root;

    info!("Checking if Runtime is installed");
    let installed = runtime::detect(root);
    info!(
        "INSTALLED_JRE={} RUNTIME_NAME={}",
        or_none(&installed.version),
        or_none(&installed.subpath)
    );

    let installed_major = installed.major();
    let target = resolve::decide_target(
        &config.request,
        installed_major.as_deref(),
        &config.default_major,
    );
    info!(
        "JRE_VERSION requested: {} (installed: {}); repo={}",
        or_none(&config.request),
        or_none(&installed.version),
        target.repo
    );

    // A "latest" request is already satisfied when the installed major
    // matches; nothing to fetch then.
    if target.use_latest && installed_major.as_deref() == Some(target.major.as_str()) {
        info!(
            "Installed major {} already satisfies requested {}",
            target.major,
            or_none(&config.request)
        );
        return Ok(RunOutputs {
            installed_jre: installed.version,
            runtime_name: installed.subpath,
        });
    }

    let client = FeedClient::new(config.token.clone());
    let release = client.fetch_release(&target).await?;

    let asset = assets::pick_asset(&release.assets)
        .ok_or("no suitable linux x64 JRE/JDK asset found in release metadata")?;
    info!("Selected asset: {}", asset.name);
    let asset_base = Path::new(&asset.name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| asset.name.clone());

    let archive_path = env::temp_dir().join(&asset_base);
    info!("Downloading asset...");
    client
        .download_to_path(&asset.download_url, &archive_path)
        .await
        .map_err(|err| format!("download failed: {err}"))?;
    let data = fs::read(&archive_path)
        .map_err(|err| format!("failed to read downloaded archive: {err}"))?;

    if extract::looks_like_html(&data) {
        let first_line: String = String::from_utf8_lossy(&data)
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(200)
            .collect();
        return Err(format!(
            "downloaded file looks like HTML (probably an error page): {first_line}"
        ));
    }

    let actual = checksum::sha256_hex(&data);
    checksum::verify(&client, &release.assets, &asset_base, &actual, config.strict).await?;

    let kind = extract::archive_kind(&asset_base)
        .ok_or_else(|| format!("unrecognized archive extension: {asset_base}"))?;
    let topdir = extract::top_level_dir(&data, kind);
    match &topdir {
        Some(dir) => info!("Archive top-level dir: {dir}"),
        None => warn!("could not inspect archive top-level"),
    }

    extract::extract(&data, kind, root).map_err(|err| format!("extraction failed: {err}"))?;

    // Prefer the predicted directory; fall back to re-scanning the root.
    let runtime_name = match topdir.filter(|dir| root.join(dir).is_dir()) {
        Some(dir) => dir,
        None => runtime::detect(root).subpath,
    };
    if runtime_name.is_empty() {
        return Err("could not determine extracted runtime directory".to_owned());
    }

    if let Some((uid, gid)) = config.owner {
        apply_ownership(&root.join(&runtime_name), uid, gid);
    }

    Ok(RunOutputs {
        installed_jre: installed.version,
        runtime_name,
    })
}

fn or_none(value: &str) -> &str {
    if value.is_empty() { "<none>" } else { value }
}

/// Best-effort recursive chown of the extracted tree; per-entry failures
/// are logged and ignored.
#[cfg(unix)]
fn apply_ownership(dir: &Path, uid: u32, gid: u32) {
    use std::os::unix::fs::chown;

    use walkdir::WalkDir;

    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if let Err(err) = chown(entry.path(), Some(uid), Some(gid)) {
            debug!("chown {} failed: {err}", entry.path().display());
        }
    }
}

#[cfg(not(unix))]
fn apply_ownership(_dir: &Path, _uid: u32, _gid: u32) {
    debug!("ownership adjustment skipped on this platform");
}
