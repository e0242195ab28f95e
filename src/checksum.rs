use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::github::{FeedClient, ReleaseAsset};

/// Find the checksum listing published next to `asset_name`, if any.
///
/// Exact `<name>.sha256.txt` wins; otherwise the first asset that looks like
/// any sha256 listing is used.
pub fn find_checksum_asset<'a>(
    assets: &'a [ReleaseAsset],
    asset_name: &str,
) -> Option<&'a ReleaseAsset> {
    let exact = format!("{asset_name}.sha256.txt");
    if let Some(asset) = assets.iter().find(|asset| asset.name == exact) {
        return Some(asset);
    }
    assets.iter().find(|asset| {
        let name = asset.name.to_lowercase();
        name.ends_with("sha256.txt") || name.contains("sha256")
    })
}

/// Pull the expected digest for `asset_name` out of a checksum listing.
///
/// Lines have the shape `<64 hex digits> [*]<filename>`; the filename may
/// carry a path prefix, so matching is by suffix.
pub fn expected_digest(listing: &str, asset_name: &str) -> Option<String> {
    for line in listing.lines() {
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let digest = parts.next().unwrap_or("");
        let Some(file) = parts.next() else {
            continue;
        };
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        let file = file.trim_start().trim_start_matches('*').trim();
        if file.ends_with(asset_name) {
            return Some(digest.to_lowercase());
        }
    }
    None
}

/// Hex-encoded SHA-256 of a byte buffer.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// The shared fail-or-warn decision for checksum problems.
fn enforce(strict: bool, message: &str) -> Result<(), String> {
    if strict {
        Err(format!("{message} (strict checksum mode is enabled)"))
    } else {
        warn!("{message} (continuing, strict checksum mode is off)");
        Ok(())
    }
}

/// Reconcile the downloaded bytes' digest against the published checksum listing.
///
/// Missing listings, unfetchable listings and mismatching digests are all
/// warnings unless strict mode turns them into fatal errors. A listing with
/// no line for the asset skips the comparison.
pub async fn verify(
    client: &FeedClient,
    assets: &[ReleaseAsset],
    asset_name: &str,
    actual_hex: &str,
    strict: bool,
) -> Result<(), String> {
    let Some(record) = find_checksum_asset(assets, asset_name) else {
        return enforce(strict, "no checksum asset found in release metadata");
    };
    let listing = match client.fetch_text(&record.download_url).await {
        Ok(listing) => listing,
        Err(err) => {
            return enforce(strict, &format!("failed to download checksum asset: {err}"));
        }
    };
    reconcile(&listing, asset_name, actual_hex, strict)
}

/// Decide the verification outcome once the listing text is in hand.
fn reconcile(
    listing: &str,
    asset_name: &str,
    actual_hex: &str,
    strict: bool,
) -> Result<(), String> {
    let expected = expected_digest(listing, asset_name);
    info!("Checksum (expected): {}", expected.as_deref().unwrap_or("<none>"));
    info!("Checksum (actual)  : {actual_hex}");
    match expected {
        Some(expected) if expected != actual_hex => {
            enforce(strict, &format!("checksum mismatch for downloaded asset {asset_name}"))
        }
        Some(_) => Ok(()),
        None => {
            warn!("no expected digest for {asset_name} in checksum listing, skipping comparison");
            Ok(())
        }
    }
}
