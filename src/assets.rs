use crate::github::ReleaseAsset;

/// JRE is preferred over JDK when a release ships both.
const KIND_PREFERENCE: [&str; 2] = ["jre", "jdk"];
const ARCHIVE_SUFFIXES: [&str; 4] = [".tar.gz", ".tgz", ".tar", ".zip"];
const EXCLUDED_MARKERS: [&str; 4] = ["debugimage", "testimage", "static", "symbols"];

/// Pick the linux x64 binary asset to install, first match in list order wins.
pub fn pick_asset(assets: &[ReleaseAsset]) -> Option<&ReleaseAsset> {
    for kind in KIND_PREFERENCE {
        for asset in assets {
            if matches(&asset.name, kind) {
                return Some(asset);
            }
        }
    }
    None
}

fn matches(name: &str, kind: &str) -> bool {
    let name = name.to_lowercase();
    if !name.contains("linux") || name.contains("alpine") {
        return false;
    }
    if !name.contains("x64") && !name.contains("x86_64") {
        return false;
    }
    if !name.contains(kind) {
        return false;
    }
    if !ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return false;
    }
    if EXCLUDED_MARKERS.iter().any(|marker| name.contains(marker)) {
        return false;
    }
    true
}
