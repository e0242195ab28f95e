use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use log::info;
use tar::Archive;
use zip::read::ZipArchive;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    Zip,
}

/// Classify an archive by its filename extension.
pub fn archive_kind(name: &str) -> Option<ArchiveKind> {
    let name = name.to_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Whether the payload looks like an HTML document rather than an archive.
///
/// Redirected or rate-limited downloads come back as error pages; checked
/// before any checksum or extraction work.
pub fn looks_like_html(data: &[u8]) -> bool {
    let head = &data[..data.len().min(256)];
    head.to_ascii_lowercase()
        .windows(5)
        .any(|window| window == b"<html")
}

/// First top-level path segment in the archive, used to predict the
/// directory name the extraction will produce.
pub fn top_level_dir(data: &[u8], kind: ArchiveKind) -> Option<String> {
    match kind {
        ArchiveKind::Zip => {
            let mut archive = ZipArchive::new(Cursor::new(data)).ok()?;
            if archive.is_empty() {
                return None;
            }
            let entry = archive.by_index(0).ok()?;
            Some(first_segment(entry.name()))
        }
        ArchiveKind::TarGz | ArchiveKind::Tar => {
            let mut archive = tar_archive(data, kind);
            let entry = archive.entries().ok()?.next()?.ok()?;
            let path = entry.path().ok()?;
            Some(first_segment(&path.to_string_lossy()))
        }
    }
}

fn first_segment(name: &str) -> String {
    name.split('/').next().unwrap_or(name).to_owned()
}

/// Extract `data` into `dest`.
///
/// Every entry path is validated before anything is written; one unsafe
/// entry aborts the whole extraction.
pub fn extract(data: &[u8], kind: ArchiveKind, dest: &Path) -> Result<(), String> {
    fs::create_dir_all(dest).map_err(|err| format!("unable to create runtime dir: {err}"))?;
    info!("Extracting archive ({kind:?}) into {}", dest.display());
    match kind {
        ArchiveKind::Zip => extract_zip(data, dest),
        ArchiveKind::TarGz | ArchiveKind::Tar => extract_tar(data, kind, dest),
    }
}

/// Reject absolute paths and parent traversal so no entry can resolve
/// outside the destination root.
fn reject_unsafe_path(path: &Path) -> Result<(), String> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(format!("unsafe path in archive: {}", path.display())),
        }
    }
    Ok(())
}

fn tar_archive(data: &[u8], kind: ArchiveKind) -> Archive<Box<dyn Read + '_>> {
    let reader: Box<dyn Read> = match kind {
        ArchiveKind::TarGz => Box::new(GzDecoder::new(Cursor::new(data))),
        _ => Box::new(Cursor::new(data)),
    };
    Archive::new(reader)
}

fn extract_tar(data: &[u8], kind: ArchiveKind, dest: &Path) -> Result<(), String> {
    // First pass validates every entry path before anything touches the disk.
    let mut scan = tar_archive(data, kind);
    for entry in scan
        .entries()
        .map_err(|err| format!("tar read error: {err}"))?
    {
        let entry = entry.map_err(|err| format!("tar entry error: {err}"))?;
        let path = entry
            .path()
            .map_err(|err| format!("tar entry path error: {err}"))?;
        reject_unsafe_path(&path)?;
    }

    let mut archive = tar_archive(data, kind);
    archive
        .unpack(dest)
        .map_err(|err| format!("tar extract error: {err}"))
}

fn extract_zip(data: &[u8], dest: &Path) -> Result<(), String> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|err| format!("zip parse error: {err}"))?;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|err| format!("zip entry error: {err}"))?;
        reject_unsafe_path(Path::new(entry.name()))?;
    }
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| format!("zip entry error: {err}"))?;
        let out_path = dest.join(entry.mangled_name());
        if entry.name().ends_with('/') {
            fs::create_dir_all(&out_path).map_err(|err| format!("zip dir create error: {err}"))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|err| format!("zip parent dir error: {err}"))?;
        }
        let mut out_file =
            fs::File::create(&out_path).map_err(|err| format!("zip create file error: {err}"))?;
        io::copy(&mut entry, &mut out_file).map_err(|err| format!("zip write error: {err}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn tar_gz_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    /// Builds tar headers by hand; `tar::Builder` refuses names containing
    /// `..`, which is exactly what the pre-scan needs to see.
    fn raw_tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, data) in entries {
            let mut header = [0u8; 512];
            header[..name.len()].copy_from_slice(name.as_bytes());
            header[100..107].copy_from_slice(b"0000644");
            header[108..115].copy_from_slice(b"0000000");
            header[116..123].copy_from_slice(b"0000000");
            header[124..135].copy_from_slice(format!("{:011o}", data.len()).as_bytes());
            header[136..147].copy_from_slice(b"00000000000");
            header[148..156].copy_from_slice(b"        ");
            header[156] = b'0';
            header[257..265].copy_from_slice(b"ustar  \0");
            let checksum: u32 = header.iter().map(|byte| u32::from(*byte)).sum();
            header[148..156].copy_from_slice(format!("{checksum:06o}\0 ").as_bytes());
            out.extend_from_slice(&header);
            out.extend_from_slice(data);
            out.resize(out.len().div_ceil(512) * 512, 0);
        }
        out.extend_from_slice(&[0u8; 1024]);
        out
    }

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn classifies_archives_by_extension() {
        assert_eq!(archive_kind("jre.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(archive_kind("jre.TGZ"), Some(ArchiveKind::TarGz));
        assert_eq!(archive_kind("jre.tar"), Some(ArchiveKind::Tar));
        assert_eq!(archive_kind("jre.zip"), Some(ArchiveKind::Zip));
        assert_eq!(archive_kind("jre.tar.gz.sig"), None);
    }

    #[test]
    fn sniffs_html_error_pages() {
        assert!(looks_like_html(b"<html><body>404</body></html>"));
        assert!(looks_like_html(b"<!DOCTYPE html>\n<HTML>..."));
        assert!(!looks_like_html(b"\x1f\x8b\x08\x00binary"));
        assert!(!looks_like_html(b""));
    }

    #[test]
    fn html_sniff_only_inspects_leading_bytes() {
        let mut data = vec![0u8; 512];
        data.extend_from_slice(b"<html>");
        assert!(!looks_like_html(&data));
    }

    #[test]
    fn predicts_top_level_dir_for_tar_and_zip() {
        let tar_gz = tar_gz_with(&[("jdk-21.0.1+12/bin/java", b"#!ELF")]);
        assert_eq!(
            top_level_dir(&tar_gz, ArchiveKind::TarGz),
            Some("jdk-21.0.1+12".to_owned())
        );

        let zip = zip_with(&[("jdk-21.0.1+12/bin/java.exe", b"MZ")]);
        assert_eq!(
            top_level_dir(&zip, ArchiveKind::Zip),
            Some("jdk-21.0.1+12".to_owned())
        );
    }

    #[test]
    fn garbage_archive_has_no_top_level_dir() {
        assert_eq!(top_level_dir(b"not an archive", ArchiveKind::Zip), None);
    }

    #[test]
    fn extracts_tar_gz_round_trip() {
        let dest = tempfile::tempdir().unwrap();
        let tar_gz = tar_gz_with(&[
            ("jdk-21.0.1+12/bin/java", b"#!ELF".as_slice()),
            ("jdk-21.0.1+12/release", b"JAVA_RUNTIME_VERSION=\"21.0.1+12\"\n"),
        ]);
        extract(&tar_gz, ArchiveKind::TarGz, dest.path()).unwrap();
        assert!(dest.path().join("jdk-21.0.1+12/bin/java").is_file());
        assert!(dest.path().join("jdk-21.0.1+12/release").is_file());
    }

    #[test]
    fn extracts_zip_round_trip() {
        let dest = tempfile::tempdir().unwrap();
        let zip = zip_with(&[("jdk-21.0.1+12/release", b"JAVA_RUNTIME_VERSION=\"21.0.1+12\"\n")]);
        extract(&zip, ArchiveKind::Zip, dest.path()).unwrap();
        assert!(dest.path().join("jdk-21.0.1+12/release").is_file());
    }

    #[test]
    fn traversal_entry_aborts_zip_before_any_write() {
        let dest = tempfile::tempdir().unwrap();
        let zip = zip_with(&[
            ("ok/file.txt", b"fine".as_slice()),
            ("../evil.txt", b"nope"),
        ]);
        assert!(extract(&zip, ArchiveKind::Zip, dest.path()).is_err());
        assert!(fs::read_dir(dest.path()).unwrap().next().is_none());
    }

    #[test]
    fn traversal_entry_aborts_tar_before_any_write() {
        let dest = tempfile::tempdir().unwrap();
        let tar = raw_tar_with(&[
            ("ok/file.txt", b"fine".as_slice()),
            ("../../etc/passwd", b"root:x:0:0"),
        ]);
        assert!(extract(&tar, ArchiveKind::Tar, dest.path()).is_err());
        assert!(fs::read_dir(dest.path()).unwrap().next().is_none());
    }

    #[test]
    fn well_formed_raw_tar_still_extracts() {
        let dest = tempfile::tempdir().unwrap();
        let tar = raw_tar_with(&[("jdk-21/release", b"JAVA_RUNTIME_VERSION=\"21\"\n")]);
        extract(&tar, ArchiveKind::Tar, dest.path()).unwrap();
        assert!(dest.path().join("jdk-21/release").is_file());
    }

    #[test]
    fn rejects_parent_and_absolute_paths() {
        assert!(reject_unsafe_path(Path::new("../../etc/passwd")).is_err());
        assert!(reject_unsafe_path(Path::new("/etc/passwd")).is_err());
        assert!(reject_unsafe_path(Path::new("jdk/../../../etc")).is_err());
        assert!(reject_unsafe_path(Path::new("jdk-21/bin/java")).is_ok());
        assert!(reject_unsafe_path(Path::new("./jdk-21/release")).is_ok());
    }
}
