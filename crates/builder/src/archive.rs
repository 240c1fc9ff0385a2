//! Archive extraction utilities

use flate2::read::GzDecoder;
use spkg_errors::{BuildError, Error};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive as TarArchive;
use tokio::task;

/// Archive formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect from the file name, falling back to the leading magic bytes
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchiveFormat` when neither check matches.
    pub fn detect(path: &Path) -> Result<Self, Error> {
        if let Some(format) = Self::from_name(path) {
            return Ok(format);
        }
        Self::sniff(path)?.ok_or_else(|| {
            BuildError::UnsupportedArchiveFormat {
                path: path.display().to_string(),
            }
            .into()
        })
    }

    fn from_name(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    fn sniff(path: &Path) -> Result<Option<Self>, Error> {
        let mut header = [0u8; 262];
        let mut file = File::open(path).map_err(|e| BuildError::ExtractionFailed {
            message: format!("failed to open {}: {e}", path.display()),
        })?;
        let n = file.read(&mut header).map_err(|e| BuildError::ExtractionFailed {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let header = &header[..n];

        Ok(if header.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(Self::TarXz)
        } else if header.starts_with(b"BZh") {
            Some(Self::TarBz2)
        } else if header.starts_with(b"PK\x03\x04") {
            Some(Self::Zip)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(Self::Tar)
        } else {
            None
        })
    }
}

/// Extract an archive into `dest_dir` and return the source root
///
/// The source root is the single top-level directory when the archive has
/// exactly one, otherwise `dest_dir` itself.
///
/// # Errors
///
/// Returns a `BuildError` if the format is unsupported or extraction fails.
pub async fn extract(archive_path: &Path, dest_dir: &Path) -> Result<PathBuf, Error> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| BuildError::ExtractionFailed {
            message: format!("failed to create {}: {e}", dest_dir.display()),
        })?;

    // xz and bzip2 tarballs are decompressed to a plain tar first
    let (format, archive_path, _scratch) = match ArchiveFormat::detect(archive_path)? {
        format @ (ArchiveFormat::TarXz | ArchiveFormat::TarBz2) => {
            let scratch = tempfile::Builder::new()
                .prefix("decompress-")
                .tempdir_in(dest_dir.parent().unwrap_or(dest_dir))
                .map_err(|e| BuildError::ExtractionFailed {
                    message: format!("failed to create temp directory: {e}"),
                })?;
            let tar_path = scratch.path().join("archive.tar");
            decompress(archive_path, format, &tar_path).await?;
            (ArchiveFormat::Tar, tar_path, Some(scratch))
        }
        format => (format, archive_path.to_path_buf(), None),
    };
    let dest = dest_dir.to_path_buf();

    task::spawn_blocking(move || {
        match format {
            ArchiveFormat::TarGz => {
                let file = open(&archive_path)?;
                unpack_tar(TarArchive::new(GzDecoder::new(file)), &dest)
            }
            ArchiveFormat::Tar | ArchiveFormat::TarXz | ArchiveFormat::TarBz2 => {
                unpack_tar(TarArchive::new(open(&archive_path)?), &dest)
            }
            ArchiveFormat::Zip => unpack_zip(open(&archive_path)?, &dest),
        }?;
        source_root(&dest)
    })
    .await
    .map_err(|e| BuildError::ExtractionFailed {
        message: format!("task join error: {e}"),
    })?
}

async fn decompress(archive: &Path, format: ArchiveFormat, out: &Path) -> Result<(), Error> {
    use async_compression::tokio::bufread::{BzDecoder, XzDecoder};
    use tokio::io::{AsyncWriteExt, BufReader};

    let failed = |message: String| BuildError::ExtractionFailed { message };

    let input = tokio::fs::File::open(archive)
        .await
        .map_err(|e| failed(format!("failed to open archive {}: {e}", archive.display())))?;
    let reader = BufReader::new(input);
    let mut output = tokio::fs::File::create(out)
        .await
        .map_err(|e| failed(format!("failed to create {}: {e}", out.display())))?;

    let copied = match format {
        ArchiveFormat::TarXz => tokio::io::copy(&mut XzDecoder::new(reader), &mut output).await,
        ArchiveFormat::TarBz2 => tokio::io::copy(&mut BzDecoder::new(reader), &mut output).await,
        other => return Err(failed(format!("{other:?} is not a compressed tar")).into()),
    };
    copied.map_err(|e| failed(format!("failed to decompress {format:?} archive: {e}")))?;

    output
        .flush()
        .await
        .map_err(|e| failed(format!("failed to flush {}: {e}", out.display())))?;
    Ok(())
}

fn open(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|e| {
        BuildError::ExtractionFailed {
            message: format!("failed to open archive {}: {e}", path.display()),
        }
        .into()
    })
}

fn unpack_tar<R: Read>(mut archive: TarArchive<R>, dest: &Path) -> Result<(), Error> {
    archive.set_preserve_permissions(true);
    archive.unpack(dest).map_err(|e| {
        BuildError::ExtractionFailed {
            message: format!("failed to extract tar: {e}"),
        }
        .into()
    })
}

fn unpack_zip(file: File, dest: &Path) -> Result<(), Error> {
    let extraction_failed = |message: String| BuildError::ExtractionFailed { message };

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| extraction_failed(format!("failed to read zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| extraction_failed(format!("failed to read zip entry: {e}")))?;

        // entries escaping the destination are skipped
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .map_err(|e| extraction_failed(format!("failed to create directory: {e}")))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                extraction_failed(format!("failed to create parent directory: {e}"))
            })?;
        }
        let mut outfile = File::create(&outpath)
            .map_err(|e| extraction_failed(format!("failed to create file: {e}")))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| extraction_failed(format!("failed to extract file: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(())
}

fn source_root(dest: &Path) -> Result<PathBuf, Error> {
    let read_failed = |e: std::io::Error| BuildError::ExtractionFailed {
        message: format!("failed to read {}: {e}", dest.display()),
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dest).map_err(read_failed)? {
        let entry = entry.map_err(read_failed)?;
        // archives from macOS often carry resource fork noise at the top level
        if entry.file_name().to_string_lossy().starts_with("._") {
            continue;
        }
        entries.push(entry);
    }

    match entries.as_slice() {
        [] => Err(BuildError::ExtractionFailed {
            message: "archive is empty".to_string(),
        }
        .into()),
        [single] if single.file_type().map_err(read_failed)?.is_dir() => Ok(single.path()),
        _ => Ok(dest.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[tokio::test]
    async fn test_single_top_level_dir_is_source_root() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("v0.3.0.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("itsyhome-cli-0.3.0/main.go", b"package main\n"),
                ("itsyhome-cli-0.3.0/go.mod", b"module itsyhome\n"),
            ],
        );

        let root = extract(&archive, &temp.path().join("src")).await.unwrap();
        assert_eq!(root, temp.path().join("src").join("itsyhome-cli-0.3.0"));
        assert!(root.join("main.go").is_file());
    }

    #[tokio::test]
    async fn test_flat_archive_uses_dest() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("flat.tgz");
        write_tar_gz(&archive, &[("a.txt", b"a"), ("b.txt", b"b")]);

        let dest = temp.path().join("src");
        assert_eq!(extract(&archive, &dest).await.unwrap(), dest);
    }

    #[tokio::test]
    async fn test_format_sniffed_without_extension() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("download");
        write_tar_gz(&archive, &[("pkg/file", b"x")]);
        assert_eq!(ArchiveFormat::detect(&archive).unwrap(), ArchiveFormat::TarGz);
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("notes.txt");
        std::fs::write(&archive, b"plain text").unwrap();
        let err = extract(&archive, &temp.path().join("src")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::UnsupportedArchiveFormat { .. })
        ));
    }

    fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[tokio::test]
    async fn test_xz_and_bzip2_extraction() {
        use async_compression::tokio::bufread::{BzEncoder, XzEncoder};
        use tokio::io::AsyncReadExt;

        let temp = tempfile::tempdir().unwrap();
        let tar = tar_bytes(&[("pkg-2.0/main.go", b"package main\n")]);

        let mut xz = Vec::new();
        XzEncoder::new(tar.as_slice()).read_to_end(&mut xz).await.unwrap();
        let mut bz2 = Vec::new();
        BzEncoder::new(tar.as_slice()).read_to_end(&mut bz2).await.unwrap();

        for (name, bytes, format) in [
            ("pkg-2.0.tar.xz", xz, ArchiveFormat::TarXz),
            ("pkg-2.0.tar.bz2", bz2, ArchiveFormat::TarBz2),
        ] {
            let archive = temp.path().join(name);
            std::fs::write(&archive, &bytes).unwrap();
            assert_eq!(ArchiveFormat::detect(&archive).unwrap(), format);

            // sniffing works without the extension too
            let bare = temp.path().join(format!("{name}.download"));
            std::fs::write(&bare, &bytes).unwrap();
            assert_eq!(ArchiveFormat::detect(&bare).unwrap(), format);

            let root = extract(&archive, &temp.path().join(format!("src-{name}")))
                .await
                .unwrap();
            assert!(root.ends_with("pkg-2.0"));
            assert_eq!(std::fs::read(root.join("main.go")).unwrap(), b"package main\n");
        }
    }

    #[tokio::test]
    async fn test_zip_extraction() {
        use std::io::Write;

        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("src.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options: zip::write::SimpleFileOptions = zip::write::SimpleFileOptions::default();
            zip.start_file("pkg-1.0/main.go", options).unwrap();
            zip.write_all(b"package main\n").unwrap();
            zip.finish().unwrap();
        }

        let root = extract(&archive, &temp.path().join("src")).await.unwrap();
        assert!(root.ends_with("pkg-1.0"));
        assert!(root.join("main.go").is_file());
    }
}
