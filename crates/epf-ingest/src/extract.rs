//! Unpacking downloaded product archives
//!
//! The City State product arrives as a tar holding a password-protected zip,
//! which in turn holds the fixed-width data file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{Secret, DEFAULT_TAR_MEMBER, DEFAULT_ZIP_MEMBER};
use crate::error::{IngestError, Result};

/// Produces the data file from a downloaded archive
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Unpack `archive` into `work_dir` and return the data file path
    async fn extract(&self, archive: &Path, work_dir: &Path) -> Result<PathBuf>;
}

/// Tar, then zip (optionally encrypted), into the work directory
#[derive(Debug, Clone)]
pub struct TarZipExtractor {
    tar_member: String,
    zip_member: String,
    password: Option<Secret>,
}

impl Default for TarZipExtractor {
    fn default() -> Self {
        Self {
            tar_member: DEFAULT_TAR_MEMBER.to_string(),
            zip_member: DEFAULT_ZIP_MEMBER.to_string(),
            password: None,
        }
    }
}

impl TarZipExtractor {
    pub fn new(tar_member: impl Into<String>, zip_member: impl Into<String>) -> Self {
        Self {
            tar_member: tar_member.into(),
            zip_member: zip_member.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: Option<Secret>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    fn extract_blocking(&self, archive: &Path, work_dir: &Path) -> Result<PathBuf> {
        let zip_path = self.unpack_tar_member(archive, work_dir)?;
        let data_path = self.unpack_zip_member(&zip_path, work_dir)?;
        info!(
            archive = %archive.display(),
            data_file = %data_path.display(),
            "Archive extracted"
        );
        Ok(data_path)
    }

    /// Copy the tar member into `work_dir`, dropping its leading directories
    fn unpack_tar_member(&self, archive: &Path, work_dir: &Path) -> Result<PathBuf> {
        let file = File::open(archive)?;
        let mut tar = tar::Archive::new(file);
        let wanted = Path::new(&self.tar_member);

        for entry in tar.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.into_owned();
            if !path.ends_with(wanted) {
                continue;
            }
            let name = wanted
                .file_name()
                .ok_or_else(|| IngestError::extraction("tar member has no file name"))?;
            let dest = work_dir.join(name);
            entry.unpack(&dest)?;
            debug!(member = %path.display(), dest = %dest.display(), "Unpacked tar member");
            return Ok(dest);
        }

        Err(IngestError::extraction(format!(
            "{} not found in {}",
            self.tar_member,
            archive.display()
        )))
    }

    fn unpack_zip_member(&self, zip_path: &Path, work_dir: &Path) -> Result<PathBuf> {
        let mut zip = zip::ZipArchive::new(File::open(zip_path)?)?;
        let dest = work_dir.join(
            Path::new(&self.zip_member)
                .file_name()
                .ok_or_else(|| IngestError::extraction("zip member has no file name"))?,
        );
        let mut out = File::create(&dest)?;

        match &self.password {
            Some(password) => {
                let mut member = zip
                    .by_name_decrypt(&self.zip_member, password.expose().as_bytes())?
                    .map_err(|_| IngestError::extraction("invalid zip password"))?;
                io::copy(&mut member, &mut out)?;
            }
            None => {
                let mut member = zip.by_name(&self.zip_member)?;
                io::copy(&mut member, &mut out)?;
            }
        }

        debug!(member = %self.zip_member, dest = %dest.display(), "Unpacked zip member");
        Ok(dest)
    }
}

#[async_trait]
impl ArchiveExtractor for TarZipExtractor {
    async fn extract(&self, archive: &Path, work_dir: &Path) -> Result<PathBuf> {
        let this = self.clone();
        let archive = archive.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        tokio::task::spawn_blocking(move || this.extract_blocking(&archive, &work_dir)).await?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_bytes(member: &str, content: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
        writer
            .start_file(member, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn write_tar(path: &Path, member: &str, content: &[u8]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, member, content).unwrap();
        builder.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extracts_nested_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("epf.tar");
        let zip = zip_bytes("ctystate.txt", b"D00501");
        write_tar(&archive, "ctystatenatl/ctystate/ctystate.zip", &zip);

        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let data = TarZipExtractor::default()
            .extract(&archive, &work)
            .await
            .unwrap();
        assert_eq!(data, work.join("ctystate.txt"));
        assert_eq!(std::fs::read(&data).unwrap(), b"D00501");
        assert!(work.join("ctystate.zip").exists());
    }

    #[tokio::test]
    async fn test_missing_tar_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("epf.tar");
        write_tar(&archive, "other/file.zip", b"nope");

        let err = TarZipExtractor::default()
            .extract(&archive, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Extraction(_)));
        assert!(err.to_string().contains("ctystate.zip"));
    }

    #[tokio::test]
    async fn test_missing_zip_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("epf.tar");
        let zip = zip_bytes("README.txt", b"hello");
        write_tar(&archive, "ctystatenatl/ctystate/ctystate.zip", &zip);

        let err = TarZipExtractor::default()
            .extract(&archive, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_not_a_tar() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("epf.tar");
        std::fs::write(&archive, b"").unwrap();

        assert!(TarZipExtractor::default()
            .extract(&archive, dir.path())
            .await
            .is_err());
    }

    #[test]
    fn test_empty_password_ignored() {
        let extractor = TarZipExtractor::default().with_password(Some(Secret::new("")));
        assert!(extractor.password.is_none());
    }
}
