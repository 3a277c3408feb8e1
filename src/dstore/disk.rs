use anyhow::{Result, bail};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// A Dstore's storage folder. One regular file per stored name.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens `root`, creating it if missing.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Streams at most `size` bytes from `reader` into the file for `name`.
    ///
    /// Returns how many bytes were written; fewer than `size` means the reader
    /// ended early. Nothing is buffered beyond what the copy needs.
    pub async fn write_from<R>(&self, name: &str, reader: &mut R, size: u64) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.path_for(name)?;
        let mut file = File::create(path).await?;
        let mut limited = reader.take(size);

        let written = tokio::io::copy(&mut limited, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    /// Returns `None` when no file with that name is stored.
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `false` when no file with that name was stored.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of every stored file, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

/// Rejects names that would escape the storage folder or are not plain files.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        bail!("invalid file name {:?}", name);
    }
    if name.contains(['/', '\\', '\0']) {
        bail!("file name {:?} contains a path separator", name);
    }
    Ok(())
}
