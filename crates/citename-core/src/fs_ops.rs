//! Filesystem primitives used by the batch runner.

use std::fs;
use std::io;
use std::path::Path;

/// The file operations a batch run performs.
pub trait FileOps: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy `from` to `to`, keeping the modification time.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Move `from` to `to`.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`FileOps`] on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileOps;

impl FileOps for LocalFileOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let modified = fs::metadata(from)?.modified()?;
        fs::copy(from, to)?;
        fs::File::options()
            .write(true)
            .open(to)?
            .set_modified(modified)
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
                self.copy(from, to)?;
                fs::remove_file(from)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_preserves_content_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.pdf");
        let dst = dir.path().join("b.pdf");
        fs::write(&src, b"%PDF-1.4").unwrap();

        LocalFileOps.copy(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"%PDF-1.4");
        assert_eq!(
            fs::metadata(&src).unwrap().modified().unwrap(),
            fs::metadata(&dst).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn move_file_renames() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.pdf");
        let sub = dir.path().join("sub");
        fs::write(&src, b"x").unwrap();
        LocalFileOps.create_dir_all(&sub).unwrap();

        LocalFileOps.move_file(&src, &sub.join("a.pdf")).unwrap();

        assert!(!LocalFileOps.exists(&src));
        assert!(LocalFileOps.exists(&sub.join("a.pdf")));
    }

    #[test]
    fn move_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFileOps
            .move_file(&dir.path().join("nope.pdf"), &dir.path().join("b.pdf"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
