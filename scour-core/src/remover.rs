use std::io;
use std::path::Path;

/// Performs the deletions requested by the sweeper.
///
/// [`FsRemover`] talks to the real filesystem; other implementations can
/// refuse individual paths to exercise the failure handling.
pub trait Remover {
    /// Remove a directory and everything below it
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a single file or symlink
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            // Windows directory symlinks are unlinked with remove_dir
            #[cfg(windows)]
            Err(_) if path.is_symlink() => std::fs::remove_dir(path),
            result => result,
        }
    }
}

impl<R: Remover + ?Sized> Remover for &R {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }
}
