//! Reading files for [`crate::Output::File`].

use std::fmt::Debug;
use std::path::Path;

#[async_trait]
/// Reads whole files from storage.
///
/// The router uses [`TokioFileReader`] unless told otherwise with
/// [`crate::Router::file_reader`]; swapping it out is mostly useful for
/// serving embedded assets, or for tests.
pub trait FileReader: Debug + Send + Sync + 'static {
    /// Reads the entire file at the given path.
    ///
    /// # Errors
    /// An error of kind [`std::io::ErrorKind::NotFound`] is answered with a
    /// `404`; any other error is treated as an internal error.
    async fn read_entire_file(&self, path: &Path) -> std::io::Result<bytes::Bytes>;
}

#[derive(Debug, Default, Clone, Copy)]
/// Reads files from disk using tokio.
pub struct TokioFileReader;

#[async_trait]
impl FileReader for TokioFileReader {
    async fn read_entire_file(&self, path: &Path) -> std::io::Result<bytes::Bytes> {
        log::trace!("read_entire_file({:?})", path);
        tokio::fs::read(path).await.map(bytes::Bytes::from)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_missing_file() {
        let error = TokioFileReader
            .read_entire_file(Path::new("this/file/does/not/exist.txt"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reads_file() {
        let contents = TokioFileReader
            .read_entire_file(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")))
            .await;
        assert!(contents.is_ok());
    }
}
