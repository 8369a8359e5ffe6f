use std::fs;
use std::io;
use std::path::Path;

/// Length of the abbreviated digest shown in human-readable output.
pub const SHORT_DIGEST_LEN: usize = 12;

/// BLAKE3 hex digest of a byte slice.
#[must_use]
pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// BLAKE3 hex digest of a file's content, or `None` if the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn digest_file(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(digest_bytes(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// First [`SHORT_DIGEST_LEN`] characters of a hex digest.
#[must_use]
pub fn short(digest: &str) -> &str {
    digest.get(..SHORT_DIGEST_LEN).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_digest_bytes_known_value() {
        assert_eq!(
            digest_bytes(b"hello world"),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_digest_file_matches_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock.json");
        fs::write(&path, b"[]").unwrap();

        assert_eq!(digest_file(&path).unwrap(), Some(digest_bytes(b"[]")));
    }

    #[test]
    fn test_digest_file_missing_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(digest_file(&dir.path().join("absent.json")).unwrap(), None);
    }

    #[test]
    fn test_short_digest() {
        let d = digest_bytes(b"x");
        assert_eq!(short(&d).len(), SHORT_DIGEST_LEN);
        assert_eq!(short("abc"), "abc");
    }
}
