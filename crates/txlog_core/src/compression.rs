//! Whole-file gzip collaborator.
//!
//! Compressed journals are ordinary journals run through gzip. Their logical
//! size is the ISIZE field of the gzip trailer, the last four bytes of the
//! compressed file, which is available without decompressing.

use crate::error::{CoreError, CoreResult};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// File extension of compressed journals.
pub const COMPRESSED_EXTENSION: &str = "gz";

/// Compression level used for compressed journals.
pub const COMPRESSION_LEVEL: u32 = 9;

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// True when `path` names a compressed journal.
#[must_use]
pub fn is_compressed_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == COMPRESSED_EXTENSION)
}

/// Returns `path` without its compression extension.
#[must_use]
pub fn uncompressed_path(path: &Path) -> PathBuf {
    if is_compressed_path(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// Reads the uncompressed size from a gzip trailer.
///
/// The field is the size modulo 2^32.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read or is shorter than four bytes.
pub fn gzip_uncompressed_size(path: &Path) -> CoreResult<u64> {
    let read = || -> io::Result<u64> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::End(-4))?;
        let mut trailer = [0u8; 4];
        file.read_exact(&mut trailer)?;
        Ok(u64::from(u32::from_le_bytes(trailer)))
    };
    read().map_err(|err| CoreError::io(display(path), err))
}

/// Decompresses a whole gzip file into memory.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read or is not valid gzip.
pub fn decompress_file(path: &Path) -> CoreResult<Vec<u8>> {
    let read = || -> io::Result<Vec<u8>> {
        let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    };
    read().map_err(|err| CoreError::io(display(path), err))
}

/// Compresses the file at `from` into a gzip file at `to`.
///
/// # Errors
///
/// Returns `Io` naming whichever file failed.
pub fn compress_file(from: &Path, to: &Path) -> CoreResult<()> {
    let mut input =
        BufReader::new(File::open(from).map_err(|err| CoreError::io(display(from), err))?);
    gzip_into(&mut input, to).map_err(|err| CoreError::io(display(to), err))
}

fn gzip_into(input: &mut impl Read, to: &Path) -> io::Result<()> {
    let output = BufWriter::new(File::create(to)?);
    let mut encoder = GzEncoder::new(output, Compression::new(COMPRESSION_LEVEL));
    io::copy(input, &mut encoder)?;
    encoder.finish()?.flush()
}

/// Removes a file, naming it on failure.
pub(crate) fn remove_file(path: &Path) -> CoreResult<()> {
    fs::remove_file(path).map_err(|err| CoreError::io(display(path), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn compressed_extension() {
        assert!(is_compressed_path(Path::new("a/00001.journal.gz")));
        assert!(!is_compressed_path(Path::new("a/00001.journal")));
        assert_eq!(
            uncompressed_path(Path::new("a/00001.journal.gz")),
            PathBuf::from("a/00001.journal")
        );
        assert_eq!(
            uncompressed_path(Path::new("a/00001.journal")),
            PathBuf::from("a/00001.journal")
        );
    }

    #[test]
    fn roundtrip_and_trailer_size() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("data.journal");
        let packed = dir.path().join("data.journal.gz");
        let contents: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&plain, &contents).unwrap();

        compress_file(&plain, &packed).unwrap();
        assert_eq!(gzip_uncompressed_size(&packed).unwrap(), 10_000);
        assert_eq!(decompress_file(&packed).unwrap(), contents);
    }

    #[test]
    fn compressing_overwrites_target() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("small.journal");
        let packed = dir.path().join("small.journal.gz");
        fs::write(&plain, b"journal bytes").unwrap();
        fs::write(&packed, b"stale").unwrap();

        compress_file(&plain, &packed).unwrap();
        assert_eq!(decompress_file(&packed).unwrap(), b"journal bytes");
        assert_eq!(gzip_uncompressed_size(&packed).unwrap(), 13);
    }

    #[test]
    fn missing_source_names_source() {
        let dir = tempdir().unwrap();
        let err = compress_file(&dir.path().join("absent"), &dir.path().join("out.gz"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Io { ref path, .. } if path.ends_with("absent")));
    }

    #[test]
    fn missing_file_names_path() {
        let err = decompress_file(Path::new("/nonexistent/x.gz")).unwrap_err();
        assert!(matches!(err, CoreError::Io { ref path, .. } if path == "/nonexistent/x.gz"));
    }
}
