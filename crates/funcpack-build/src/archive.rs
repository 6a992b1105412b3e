//! Packing function bundles into upload archives.

use std::io::{Cursor, Write};

use funcpack_core::{ContentRef, FunctionBundle, PackagedFunction};
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::PackagingError;

/// Serializes a bundle's file set into a single archive.
///
/// Implementations must be deterministic: the same file set yields the
/// same bytes.
pub trait ArchiveWriter: Send + Sync {
    fn write(&self, bundle: &FunctionBundle) -> Result<Vec<u8>, PackagingError>;
}

/// Zip archives with sorted entries, fixed timestamps and unix modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveWriter;

impl ArchiveWriter for ZipArchiveWriter {
    fn write(&self, bundle: &FunctionBundle) -> Result<Vec<u8>, PackagingError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        // ArtifactMap iterates in sorted path order
        for (path, content) in bundle.files.iter() {
            let options = entry_options(content.mode());
            match content {
                ContentRef::Symlink { target } => {
                    zip.add_symlink(path, target.to_string_lossy(), options)
                        .map_err(archive_error)?;
                }
                ContentRef::Inline { .. } | ContentRef::File { .. } => {
                    let bytes = content.read_bytes().map_err(|e| PackagingError::Read {
                        path: path.into(),
                        source: e,
                    })?;
                    zip.start_file(path, options).map_err(archive_error)?;
                    zip.write_all(&bytes).map_err(|e| PackagingError::Archive {
                        detail: format!("{path}: {e}"),
                    })?;
                }
            }
        }

        let cursor = zip.finish().map_err(archive_error)?;
        Ok(cursor.into_inner())
    }
}

fn entry_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(mode)
}

fn archive_error(e: zip::result::ZipError) -> PackagingError {
    PackagingError::Archive {
        detail: e.to_string(),
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Archive `bundle` with `writer` and attach its digest.
pub fn package(
    bundle: FunctionBundle,
    writer: &dyn ArchiveWriter,
) -> Result<PackagedFunction, PackagingError> {
    let archive = writer.write(&bundle)?;
    let digest = sha256_hex(&archive);
    tracing::info!(
        function = %bundle.name,
        bytes = archive.len(),
        digest = %digest,
        "packaged function"
    );
    Ok(PackagedFunction {
        bundle,
        archive,
        digest,
    })
}
