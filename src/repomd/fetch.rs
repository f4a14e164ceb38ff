use crate::error::Result;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reads (possibly compressed) metadata files out of the local dnf cache
pub struct MetadataReader;

impl MetadataReader {
    /// Read a metadata file and decompress it according to its extension
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!(path = %path.display(), bytes = data.len(), "read metadata file");
        Self::auto_decompress(path, &data)
    }

    pub fn decompress_gz(data: &[u8]) -> Result<Vec<u8>> {
        use flate2::read::GzDecoder;
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }

    pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
        Ok(zstd::decode_all(data)?)
    }

    pub fn decompress_xz(data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = xz2::read::XzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }

    /// Pick the decompressor from the file extension
    pub fn auto_decompress<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<Vec<u8>> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match extension {
            "gz" => Self::decompress_gz(data),
            "zst" | "zstd" => Self::decompress_zstd(data),
            "xz" => Self::decompress_xz(data),
            _ => Ok(data.to_vec()),
        }
    }
}
