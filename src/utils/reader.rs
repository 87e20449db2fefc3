//! Decompression of fetched objects.
//!
//! CloudTrail delivers gzip-compressed JSON. Objects are fetched into memory
//! and decoded straight from the buffer; no temporary files are written.
//!
//! # Examples
//!
//! ```
//! use cloudtrail_actions::utils::reader::open_document;
//! use std::io::Read;
//!
//! let mut reader = open_document("notes.json", b"{}");
//! let mut contents = String::new();
//! reader.read_to_string(&mut contents).unwrap();
//! assert_eq!(contents, "{}");
//! ```

use flate2::read::MultiGzDecoder;
use std::io::{BufRead, BufReader};

/// Wrap an object's bytes in a buffered reader that undoes its compression.
///
/// Detection is by key suffix:
/// - `.gz` → Gzip decompression (multi-member streams included)
/// - Otherwise → the bytes as-is
///
/// serde_json reads byte by byte, so the decoder always sits behind a
/// `BufReader`.
pub fn open_document<'a>(key: &str, bytes: &'a [u8]) -> Box<dyn BufRead + Send + 'a> {
    if key.ends_with(".gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(bytes)))
    } else {
        Box::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_plain_document() {
        let mut out = String::new();
        open_document("a.json", b"{\"Records\":[]}")
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "{\"Records\":[]}");
    }

    #[test]
    fn test_gzip_document() {
        let compressed = gzip(b"{\"Records\":[]}");
        let mut out = String::new();
        open_document("a.json.gz", &compressed)
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "{\"Records\":[]}");
    }

    #[test]
    fn test_gzip_document_is_buffered() {
        let compressed = gzip(b"{\"Records\":[]}\nsecond line\n");
        let mut reader = open_document("a.json.gz", &compressed);

        let buffered = reader.fill_buf().unwrap();
        assert!(!buffered.is_empty());
        assert!(b"{\"Records\":[]}\nsecond line\n".starts_with(buffered));

        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["{\"Records\":[]}", "second line"]);
    }

    #[test]
    fn test_corrupt_gzip_fails_on_read() {
        let mut out = Vec::new();
        let result = open_document("a.json.gz", b"not gzip at all").read_to_end(&mut out);
        assert!(result.is_err());
    }
}
