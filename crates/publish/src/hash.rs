//! Content fingerprints.
//!
//! An asset's key is the first 32 hex characters of BLAKE3 over the
//! base64 form of its bytes followed by its extension. Hashing the base64
//! text keeps keys identical to those produced by other direct-upload
//! clients, so their uploads dedupe against ours.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Length of a content hash in hex characters.
pub const HASH_LEN: usize = 32;

/// Extension of the last path component without the leading dot.
///
/// The extension starts at the last `.` of the file name, so `.htaccess`
/// yields `htaccess` and `app.min.js` yields `js`. Empty when there is no
/// dot.
pub fn extension(path: &Path) -> &str {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return "";
    };
    match name.rfind('.') {
        Some(idx) => &name[idx + 1..],
        None => "",
    }
}

/// Hashes already base64-encoded content.
pub fn hash_encoded(encoded: &str, extension: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(encoded.as_bytes());
    hasher.update(extension.as_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..HASH_LEN].to_string()
}

/// Content hash of `content` stored under a name with `extension`.
pub fn content_hash(content: &[u8], extension: &str) -> String {
    hash_encoded(&STANDARD.encode(content), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_last_dot() {
        assert_eq!(extension(Path::new("index.html")), "html");
        assert_eq!(extension(Path::new("assets/app.min.js")), "js");
        assert_eq!(extension(Path::new(".htaccess")), "htaccess");
        assert_eq!(extension(Path::new("LICENSE")), "");
        assert_eq!(extension(Path::new("dir.d/README")), "");
        assert_eq!(extension(Path::new("trailing.")), "");
    }

    #[test]
    fn hash_is_32_hex_chars() {
        let h = content_hash(b"<h1>hi</h1>", "html");
        assert_eq!(h.len(), HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_matches_blake3_of_base64_plus_extension() {
        // base64("hello") == "aGVsbG8="
        let expected = blake3::hash(b"aGVsbG8=txt").to_hex();
        assert_eq!(content_hash(b"hello", "txt"), &expected.as_str()[..HASH_LEN]);
    }

    #[test]
    fn hash_depends_on_content_and_extension() {
        let a = content_hash(b"body{}", "css");
        assert_eq!(a, content_hash(b"body{}", "css"));
        assert_ne!(a, content_hash(b"body{ }", "css"));
        assert_ne!(a, content_hash(b"body{}", "txt"));
        assert_ne!(a, content_hash(b"body{}", ""));
    }

    #[test]
    fn empty_file_hashes() {
        assert_eq!(content_hash(b"", "").len(), HASH_LEN);
        assert_ne!(content_hash(b"", ""), content_hash(b"", "html"));
    }
}
