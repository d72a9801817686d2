//! Content-addressed book identity.
//!
//! ```text
//! id = "book_" || hex(SHA-256(content))[..8] || "_" || hex(SHA-256(filename))[..8]
//! ```
//!
//! The two digests are computed independently, so the same bytes uploaded
//! under two names yield two ids that share their first half. The truncated
//! digest is only 32 bits per half: good enough to dedup a personal library,
//! not meant to resist deliberate collisions.

use sha2::{Digest, Sha256};

/// Prefix carried by every generated id.
pub const ID_PREFIX: &str = "book_";

const HALF_LEN: usize = 8;

/// Derive the stable identifier of a book from its bytes and filename.
///
/// Pure and infallible: any byte sequence and any string are valid inputs.
///
/// ```
/// use catalog::generate_id;
///
/// let a = generate_id(b"abc", "abc");
/// assert_eq!(a, "book_ba7816bf_ba7816bf");
/// assert_eq!(a, generate_id(b"abc", "abc"));
/// ```
pub fn generate_id(content: &[u8], filename: &str) -> String {
    let mut id = String::with_capacity(ID_PREFIX.len() + 2 * HALF_LEN + 1);
    id.push_str(ID_PREFIX);
    id.push_str(&digest_prefix(content));
    id.push('_');
    id.push_str(&digest_prefix(filename.as_bytes()));
    id
}

/// First eight lowercase hex characters of the SHA-256 digest of `bytes`.
pub fn digest_prefix(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    // Four digest bytes encode to exactly eight hex characters.
    hex::encode(&digest[..HALF_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(generate_id(b"", ""), "book_e3b0c442_e3b0c442");
        assert_eq!(generate_id(b"abc", "abc"), "book_ba7816bf_ba7816bf");
    }

    #[test]
    fn halves_are_independent() {
        let same_bytes_a = generate_id(b"payload", "a.epub");
        let same_bytes_b = generate_id(b"payload", "b.epub");
        assert_ne!(same_bytes_a, same_bytes_b);
        assert_eq!(same_bytes_a[..13], same_bytes_b[..13]);

        let same_name_a = generate_id(b"one", "x.epub");
        let same_name_b = generate_id(b"two", "x.epub");
        assert_ne!(same_name_a, same_name_b);
        assert_eq!(same_name_a[14..], same_name_b[14..]);
    }

    #[test]
    fn id_shape() {
        let id = generate_id(&[0xff, 0x00, 0x7f], "Ünïcödé 書.epub");
        assert_eq!(id.len(), 22);
        assert!(id.starts_with(ID_PREFIX));
        assert!(id[5..]
            .chars()
            .all(|c| c == '_' || (c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }
}
