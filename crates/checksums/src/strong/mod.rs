//! Strong digest used for collision rejection after a weak-checksum match.
//!
//! MD5 is used here purely as a fast, well-tested non-cryptographic
//! collision check between a candidate block and a table entry — not as a
//! security primitive, per spec.

use digest::Digest;

/// Length in bytes of the strong digest.
pub const DIGEST_LEN: usize = 16;

/// Computes the MD5 digest of `data` in one shot.
#[must_use]
pub fn strong(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = md5::Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        use std::fmt::Write as _;
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            write!(&mut out, "{byte:02x}").expect("write! to String cannot fail");
        }
        out
    }

    #[test]
    fn md5_matches_rfc_vectors() {
        assert_eq!(to_hex(&strong(b"")), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(to_hex(&strong(b"abc")), "900150983cd24fb0d6963f7d28e17f72");
    }
}
