//! Opaque id generation
//!
//! All grants, requests, audit entries, and media records use the same
//! 32-char lowercase hex form.

use uuid::Uuid;

/// Generate a new opaque unique id
pub fn make_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Lowercase hex rendering of a digest
pub fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_id_shape() {
        let id = make_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_make_id_unique() {
        assert_ne!(make_id(), make_id());
    }

    #[test]
    fn test_hex_digest() {
        assert_eq!(hex_digest(&[0x00, 0xab, 0xff]), "00abff");
    }
}
