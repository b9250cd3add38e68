//! URL handling module for Outlet-Mesh
//!
//! This module provides URL normalization and first-level domain extraction.
//! Both are shared by the link extractor, the workers and outlet seeding.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{first_level_domain, public_suffix};
pub use normalize::normalize_url;

/// Returns true when two first-level domains describe an internal link
///
/// An empty FLD never matches anything, including another empty FLD, so a
/// link whose domain could not be determined is always treated as external.
pub fn is_internal(fld_origin: &str, fld_target: &str) -> bool {
    !fld_origin.is_empty() && fld_origin == fld_target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_fld_is_internal() {
        assert!(is_internal("example.com", "example.com"));
    }

    #[test]
    fn test_different_fld_is_external() {
        assert!(!is_internal("example.com", "other.org"));
    }

    #[test]
    fn test_empty_fld_never_internal() {
        assert!(!is_internal("", ""));
        assert!(!is_internal("", "example.com"));
    }
}
