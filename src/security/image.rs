//! Image allow-list check.

use std::collections::BTreeSet;

use crate::error::Rejection;

/// Returns true if `image` is covered by `allowed`.
///
/// An entry covers the exact reference and any tag of it (`entry:<tag>`).
/// An empty allow-list covers every image.
#[must_use]
pub fn is_image_allowed(image: &str, allowed: &BTreeSet<String>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    allowed.iter().any(|entry| {
        image == entry
            || image
                .strip_prefix(entry.as_str())
                .is_some_and(|rest| rest.starts_with(':'))
    })
}

/// Checks `image` against the allow-list.
///
/// # Errors
///
/// Returns `Rejection::ImageNotAllowed` when no entry covers the image.
pub fn check_image(image: &str, allowed: &BTreeSet<String>) -> Result<(), Rejection> {
    if is_image_allowed(image, allowed) {
        Ok(())
    } else {
        Err(Rejection::ImageNotAllowed {
            image: image.to_string(),
        })
    }
}
