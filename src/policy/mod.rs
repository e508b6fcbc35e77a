//! Policy store: the immutable security configuration.
//!
//! A [`PolicyConfig`] holds the image allow-list, the protected host paths,
//! the capability allow-list and the identity used for ownership labels. It is
//! loaded once at process start and read concurrently afterwards.
//!
//! The two allow-lists have opposite polarity: an empty image list admits every
//! image, while an empty capability list admits no capability at all.

mod config;

pub use config::{
    DEFAULT_BLOCKED_VOLUME_PATHS, DEFAULT_LABEL_PREFIX, PolicyConfig, generate_instance_id,
};
