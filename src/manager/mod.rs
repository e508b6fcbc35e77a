//! Container lifecycle management behind the security policy.
//!
//! [`ContainerManager`] is the only entry point the HTTP layer uses. It owns
//! the validator, the ownership guard and a handle to the runtime adapter, all
//! passed in at construction.

mod lifecycle;

pub use lifecycle::ContainerManager;
