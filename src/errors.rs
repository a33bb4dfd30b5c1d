//! Crate-wide error definitions.
//!
//! Recoverable conditions (bad input records, lifecycle violations) never
//! surface here; they are logged and skipped where they happen. The variants
//! below are the configuration and unrecoverable failures that callers are
//! expected to handle.

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Unknown feature kind: {}.", _0)]
    KindUnknown(String),
    #[fail(display = "Unknown material type: {}.", _0)]
    MaterialUnknown(String),
    #[fail(display = "Unknown performance preset: {}.", _0)]
    PresetUnknown(String),
    #[fail(display = "Layer {} does not exist.", _0)]
    LayerUnknown(String),
    #[fail(display = "Layer {} already exists.", _0)]
    LayerDuplicated(String),
    #[fail(display = "{} has been destroyed.", _0)]
    Destroyed(&'static str),
    #[fail(display = "Malformed {} document: {}.", _0, _1)]
    DocumentInvalid(&'static str, String),
    #[fail(display = "Failed to parse timestamp: {}.", _0)]
    TimeInvalid(String),
    #[fail(display = "The viewer binding has been lost: {}.", _0)]
    HostLost(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;
