//! Error types for header parsing, negotiation, and registration.
//!
//! Three separate enums, matching the three error classes in the design:
//! grammar failures, negotiation/pipeline failures, and registration
//! misuse. None of them wrap I/O errors — this crate performs no I/O.

use thiserror::Error;

use crate::session::SessionError;

/// Failures raised while parsing a `Sec-WebSocket-Extensions`-shaped header.
///
/// Never wrapped by anything downstream; surfaces to the caller so they can
/// reject the handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The header ended with a comma (or had an empty trailing offer).
    #[error("trailing comma in header: {0:?}")]
    TrailingComma(String),

    /// An offer fragment (between commas) was empty.
    #[error("empty offer in header: {0:?}")]
    EmptyOffer(String),

    /// A name, key, or unquoted value did not match the token grammar.
    #[error("malformed token {0:?}")]
    InvalidToken(String),

    /// A quoted string was never closed.
    #[error("unterminated quoted string: {0:?}")]
    UnterminatedQuotedString(String),

    /// A byte outside the token/quoted-string grammar appeared where
    /// neither is permitted.
    #[error("unexpected byte at position {position} in {source_fragment:?}")]
    UnexpectedByte {
        /// Byte offset within `source_fragment`.
        position: usize,
        /// The offer fragment in which the byte occurred.
        source_fragment: String,
    },
}

/// A negotiation, reservation, or pipeline failure.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExtensionError {
    /// `activate` saw a name that was never offered (not present in `index`).
    #[error("unknown extension {name:?}")]
    UnknownExtension {
        /// The offending extension name.
        name: String,
    },

    /// The extension would claim an RSV slot already owned by a different
    /// extension.
    #[error("extension {extension:?} conflicts with {owner:?} over rsv{slot}")]
    RsvConflict {
        /// Which slot, 1/2/3.
        slot: u8,
        /// The extension that already owns the slot.
        owner: String,
        /// The extension that tried to claim it.
        extension: String,
    },

    /// `Session::activate` returned something other than the exact boolean
    /// `true`.
    #[error("unacceptable parameters for extension {name:?}")]
    Rejected {
        /// The extension whose parameters were rejected.
        name: String,
    },

    /// A session's `process_incoming_message`/`process_outgoing_message`
    /// raised. Wrapped once, by message, and never re-wrapped.
    #[error("extension pipeline error: {message}")]
    Pipeline {
        /// The original failure's message.
        message: String,
        /// The original failure, if the caller wants to inspect it further.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ExtensionError {
    /// Wrap a session's pipeline failure, chaining the original as the
    /// `source()`. Used directly on the `SessionError` a `Session`'s
    /// `process_*` methods return.
    pub fn from_session_error(err: SessionError) -> Self {
        ExtensionError::Pipeline {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Wrap a session pipeline failure known only by message (no concrete
    /// error type available to chain).
    pub fn pipeline_message(message: impl Into<String>) -> Self {
        ExtensionError::Pipeline {
            message: message.into(),
            source: None,
        }
    }
}

/// Unifies [`ParseError`] and [`ExtensionError`] for the two
/// [`crate::manager::Manager`] methods (`activate`, `generate_response`)
/// that both parse a header and then run negotiation over it — the two
/// error kinds still propagate unchanged, this enum only exists so both
/// methods can share one `Result` type.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// The header itself was malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Negotiation or pipeline failed after the header parsed successfully.
    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

/// Registration-time misuse: malformed or duplicate extension descriptors.
///
/// This is a programming-error class, not a runtime negotiation failure —
/// registration happens once, at startup, before any connection exists.
/// Callers are expected to `.expect()` these in production rather than
/// branch on them at every call site; the `Result` return exists so tests
/// and dynamic plugin loaders can still recover.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    /// The extension's name was empty.
    #[error("extension name must not be empty")]
    EmptyName,

    /// The extension's `kind` was not `ExtensionKind::PerMessage`.
    #[error("unsupported extension kind for {name:?}")]
    WrongKind {
        /// The extension's name.
        name: String,
    },

    /// An extension with this name was already registered.
    #[error("extension {name:?} is already registered")]
    DuplicateName {
        /// The duplicate name.
        name: String,
    },
}
