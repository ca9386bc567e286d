//! The [`Session`] trait: a caller-supplied, per-connection, per-extension
//! object produced by [`crate::extension::Extension`]'s factory methods.

use crate::message::{Frame, Message, RsvBits};
use crate::params::Params;

/// A per-connection instance of a negotiated (or not-yet-negotiated)
/// extension.
///
/// Implementations are supplied by the caller; this crate only drives them
/// through the sequence described on each method. `Session` is
/// `dyn`-compatible so the negotiation engine can hold a homogeneous
/// `Vec<Box<dyn Session>>` regardless of how many distinct extensions are
/// registered.
pub trait Session {
    /// Client role: produce this round's offer parameters, if any.
    ///
    /// Returning `None` means "offer this extension with no parameters and
    /// do not emit a header fragment for it at all" — the session still
    /// stays registered in the negotiation engine's `index` and can be
    /// activated later. Returning `Some(vec![])` (an empty `Vec`) would
    /// instead emit a single bare-name fragment; implementations that want
    /// exactly one offer with no parameters should return
    /// `Some(vec![Params::new()])`.
    fn generate_offer(&mut self) -> Option<Vec<Params>> {
        None
    }

    /// Server role: produce the parameters to echo back for this
    /// extension's response fragment, given it was already configured via
    /// whatever mechanism the extension's `create_server_session` factory
    /// used.
    fn generate_response(&mut self) -> Params {
        Params::new()
    }

    /// Client role: attempt to activate this session against the server's
    /// response parameters for it. Must return the exact boolean `true` to
    /// count as acceptance — any other outcome (a panic aside) is treated
    /// as rejection by the negotiation engine.
    fn activate(&mut self, params: &Params) -> bool;

    /// Transform a message after it arrives from the peer, in the reverse
    /// of [`Session::process_outgoing_message`]'s pipeline order.
    fn process_incoming_message(&mut self, message: Message) -> Result<Message, SessionError>;

    /// Transform a message before it is sent to the peer.
    fn process_outgoing_message(&mut self, message: Message) -> Result<Message, SessionError>;

    /// Which of the frame's RSV bits this session permits to be set.
    /// Default: none (the session permits nothing beyond what a frame
    /// already has clear).
    fn valid_frame_rsv(&self, _frame: &Frame) -> RsvBits {
        RsvBits::NONE
    }

    /// Idempotent teardown. Any failure is swallowed by the caller
    /// ([`crate::manager::Manager::close`]) — best-effort.
    fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// The error type a [`Session`]'s `process_*` methods may raise. Opaque to
/// the negotiation engine, which only ever re-wraps it (by message) into
/// [`crate::error::ExtensionError::Pipeline`].
pub type SessionError = Box<dyn std::error::Error + Send + Sync>;
