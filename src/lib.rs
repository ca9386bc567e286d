//! # wsext — protocol-agnostic extension negotiation and message pipeline
//!
//! `wsext` implements the extension negotiation model described in RFC 6455
//! §9 and the permessage-deflate-style offer/response grammar of RFC 7692,
//! generalized to any framed bidirectional messaging protocol rather than
//! tied to a single transport. It does not parse HTTP, perform a handshake,
//! or frame bytes on a socket — callers hand it header strings to parse and
//! messages to transform, and get back header strings and transformed
//! messages.
//!
//! ## What this crate does
//!
//! - Parses and serializes the `name; param=value, ...` extension-offer
//!   grammar ([`header`]).
//! - Tracks which extensions are registered and mediates RSV-bit ownership
//!   between them ([`registry`], [`extension`]).
//! - Drives the client-offer / server-response / client-activate negotiation
//!   sequence and the resulting per-message pipeline ([`manager`]).
//!
//! ## What it doesn't do
//!
//! Framing, masking, handshakes, and concrete extensions (a real
//! permessage-deflate implementation, for instance) are callers'
//! responsibility. `demos/` in this crate's repository shows one such
//! integration behind the `compression` feature.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use wsext::{Manager, Extension, RsvBits};
//!
//! let mut manager = Manager::new();
//! manager.add(my_deflate_extension())?;
//!
//! // client side
//! let offer_header = manager.generate_offer();
//!
//! // server side, in a fresh Manager with the same registered extensions
//! let response_header = server_manager.generate_response(offer_header.as_deref())?;
//! ```

pub mod error;
pub mod extension;
pub mod header;
pub mod manager;
pub mod message;
pub mod params;
pub mod registry;
pub mod session;

pub use error::{ExtensionError, ManagerError, ParseError, RegistrationError};
pub use extension::{Extension, ExtensionKind};
pub use header::{parse_header, serialize_params, Offer, ParsedOffers};
pub use manager::Manager;
pub use message::{CloseCode, CloseFrame, Frame, FrameOpCode, Message, RsvBits};
pub use params::{ParamValue, Params};
pub use session::{Session, SessionError};
