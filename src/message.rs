//! Message and frame vocabulary types.
//!
//! `Message` and `CloseCode`/`CloseFrame` are the payload types the
//! negotiation pipeline folds sessions over. `Frame` and [`RsvBits`] are the
//! minimal per-frame vocabulary the RSV policy checks against — header bits
//! and an opcode only, with no wire (de)serialization logic; framing itself
//! is out of this crate's scope and is the caller's concern.

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    #[default]
    Normal,
    GoingAway,
    ProtocolError,
    UnsupportedData,
    InvalidPayload,
    PolicyViolation,
    MessageTooBig,
    MandatoryExtension,
    InternalError,
    Other(u16),
}

impl CloseCode {
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: CloseCode,
    pub reason: String,
}

impl CloseFrame {
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message (arbitrary bytes).
    Binary(Vec<u8>),
    /// A ping frame (control frame, payload <= 125 bytes).
    Ping(Vec<u8>),
    /// A pong frame (control frame, payload <= 125 bytes).
    Pong(Vec<u8>),
    /// A close frame (control frame, may include status code and reason).
    Close(Option<CloseFrame>),
}

impl Message {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Message::Ping(data.into())
    }

    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Message::Pong(data.into())
    }

    #[must_use]
    pub fn close(code: CloseCode, reason: impl Into<String>) -> Self {
        Message::Close(Some(CloseFrame::new(code, reason)))
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Message::Text(_) | Message::Binary(_))
    }

    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(
            self,
            Message::Ping(_) | Message::Pong(_) | Message::Close(_)
        )
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Message::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_binary(self) -> Option<Vec<u8>> {
        match self {
            Message::Binary(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Message::Binary(data) => Some(data),
            _ => None,
        }
    }
}

/// Which of the three reserved frame bits (RSV1/2/3) a declaration covers.
///
/// Used both by [`crate::extension::Extension`] to declare which bits an
/// extension *may* claim and by [`crate::session::Session::valid_frame_rsv`]
/// to declare which bits a particular active session *permits* on a given
/// frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RsvBits {
    /// RSV1.
    pub rsv1: bool,
    /// RSV2.
    pub rsv2: bool,
    /// RSV3.
    pub rsv3: bool,
}

impl RsvBits {
    /// No bits.
    pub const NONE: Self = Self {
        rsv1: false,
        rsv2: false,
        rsv3: false,
    };

    /// RSV1 only (the bit `permessage-deflate` claims).
    pub const RSV1: Self = Self {
        rsv1: true,
        rsv2: false,
        rsv3: false,
    };

    /// Bitwise union: true per slot if either side sets it.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            rsv1: self.rsv1 || other.rsv1,
            rsv2: self.rsv2 || other.rsv2,
            rsv3: self.rsv3 || other.rsv3,
        }
    }

    /// True if `frame_bits` sets no bit this declaration doesn't allow.
    #[must_use]
    pub const fn permits(self, frame_bits: Self) -> bool {
        (self.rsv1 || !frame_bits.rsv1)
            && (self.rsv2 || !frame_bits.rsv2)
            && (self.rsv3 || !frame_bits.rsv3)
    }
}

/// A minimal frame header, carrying only what the RSV policy needs: which
/// reserved bits are set and what opcode the frame carries. Does not model
/// masking, fragmentation, or payload length encoding — those belong to the
/// transport layer driving this crate, not to the extension manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// RSV1/2/3 as actually set on this frame.
    pub rsv: RsvBits,
    /// The frame's opcode (text/binary/ping/pong/close/continuation).
    pub opcode: FrameOpCode,
    /// The frame's payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Construct a frame with no reserved bits set.
    #[must_use]
    pub fn new(opcode: FrameOpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            rsv: RsvBits::NONE,
            opcode,
            payload: payload.into(),
        }
    }

    /// Set the RSV bits on this frame (builder style).
    #[must_use]
    pub const fn with_rsv(mut self, rsv: RsvBits) -> Self {
        self.rsv = rsv;
        self
    }
}

/// Frame opcode, mirroring the RFC 6455 base frame opcodes relevant to RSV
/// policy checks (full opcode validation is a framing concern, out of
/// scope here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FrameOpCode {
    /// Continuation frame.
    Continuation,
    /// Text frame.
    Text,
    /// Binary frame.
    Binary,
    /// Close frame.
    Close,
    /// Ping frame.
    Ping,
    /// Pong frame.
    Pong,
}

impl FrameOpCode {
    /// Control frames (Close/Ping/Pong) typically don't carry extension
    /// RSV bits; data frames (Text/Binary/Continuation) do.
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(
            self,
            FrameOpCode::Close | FrameOpCode::Ping | FrameOpCode::Pong
        )
    }
}
