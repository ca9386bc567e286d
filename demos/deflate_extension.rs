//! A permessage-deflate-like extension (RFC 7692) built on top of
//! `wsext::Extension`/`wsext::Session`, shown as a standalone consumer of
//! the crate rather than bundled into it: concrete extensions are outside
//! this crate's own scope, but this is the shape of the thing it's meant to
//! negotiate. Run with `--features compression`.

use std::io::Read;

use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;

use wsext::{Extension, Frame, Message, ParamValue, Params, RsvBits, Session};

const MIN_WINDOW_BITS: u8 = 8;
const MAX_WINDOW_BITS: u8 = 15;
const DEFAULT_WINDOW_BITS: u8 = 15;
const DEFLATE_TRAILER: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

#[derive(Debug, Clone, Copy)]
struct DeflateConfig {
    server_no_context_takeover: bool,
    client_no_context_takeover: bool,
    server_max_window_bits: u8,
    client_max_window_bits: u8,
    compression_level: u32,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            server_no_context_takeover: false,
            client_no_context_takeover: false,
            server_max_window_bits: DEFAULT_WINDOW_BITS,
            client_max_window_bits: DEFAULT_WINDOW_BITS,
            compression_level: 6,
        }
    }
}

fn compress(level: u32, data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut encoder = DeflateEncoder::new(data, Compression::new(level));
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).expect("in-memory deflate never fails");
    if out.ends_with(&DEFLATE_TRAILER) {
        out.truncate(out.len() - DEFLATE_TRAILER.len());
    }
    out
}

fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut with_trailer = data.to_vec();
    with_trailer.extend_from_slice(&DEFLATE_TRAILER);
    let mut decoder = DeflateDecoder::new(with_trailer.as_slice());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn parse_window_bits(value: &ParamValue) -> Option<u8> {
    match value {
        ParamValue::Flag => Some(DEFAULT_WINDOW_BITS),
        ParamValue::Int(n) => u8::try_from(*n).ok(),
        ParamValue::Text(s) => s.parse().ok(),
        ParamValue::Multi(_) => None,
    }
    .filter(|bits| (MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(bits))
}

/// A single connection's negotiated deflate state, implementing
/// `wsext::Session`.
struct DeflateSession {
    config: DeflateConfig,
}

impl DeflateSession {
    fn should_compress(message: &Message) -> bool {
        matches!(message, Message::Text(_) | Message::Binary(_))
    }
}

impl Session for DeflateSession {
    fn generate_offer(&mut self) -> Option<Vec<Params>> {
        let mut params = Params::new();
        if self.config.server_no_context_takeover {
            params.insert("server_no_context_takeover", ParamValue::Flag);
        }
        if self.config.client_no_context_takeover {
            params.insert("client_no_context_takeover", ParamValue::Flag);
        }
        Some(vec![params])
    }

    fn generate_response(&mut self) -> Params {
        let mut params = Params::new();
        if self.config.server_no_context_takeover {
            params.insert("server_no_context_takeover", ParamValue::Flag);
        }
        if self.config.client_no_context_takeover {
            params.insert("client_no_context_takeover", ParamValue::Flag);
        }
        if self.config.server_max_window_bits != DEFAULT_WINDOW_BITS {
            params.insert(
                "server_max_window_bits",
                ParamValue::Int(self.config.server_max_window_bits as i64),
            );
        }
        params
    }

    fn activate(&mut self, params: &Params) -> bool {
        for (key, value) in params.iter() {
            match key {
                "server_no_context_takeover" => self.config.server_no_context_takeover = true,
                "client_no_context_takeover" => self.config.client_no_context_takeover = true,
                "server_max_window_bits" => match parse_window_bits(value) {
                    Some(bits) => self.config.server_max_window_bits = bits,
                    None => return false,
                },
                "client_max_window_bits" => match parse_window_bits(value) {
                    Some(bits) => self.config.client_max_window_bits = bits,
                    None => return false,
                },
                _ => return false,
            }
        }
        true
    }

    fn process_outgoing_message(&mut self, message: Message) -> Result<Message, wsext::SessionError> {
        if !Self::should_compress(&message) {
            return Ok(message);
        }
        let compressed = match &message {
            Message::Text(s) => compress(self.config.compression_level, s.as_bytes()),
            Message::Binary(data) => compress(self.config.compression_level, data),
            _ => unreachable!("filtered by should_compress"),
        };
        Ok(Message::Binary(compressed))
    }

    fn process_incoming_message(&mut self, message: Message) -> Result<Message, wsext::SessionError> {
        match message {
            Message::Binary(data) => {
                let decompressed = decompress(&data)?;
                Ok(Message::Binary(decompressed))
            }
            other => Ok(other),
        }
    }

    fn valid_frame_rsv(&self, frame: &Frame) -> RsvBits {
        if frame.opcode.is_control() {
            RsvBits::NONE
        } else {
            RsvBits::RSV1
        }
    }
}

/// Build the extension descriptor, ready to register with a
/// `wsext::Manager` on either role.
fn permessage_deflate(config: DeflateConfig) -> Extension {
    Extension::new(
        "permessage-deflate",
        RsvBits::RSV1,
        move || Some(Box::new(DeflateSession { config }) as Box<dyn Session>),
        move |offers| {
            let mut session = DeflateSession { config };
            for params in offers {
                if !session.activate(params) {
                    return None;
                }
            }
            Some(Box::new(session) as Box<dyn Session>)
        },
    )
}

fn main() -> Result<(), wsext::ManagerError> {
    let mut client = wsext::Manager::new();
    client.add(permessage_deflate(DeflateConfig::default())).expect("fresh registry");

    let mut server = wsext::Manager::new();
    server.add(permessage_deflate(DeflateConfig::default())).expect("fresh registry");

    let offer = client.generate_offer();
    println!("client offer: {:?}", offer);

    let response = server.generate_response(offer.as_deref())?;
    println!("server response: {:?}", response);

    client.activate(response.as_deref())?;

    let outgoing = client.process_outgoing_message(Message::text("hello, extensions"))?;
    let roundtripped = server.process_incoming_message(outgoing)?;
    println!("roundtripped: {:?}", roundtripped.as_text());

    Ok(())
}
