//! The header grammar: translates between a `Sec-WebSocket-Extensions`-style
//! header string and an ordered, duplicate-preserving list of
//! `(name, Params)` offers.
//!
//! Grammar (informal): `header := offer (","  offer)*`, `offer := name
//! (";" fragment)*`, `fragment := key ["=" value]`, `value := token |
//! quoted-string`. Whitespace around `,` and `;` is insignificant.
//! `quoted-string := "\"" (qdtext | "\\" any-byte)* "\""`.

use crate::error::ParseError;
use crate::params::{Params, ParamValue, is_token, is_token_byte};

/// A single parsed offer: an extension name with its parameters, in the
/// order it appeared in the header.
pub type Offer = (String, Params);

/// An ordered, duplicate-preserving decoded header.
///
/// Duplicate extension *names* across the header are kept as separate
/// entries (unlike duplicate *keys* within one offer, which collapse into
/// a `Multi` value — see [`Params`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOffers {
    offers: Vec<Offer>,
}

impl ParsedOffers {
    /// An empty offer list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The offers, in header order.
    pub fn iter(&self) -> impl Iterator<Item = &Offer> {
        self.offers.iter()
    }

    /// Number of offer entries (including repeated names).
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// True if the header carried no offers at all.
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// All `Params` for entries named `name`, in header order. Empty if the
    /// name never appeared.
    pub fn by_name(&self, name: &str) -> Vec<&Params> {
        self.offers
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| p)
            .collect()
    }
}

impl IntoIterator for ParsedOffers {
    type Item = Offer;
    type IntoIter = std::vec::IntoIter<Offer>;

    fn into_iter(self) -> Self::IntoIter {
        self.offers.into_iter()
    }
}

/// Parse a header value into an ordered, duplicate-preserving offer list.
///
/// `None` and the empty string both yield an empty [`ParsedOffers`].
pub fn parse_header(header: Option<&str>) -> Result<ParsedOffers, ParseError> {
    let header = match header {
        None => return Ok(ParsedOffers::new()),
        Some(h) if h.trim().is_empty() => return Ok(ParsedOffers::new()),
        Some(h) => h,
    };

    let fragments = split_top_level(header, b',')?;
    let mut offers = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyOffer(header.to_string()));
        }
        offers.push(parse_offer(trimmed)?);
    }
    Ok(ParsedOffers { offers })
}

fn parse_offer(offer: &str) -> Result<Offer, ParseError> {
    let parts = split_top_level(offer, b';')?;
    let mut parts = parts.into_iter();

    let name = parts.next().expect("split always yields at least one part");
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::InvalidToken(offer.to_string()));
    }
    if !is_token(name) {
        return Err(ParseError::InvalidToken(name.to_string()));
    }

    let mut params = Params::new();
    for fragment in parts {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ParseError::InvalidToken(offer.to_string()));
        }
        let (key, value) = parse_fragment(fragment)?;
        params.insert(key, value);
    }

    Ok((name.to_string(), params))
}

fn parse_fragment(fragment: &str) -> Result<(String, ParamValue), ParseError> {
    match fragment.split_once('=') {
        None => {
            if !is_token(fragment) {
                return Err(ParseError::InvalidToken(fragment.to_string()));
            }
            Ok((fragment.to_string(), ParamValue::Flag))
        }
        Some((key, value)) => {
            let key = key.trim();
            if !is_token(key) {
                return Err(ParseError::InvalidToken(key.to_string()));
            }
            let value = parse_value(value, fragment)?;
            Ok((key.to_string(), value))
        }
    }
}

fn parse_value(value: &str, fragment: &str) -> Result<ParamValue, ParseError> {
    let value = value.trim();
    if let Some(unquoted) = value.strip_prefix('"') {
        let text = unescape_quoted(unquoted, fragment)?;
        return Ok(ParamValue::Text(text));
    }

    if !is_token(value) {
        return Err(ParseError::InvalidToken(fragment.to_string()));
    }
    if value.bytes().all(|b| b.is_ascii_digit()) {
        match value.parse::<i64>() {
            Ok(n) => Ok(ParamValue::Int(n)),
            Err(_) => Ok(ParamValue::Text(value.to_string())),
        }
    } else {
        Ok(ParamValue::Text(value.to_string()))
    }
}

/// Decode a quoted-string body (the bytes *after* the opening `"`) up to
/// and including its closing `"`, unescaping `\x` to the literal byte `x`.
fn unescape_quoted(body: &str, fragment: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    loop {
        match chars.next() {
            None => return Err(ParseError::UnterminatedQuotedString(fragment.to_string())),
            Some('"') => return Ok(out),
            Some('\\') => match chars.next() {
                None => return Err(ParseError::UnterminatedQuotedString(fragment.to_string())),
                Some(escaped) => out.push(escaped),
            },
            Some(c) => out.push(c),
        }
    }
}

/// Split `s` on bytes equal to `delim`, but only at "top level" — not while
/// inside a quoted string, where the delimiter (and any other byte) is
/// literal. Returns an error if a trailing delimiter leaves an empty final
/// fragment (checked by the caller for `,`) and if a quoted string is left
/// unterminated.
fn split_top_level(s: &str, delim: u8) -> Result<Vec<String>, ParseError> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    let mut in_quotes = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'\\' {
                i += 1;
                if i >= bytes.len() {
                    return Err(ParseError::UnterminatedQuotedString(s.to_string()));
                }
            } else if b == b'"' {
                in_quotes = false;
            }
        } else if b == b'"' {
            in_quotes = true;
        } else if b == delim {
            parts.push(s[start..i].to_string());
            start = i + 1;
        } else if !is_token_byte(b) && !b.is_ascii_whitespace() && b != b'=' && b != b';' && b != b',' {
            return Err(ParseError::UnexpectedByte {
                position: i,
                source_fragment: s.to_string(),
            });
        }
        i += 1;
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuotedString(s.to_string()));
    }

    parts.push(s[start..].to_string());

    if delim == b','
        && parts.len() > 1
        && parts.last().is_some_and(|last| last.trim().is_empty())
    {
        return Err(ParseError::TrailingComma(s.to_string()));
    }

    Ok(parts)
}

/// Serialize a single `(name, params)` offer back into its header fragment,
/// e.g. `"deflate; mode=compress"` or just `"deflate"` when `params` is
/// empty. Does not include the `", "` joiner between offers — that is the
/// caller's job (see [`crate::manager::Manager`]).
pub fn serialize_params(name: &str, params: &Params) -> String {
    if params.is_empty() {
        return name.to_string();
    }
    format!("{name}; {params}")
}
