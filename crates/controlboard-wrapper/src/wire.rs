//! Tagged-list messages exchanged on the RPC and streaming ports.
//!
//! A [`Bottle`] is an ordered list of [`Value`]s. Command words are
//! [`Vocab`]s: up to four ASCII characters packed little-endian into a `u32`.
//! The text form (`[get] [pos] 3 (1.0 2.0) "name"`) is used by the CLI and in
//! tests; binary framing belongs to the transport.

use core::fmt;
use core::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vocab(u32);

impl Vocab {
    /// Pack a word of at most four ASCII characters. Longer words are a
    /// programming error; use [`Vocab::parse`] for untrusted input.
    pub const fn new(tag: &str) -> Self {
        let bytes = tag.as_bytes();
        debug_assert!(bytes.len() <= 4, "vocab words have at most four characters");
        let mut raw = 0u32;
        let mut i = 0;
        while i < bytes.len() && i < 4 {
            raw |= (bytes[i] as u32) << (8 * i);
            i += 1;
        }
        Vocab(raw)
    }

    /// Checked form of [`Vocab::new`]: `None` for empty words, words longer
    /// than four characters and non-ASCII text.
    pub fn parse(tag: &str) -> Option<Self> {
        let ok = !tag.is_empty() && tag.len() <= 4 && tag.bytes().all(|b| b.is_ascii_graphic());
        ok.then(|| Self::new(tag))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Vocab(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Vocab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.to_le_bytes() {
            if byte == 0 {
                break;
            }
            write!(f, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Vocab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{self}]")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Vocab(Vocab),
    Text(String),
    List(Bottle),
}

impl Value {
    pub fn as_vocab(&self) -> Option<Vocab> {
        match self {
            Value::Vocab(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Bottle> {
        match self {
            Value::List(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vocab> for Value {
    fn from(v: Vocab) -> Self {
        Value::Vocab(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Bottle> for Value {
    fn from(v: Bottle) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bottle {
    items: Vec<Value>,
}

impl Bottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, v: impl Into<Value>) -> &mut Self {
        self.items.push(v.into());
        self
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        self.items.extend(values);
    }

    pub fn get(&self, i: usize) -> Option<&Value> {
        self.items.get(i)
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn vocab_at(&self, i: usize) -> Option<Vocab> {
        self.get(i).and_then(Value::as_vocab)
    }

    pub fn int_at(&self, i: usize) -> Option<i64> {
        self.get(i).and_then(Value::as_int)
    }

    pub fn f64_at(&self, i: usize) -> Option<f64> {
        self.get(i).and_then(Value::as_f64)
    }

    pub fn list_at(&self, i: usize) -> Option<&Bottle> {
        self.get(i).and_then(Value::as_list)
    }

    pub fn text_at(&self, i: usize) -> Option<&str> {
        self.get(i).and_then(Value::as_text)
    }

    /// All entries as numbers, or `None` if any entry is not numeric.
    pub fn to_f64s(&self) -> Option<Vec<f64>> {
        self.items.iter().map(Value::as_f64).collect()
    }
}

impl FromIterator<Value> for Bottle {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Bottle {
            items: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Vocab(v) => write!(f, "[{v}]"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::List(b) => write!(f, "({b})"),
        }
    }
}

impl fmt::Display for Bottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse message at byte {at}: {reason}")]
pub struct ParseError {
    pub at: usize,
    pub reason: &'static str,
}

impl FromStr for Bottle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TextParser {
            src: s.as_bytes(),
            pos: 0,
        };
        let bottle = parser.list(None)?;
        Ok(bottle)
    }
}

struct TextParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl TextParser<'_> {
    fn err(&self, reason: &'static str) -> ParseError {
        ParseError {
            at: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn list(&mut self, close: Option<u8>) -> Result<Bottle, ParseError> {
        let mut out = Bottle::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None if close.is_none() => return Ok(out),
                None => return Err(self.err("unterminated list")),
                Some(c) if Some(c) == close => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b')') => return Err(self.err("unexpected ')'")),
                Some(b'(') => {
                    self.pos += 1;
                    let inner = self.list(Some(b')'))?;
                    out.push(inner);
                }
                Some(b'[') => {
                    self.pos += 1;
                    let at = self.pos;
                    let word = self.until(b']')?;
                    let vocab = Vocab::parse(word).ok_or(ParseError {
                        at,
                        reason: "command words have one to four ASCII characters",
                    })?;
                    out.push(vocab);
                }
                Some(b'"') => {
                    self.pos += 1;
                    let text = self.until(b'"')?;
                    out.push(text.to_string());
                }
                Some(_) => {
                    let word = self.word();
                    out.push(scalar(word));
                }
            }
        }
    }

    fn until(&mut self, end: u8) -> Result<&str, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == end {
                let s = core::str::from_utf8(&self.src[start..self.pos])
                    .map_err(|_| self.err("invalid utf-8"))?;
                self.pos += 1;
                return Ok(s);
            }
            self.pos += 1;
        }
        Err(self.err("unterminated token"))
    }

    fn word(&mut self) -> &str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_ascii_whitespace() && c != b'(' && c != b')')
        {
            self.pos += 1;
        }
        core::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default()
    }
}

fn scalar(word: &str) -> Value {
    if let Ok(i) = word.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(x) = word.parse::<f64>() {
        Value::Float(x)
    } else {
        Value::Text(word.to_string())
    }
}
