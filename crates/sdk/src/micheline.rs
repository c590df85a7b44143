//! Micheline values: the structural half of operation parameters.
//!
//! Only the data fragment of Micheline is modeled (no instructions, no
//! annotations): ints, strings, bytes, the data-constructor prims
//! (`Pair`, `Left`, ..., `Elt`) and sequences. That is everything the
//! proxy contract's entrypoints and views consume.
//!
//! Two encodings are produced from one value:
//!
//! - [`Micheline::encode`] -- the canonical binary form embedded in
//!   forged transactions (tag byte per node kind, zarith ints,
//!   length-prefixed strings/bytes/sequences)
//! - [`Micheline::to_json`] -- the JSON form the node RPC expects for
//!   `run_operation` and `run_view`

use serde_json::{json, Value};

use crate::utils::hex_encode;

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// Data-constructor primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    False,
    Elt,
    Left,
    None,
    Pair,
    Right,
    Some,
    True,
    Unit,
}

impl Prim {
    /// Protocol opcode for the primitive.
    const fn opcode(&self) -> u8 {
        match self {
            Self::False => 0x03,
            Self::Elt => 0x04,
            Self::Left => 0x05,
            Self::None => 0x06,
            Self::Pair => 0x07,
            Self::Right => 0x08,
            Self::Some => 0x09,
            Self::True => 0x0A,
            Self::Unit => 0x0B,
        }
    }

    /// Name used in the JSON encoding.
    const fn name(&self) -> &'static str {
        match self {
            Self::False => "False",
            Self::Elt => "Elt",
            Self::Left => "Left",
            Self::None => "None",
            Self::Pair => "Pair",
            Self::Right => "Right",
            Self::Some => "Some",
            Self::True => "True",
            Self::Unit => "Unit",
        }
    }
}

/// A Micheline data value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Micheline {
    /// Arbitrary-precision integer (nat/int/mutez/timestamp).
    Int(i128),
    /// UTF-8 string.
    String(String),
    /// Raw byte sequence.
    Bytes(Vec<u8>),
    /// Primitive application.
    App { prim: Prim, args: Vec<Micheline> },
    /// Sequence (lists, sets, maps).
    Seq(Vec<Micheline>),
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

impl Micheline {
    /// A natural number.
    pub fn nat(v: u128) -> Self {
        Self::Int(v as i128)
    }

    /// A string literal.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// A byte literal.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    /// `Pair a b`.
    pub fn pair(a: Micheline, b: Micheline) -> Self {
        Self::App {
            prim: Prim::Pair,
            args: vec![a, b],
        }
    }

    /// `Some x`.
    pub fn some(x: Micheline) -> Self {
        Self::App {
            prim: Prim::Some,
            args: vec![x],
        }
    }

    /// `None`.
    pub fn none() -> Self {
        Self::App {
            prim: Prim::None,
            args: vec![],
        }
    }

    /// `Unit`.
    pub fn unit() -> Self {
        Self::App {
            prim: Prim::Unit,
            args: vec![],
        }
    }

    /// Wrap an optional value.
    pub fn option(x: Option<Micheline>) -> Self {
        match x {
            Option::Some(v) => Self::some(v),
            Option::None => Self::none(),
        }
    }

    // -- encodings -----------------------------------------------------------

    /// Canonical binary encoding, appended to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(v) => {
                out.push(0x00);
                zarith_signed(*v, out);
            }
            Self::String(s) => {
                out.push(0x01);
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Self::Bytes(b) => {
                out.push(0x0A);
                out.extend_from_slice(&(b.len() as u32).to_be_bytes());
                out.extend_from_slice(b);
            }
            Self::Seq(items) => {
                out.push(0x02);
                let mut body = Vec::new();
                for item in items {
                    item.encode(&mut body);
                }
                out.extend_from_slice(&(body.len() as u32).to_be_bytes());
                out.extend_from_slice(&body);
            }
            Self::App { prim, args } => match args.len() {
                0 => {
                    out.push(0x03);
                    out.push(prim.opcode());
                }
                1 => {
                    out.push(0x05);
                    out.push(prim.opcode());
                    args[0].encode(out);
                }
                2 => {
                    out.push(0x07);
                    out.push(prim.opcode());
                    args[0].encode(out);
                    args[1].encode(out);
                }
                _ => {
                    // General form: length-prefixed args, empty annotations.
                    out.push(0x09);
                    out.push(prim.opcode());
                    let mut body = Vec::new();
                    for arg in args {
                        arg.encode(&mut body);
                    }
                    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
                    out.extend_from_slice(&body);
                    out.extend_from_slice(&0u32.to_be_bytes());
                }
            },
        }
    }

    /// Binary encoding as an owned buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    /// JSON encoding for the node RPC.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => json!({ "int": v.to_string() }),
            Self::String(s) => json!({ "string": s }),
            Self::Bytes(b) => json!({ "bytes": hex_encode(b) }),
            Self::Seq(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::App { prim, args } => {
                if args.is_empty() {
                    json!({ "prim": prim.name() })
                } else {
                    json!({
                        "prim": prim.name(),
                        "args": args.iter().map(Self::to_json).collect::<Vec<_>>(),
                    })
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Zarith
// ---------------------------------------------------------------------------

/// Unsigned zarith: little-endian 7-bit groups, high bit = continuation.
pub(crate) fn zarith_unsigned(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Signed zarith: the first byte carries the sign at bit 6 and six
/// payload bits; subsequent bytes carry seven bits each.
pub(crate) fn zarith_signed(v: i128, out: &mut Vec<u8>) {
    let negative = v < 0;
    let mut magnitude = v.unsigned_abs();

    let mut first = (magnitude & 0x3F) as u8;
    if negative {
        first |= 0x40;
    }
    magnitude >>= 6;

    if magnitude == 0 {
        out.push(first);
        return;
    }
    out.push(first | 0x80);

    loop {
        let byte = (magnitude & 0x7F) as u8;
        magnitude >>= 7;
        if magnitude == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
