//! # Message Boundary Scanner
//!
//! Finds where a message ends in a buffer that grows by appending, without
//! decoding it. The scanner remembers how far it got, so every byte is
//! examined once no matter how many chunks the message arrives in. Once a
//! boundary is found, the caller decodes the message exactly once.
//!
//! ## Invariants
//! - **Append Only**: Between calls the buffer may only grow at the end.
//! - **Same Verdicts**: Structural errors (tags, negative lengths, limits,
//!   fault flag) are the ones the decoder would report for the same bytes.
//!   String contents are not checked; UTF-8 errors surface on decode.

use sodepack::Limits;
use sodepack::Tag;

use crate::error::Error;
use crate::error::Result;
use crate::frame::FAULT_ABSENT;
use crate::frame::FAULT_PRESENT;

/// Grammar items still to be matched, innermost last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    /// Opaque bytes: the id, numeric content, or string data.
    Skip(usize),
    /// A length prefix followed by that many bytes.
    Str,
    /// The fault presence byte.
    FaultFlag,
    /// A whole value tree at the given depth.
    Value(usize),
    /// The name count of a value at the given depth.
    NameCount(usize),
    /// Child groups left to match: `(name, count, values)` each.
    Groups { depth: usize, remaining: usize },
    /// The value count of a group whose values sit at `depth`.
    GroupCount(usize),
    /// Sibling values left to match within one group.
    Values { depth: usize, remaining: usize },
}

/// Incremental boundary finder for one message at a time.
#[derive(Debug, Clone)]
pub struct MessageScanner {
    limits: Limits,
    stack: Vec<Item>,
    pos: usize,
    nodes: usize,
}

impl MessageScanner {
    pub fn new(limits: Limits) -> Self {
        let mut scanner = Self { limits, stack: Vec::new(), pos: 0, nodes: 0 };
        scanner.reset();
        scanner
    }

    /// Forgets all progress and expects a message at offset zero.
    pub fn reset(&mut self) {
        self.stack.clear();
        // popped front to back: id, path, operation, fault, payload
        self.stack.extend([Item::Value(0), Item::FaultFlag, Item::Str, Item::Str, Item::Skip(8)]);
        self.pos = 0;
        self.nodes = 0;
    }

    /// Bytes already accounted for in the current message.
    pub fn scanned(&self) -> usize {
        self.pos
    }

    /// Continues scanning `buf`, which must extend the buffer of the last call.
    ///
    /// Returns `Ok(Some(len))` once `buf[..len]` holds one whole message, and
    /// resets so the next message is expected at offset zero of whatever
    /// buffer the caller passes next. Returns `Ok(None)` if more bytes are
    /// needed.
    pub fn advance(&mut self, buf: &[u8]) -> Result<Option<usize>> {
        while let Some(item) = self.stack.pop() {
            if !self.step(item, buf)? {
                return Ok(None);
            }
        }

        let len = self.pos;
        self.reset();
        Ok(Some(len))
    }

    /// Matches one item. On `false` the item is back on the stack and the
    /// buffer is exhausted.
    fn step(&mut self, item: Item, buf: &[u8]) -> Result<bool> {
        let available = buf.len().saturating_sub(self.pos);

        match item {
            Item::Skip(n) => {
                let taken = n.min(available);
                self.pos += taken;
                if taken < n {
                    self.stack.push(Item::Skip(n - taken));
                    return Ok(false);
                }
            }
            Item::Str => {
                let Some(len) = self.length(buf, item)? else { return Ok(false) };
                if len > self.limits.max_string_len {
                    return Err(sodepack::Error::LengthLimitExceeded {
                        len,
                        limit: self.limits.max_string_len,
                    }
                    .into());
                }
                self.stack.push(Item::Skip(len));
            }
            Item::FaultFlag => {
                let Some(&flag) = buf.get(self.pos) else {
                    self.stack.push(item);
                    return Ok(false);
                };
                self.pos += 1;
                match flag {
                    FAULT_ABSENT => {}
                    FAULT_PRESENT => self.stack.extend([Item::Value(0), Item::Str]),
                    b => return Err(Error::InvalidFaultFlag(b)),
                }
            }
            Item::Value(depth) => {
                let Some(&b) = buf.get(self.pos) else {
                    self.stack.push(item);
                    return Ok(false);
                };
                if depth > self.limits.max_depth {
                    return Err(sodepack::Error::RecursionLimitExceeded { limit: self.limits.max_depth }.into());
                }
                if depth == 0 {
                    self.nodes = 0;
                }
                self.nodes += 1;
                if self.nodes > self.limits.max_nodes {
                    return Err(sodepack::Error::NodeLimitExceeded { limit: self.limits.max_nodes }.into());
                }

                let tag = Tag::from_u8(b).ok_or(sodepack::Error::InvalidTag(b))?;
                self.pos += 1;
                self.stack.push(Item::NameCount(depth));
                match tag {
                    Tag::Absent => {}
                    Tag::Text => self.stack.push(Item::Str),
                    Tag::Int32 => self.stack.push(Item::Skip(4)),
                    Tag::Float64 => self.stack.push(Item::Skip(8)),
                }
            }
            Item::NameCount(depth) => {
                let Some(remaining) = self.length(buf, item)? else { return Ok(false) };
                self.stack.push(Item::Groups { depth, remaining });
            }
            Item::Groups { depth, remaining } => {
                if remaining > 0 {
                    self.stack.push(Item::Groups { depth, remaining: remaining - 1 });
                    self.stack.extend([Item::GroupCount(depth + 1), Item::Str]);
                }
            }
            Item::GroupCount(depth) => {
                let Some(remaining) = self.length(buf, item)? else { return Ok(false) };
                self.stack.push(Item::Values { depth, remaining });
            }
            Item::Values { depth, remaining } => {
                if remaining > 0 {
                    self.stack.push(Item::Values { depth, remaining: remaining - 1 });
                    self.stack.push(Item::Value(depth));
                }
            }
        }
        Ok(true)
    }

    /// Reads a non-negative `i32` prefix, or puts `item` back if it is incomplete.
    fn length(&mut self, buf: &[u8], item: Item) -> Result<Option<usize>> {
        let Some(bytes) = buf.get(self.pos..self.pos + 4) else {
            self.stack.push(item);
            return Ok(None);
        };
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        let n = i32::from_be_bytes(raw);
        let len = usize::try_from(n).map_err(|_| sodepack::Error::InvalidLength(n))?;
        self.pos += 4;
        Ok(Some(len))
    }
}

impl Default for MessageScanner {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}
