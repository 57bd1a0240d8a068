// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Line assembler for the command protocol.
//!
//! Bytes are pushed one at a time as they arrive. Once a `\n` terminator is seen the buffered
//! line is parsed into a [`Command`]. Nothing blocks: [`Parser::drain`] pulls from a
//! [`ByteSource`] until it reports `WouldBlock`.

use heapless::Vec;

use crate::protocol::messages::{Command, ParseError};

/// Longest accepted line, excluding the terminator.
pub const LINE_CAPACITY: usize = 64;

/// Line terminator.
pub const TERMINATOR: u8 = b'\n';

/// Non-blocking byte input, e.g. a UART receiver.
pub trait ByteSource {
    type Error;

    /// Next received byte, or `nb::Error::WouldBlock` if none is pending.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;
}

pub struct Parser {
    line: Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            overflowed: false,
        }
    }

    /// Process a single incoming byte. Returns `Some` once a complete line has been received.
    ///
    /// A line that outgrows the buffer is dropped up to its terminator and reported once as
    /// [`ParseError::Overflow`].
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, ParseError>> {
        if byte == TERMINATOR {
            let result = if self.overflowed {
                Err(ParseError::Overflow)
            } else {
                core::str::from_utf8(&self.line)
                    .map_err(|_| ParseError::InvalidUtf8)
                    .and_then(Command::parse)
            };
            self.line.clear();
            self.overflowed = false;
            return Some(result);
        }

        if !self.overflowed && self.line.push(byte).is_err() {
            self.overflowed = true;
        }
        None
    }

    /// Pull every pending byte from `source`, handing each completed line to `on_line`.
    ///
    /// Stops at the first `WouldBlock`. Receive errors end the drain for this call and are
    /// otherwise ignored.
    pub fn drain<S, F>(&mut self, source: &mut S, mut on_line: F)
    where
        S: ByteSource,
        F: FnMut(Result<Command, ParseError>),
    {
        loop {
            match source.read_byte() {
                Ok(byte) => {
                    if let Some(result) = self.push(byte) {
                        on_line(result);
                    }
                }
                Err(nb::Error::WouldBlock) | Err(nb::Error::Other(_)) => return,
            }
        }
    }
}
