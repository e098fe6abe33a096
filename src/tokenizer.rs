//! Codepoint-aligned tokenization of input text.
//!
//! Streaming engines accept text a piece at a time. Feeding them half of a
//! multi-byte character corrupts the stream, so the tokenizer hands out one
//! complete codepoint per token, classified by the UTF-8 lead byte.

use crate::error::StreamError;

/// One source codepoint (1 to 4 bytes) and its byte offset in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Width in bytes of the codepoint introduced by `lead`, or `None` if `lead`
/// cannot start a codepoint.
pub fn codepoint_width(lead: u8) -> Option<usize> {
    if lead & 0x80 == 0x00 {
        Some(1)
    } else if lead & 0xE0 == 0xC0 {
        Some(2)
    } else if lead & 0xF0 == 0xE0 {
        Some(3)
    } else if lead & 0xF8 == 0xF0 {
        Some(4)
    } else {
        None
    }
}

/// Lazy iterator of [`Token`]s over a byte string.
///
/// Yields `Err(StreamError::InvalidEncoding)` once on the first malformed
/// codepoint and then stops; nothing after the bad byte is emitted.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    input: &'a [u8],
    cursor: usize,
    failed: bool,
}

impl<'a> Tokens<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            cursor: 0,
            failed: false,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.cursor
    }

    fn fail(&mut self, byte: u8, offset: usize) -> Option<Result<Token<'a>, StreamError>> {
        self.failed = true;
        Some(Err(StreamError::InvalidEncoding { byte, offset }))
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.input.len() {
            return None;
        }

        let offset = self.cursor;
        let lead = self.input[offset];
        let width = match codepoint_width(lead) {
            Some(width) => width,
            None => return self.fail(lead, offset),
        };

        let end = offset + width;
        if end > self.input.len() {
            return self.fail(lead, offset);
        }

        let bytes = &self.input[offset..end];
        if let Some(pos) = bytes[1..].iter().position(|b| b & 0xC0 != 0x80) {
            return self.fail(bytes[pos + 1], offset + pos + 1);
        }

        // Overlong forms and surrogates pass the bit-pattern checks above.
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return self.fail(lead, offset),
        };

        self.cursor = end;
        Some(Ok(Token { text, offset }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            let remaining = self.remaining();
            (remaining.div_ceil(4), Some(remaining))
        }
    }
}

impl std::iter::FusedIterator for Tokens<'_> {}

/// Tokenize `text` into codepoint-aligned tokens.
pub fn tokenize<T: AsRef<[u8]> + ?Sized>(text: &T) -> Tokens<'_> {
    Tokens::new(text.as_ref())
}
