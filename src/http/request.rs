//! Request-line tokenizer.
//!
//! Only the first three whitespace-delimited tokens of a request are read:
//! method, path and protocol. Headers and body are left untouched in the raw
//! buffer handed to route handlers.

/// Why a request line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than three tokens before the data ran out.
    MissingToken,
}

/// The three leading tokens of an HTTP request, as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a [u8],
    pub path: &'a [u8],
    pub protocol: &'a [u8],
}

impl<'a> RequestLine<'a> {
    /// Extracts method, path and protocol from the start of `buf`.
    ///
    /// Tokens are separated by any run of space, tab, CR, LF, vertical tab or
    /// form feed, so they may span lines. Data stops at the first NUL byte.
    /// Token bytes are taken verbatim with no encoding or length checks; the
    /// path keeps its query string.
    ///
    /// # Returns
    /// The three tokens, or [`ParseError::MissingToken`] if fewer than three
    /// are present.
    ///
    /// # Example
    /// ```ignore
    /// let line = RequestLine::parse(b"GET /a?b=1 HTTP/1.1\r\n")?;
    /// assert_eq!(line.path, b"/a?b=1");
    /// ```
    pub fn parse(buf: &'a [u8]) -> Result<Self, ParseError> {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let mut tokens = buf[..end]
            .split(|&b| is_space(b))
            .filter(|token| !token.is_empty());

        let mut next = || tokens.next().ok_or(ParseError::MissingToken);
        let method = next()?;
        let path = next()?;
        let protocol = next()?;

        Ok(Self {
            method,
            path,
            protocol,
        })
    }
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}
