use crate::http::buffer::{LineStatus, ReadBuffer};
use crate::http::request::{Method, Request};
use bytes::Bytes;

/// Protocol version accepted on the request line.
const HTTP_VERSION: &str = "HTTP/1.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Not enough bytes yet; keep reading.
    Incomplete,
    /// A line terminator other than CRLF.
    MalformedLine,
    /// The request line does not have exactly three tokens.
    InvalidRequest,
    InvalidMethod,
    InvalidUrl,
    UnsupportedVersion,
    InvalidHeader,
    InvalidContentLength,
    /// The request cannot fit in the read buffer.
    TooLarge,
    /// `advance` called again after a request was produced.
    Finished,
}

impl ParseError {
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::Incomplete)
    }
}

/// Main state of the request parser. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    RequestLine,
    Headers,
    Content,
    Done,
}

#[derive(PartialEq, Eq)]
enum HeaderLine {
    Field,
    End,
}

/// Incremental HTTP/1.1 request parser.
///
/// Progress survives across calls: each call to [`advance`](Self::advance)
/// picks up from the state and scan position left by the previous one, so a
/// request may arrive split at any byte boundary.
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    method: Option<Method>,
    path: String,
    version: String,
    host: Option<String>,
    content_length: usize,
    keep_alive: bool,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::RequestLine,
            method: None,
            path: String::new(),
            version: String::new(),
            host: None,
            content_length: 0,
            keep_alive: false,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Drives the state machine over whatever `buf` holds.
    ///
    /// Returns the request once it is complete, `Err(ParseError::Incomplete)`
    /// when more input is needed, or the syntax error that ended parsing.
    pub fn advance(&mut self, buf: &mut ReadBuffer) -> Result<Request, ParseError> {
        loop {
            match self.state {
                ParseState::Done => return Err(ParseError::Finished),
                ParseState::Content => return self.parse_content(buf),
                ParseState::RequestLine | ParseState::Headers => {}
            }

            let span = match buf.next_line() {
                LineStatus::Complete(span) => span,
                LineStatus::Incomplete if buf.is_full() => return Err(ParseError::TooLarge),
                LineStatus::Incomplete => return Err(ParseError::Incomplete),
                LineStatus::Malformed => return Err(ParseError::MalformedLine),
            };
            let line = buf.line(span);

            if self.state == ParseState::RequestLine {
                self.parse_request_line(line)?;
                self.state = ParseState::Headers;
            } else if self.parse_header(line)? == HeaderLine::End {
                return self.finish_headers(buf);
            }
        }
    }

    fn parse_request_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequest)?;
        let mut parts = text.split_ascii_whitespace();

        let (method_str, target, version) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(m), Some(t), Some(v), None) => (m, t, v),
                _ => return Err(ParseError::InvalidRequest),
            };

        let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

        if !version.eq_ignore_ascii_case(HTTP_VERSION) {
            return Err(ParseError::UnsupportedVersion);
        }

        self.path = normalize_target(target)?;
        self.method = Some(method);
        self.version = HTTP_VERSION.to_string();
        Ok(())
    }

    fn parse_header(&mut self, line: &[u8]) -> Result<HeaderLine, ParseError> {
        if line.is_empty() {
            return Ok(HeaderLine::End);
        }

        let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidHeader)?;

        let Some((name, value)) = text.split_once(':') else {
            tracing::debug!(line = text, "Ignoring header line without a colon");
            return Ok(HeaderLine::Field);
        };
        let name = name.trim_end();
        let value = value.trim_start_matches([' ', '\t']);

        if name.eq_ignore_ascii_case("Connection") {
            self.keep_alive = value.trim_end().eq_ignore_ascii_case("keep-alive");
        } else if name.eq_ignore_ascii_case("Content-Length") {
            self.content_length = parse_content_length(value.trim_end())?;
        } else if name.eq_ignore_ascii_case("Host") {
            self.host = Some(value.trim_end().to_string());
        } else {
            tracing::trace!(header = name, "Ignoring unrecognized header");
        }

        Ok(HeaderLine::Field)
    }

    fn finish_headers(&mut self, buf: &mut ReadBuffer) -> Result<Request, ParseError> {
        if self.method == Some(Method::POST) && self.content_length > 0 {
            if self.content_length > buf.capacity() - buf.line_start() {
                return Err(ParseError::TooLarge);
            }
            self.state = ParseState::Content;
            return self.parse_content(buf);
        }

        self.complete(Bytes::new())
    }

    fn parse_content(&mut self, buf: &mut ReadBuffer) -> Result<Request, ParseError> {
        let pending = buf.unparsed();
        if pending.len() < self.content_length {
            return Err(ParseError::Incomplete);
        }

        let body = Bytes::copy_from_slice(&pending[..self.content_length]);
        buf.consume(self.content_length);
        self.complete(body)
    }

    fn complete(&mut self, body: Bytes) -> Result<Request, ParseError> {
        let method = self.method.ok_or(ParseError::InvalidRequest)?;
        self.state = ParseState::Done;

        Ok(Request {
            method,
            path: std::mem::take(&mut self.path),
            version: std::mem::take(&mut self.version),
            host: self.host.take(),
            content_length: self.content_length,
            keep_alive: self.keep_alive,
            body,
        })
    }
}

/// Digits only. `str::parse` would also take a leading `+`.
fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength);
    }
    value
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidContentLength)
}

/// Reduces a request target to origin form.
///
/// Absolute-form targets lose their scheme and authority; a bare authority
/// becomes `/`. Anything else must already start with `/`.
fn normalize_target(target: &str) -> Result<String, ParseError> {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let url = url::Url::parse(target).map_err(|_| ParseError::InvalidUrl)?;
        let mut path = url.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        return Ok(path);
    }

    if target.starts_with('/') {
        Ok(target.to_string())
    } else {
        Err(ParseError::InvalidUrl)
    }
}
