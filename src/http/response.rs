use crate::http::mapped::MappedFile;
use crate::http::mime;
use crate::http::resolver::Outcome;
use crate::http::writer::{Overflow, WriteBuffer};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Body of the fallback response used when the real one does not fit.
const FALLBACK_BODY: &str = "Internal Server Error\n";

/// HTTP status codes the server produces.
///
/// - `Ok` (200): File or action page served
/// - `BadRequest` (400): Malformed request
/// - `Forbidden` (403): Directory, unreadable file, or path outside the root
/// - `NotFound` (404): Resource not found
/// - `MethodNotAllowed` (405): HTTP method not served
/// - `PayloadTooLarge` (413): Request does not fit the read buffer
/// - `InternalServerError` (500): Server error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tideway::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tideway::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Body of the generated page for an error status.
    pub fn error_page(&self) -> &'static str {
        match self {
            StatusCode::Ok => "",
            StatusCode::BadRequest => {
                "Your request has bad syntax or is inherently impossible to satisfy.\n"
            }
            StatusCode::Forbidden => "You do not have permission to get file from this server.\n",
            StatusCode::NotFound => "The requested file was not found on this server.\n",
            StatusCode::MethodNotAllowed => "The request method is not supported for this resource.\n",
            StatusCode::PayloadTooLarge => "The request is larger than the server will process.\n",
            StatusCode::InternalServerError => {
                "There was an unusual problem serving the request file.\n"
            }
        }
    }

    /// Whether the connection can carry another request after this response.
    pub fn allows_keep_alive(&self) -> bool {
        !matches!(
            self,
            StatusCode::BadRequest | StatusCode::PayloadTooLarge | StatusCode::InternalServerError
        )
    }
}

/// A response head written into a [`WriteBuffer`], with its file segment.
#[derive(Debug)]
pub struct Prepared {
    pub status: StatusCode,
    pub keep_alive: bool,
    /// Mapped file bytes that follow the head, if any.
    pub body: Option<MappedFile>,
}

/// Writes the response for `outcome` into `head`.
///
/// Files are never copied: their mapping comes back in [`Prepared::body`]
/// and goes out as a second send segment. Generated pages are written into
/// `head` directly. With `head_only` (HEAD requests) no body is produced but
/// `Content-Length` still describes it.
///
/// If the response does not fit, `head` is rewritten with a short 500 that
/// closes the connection.
pub fn build_response(
    outcome: Outcome,
    head_only: bool,
    keep_alive: bool,
    head: &mut WriteBuffer,
) -> Prepared {
    head.clear();

    match try_build(outcome, head_only, keep_alive, head) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::warn!(error = %e, "Response does not fit the write buffer");
            write_fallback(head);
            Prepared {
                status: StatusCode::InternalServerError,
                keep_alive: false,
                body: None,
            }
        }
    }
}

fn try_build(
    outcome: Outcome,
    head_only: bool,
    keep_alive: bool,
    head: &mut WriteBuffer,
) -> Result<Prepared, Overflow> {
    let (status, file) = match outcome {
        Outcome::StaticFile(file) => (StatusCode::Ok, Some(file)),
        Outcome::CredentialAction { page, .. } => (StatusCode::Ok, Some(page)),
        Outcome::BadRequest => (StatusCode::BadRequest, None),
        Outcome::NotFound => (StatusCode::NotFound, None),
        Outcome::Forbidden => (StatusCode::Forbidden, None),
        Outcome::MethodNotAllowed => (StatusCode::MethodNotAllowed, None),
        Outcome::PayloadTooLarge => (StatusCode::PayloadTooLarge, None),
        Outcome::InternalError => (StatusCode::InternalServerError, None),
    };
    let keep_alive = keep_alive && status.allows_keep_alive();

    add_status_line(head, status)?;

    match file {
        Some(file) => {
            add_headers(head, mime::content_type_for(file.path()), file.len(), keep_alive)?;
            Ok(Prepared {
                status,
                keep_alive,
                body: (!head_only && !file.is_empty()).then_some(file),
            })
        }
        None => {
            let page = status.error_page();
            add_headers(head, mime::HTML, page.len(), keep_alive)?;
            if !head_only {
                head.append(page.as_bytes())?;
            }
            Ok(Prepared {
                status,
                keep_alive,
                body: None,
            })
        }
    }
}

fn add_status_line(head: &mut WriteBuffer, status: StatusCode) -> Result<(), Overflow> {
    head.append_fmt(format_args!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    ))
}

fn add_headers(
    head: &mut WriteBuffer,
    content_type: &str,
    content_length: usize,
    keep_alive: bool,
) -> Result<(), Overflow> {
    head.append_fmt(format_args!("Content-Type: {}\r\n", content_type))?;
    head.append_fmt(format_args!("Content-Length: {}\r\n", content_length))?;
    let connection: &[u8] = if keep_alive {
        b"Connection: keep-alive\r\n"
    } else {
        b"Connection: close\r\n"
    };
    head.append(connection)?;
    head.append(b"\r\n")
}

/// Fits in [`MIN_WRITE_BUFFER_SIZE`](crate::http::writer::MIN_WRITE_BUFFER_SIZE) bytes.
fn write_fallback(head: &mut WriteBuffer) {
    head.clear();
    let written = try_write_fallback(head);
    debug_assert!(written.is_ok(), "fallback response must fit");
}

fn try_write_fallback(head: &mut WriteBuffer) -> Result<(), Overflow> {
    add_status_line(head, StatusCode::InternalServerError)?;
    add_headers(head, mime::HTML, FALLBACK_BODY.len(), false)?;
    head.append(FALLBACK_BODY.as_bytes())
}
