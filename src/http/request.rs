use bytes::Bytes;

/// HTTP request methods.
///
/// Every method of the HTTP/1.1 base set is recognized by the parser. Only
/// GET, HEAD and POST are served; the rest resolve to 405 Method Not Allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Submit a form to a credential action
    POST,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// TRACE - Loop-back test
    TRACE,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// CONNECT - Establish a tunnel
    CONNECT,
}

/// Represents a parsed HTTP request from a client.
///
/// Only the headers the server acts on are kept; everything else is dropped
/// by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path in origin form (e.g., "/index.html?x=1")
    pub path: String,
    /// HTTP version (always "HTTP/1.1" once parsed)
    pub version: String,
    /// Value of the Host header, if sent
    pub host: Option<String>,
    /// Declared Content-Length, 0 when absent
    pub content_length: usize,
    /// Whether the client sent `Connection: keep-alive`
    pub keep_alive: bool,
    /// Request body; only read for POST
    pub body: Bytes,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use tideway::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "HEAD" => Some(Method::HEAD),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "TRACE" => Some(Method::TRACE),
            "OPTIONS" => Some(Method::OPTIONS),
            "CONNECT" => Some(Method::CONNECT),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::HEAD => "HEAD",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::TRACE => "TRACE",
            Method::OPTIONS => "OPTIONS",
            Method::CONNECT => "CONNECT",
        }
    }
}

impl Request {
    /// The path with any query string removed.
    pub fn path_only(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    /// The query string without the leading `?`, if present.
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }
}
