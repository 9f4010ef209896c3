use crate::{Error, Result};
use std::collections::HashMap;

/// HTTP request method as encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get = 0x1,
    Post = 0x2,
    Head = 0x3,
    Put = 0x4,
    Delete = 0x5,
}

impl RequestMethod {
    /// Method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Head => "HEAD",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl TryFrom<u32> for RequestMethod {
    type Error = u32;

    fn try_from(value: u32) -> std::result::Result<Self, u32> {
        match value {
            0x1 => Ok(RequestMethod::Get),
            0x2 => Ok(RequestMethod::Post),
            0x3 => Ok(RequestMethod::Head),
            0x4 => Ok(RequestMethod::Put),
            0x5 => Ok(RequestMethod::Delete),
            other => Err(other),
        }
    }
}

/// Ordered header list with case-insensitive names.
///
/// Setting an existing name replaces its value in place, so each name
/// appears once and keeps the position of its first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    /// Value stored under `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header has been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut list = HeaderList::new();
        for (name, value) in iter {
            list.set(name, value);
        }
        list
    }
}

/// A completed HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u32,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// `Content-Length` as announced by the server; 0 when absent or malformed.
    pub fn content_length(&self) -> u32 {
        self.headers
            .get("Content-Length")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Per-request state held by the HTTP service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// URL bytes as supplied by the guest, up to the first NUL.
    pub url: Vec<u8>,
    pub method: RequestMethod,
    pub request_headers: HeaderList,
    pub initialized: bool,
    pub proxy_default: bool,
    pub keep_alive: bool,
    pub ssl_options: u32,
    /// Nanoseconds; the most recent value recorded by a `*Timeout` command.
    pub timeout: u64,
    pub response: HttpResponse,
    current_offset: u32,
}

impl Context {
    /// Fresh context with every flag cleared and no response.
    pub fn new(url: Vec<u8>, method: RequestMethod) -> Self {
        Self {
            url,
            method,
            ..Self::default()
        }
    }

    /// URL as text, with invalid UTF-8 replaced.
    pub fn url_lossy(&self) -> String {
        String::from_utf8_lossy(&self.url).into_owned()
    }

    /// Bytes of the response body already handed to the guest.
    pub fn current_offset(&self) -> u32 {
        self.current_offset
    }

    /// Length of the received body in bytes.
    pub fn body_len(&self) -> u32 {
        self.response.body.len() as u32
    }

    /// Whether body bytes remain to be received.
    pub fn download_pending(&self) -> bool {
        self.current_offset < self.body_len()
    }

    /// Store a fresh response and rewind the cursor.
    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = response;
        self.current_offset = 0;
    }

    /// Next chunk of at most `max_len` body bytes, without advancing.
    pub fn peek_chunk(&self, max_len: u32) -> &[u8] {
        let start = self.current_offset;
        let len = max_len.min(self.body_len() - start);
        &self.response.body[start as usize..(start + len) as usize]
    }

    /// Advance the cursor by `len` bytes, clamped to the body length.
    pub fn advance(&mut self, len: u32) {
        self.current_offset = self
            .current_offset
            .saturating_add(len)
            .min(self.body_len());
    }
}

/// Handle-addressed store of live contexts.
///
/// Handles are allocated from a counter that never goes backwards, so a
/// closed handle is never handed out again.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: HashMap<u32, Context>,
    counter: u32,
}

impl ContextStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `context` under the next handle.
    pub fn create(&mut self, context: Context) -> u32 {
        self.counter += 1;
        self.contexts.insert(self.counter, context);
        self.counter
    }

    /// Context stored under `handle`.
    pub fn get(&self, handle: u32) -> Result<&Context> {
        self.contexts
            .get(&handle)
            .ok_or(Error::ContextNotFound(handle))
    }

    /// Mutable context stored under `handle`.
    pub fn get_mut(&mut self, handle: u32) -> Result<&mut Context> {
        self.contexts
            .get_mut(&handle)
            .ok_or(Error::ContextNotFound(handle))
    }

    /// Remove and return the context stored under `handle`.
    pub fn erase(&mut self, handle: u32) -> Result<Context> {
        self.contexts
            .remove(&handle)
            .ok_or(Error::ContextNotFound(handle))
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no context is live.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
