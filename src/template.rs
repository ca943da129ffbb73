//! Device URI templates.
//!
//! A template looks like `file:///var/spool/out/@user@/@jobid@-@title@.ps`: a
//! scheme, a colon and a run of `/`, then a body where `@key@` tokens are
//! replaced with job metadata. The scheme is stripped and the run of `/` is
//! collapsed to one.
//!
//! There is no escape for `@`. Every occurrence in the template opens a key,
//! and an `@` in a substituted value is copied as-is.

use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const DELIMITER: char = '@';
pub const SEPARATOR: char = '/';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Invalid DeviceURI \"{uri}\": missing scheme terminator")]
    MissingScheme { uri: String },
    #[error("Invalid DeviceURI \"{uri}\": unterminated key at byte {offset}")]
    UnterminatedKey { uri: String, offset: usize },
    #[error("Invalid DeviceURI \"{uri}\": key at byte {offset} exceeds {limit} bytes")]
    KeyTooLong { uri: String, offset: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    User,
    Title,
    JobId,
    Unknown(String),
}

impl Key {
    fn from_text(text: &str) -> Self {
        match text {
            "user" => Key::User,
            "title" => Key::Title,
            "jobid" => Key::JobId,
            other => Key::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Key::User => "user",
            Key::Title => "title",
            Key::JobId => "jobid",
            Key::Unknown(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Key(Key),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTemplate {
    scheme: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy)]
pub struct JobBindings<'a> {
    pub user: &'a str,
    pub title: &'a str,
    pub job_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    UnknownKey(String),
    Truncated { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub path: OutputPath,
    pub warnings: Vec<TemplateWarning>,
}

/// A finished destination path, never longer than the limit it was built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath(String);

impl OutputPath {
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn as_path(&self) -> &Path { Path::new(&self.0) }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saturated;

/// Growable buffer with one hard byte limit, checked on every push.
#[derive(Debug)]
pub struct PathAccumulator {
    buf: String,
    limit: usize,
    saturated: bool,
}

impl PathAccumulator {
    pub fn new(limit: usize) -> Self {
        Self { buf: String::new(), limit, saturated: false }
    }

    /// Appends as much of `text` as fits. Once something is cut off, every
    /// later push is refused.
    pub fn push(&mut self, text: &str) -> Result<(), Saturated> {
        if self.saturated {
            return Err(Saturated);
        }
        let room = self.limit - self.buf.len();
        if text.len() <= room {
            self.buf.push_str(text);
            return Ok(());
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.push_str(&text[..cut]);
        self.saturated = true;
        Err(Saturated)
    }

    pub fn is_saturated(&self) -> bool { self.saturated }

    pub fn finish(self) -> OutputPath { OutputPath(self.buf) }
}

impl DeviceTemplate {
    /// Validates the scheme and tokenizes the whole body. `max_len` bounds key length.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, TemplateError> {
        let missing = || TemplateError::MissingScheme { uri: raw.to_string() };
        let colon = raw.find(':').ok_or_else(missing)?;
        let after = &raw[colon + 1..];
        if !after.starts_with(SEPARATOR) {
            return Err(missing());
        }
        let stripped = after.trim_start_matches(SEPARATOR);
        // keep exactly one separator in front of the body
        let body = &after[after.len() - stripped.len() - SEPARATOR.len_utf8()..];
        let body_offset = raw.len() - body.len();

        let mut tokens = Vec::new();
        let mut rest = body;
        while let Some(open) = rest.find(DELIMITER) {
            let offset = body_offset + (body.len() - rest.len()) + open;
            if open > 0 {
                tokens.push(Token::Literal(rest[..open].to_string()));
            }
            let tail = &rest[open + DELIMITER.len_utf8()..];
            let close = tail
                .find(DELIMITER)
                .ok_or_else(|| TemplateError::UnterminatedKey { uri: raw.to_string(), offset })?;
            let key = &tail[..close];
            if key.len() >= max_len {
                return Err(TemplateError::KeyTooLong { uri: raw.to_string(), offset, limit: max_len });
            }
            tokens.push(Token::Key(Key::from_text(key)));
            rest = &tail[close + DELIMITER.len_utf8()..];
        }
        if !rest.is_empty() {
            tokens.push(Token::Literal(rest.to_string()));
        }

        Ok(Self { scheme: raw[..colon].to_string(), tokens })
    }

    pub fn scheme(&self) -> &str { &self.scheme }

    pub fn expand(&self, bindings: &JobBindings<'_>, max_len: usize) -> Expansion {
        let mut acc = PathAccumulator::new(max_len);
        let mut warnings = Vec::new();

        for token in &self.tokens {
            let text = match token {
                Token::Literal(text) => text.as_str(),
                Token::Key(key) => {
                    debug!("Found key \"{}\" in DeviceURI", key.as_str());
                    match key {
                        Key::User => bindings.user,
                        Key::Title => bindings.title,
                        Key::JobId => bindings.job_id,
                        Key::Unknown(name) => {
                            warn!("Invalid substitution key in Device URI: \"{}\"", name);
                            warnings.push(TemplateWarning::UnknownKey(name.clone()));
                            name.as_str()
                        }
                    }
                }
            };
            if acc.push(text).is_err() {
                break;
            }
        }

        if acc.is_saturated() {
            warn!(limit = max_len, "Output path truncated");
            warnings.push(TemplateWarning::Truncated { limit: max_len });
        }
        Expansion { path: acc.finish(), warnings }
    }
}
