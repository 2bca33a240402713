use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use crate::level::Level;

lazy_static! {
    // explicit severity tag at the start of a line: "[INFO] message"
    static ref SEVERITY_TAG_RE: Regex =
        Regex::new(r"(?i)^\[(TRACE|DEBUG|INFO|WARN|ERROR|FATAL)\]\s+(.*)").unwrap();
}

/// result of classifying a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub level: Level,
    pub body: &'a str,
}

/// strips the `<app>[pid:tid] ` prefix a device forwarder puts in front of
/// every line written by the application
#[derive(Debug, Clone)]
pub struct ChannelPrefix {
    re: Regex,
}

impl ChannelPrefix {
    pub fn new(app_name: &str) -> Result<Self> {
        // not anchored: syslog relays put a timestamp and device name first
        let re = Regex::new(&format!(r"{}\[\w+:\w+\]\s+(.*)", regex::escape(app_name)))?;
        Ok(Self { re })
    }

    /// returns the text after the prefix, or the line unchanged
    pub fn strip<'a>(&self, line: &'a str) -> &'a str {
        self.re
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map_or(line, |m| m.as_str())
    }
}

/// matches a leading `[LEVEL] ` tag, returning the label and the rest of the line
pub fn match_severity_tag(line: &str) -> Option<(Level, &str)> {
    let caps = SEVERITY_TAG_RE.captures(line)?;
    let level = caps.get(1)?.as_str().parse().ok()?;
    let rest = caps.get(2).map_or("", |m| m.as_str());
    Some((level, rest))
}

/// strip the channel prefix, then look for a severity tag; falls back to `default`
pub fn classify<'a>(prefix: &ChannelPrefix, default: Level, line: &'a str) -> Classified<'a> {
    let line = prefix.strip(line);
    match match_severity_tag(line) {
        Some((level, body)) => Classified { level, body },
        None => Classified {
            level: default,
            body: line,
        },
    }
}
