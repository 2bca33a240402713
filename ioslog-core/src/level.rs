use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;

/// severity label attached to every reassembled message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// `log` has no fatal level, so fatal messages go out as errors
    pub fn to_log_level(self) -> log::Level {
        match self {
            Level::Trace => log::Level::Trace,
            Level::Debug => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error | Level::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown severity label: {}", s))
    }
}

/// one of the two byte streams coming out of the forwarded process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Out,
    Err,
}

impl Channel {
    pub(crate) fn index(self) -> usize {
        match self {
            Channel::Out => 0,
            Channel::Err => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Out => "out",
            Channel::Err => "err",
        }
    }

    /// label used for lines that carry no explicit tag
    pub fn default_level(self) -> Level {
        match self {
            Channel::Out => Level::Debug,
            Channel::Err => Level::Error,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
