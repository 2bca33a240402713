//! # ioslog-core
//!
//! Reassembles the stdout/stderr output of a device log forwarder (for example
//! `idevicesyslog`) into labeled messages.
//!
//! Raw chunks arrive on two channels, [`Channel::Out`] and [`Channel::Err`],
//! and do not need to be line aligned. Each line has its `<app>[pid:tid] `
//! prefix stripped and is checked for a leading `[LEVEL]` tag. Consecutive
//! lines with the same label become one multi-line message, which is handed to
//! a [`LogSink`] exactly once.
//!
//! ```rust
//! use ioslog_core::{Channel, Level, LogReassembler};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let mut logger = LogReassembler::with_callback("MyApp", move |level: Level, msg: &str| {
//!     sink.lock().unwrap().push((level, msg.to_string()));
//! })?;
//!
//! logger.push(Channel::Out, b"MyApp[12:34] [INFO] loading\nMyApp[12:34] done\n");
//! logger.flush();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![(Level::Info, "loading\ndone".to_string())]);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod attach;
mod classifier;
mod decode;
mod dispatch;
mod level;
mod reassembler;

pub use attach::{READ_CHUNK_SIZE, attach, attach_child};
pub use classifier::{ChannelPrefix, Classified, classify, match_severity_tag};
pub use dispatch::{LogFacadeSink, LogSink};
pub use level::{Channel, Level};
pub use reassembler::{LogReassembler, ReassemblerDesc};
