use anyhow::{Result, bail};

use crate::classifier::{ChannelPrefix, classify};
use crate::decode::Utf8Carry;
use crate::dispatch::{Dispatcher, LogFacadeSink, LogSink};
use crate::level::{Channel, Level};

// constants
const DEFAULT_EAGER_UNTERMINATED: bool = false;
const DEFAULT_MAX_PENDING: usize = 64 * 1024;
const CHANNEL_COUNT: usize = 2;

/// tuning knobs for [`LogReassembler`]
#[derive(Debug, Clone)]
pub struct ReassemblerDesc {
    /// dispatch a chunk without any newline right away instead of waiting
    /// for the rest of the line
    pub eager_unterminated: bool,
    /// once an unterminated line grows past this many bytes it is dispatched
    /// as if `eager_unterminated` were set
    pub max_pending: usize,
    /// label for untagged lines on the out channel
    pub out_level: Level,
    /// label for untagged lines on the err channel
    pub err_level: Level,
}

impl Default for ReassemblerDesc {
    fn default() -> Self {
        Self {
            eager_unterminated: DEFAULT_EAGER_UNTERMINATED,
            max_pending: DEFAULT_MAX_PENDING,
            out_level: Channel::Out.default_level(),
            err_level: Channel::Err.default_level(),
        }
    }
}

// unterminated text left over from the previous chunk of a channel
#[derive(Debug)]
struct Pending {
    text: String,
    level: Option<Level>,
}

// lines accumulated for the message currently being built
struct Group<'a> {
    level: Option<Level>,
    lines: Vec<&'a str>,
}

/// Reassembles the out/err byte streams of a forwarded process into labeled,
/// possibly multi-line messages.
///
/// Consecutive lines sharing a label are joined into one message. The label of
/// a message is the label of its first line; an untagged line inherits the
/// label of the message it continues.
pub struct LogReassembler {
    app_name: String,
    prefix: ChannelPrefix,
    desc: ReassemblerDesc,
    dispatcher: Dispatcher,
    pending: [Option<Pending>; CHANNEL_COUNT],
    carry: [Utf8Carry; CHANNEL_COUNT],
}

impl LogReassembler {
    /// messages go to the `log` facade with `app_name` as target
    pub fn new(app_name: &str) -> Result<Self> {
        Self::with_desc(
            app_name,
            LogFacadeSink::new(app_name),
            ReassemblerDesc::default(),
        )
    }

    pub fn with_callback<F>(app_name: &str, callback: F) -> Result<Self>
    where
        F: FnMut(Level, &str) + Send + 'static,
    {
        Self::with_desc(app_name, callback, ReassemblerDesc::default())
    }

    pub fn with_desc<S>(app_name: &str, sink: S, desc: ReassemblerDesc) -> Result<Self>
    where
        S: LogSink + 'static,
    {
        if app_name.trim().is_empty() {
            bail!("missing application name");
        }

        Ok(Self {
            app_name: app_name.to_string(),
            prefix: ChannelPrefix::new(app_name)?,
            desc,
            dispatcher: Dispatcher::new(Box::new(sink)),
            pending: [None, None],
            carry: [Utf8Carry::default(), Utf8Carry::default()],
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn stdout(&mut self, chunk: &[u8]) {
        self.push(Channel::Out, chunk);
    }

    pub fn stderr(&mut self, chunk: &[u8]) {
        self.push(Channel::Err, chunk);
    }

    /// feed a raw chunk for `channel`; it does not need to be line aligned
    pub fn push(&mut self, channel: Channel, chunk: &[u8]) {
        let text = self.carry[channel.index()].decode(chunk);
        self.ingest(channel, &text);
    }

    pub fn push_str(&mut self, channel: Channel, chunk: &str) {
        self.push(channel, chunk.as_bytes());
    }

    /// end of stream for both channels
    pub fn flush(&mut self) {
        self.finish(Channel::Out);
        self.finish(Channel::Err);
    }

    /// end of stream for a single channel: whatever is buffered is dispatched
    pub fn finish(&mut self, channel: Channel) {
        let idx = channel.index();
        if self.pending[idx].is_some() || !self.carry[idx].is_empty() {
            log::debug!("LogReassembler: Flushing buffered {} data", channel);
        }

        let mut text = self.carry[idx].finish();
        text.push('\n');
        self.ingest(channel, &text);
        self.pending[idx] = None;
    }

    /// true while an unterminated line is buffered for `channel`
    pub fn has_pending(&self, channel: Channel) -> bool {
        let idx = channel.index();
        self.pending[idx].is_some() || !self.carry[idx].is_empty()
    }

    fn default_level(&self, channel: Channel) -> Level {
        match channel {
            Channel::Out => self.desc.out_level,
            Channel::Err => self.desc.err_level,
        }
    }

    fn ingest(&mut self, channel: Channel, chunk: &str) {
        if chunk.is_empty() {
            return;
        }

        let idx = channel.index();
        let default = self.default_level(channel);
        // a held fragment never contains a newline, only the new chunk can
        let (text, level, newline) = match self.pending[idx].take() {
            Some(mut pending) => {
                let offset = pending.text.len();
                pending.text.push_str(chunk);
                let newline = chunk.rfind('\n').map(|i| offset + i);
                (pending.text, pending.level, newline)
            }
            None => (chunk.to_string(), None, chunk.rfind('\n')),
        };

        let Some(newline) = newline else {
            if self.dispatch_unterminated(channel, &text) {
                let line = classify(&self.prefix, level.unwrap_or(default), &text);
                self.dispatcher.deliver(line.level, line.body);
            } else {
                log::trace!(
                    "LogReassembler: Holding {} bytes of unterminated {} data",
                    text.len(),
                    channel
                );
                self.pending[idx] = Some(Pending { text, level });
            }
            return;
        };

        let (complete, fragment) = text.split_at(newline + 1);
        let mut group = Group {
            level,
            lines: Vec::new(),
        };
        for line in complete.split_terminator('\n') {
            self.feed_line(&mut group, default, line);
        }

        if fragment.is_empty() {
            self.emit(&mut group);
        } else if self.dispatch_unterminated(channel, fragment) {
            self.feed_line(&mut group, default, fragment);
            self.emit(&mut group);
        } else {
            self.emit(&mut group);
            self.pending[idx] = Some(Pending {
                text: fragment.to_string(),
                level: group.level,
            });
        }
    }

    fn dispatch_unterminated(&self, channel: Channel, fragment: &str) -> bool {
        if self.desc.eager_unterminated {
            return true;
        }
        if fragment.len() > self.desc.max_pending {
            log::debug!(
                "LogReassembler: Unterminated {} line exceeds {} bytes, dispatching",
                channel,
                self.desc.max_pending
            );
            return true;
        }
        false
    }

    fn feed_line<'a>(&mut self, group: &mut Group<'a>, default: Level, line: &'a str) {
        let line = classify(&self.prefix, group.level.unwrap_or(default), line);

        // a label change closes the current message
        if let Some(current) = group.level
            && current != line.level
        {
            self.dispatcher.deliver(current, &group.lines.join("\n"));
            group.lines.clear();
            group.level = None;
        }

        // first line wins
        if group.level.is_none() {
            group.level = Some(line.level);
        }
        if !line.body.is_empty() {
            group.lines.push(line.body);
        }
    }

    fn emit(&mut self, group: &mut Group<'_>) {
        if let Some(level) = group.level
            && !group.lines.is_empty()
        {
            self.dispatcher.deliver(level, &group.lines.join("\n"));
            group.lines.clear();
        }
    }
}
