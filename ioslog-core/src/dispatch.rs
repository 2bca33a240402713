use crate::level::Level;

/// receives every completed message exactly once
pub trait LogSink: Send {
    fn deliver(&mut self, level: Level, message: &str);
}

impl<F> LogSink for F
where
    F: FnMut(Level, &str) + Send,
{
    fn deliver(&mut self, level: Level, message: &str) {
        self(level, message)
    }
}

/// default sink: forwards messages to the `log` facade, using the
/// application name as the log target
pub struct LogFacadeSink {
    target: String,
}

impl LogFacadeSink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl LogSink for LogFacadeSink {
    fn deliver(&mut self, level: Level, message: &str) {
        log::log!(target: self.target.as_str(), level.to_log_level(), "{}", message);
    }
}

pub(crate) struct Dispatcher {
    sink: Box<dyn LogSink>,
}

impl Dispatcher {
    pub(crate) fn new(sink: Box<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn deliver(&mut self, level: Level, message: &str) {
        if message.is_empty() {
            return;
        }
        self.sink.deliver(level, message);
    }
}
