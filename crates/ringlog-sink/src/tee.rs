//! Sink that fans writes out to two other sinks — used to mirror a ring's
//! output to, say, a file and stderr simultaneously.

use crate::Sink;

pub struct TeeSink {
    first: Box<dyn Sink>,
    second: Box<dyn Sink>,
}

impl TeeSink {
    #[must_use]
    pub fn new(first: Box<dyn Sink>, second: Box<dyn Sink>) -> Self {
        Self { first, second }
    }
}

impl Sink for TeeSink {
    fn push(&mut self, data: &[u8]) {
        self.first.push(data);
        self.second.push(data);
    }

    fn flush(&mut self) {
        self.first.flush();
        self.second.flush();
    }

    /// Failed if either leg has failed.
    fn failed(&self) -> bool {
        self.first.failed() || self.second.failed()
    }

    fn error(&self) -> Option<&str> {
        self.first.error().or_else(|| self.second.error())
    }
}
