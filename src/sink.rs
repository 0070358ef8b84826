//! Sinks: subscribers to the envelope stream.

use std::{cell::RefCell, io, rc::Rc};

use crate::event::Envelope;

/// A subscriber to the envelope stream.
///
/// [`on_message`] is called once per envelope, in emission order. Sinks
/// may stream each envelope out immediately or buffer and render on
/// `TestRunFinished`; they must not retain references into the envelope.
///
/// [`on_message`]: Sink::on_message
pub trait Sink {
    /// Handles the next envelope.
    fn on_message(&mut self, envelope: &Envelope);
}

/// In-memory collecting sink.
///
/// Clones share one buffer, so a caller can keep a handle and hand
/// another clone to [`RunOptions::sinks`].
///
/// [`RunOptions::sinks`]: crate::RunOptions::sinks
#[derive(Clone, Debug, Default)]
pub struct MessageVec {
    shared: Rc<RefCell<Vec<Envelope>>>,
}

impl MessageVec {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything collected so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.shared.borrow().clone()
    }

    /// Takes everything collected so far, leaving the buffer empty.
    #[must_use]
    pub fn take(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.shared.borrow_mut())
    }

    /// Number of collected envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.borrow().len()
    }

    /// Indicates whether nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.borrow().is_empty()
    }
}

impl Sink for MessageVec {
    fn on_message(&mut self, envelope: &Envelope) {
        self.shared.borrow_mut().push(envelope.clone());
    }
}

/// Sink writing one JSON envelope per line (NDJSON) to any writer.
#[derive(Debug)]
pub struct Ndjson<O: io::Write> {
    out: O,
}

impl<O: io::Write> Ndjson<O> {
    /// Creates an NDJSON sink over `out`.
    #[must_use]
    pub fn new(out: O) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: io::Write> Sink for Ndjson<O> {
    fn on_message(&mut self, envelope: &Envelope) {
        if let Err(e) = serde_json::to_writer(&mut self.out, envelope)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
        {
            log::warn!("failed to write NDJSON envelope: {e}");
        }
    }
}
