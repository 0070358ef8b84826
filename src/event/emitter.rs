//! Envelope emission and run-wide id allocation.

use std::cell::{Cell, RefCell};

use crate::sink::Sink;

use super::Envelope;

/// Run-wide id allocator: one monotonic counter, string prefixes by
/// envelope type (`pickle-`, `step-`, `sd-`, `hook-`, `pt-`, `tc-`,
/// `ts-`, `tcs-`, `trs-`, `trhs-`).
///
/// A single counter keeps every minted id unique across the whole run,
/// whatever its prefix.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    counter: Cell<u64>,
}

impl IdGenerator {
    /// Mints the next id with the given prefix.
    pub(crate) fn next(&self, prefix: &str) -> String {
        let n = self.counter.get();
        self.counter.set(n + 1);
        format!("{prefix}-{n}")
    }
}

/// Publishes envelopes to the subscribed sinks.
///
/// Execution is cooperatively scheduled on one thread, so a [`RefCell`]
/// provides the mutual exclusion the sink list needs: a whole group is
/// delivered under a single borrow and no suspension point exists while
/// it is held, which keeps each pickle attempt's envelopes contiguous in
/// every sink even with concurrent pickles in flight.
pub(crate) struct Emitter {
    sinks: RefCell<Vec<Box<dyn Sink>>>,
}

impl Emitter {
    pub(crate) fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks: RefCell::new(sinks) }
    }

    /// Delivers one envelope to every sink.
    pub(crate) fn emit(&self, envelope: Envelope) {
        let mut sinks = self.sinks.borrow_mut();
        for sink in sinks.iter_mut() {
            sink.on_message(&envelope);
        }
    }

    /// Delivers a group of envelopes atomically with respect to other
    /// groups.
    pub(crate) fn emit_group(
        &self,
        group: impl IntoIterator<Item = Envelope>,
    ) {
        let mut sinks = self.sinks.borrow_mut();
        for envelope in group {
            for sink in sinks.iter_mut() {
                sink.on_message(&envelope);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::messages, sink::MessageVec};

    fn sample(id: &str) -> Envelope {
        Envelope::TestRunStarted(messages::TestRunStarted {
            id: id.to_owned(),
            timestamp: messages::Timestamp { seconds: 0, nanos: 0 },
        })
    }

    #[test]
    fn ids_are_unique_across_prefixes() {
        let ids = IdGenerator::default();
        let minted = [
            ids.next("pickle"),
            ids.next("step"),
            ids.next("pickle"),
            ids.next("sd"),
        ];

        assert_eq!(minted, ["pickle-0", "step-1", "pickle-2", "sd-3"]);
    }

    #[test]
    fn groups_reach_every_sink_in_order() {
        let first = MessageVec::new();
        let second = MessageVec::new();
        let emitter = Emitter::new(vec![
            Box::new(first.clone()),
            Box::new(second.clone()),
        ]);

        emitter.emit(sample("trs-0"));
        emitter.emit_group(vec![sample("trs-1"), sample("trs-2")]);

        for sink in [first, second] {
            let ids: Vec<_> = sink
                .snapshot()
                .iter()
                .map(|e| match e {
                    Envelope::TestRunStarted(m) => m.id.clone(),
                    other => panic!("unexpected envelope {other:?}"),
                })
                .collect();
            assert_eq!(ids, ["trs-0", "trs-1", "trs-2"]);
        }
    }
}
