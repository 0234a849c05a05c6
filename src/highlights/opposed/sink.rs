use crate::highlights::opposed::types::ChromaCorrection;

/// Receives freshly estimated corrections so the caller can persist them
/// with the image's edit history.
pub trait ParamsSink {
    fn store_chroma(&mut self, correction: &ChromaCorrection);
    fn add_history_item(&mut self);
}

/// Sink that drops every publication.
pub struct NullSink;

impl ParamsSink for NullSink {
    fn store_chroma(&mut self, _correction: &ChromaCorrection) {}

    fn add_history_item(&mut self) {}
}

/// Sink that remembers the last published correction and counts history items.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub last: Option<ChromaCorrection>,
    pub history_items: usize,
}

impl ParamsSink for RecordingSink {
    fn store_chroma(&mut self, correction: &ChromaCorrection) {
        self.last = Some(*correction);
    }

    fn add_history_item(&mut self) {
        self.history_items += 1;
    }
}
