//! Metadata sink: the two output regions and the render gate

use crate::record::EventRecord;
use crate::types::Gate;

/// The two text regions records are rendered into
pub trait MetadataSurface {
    /// Current metadata log content
    fn log(&self) -> String;

    fn set_log(&mut self, text: &str);

    fn set_media_info(&mut self, text: &str);
}

/// In-memory surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySurface {
    pub log: String,
    pub media_info: String,
}

impl MetadataSurface for MemorySurface {
    fn log(&self) -> String {
        self.log.clone()
    }

    fn set_log(&mut self, text: &str) {
        self.log = text.to_string();
    }

    fn set_media_info(&mut self, text: &str) {
        self.media_info = text.to_string();
    }
}

/// Renders event records into a surface, honoring the gate
#[derive(Debug)]
pub struct MetadataSink<S> {
    surface: S,
    gate: Gate,
}

impl<S: MetadataSurface> MetadataSink<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            gate: Gate::Open,
        }
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn set_gate(&mut self, gate: Gate) {
        self.gate = gate;
    }

    /// Replace the log with the pretty-printed record.
    ///
    /// Suppressed (returns `false`) while a collaborator owns the log and the
    /// matching allowance is not given.
    pub fn render(&mut self, record: &EventRecord, allow_adaptive: bool, allow_legacy: bool) -> bool {
        if !self.gate.allows(allow_adaptive, allow_legacy) {
            return false;
        }
        self.surface.set_log(&record.to_pretty());
        true
    }

    /// Append a line, keeping earlier content
    pub fn append(&mut self, text: &str) {
        let current = self.surface.log();
        if current.is_empty() {
            self.surface.set_log(text);
        } else {
            self.surface.set_log(&format!("{current}\n{text}"));
        }
    }

    /// Replace the media-info panel
    pub fn render_media_info(&mut self, record: &EventRecord) {
        self.surface.set_media_info(&record.to_pretty());
    }

    pub fn clear_log(&mut self) {
        self.surface.set_log("");
    }

    pub fn clear_media_info(&mut self) {
        self.surface.set_media_info("");
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
