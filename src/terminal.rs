use std::io::Write;

use crate::client::{ResultCard, SearchSurface, StatusKind};

/// Renders a search onto a plain text stream, used by the `find` command.
pub struct TerminalSurface<W: Write> {
    out: W,
    trigger_enabled: bool,
    trigger_label: String,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            trigger_enabled: true,
            trigger_label: crate::client::IDLE_LABEL.to_string(),
        }
    }

    pub fn trigger(&self) -> (bool, &str) {
        (self.trigger_enabled, &self.trigger_label)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SearchSurface for TerminalSurface<W> {
    fn set_trigger(&mut self, enabled: bool, label: &str) {
        self.trigger_enabled = enabled;
        self.trigger_label = label.to_string();
        log::debug!("trigger enabled={enabled} label={label}");
    }

    fn show_status(&mut self, message: &str, kind: StatusKind) {
        if let Err(e) = writeln!(self.out, "[{}] {}", kind.class_name(), message) {
            log::warn!("Failed to write status: {e}");
        }
    }

    fn clear_results(&mut self) {}

    fn render(&mut self, cards: Vec<ResultCard>) {
        for (i, card) in cards.iter().enumerate() {
            if let Err(e) = writeln!(
                self.out,
                "{:>3}. {:>7}  {}",
                i + 1,
                card.similarity_label,
                card.image_url
            ) {
                log::warn!("Failed to write result {}: {e}", i + 1);
                return;
            }
        }
    }
}
