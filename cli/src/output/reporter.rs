//! `TerminalRenderer`: presentation-layer implementation of `EventRenderer`.
//!
//! Every event becomes one line (plus indented continuation lines for
//! multi-line text):
//!
//! ```text
//! → [api]    /usr/local/go/bin/go version
//! ✓ [api]    go version go1.22.1 linux/amd64
//! ✗ [worker] couldn't stop systemd service: Unit worker.service not loaded.
//! ```

use std::io::Write;

use owo_colors::OwoColorize as _;

use crate::application::ports::EventRenderer;
use crate::domain::{ProgressEvent, Severity};
use crate::output::Styles;

/// Width of the widest `[name]` tag among `services`.
#[must_use]
pub fn tag_width<S: AsRef<str>>(services: &[S]) -> usize {
    services
        .iter()
        .map(|name| name.as_ref().chars().count() + 2)
        .max()
        .unwrap_or(0)
}

/// Writes events as aligned, symbol-prefixed lines.
///
/// In quiet mode only error events are written.
pub struct TerminalRenderer<W> {
    out: W,
    styles: Styles,
    quiet: bool,
    tag_width: usize,
}

impl<W: Write> TerminalRenderer<W> {
    /// `tag_width` is usually [`tag_width`] of the selected services.
    #[must_use]
    pub fn new(out: W, styles: Styles, quiet: bool, tag_width: usize) -> Self {
        Self {
            out,
            styles,
            quiet,
            tag_width,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventRenderer for TerminalRenderer<W> {
    fn render(&mut self, event: &ProgressEvent) {
        if self.quiet && event.severity() != Severity::Error {
            return;
        }
        let (symbol, style) = match event.severity() {
            Severity::Normal => ("→", self.styles.info),
            Severity::Success => ("✓", self.styles.success),
            Severity::Warning => ("⚠", self.styles.warning),
            Severity::Error => ("✗", self.styles.error),
        };
        let tag = format!("[{}]", event.service());
        let width = self.tag_width.max(tag.chars().count());
        let pad = " ".repeat(width - tag.chars().count());
        // Symbol, space, tag column, space.
        let indent = " ".repeat(width + 3);

        let mut lines = event.text().lines();
        let first = lines.next().unwrap_or_default();
        let mut block = format!(
            "{} {}{pad} {first}\n",
            symbol.style(style),
            tag.style(self.styles.bold)
        );
        for line in lines {
            block.push_str(&indent);
            block.push_str(line);
            block.push('\n');
        }
        if let Err(e) = self.out.write_all(block.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "cannot write progress output");
        }
    }
}
