//! Output formatting module

pub mod reporter;
pub mod styles;

use std::io::Stdout;

use console::Term;
use owo_colors::OwoColorize as _;
pub use reporter::{TerminalRenderer, tag_width};
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Renderer writing progress lines for `services` to stdout.
    #[must_use]
    pub fn renderer<S: AsRef<str>>(&self, services: &[S]) -> TerminalRenderer<Stdout> {
        TerminalRenderer::new(std::io::stdout(), self.styles, self.quiet, tag_width(services))
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("{} {msg}", "✗".style(self.styles.error));
    }
}
