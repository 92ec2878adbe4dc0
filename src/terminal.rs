//! Interactive terminal
//!
//! Ties together the raw-mode session, the interrupt router and the line
//! editor. This is what a [`Prompter`](crate::ask::Prompter) reads from in a
//! real program.

use std::io::Write;

use crossbeam_channel::Receiver;

use crate::app::Config;
use crate::ask::LineSource;
use crate::editor::{LineEditor, ReadError};
use crate::router::{Interrupt, InterruptAction, InterruptRouter};
use crate::term::{Session, TermResult, WindowSize};

/// A raw-mode terminal reading edited lines
pub struct Terminal {
    // Dropped first: the reader thread stops before the session restores
    router: InterruptRouter,
    editor: LineEditor,
    session: Session,
}

impl Terminal {
    /// Open the controlling terminal with the default configuration
    pub fn stdio() -> TermResult<Self> {
        Self::open(Session::stdio()?, &Config::default())
    }

    /// Put `session` in raw mode and start routing its input
    ///
    /// Interrupt handlers come from `config.interrupts`.
    pub fn open(session: Session, config: &Config) -> TermResult<Self> {
        Self::start(session, config, None)
    }

    /// Like [`Terminal::open`], calling `hook` instead of exiting the process
    pub fn open_with_exit_hook(
        session: Session,
        config: &Config,
        hook: impl Fn(i32) + Send + 'static,
    ) -> TermResult<Self> {
        Self::start(session, config, Some(Box::new(hook)))
    }

    fn start(
        mut session: Session,
        config: &Config,
        hook: Option<Box<dyn Fn(i32) + Send>>,
    ) -> TermResult<Self> {
        session.set_raw_mode()?;

        let mut builder = InterruptRouter::builder(session.input_reader()?)
            .restore(session.restore_handle())
            .output(session.output_writer()?)
            .capacity(config.editor.channel_capacity);
        if let Some(hook) = hook {
            builder = builder.exit_hook(hook);
        }
        let router = builder.spawn()?;

        for interrupt in [Interrupt::CtrlC, Interrupt::CtrlD] {
            let action = config.interrupts.action(interrupt);
            if action != InterruptAction::Abort {
                router.on_interrupt(interrupt, action);
            }
        }

        tracing::debug!("terminal ready");
        Ok(Self {
            router,
            editor: LineEditor::with_capacity(config.editor.buffer_capacity),
            session,
        })
    }

    /// Replace the handler for one interrupt; false once input has closed
    pub fn on_interrupt(&self, interrupt: Interrupt, action: InterruptAction) -> bool {
        self.router.on_interrupt(interrupt, action)
    }

    /// Receive every interrupt from now on
    pub fn subscribe(&self) -> Receiver<Interrupt> {
        self.router.subscribe()
    }

    /// Read one line, starting from `seed`
    pub fn read_seeded(&mut self, prompt: &str, seed: &str) -> Result<String, ReadError> {
        self.editor.read_seeded(
            prompt,
            seed,
            self.router.input(),
            self.session.output(),
        )
    }

    pub fn window_size(&self) -> TermResult<WindowSize> {
        self.session.window_size()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    /// Put the terminal back the way it was found
    pub fn restore(&mut self) -> TermResult<()> {
        self.session.restore()
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadError> {
        self.read_seeded(prompt, "")
    }

    fn write_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let out = self.session.output();
        out.write_all(bytes)?;
        out.flush()
    }
}
