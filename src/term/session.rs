//! Terminal session: original/working termios snapshots and mode transitions
//!
//! Raw mode follows the classic `cfmakeraw` recipe: no break processing, no
//! CR/NL translation, no parity or stripping, no flow control, no output
//! post-processing, no echo, no canonical mode, no signal characters, 8-bit
//! characters, and reads returning after a single byte with no timeout.

use std::fs::File;
use std::io::{self, IsTerminal};
use std::os::fd::AsFd;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::libc;
use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};

use super::{Modes, TermError, TermResult, WindowSize};

/// The controlling terminal, with its original attributes captured at open
pub struct Session {
    /// Terminal the attributes are read from and applied to
    input: File,
    /// Where prompts and control sequences are written
    output: File,
    /// Snapshot actively applied by the mode calls
    working: Termios,
    /// Modes applied since open (or since the last restore)
    modes: Modes,
    /// Original snapshot plus the shared "needs restore" flag
    restore: RestoreHandle,
}

impl Session {
    /// Open a session over the given terminal input and output
    ///
    /// The current attributes of `input` become the original snapshot; they
    /// are never modified afterwards.
    pub fn open(input: File, output: File) -> TermResult<Self> {
        if !input.is_terminal() {
            return Err(TermError::NotATerminal);
        }

        let original = termios::tcgetattr(&input).map_err(TermError::GetAttr)?;
        let restore = RestoreHandle::new(input.try_clone()?, &original);

        tracing::debug!(fd = input.as_raw_fd(), "terminal session opened");

        Ok(Self {
            input,
            output,
            working: original,
            modes: Modes::empty(),
            restore,
        })
    }

    /// Open a session on stdin/stdout
    ///
    /// When stdin is redirected the controlling terminal is opened through
    /// `/dev/tty` instead.
    pub fn stdio() -> TermResult<Self> {
        let stdin = io::stdin();
        let input = if stdin.is_terminal() {
            File::from(stdin.as_fd().try_clone_to_owned()?)
        } else {
            File::options().read(true).write(true).open("/dev/tty")?
        };
        let output = File::from(io::stdout().as_fd().try_clone_to_owned()?);
        Self::open(input, output)
    }

    /// Put the terminal in raw mode
    ///
    /// Input is available byte by byte, echo is off and no special
    /// processing is done on input or output. In raw mode a new line on
    /// output needs CR+LF, and Enter arrives as CR.
    pub fn set_raw_mode(&mut self) -> TermResult<()> {
        let state = &mut self.working;

        state.input_flags.remove(
            InputFlags::BRKINT
                | InputFlags::IGNBRK
                | InputFlags::ICRNL
                | InputFlags::INLCR
                | InputFlags::IGNCR
                | InputFlags::ISTRIP
                | InputFlags::IXON
                | InputFlags::PARMRK,
        );
        state.output_flags.remove(OutputFlags::OPOST);
        state.local_flags.remove(
            LocalFlags::ECHO
                | LocalFlags::ECHONL
                | LocalFlags::ICANON
                | LocalFlags::IEXTEN
                | LocalFlags::ISIG,
        );
        state.control_flags.remove(ControlFlags::CSIZE | ControlFlags::PARENB);
        state.control_flags.insert(ControlFlags::CS8);
        state.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        state.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        self.apply(SetArg::TCSAFLUSH)?;
        self.modes.insert(Modes::RAW);
        tracing::debug!("raw mode enabled");
        Ok(())
    }

    /// Turn echo on or off
    pub fn set_echo_mode(&mut self, echo: bool) -> TermResult<()> {
        if echo {
            self.working.local_flags.insert(LocalFlags::ECHO);
        } else {
            self.working.local_flags.remove(LocalFlags::ECHO);
        }

        self.apply(SetArg::TCSANOW)?;
        self.modes.set(Modes::ECHO, echo);
        Ok(())
    }

    /// Single-character mode: canonical processing off, one byte per read
    pub fn set_char_mode(&mut self) -> TermResult<()> {
        self.working.local_flags.remove(LocalFlags::ICANON);
        self.working.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        self.working.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;

        self.apply(SetArg::TCSANOW)?;
        self.modes.insert(Modes::CHAR);
        Ok(())
    }

    /// Apply arbitrary attributes as the working snapshot
    pub fn set_state(&mut self, state: Termios) -> TermResult<()> {
        let previous = std::mem::replace(&mut self.working, state);
        if let Err(e) = self.apply(SetArg::TCSANOW) {
            self.working = previous;
            return Err(e);
        }
        self.modes.insert(Modes::OTHER);
        Ok(())
    }

    /// Restore the original attributes
    ///
    /// Safe to call any number of times: once the original snapshot is back
    /// in place further calls do nothing.
    pub fn restore(&mut self) -> TermResult<()> {
        self.restore.restore()?;
        self.working = self.restore.original();
        self.modes = Modes::empty();
        Ok(())
    }

    /// Handle that can restore the terminal from another thread
    pub fn restore_handle(&self) -> RestoreHandle {
        self.restore.clone()
    }

    /// The attributes captured when the session was opened
    pub fn original_state(&self) -> Termios {
        self.restore.original()
    }

    /// The working attributes (last applied by a mode call)
    pub fn state(&self) -> &Termios {
        &self.working
    }

    /// Modes applied since open or the last restore
    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// Get the window size of the output terminal
    pub fn window_size(&self) -> TermResult<WindowSize> {
        let mut ws = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: TIOCGWINSZ only writes into the winsize struct we pass
        let result = unsafe { libc::ioctl(self.output.as_raw_fd(), libc::TIOCGWINSZ, &mut ws) };

        if result < 0 {
            Err(TermError::WindowSize(nix::errno::Errno::last()))
        } else {
            Ok(WindowSize {
                rows: ws.ws_row,
                cols: ws.ws_col,
            })
        }
    }

    /// A second handle on the input, for the reader thread
    pub fn input_reader(&self) -> TermResult<File> {
        Ok(self.input.try_clone()?)
    }

    /// A second handle on the output
    pub fn output_writer(&self) -> TermResult<File> {
        Ok(self.output.try_clone()?)
    }

    /// Terminal output
    pub fn output(&mut self) -> &mut File {
        &mut self.output
    }

    fn apply(&mut self, when: SetArg) -> TermResult<()> {
        termios::tcsetattr(&self.input, when, &self.working).map_err(TermError::SetAttr)?;
        self.restore.mark_modified();
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("failed to restore terminal: {}", e);
        }
    }
}

/// Restores a session's original attributes; cheap to clone and `Send`
///
/// Shares its "modified" flag with the session, so a restore through any
/// handle makes later restores (from the session or other handles) no-ops
/// until a mode is applied again.
#[derive(Clone)]
pub struct RestoreHandle {
    inner: Arc<Restorer>,
}

struct Restorer {
    tty: File,
    original: libc::termios,
    modified: AtomicBool,
}

impl RestoreHandle {
    fn new(tty: File, original: &Termios) -> Self {
        Self {
            inner: Arc::new(Restorer {
                tty,
                original: libc::termios::from(original.clone()),
                modified: AtomicBool::new(false),
            }),
        }
    }

    /// Reapply the original attributes if any mode was applied since the last restore
    pub fn restore(&self) -> TermResult<()> {
        if !self.inner.modified.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let original = Termios::from(self.inner.original);
        if let Err(e) = termios::tcsetattr(&self.inner.tty, SetArg::TCSANOW, &original) {
            self.inner.modified.store(true, Ordering::Release);
            return Err(TermError::SetAttr(e));
        }

        tracing::debug!("terminal restored");
        Ok(())
    }

    /// Whether the terminal currently differs from the original snapshot
    pub fn is_modified(&self) -> bool {
        self.inner.modified.load(Ordering::Acquire)
    }

    fn original(&self) -> Termios {
        Termios::from(self.inner.original)
    }

    fn mark_modified(&self) {
        self.inner.modified.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for RestoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreHandle")
            .field("fd", &self.inner.tty.as_raw_fd())
            .field("modified", &self.is_modified())
            .finish()
    }
}
