//! Interrupt routing
//!
//! One reader thread owns the terminal input. Every byte it reads is
//! inspected before anyone else sees it:
//!
//! - `0x03` (Ctrl-C) and `0x04` (Ctrl-D) are raised as [`Interrupt`] events
//!   and never reach the editor as text
//! - every other byte is forwarded as text
//!
//! Both go out over one bounded channel of [`Routed`] items, in the order
//! they were typed, so the editor never sees an interrupt before the text
//! that preceded it. Interrupts are also broadcast to every subscriber. A
//! handler registered with [`InterruptRouter::on_interrupt`] decides whether
//! an event only aborts the current read or restores the terminal and exits
//! the process. Registration travels to the thread as a message, so there is
//! no shared state behind a lock.

use std::fs::File;
use std::io::{self, Read, Write};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use nix::poll::{poll, PollFd, PollFlags};

use crate::core::ansi;
use crate::term::RestoreHandle;

/// How long the reader waits for input before checking for control messages
const POLL_INTERVAL_MS: i32 = 100;

/// Default capacity of the input channel
pub const DEFAULT_BYTE_CAPACITY: usize = 1024;

/// Reserved input bytes handled out of band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// Ctrl-C, the interrupt token (0x03)
    CtrlC,
    /// Ctrl-D, the end-of-transmission token (0x04)
    CtrlD,
}

impl Interrupt {
    /// Classify a byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x03 => Some(Interrupt::CtrlC),
            0x04 => Some(Interrupt::CtrlD),
            _ => None,
        }
    }

    /// The byte that raises this event
    pub fn byte(self) -> u8 {
        match self {
            Interrupt::CtrlC => 0x03,
            Interrupt::CtrlD => 0x04,
        }
    }

    /// Caret notation echoed when a read is aborted
    pub fn caret(self) -> &'static str {
        match self {
            Interrupt::CtrlC => "^C",
            Interrupt::CtrlD => "^D",
        }
    }

    fn index(self) -> usize {
        match self {
            Interrupt::CtrlC => 0,
            Interrupt::CtrlD => 1,
        }
    }
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupt::CtrlC => write!(f, "interrupted (Ctrl-C)"),
            Interrupt::CtrlD => write!(f, "end of input (Ctrl-D)"),
        }
    }
}

/// One item of routed input
#[derive(Debug)]
pub enum Routed {
    /// An editable byte
    Byte(u8),
    /// Ctrl-C or Ctrl-D, in its place among the bytes
    Interrupt(Interrupt),
    /// Reading the terminal failed; always the last item
    Failed(io::Error),
}

/// What the router does when an interrupt arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptAction {
    /// Abort the current read only; the caller decides what happens next
    #[default]
    Abort,
    /// Restore the terminal, erase the current line and exit with this code
    Exit(i32),
}

/// Called instead of `std::process::exit` when set
pub type ExitHook = Box<dyn Fn(i32) + Send>;

/// Messages from the router handle to its thread
enum Control {
    Handle(Interrupt, InterruptAction),
    Subscribe(Sender<Interrupt>),
    Shutdown,
}

/// Builder for an [`InterruptRouter`]
pub struct RouterBuilder {
    input: File,
    restore: Option<RestoreHandle>,
    output: Option<File>,
    capacity: usize,
    exit: Option<ExitHook>,
}

impl RouterBuilder {
    /// Handle used to restore the terminal before exiting
    pub fn restore(mut self, handle: RestoreHandle) -> Self {
        self.restore = Some(handle);
        self
    }

    /// Where the erase-line sequence is written before exiting
    pub fn output(mut self, output: File) -> Self {
        self.output = Some(output);
        self
    }

    /// Capacity of the input channel
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Replace the process exit, e.g. to run cleanup first
    pub fn exit_hook(mut self, hook: impl Fn(i32) + Send + 'static) -> Self {
        self.exit = Some(Box::new(hook));
        self
    }

    /// Start the reader thread
    pub fn spawn(self) -> io::Result<InterruptRouter> {
        let (routed_tx, routed_rx) = bounded(self.capacity);
        let (control_tx, control_rx) = unbounded();

        let worker = Worker {
            input: self.input,
            control: control_rx,
            routed: routed_tx,
            handlers: [InterruptAction::Abort; 2],
            subscribers: Vec::new(),
            restore: self.restore,
            output: self.output,
            exit: self.exit.unwrap_or_else(|| Box::new(|code| std::process::exit(code))),
        };

        let thread = std::thread::Builder::new()
            .name("interrupt-router".to_string())
            .spawn(move || worker.run())?;

        Ok(InterruptRouter {
            routed: routed_rx,
            control: control_tx,
            thread: Some(thread),
        })
    }
}

/// Handle on the reader thread
pub struct InterruptRouter {
    routed: Receiver<Routed>,
    control: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl InterruptRouter {
    /// Start configuring a router reading from `input`
    pub fn builder(input: File) -> RouterBuilder {
        RouterBuilder {
            input,
            restore: None,
            output: None,
            capacity: DEFAULT_BYTE_CAPACITY,
            exit: None,
        }
    }

    /// Bytes and interrupts, in input order
    ///
    /// A read failure arrives as [`Routed::Failed`] and is the last item; end
    /// of input disconnects the channel.
    pub fn input(&self) -> &Receiver<Routed> {
        &self.routed
    }

    /// Set the handler for one interrupt, replacing any previous one
    ///
    /// Returns false when the reader thread has already stopped.
    pub fn on_interrupt(&self, interrupt: Interrupt, action: InterruptAction) -> bool {
        let sent = self.control.send(Control::Handle(interrupt, action)).is_ok();
        if !sent {
            tracing::warn!(?interrupt, "reader stopped, handler not registered");
        }
        sent
    }

    /// Exit the process with `code` when `interrupt` arrives
    pub fn exit_on(&self, interrupt: Interrupt, code: i32) -> bool {
        self.on_interrupt(interrupt, InterruptAction::Exit(code))
    }

    /// Receive every interrupt from now on
    ///
    /// Once the reader thread has stopped the receiver is already
    /// disconnected.
    pub fn subscribe(&self) -> Receiver<Interrupt> {
        let (tx, rx) = unbounded();
        if self.control.send(Control::Subscribe(tx)).is_err() {
            tracing::warn!("reader stopped, subscription closed");
        }
        rx
    }
}

impl Drop for InterruptRouter {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(thread) = self.thread.take() {
            // The thread may be blocked handing input to a full channel;
            // drain so it can see the shutdown.
            while !thread.is_finished() {
                let _ = self
                    .routed
                    .recv_timeout(std::time::Duration::from_millis(10));
            }
            let _ = thread.join();
        }
    }
}

/// State owned by the reader thread
struct Worker {
    input: File,
    // Dropped before `routed`, so a disconnected input channel means
    // registrations already fail
    control: Receiver<Control>,
    routed: Sender<Routed>,
    handlers: [InterruptAction; 2],
    subscribers: Vec<Sender<Interrupt>>,
    restore: Option<RestoreHandle>,
    output: Option<File>,
    exit: ExitHook,
}

impl Worker {
    fn run(mut self) {
        let mut buf = [0u8; 256];

        loop {
            if !self.apply_controls() {
                break;
            }

            match self.poll_readable() {
                Ok(false) => continue,
                Ok(true) => {},
                Err(e) => {
                    tracing::error!("poll on terminal input failed: {}", e);
                    let _ = self.routed.send(Routed::Failed(io::Error::from(e)));
                    break;
                },
            }

            let n = match self.input.read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("terminal input closed");
                    break;
                },
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    continue
                },
                Err(e) => {
                    tracing::error!("read from terminal failed: {}", e);
                    let _ = self.routed.send(Routed::Failed(e));
                    break;
                },
            };

            // Registrations made before these bytes arrived must apply to them
            if !self.apply_controls() {
                break;
            }

            for &byte in &buf[..n] {
                if !self.dispatch(byte) {
                    return;
                }
            }
        }
    }

    /// Drain pending control messages; false means shut down
    fn apply_controls(&mut self) -> bool {
        loop {
            match self.control.try_recv() {
                Ok(Control::Handle(interrupt, action)) => {
                    tracing::debug!(?interrupt, ?action, "interrupt handler set");
                    self.handlers[interrupt.index()] = action;
                },
                Ok(Control::Subscribe(tx)) => self.subscribers.push(tx),
                Ok(Control::Shutdown) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn poll_readable(&self) -> nix::Result<bool> {
        let mut fds = [PollFd::new(&self.input, PollFlags::POLLIN)];
        let n = poll(&mut fds, POLL_INTERVAL_MS)?;
        // Hangup and errors count as readable so the read reports them
        let ready = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
        Ok(n > 0 && fds[0].revents().is_some_and(|r| r.intersects(ready)))
    }

    /// Route one byte; false when the editor side is gone
    fn dispatch(&mut self, byte: u8) -> bool {
        let item = match Interrupt::from_byte(byte) {
            Some(interrupt) => {
                self.raise(interrupt);
                Routed::Interrupt(interrupt)
            },
            None => Routed::Byte(byte),
        };
        self.routed.send(item).is_ok()
    }

    fn raise(&mut self, interrupt: Interrupt) {
        tracing::debug!(?interrupt, "interrupt received");

        self.subscribers.retain(|tx| tx.send(interrupt).is_ok());

        if let InterruptAction::Exit(code) = self.handlers[interrupt.index()] {
            self.exit(code);
        }
    }

    fn exit(&mut self, code: i32) {
        if let Some(restore) = &self.restore {
            if let Err(e) = restore.restore() {
                tracing::error!("failed to restore terminal before exit: {}", e);
            }
        }
        if let Some(output) = &mut self.output {
            let _ = output.write_all(ansi::ERASE_LINE_CR);
            let _ = output.flush();
        }
        tracing::debug!(code, "exiting on interrupt");
        (self.exit)(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::RecvTimeoutError;
    use std::io::{Seek, SeekFrom};
    use std::os::fd::FromRawFd;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn pipe_pair() -> (File, File) {
        let (read, write) = nix::unistd::pipe().expect("Failed to create pipe");
        // SAFETY: both descriptors are fresh and owned by nobody else
        unsafe { (File::from_raw_fd(read), File::from_raw_fd(write)) }
    }

    /// Next item rendered as text, interrupts as their caret form
    fn recv_text(router: &InterruptRouter, n: usize) -> String {
        (0..n)
            .map(|_| {
                match router.input().recv_timeout(TIMEOUT).expect("input expected") {
                    Routed::Byte(b) => char::from(b).to_string(),
                    Routed::Interrupt(i) => i.caret().to_string(),
                    Routed::Failed(e) => panic!("read failed: {}", e),
                }
            })
            .collect()
    }

    #[test]
    fn test_interrupt_from_byte() {
        assert_eq!(Interrupt::from_byte(0x03), Some(Interrupt::CtrlC));
        assert_eq!(Interrupt::from_byte(0x04), Some(Interrupt::CtrlD));
        assert_eq!(Interrupt::from_byte(b'a'), None);
        assert_eq!(Interrupt::CtrlD.byte(), 0x04);
        assert_eq!(Interrupt::CtrlC.caret(), "^C");
    }

    #[test]
    fn test_forwards_bytes_in_order() {
        let (read, mut write) = pipe_pair();
        let router = InterruptRouter::builder(read).spawn().unwrap();

        write.write_all(b"abc\x1b[D\r").unwrap();
        assert_eq!(recv_text(&router, 7), "abc\x1b[D\r");
        assert!(router.input().try_recv().is_err());
    }

    #[test]
    fn test_interrupts_keep_their_place() {
        let (read, mut write) = pipe_pair();
        let router = InterruptRouter::builder(read).spawn().unwrap();

        write.write_all(b"a\x03b\x04c").unwrap();
        assert_eq!(recv_text(&router, 5), "a^Cb^Dc");
        assert!(router.input().try_recv().is_err());
    }

    #[test]
    fn test_subscribers_receive_events() {
        let (read, mut write) = pipe_pair();
        let router = InterruptRouter::builder(read).spawn().unwrap();
        let first = router.subscribe();
        let second = router.subscribe();

        // Let the thread pick up the subscriptions
        std::thread::sleep(Duration::from_millis(250));
        write.write_all(b"\x04").unwrap();

        assert_eq!(first.recv_timeout(TIMEOUT).unwrap(), Interrupt::CtrlD);
        assert_eq!(second.recv_timeout(TIMEOUT).unwrap(), Interrupt::CtrlD);
    }

    #[test]
    fn test_exit_handler_runs_hook() {
        let (read, mut write) = pipe_pair();
        let mut out = tempfile::tempfile().unwrap();
        let (code_tx, code_rx) = unbounded();

        let router = InterruptRouter::builder(read)
            .output(out.try_clone().unwrap())
            .exit_hook(move |code| {
                let _ = code_tx.send(code);
            })
            .spawn()
            .unwrap();
        router.exit_on(Interrupt::CtrlC, 130);
        router.exit_on(Interrupt::CtrlD, 0);
        std::thread::sleep(Duration::from_millis(250));

        write.write_all(b"\x03").unwrap();
        assert_eq!(code_rx.recv_timeout(TIMEOUT).unwrap(), 130);
        write.write_all(b"\x04").unwrap();
        assert_eq!(code_rx.recv_timeout(TIMEOUT).unwrap(), 0);

        let mut written = Vec::new();
        out.seek(SeekFrom::Start(0)).unwrap();
        out.read_to_end(&mut written).unwrap();
        assert!(written.starts_with(ansi::ERASE_LINE_CR));
    }

    #[test]
    fn test_abort_replaces_exit_handler() {
        let (read, mut write) = pipe_pair();
        let (code_tx, code_rx) = unbounded();
        let router = InterruptRouter::builder(read)
            .exit_hook(move |code| {
                let _ = code_tx.send(code);
            })
            .spawn()
            .unwrap();

        router.exit_on(Interrupt::CtrlC, 1);
        router.on_interrupt(Interrupt::CtrlC, InterruptAction::Abort);
        std::thread::sleep(Duration::from_millis(250));

        write.write_all(b"\x03").unwrap();
        assert_eq!(recv_text(&router, 1), "^C");
        assert!(code_rx.try_recv().is_err());
    }

    #[test]
    fn test_end_of_input_disconnects() {
        let (read, mut write) = pipe_pair();
        let router = InterruptRouter::builder(read).spawn().unwrap();

        write.write_all(b"z").unwrap();
        drop(write);

        assert_eq!(recv_text(&router, 1), "z");
        assert!(router.input().recv_timeout(TIMEOUT).is_err());
    }

    #[test]
    fn test_registration_after_reader_stopped() {
        let (read, write) = pipe_pair();
        let router = InterruptRouter::builder(read).spawn().unwrap();

        drop(write);
        assert!(matches!(
            router.input().recv_timeout(TIMEOUT),
            Err(RecvTimeoutError::Disconnected)
        ));

        assert!(!router.on_interrupt(Interrupt::CtrlC, InterruptAction::Exit(1)));
        let events = router.subscribe();
        assert!(matches!(
            events.recv_timeout(TIMEOUT),
            Err(RecvTimeoutError::Disconnected)
        ));
    }
}
