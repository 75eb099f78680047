//! Operator input from the keyboard and the Ctrl-C flag.
//!
//! Lines typed on stdin are read on a helper thread and handed over a
//! channel. Each key becomes one short press: the button reads high for
//! `HOLD_TICKS` ticks, then low for at least one tick, so the sequencer sees
//! a full press and release.

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, TryRecvError};
use fftune_traits::OperatorInput;

const HOLD_TICKS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Confirm,
    Decline,
    Abort,
}

/// Map one typed line to a key; unknown input is ignored.
pub fn parse_key(line: &str) -> Option<Key> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Some(Key::Confirm),
        "n" | "no" => Some(Key::Decline),
        "q" | "quit" | "abort" => Some(Key::Abort),
        _ => None,
    }
}

pub struct ConsoleOperator {
    rx: Receiver<Key>,
    queue: VecDeque<Key>,
    held: Option<(Key, u8)>,
    released: bool,
    aborted: bool,
    shutdown: Arc<AtomicBool>,
}

impl ConsoleOperator {
    /// Start the stdin reader thread.
    pub fn spawn(shutdown: Arc<AtomicBool>) -> eyre::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::Builder::new()
            .name("fftune-console".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if let Some(key) = parse_key(&line)
                        && tx.send(key).is_err()
                    {
                        break;
                    }
                }
                tracing::debug!("console reader finished");
            })
            .map_err(|e| eyre::eyre!("spawn console reader: {e}"))?;
        Ok(Self::from_receiver(rx, shutdown))
    }

    pub fn from_receiver(rx: Receiver<Key>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            rx,
            queue: VecDeque::new(),
            held: None,
            released: true,
            aborted: false,
            shutdown,
        }
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(Key::Abort) => self.aborted = true,
                Ok(key) => self.queue.push_back(key),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if self.held.is_none()
            && self.released
            && let Some(key) = self.queue.pop_front()
        {
            self.held = Some((key, HOLD_TICKS));
        }
    }

    fn is_held(&self, key: Key) -> bool {
        matches!(self.held, Some((k, _)) if k == key)
    }
}

impl OperatorInput for ConsoleOperator {
    fn confirm_pressed(&mut self) -> bool {
        self.drain();
        self.is_held(Key::Confirm)
    }

    fn decline_pressed(&mut self) -> bool {
        self.is_held(Key::Decline)
    }

    // Read last in each tick, so the held press advances here.
    fn abort_requested(&mut self) -> bool {
        match self.held {
            Some((key, n)) if n > 1 => self.held = Some((key, n - 1)),
            Some(_) => {
                self.held = None;
                self.released = false;
            }
            None => self.released = true,
        }
        self.aborted || self.shutdown.load(Ordering::Relaxed)
    }
}

/// Folds the Ctrl-C flag into another operator's abort input.
pub struct ShutdownAware<O> {
    inner: O,
    shutdown: Arc<AtomicBool>,
}

impl<O: OperatorInput> ShutdownAware<O> {
    pub fn new(inner: O, shutdown: Arc<AtomicBool>) -> Self {
        Self { inner, shutdown }
    }
}

impl<O: OperatorInput> OperatorInput for ShutdownAware<O> {
    fn confirm_pressed(&mut self) -> bool {
        self.inner.confirm_pressed()
    }

    fn decline_pressed(&mut self) -> bool {
        self.inner.decline_pressed()
    }

    fn abort_requested(&mut self) -> bool {
        let inner = self.inner.abort_requested();
        inner || self.shutdown.load(Ordering::Relaxed)
    }
}
