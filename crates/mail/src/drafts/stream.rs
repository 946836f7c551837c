//! Word-by-word draft playback

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::DraftError;

/// Shared flag that stops a running [`DraftStream`]
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Finite sequence of text chunks, one word (plus trailing space) each,
/// separated by a fixed delay
pub struct DraftStream {
    words: std::vec::IntoIter<String>,
    delay: Duration,
    cancel: CancelToken,
    started: bool,
    interrupted: bool,
}

impl DraftStream {
    /// Pause between chunks
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(50);

    /// Empty text yields no chunks
    pub fn new(text: &str) -> Self {
        let words: Vec<String> = if text.is_empty() {
            Vec::new()
        } else {
            text.split(' ').map(str::to_string).collect()
        };
        Self {
            words: words.into_iter(),
            delay: Self::DEFAULT_DELAY,
            cancel: CancelToken::new(),
            started: false,
            interrupted: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Use an existing token, e.g. one held by a UI cancel button
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Play the whole stream, calling `on_text` with the accumulated text
    /// after every chunk.
    ///
    /// Returns the full text, or `Cancelled` if the token fired first.
    pub fn play(mut self, mut on_text: impl FnMut(&str)) -> Result<String, DraftError> {
        let mut text = String::new();
        for chunk in self.by_ref() {
            text.push_str(&chunk);
            on_text(&text);
        }

        if self.interrupted {
            Err(DraftError::Cancelled)
        } else {
            Ok(text)
        }
    }
}

impl Iterator for DraftStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.words.as_slice().is_empty() {
            return None;
        }
        if self.started && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.started = true;

        if self.cancel.is_cancelled() {
            self.interrupted = true;
            return None;
        }

        self.words.next().map(|word| format!("{} ", word))
    }
}
