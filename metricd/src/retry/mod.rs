/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

/// Bounded backoff policy for a single logical operation.
///
/// One instance drives one operation, call [`next`](Self::next) before each
/// attempt and feed the previous attempt's error back in:
///
/// ```ignore
/// let mut retry = Retry::always(BACKOFF);
/// let mut last_err = None;
/// while retry.next(last_err.as_ref()).await {
///     match operation().await {
///         Ok(_) => last_err = None,
///         Err(e) => last_err = Some(e),
///     }
/// }
/// ```
///
/// The first call always returns true. A later call returns false as soon as
/// the last attempt succeeded, the delay list is exhausted, or the error is
/// not retriable; otherwise it sleeps the next configured delay and returns
/// true.
pub(crate) struct Retry<E> {
    delays: &'static [Duration],
    should_retry: fn(&E) -> bool,
    attempt: usize,
}

impl<E> Retry<E> {
    pub(crate) fn new(delays: &'static [Duration], should_retry: fn(&E) -> bool) -> Self {
        Retry {
            delays,
            should_retry,
            attempt: 0,
        }
    }

    /// A policy that retries every error until the delay list is exhausted.
    #[allow(unused)]
    pub(crate) fn always(delays: &'static [Duration]) -> Self {
        Retry::new(delays, |_| true)
    }

    pub(crate) async fn next(&mut self, last_err: Option<&E>) -> bool {
        let attempt = self.attempt;
        self.attempt += 1;
        if attempt == 0 {
            return true;
        }
        let Some(err) = last_err else {
            return false;
        };
        let Some(delay) = self.delays.get(attempt - 1) else {
            return false;
        };
        if !(self.should_retry)(err) {
            return false;
        }
        tokio::time::sleep(*delay).await;
        true
    }
}
