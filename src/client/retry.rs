// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repeating failed transactions

use std::time::Duration;

use super::Client;
use crate::{frame::*, Result};

/// How often and how patiently a transaction is repeated.
///
/// Only errors that are safe to repeat are retried, see
/// [`Error::is_retryable()`](crate::Error::is_retryable). Stale bytes of
/// the failed attempt are drained by the client before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: usize,
    /// Pause between two attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: usize = 3;

    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

    /// A single attempt without any retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: Self::DEFAULT_ATTEMPTS,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

/// Executes a transaction and repeats it according to `policy`.
///
/// The error of the last attempt is returned if all attempts failed.
pub async fn call_with_retry<C>(
    client: &mut C,
    request: Request,
    policy: RetryPolicy,
) -> Result<Response>
where
    C: Client + ?Sized,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match client.call(request).await {
            Err(err) if err.is_retryable() && attempt < attempts => {
                log::warn!("Attempt {attempt}/{attempts} of {request:?} failed: {err}");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, io};

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Slave, SlaveContext};

    #[derive(Debug, Default)]
    struct FlakyClient {
        calls: usize,
        results: VecDeque<Result<Response>>,
    }

    impl SlaveContext for FlakyClient {
        fn set_slave(&mut self, _: Slave) {}
    }

    #[async_trait]
    impl Client for FlakyClient {
        async fn call(&mut self, _: Request) -> Result<Response> {
            self.calls += 1;
            self.results
                .pop_front()
                .unwrap_or(Err(Error::Timeout(Duration::from_secs(1))))
        }

        async fn disconnect(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const REQUEST: Request = Request::ReadInputRegisters(1000, 1);

    #[tokio::test(start_paused = true)]
    async fn retry_after_timeout() {
        let mut client = FlakyClient::default();
        client
            .results
            .push_back(Err(Error::Timeout(Duration::from_secs(1))));
        client
            .results
            .push_back(Ok(Response::ReadInputRegisters(vec![84])));

        let rsp = call_with_retry(&mut client, REQUEST, RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(rsp, Response::ReadInputRegisters(vec![84]));
        assert_eq!(client.calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn give_up_after_all_attempts() {
        let mut client = FlakyClient::default();

        let err = call_with_retry(&mut client, REQUEST, RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(client.calls, RetryPolicy::DEFAULT_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn never_retry_checksum_errors() {
        let mut client = FlakyClient::default();
        client.results.push_back(Err(Error::Checksum {
            expected: 0xCFFC,
            actual: 0xCEFC,
        }));

        let err = call_with_retry(&mut client, REQUEST, RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Checksum { .. }));
        assert_eq!(client.calls, 1);
    }

    #[tokio::test]
    async fn single_attempt() {
        let mut client = FlakyClient::default();

        assert!(call_with_retry(&mut client, REQUEST, RetryPolicy::none())
            .await
            .is_err());
        assert_eq!(client.calls, 1);
    }
}
