//! Chunked stream copy with percentage progress.
//!
//! This is the lowest-level primitive of the pipeline: every manifest and
//! part fetch is a [`transfer`] from a network body into a scratch file.
//! Cancellation is checked on every chunk read so a large transfer aborts
//! promptly instead of running to completion.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Default chunk size for reads (8 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Smallest accepted chunk size.
pub const MIN_BUFFER_SIZE: usize = 4 * 1024;

/// Errors that end a transfer early.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading the source or writing the sink failed.
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The cancellation token fired mid-transfer.
    #[error("transfer cancelled")]
    Cancelled,
}

/// Percentage of `total` covered by `so_far`, floored.
///
/// A `total` of zero means the size is unknown and reports 0. Sources that
/// deliver more than they declared are clamped to 100.
pub fn percent(so_far: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = u128::from(so_far) * 100 / u128::from(total);
    pct.min(100) as u8
}

/// Normalize a configured chunk size to a power of two of at least 4 KiB.
pub fn normalize_buffer_size(size: usize) -> usize {
    size.max(MIN_BUFFER_SIZE)
        .checked_next_power_of_two()
        .unwrap_or(DEFAULT_BUFFER_SIZE)
}

/// Copy `source` into `sink` in fixed-size chunks.
///
/// `on_progress` is invoked after every chunk with the current percentage,
/// even when it did not change. Both streams are owned by this function and
/// dropped on every exit path; on success the sink is flushed and shut down.
///
/// Returns the number of bytes copied.
pub async fn transfer<R, W, F>(
    source: R,
    sink: W,
    total_bytes: u64,
    buffer_size: usize,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(u8),
{
    let mut source = source;
    let mut sink = sink;
    let mut buffer = vec![0u8; normalize_buffer_size(buffer_size)];
    let mut transferred: u64 = 0;

    loop {
        let bytes_read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            read = source.read(&mut buffer) => read?,
        };

        if bytes_read == 0 {
            break;
        }

        sink.write_all(&buffer[..bytes_read]).await?;
        transferred += bytes_read as u64;

        let pct = percent(transferred, total_bytes);
        tracing::trace!(transferred, total_bytes, pct, "chunk written");
        on_progress(pct);
    }

    sink.flush().await?;
    sink.shutdown().await?;

    Ok(transferred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Reader that yields a few bytes and then fails.
    struct FailingReader {
        served: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.served {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
            } else {
                self.served = true;
                buf.put_slice(b"abc");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[test]
    fn test_percent_basic() {
        assert_eq!(percent(0, 200), 0);
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(199, 200), 99);
        assert_eq!(percent(200, 200), 100);
    }

    #[test]
    fn test_percent_unknown_total_is_zero() {
        assert_eq!(percent(12345, 0), 0);
    }

    #[test]
    fn test_percent_clamps_overrun() {
        assert_eq!(percent(300, 200), 100);
    }

    #[test]
    fn test_normalize_buffer_size() {
        assert_eq!(normalize_buffer_size(8192), 8192);
        assert_eq!(normalize_buffer_size(1), 4096);
        assert_eq!(normalize_buffer_size(5000), 8192);
    }

    #[tokio::test]
    async fn test_transfer_copies_all_bytes() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut sink = Vec::new();
        let mut reports = Vec::new();

        let copied = transfer(
            data.as_slice(),
            &mut sink,
            data.len() as u64,
            DEFAULT_BUFFER_SIZE,
            &CancellationToken::new(),
            |p| reports.push(p),
        )
        .await
        .unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(sink, data);
        assert!(!reports.is_empty());
        assert_eq!(*reports.last().unwrap(), 100);
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_transfer_unknown_total_reports_zero() {
        let data = vec![7u8; 10_000];
        let mut sink = Vec::new();
        let mut reports = Vec::new();

        transfer(
            data.as_slice(),
            &mut sink,
            0,
            DEFAULT_BUFFER_SIZE,
            &CancellationToken::new(),
            |p| reports.push(p),
        )
        .await
        .unwrap();

        assert!(reports.iter().all(|&p| p == 0));
        assert_eq!(sink.len(), 10_000);
    }

    #[tokio::test]
    async fn test_transfer_empty_source() {
        let mut sink = Vec::new();
        let mut calls = 0;
        let copied = transfer(
            &b""[..],
            &mut sink,
            0,
            DEFAULT_BUFFER_SIZE,
            &CancellationToken::new(),
            |_| calls += 1,
        )
        .await
        .unwrap();

        assert_eq!(copied, 0);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_transfer_propagates_read_error() {
        let mut sink = Vec::new();
        let err = transfer(
            FailingReader { served: false },
            &mut sink,
            100,
            DEFAULT_BUFFER_SIZE,
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .unwrap_err();

        match err {
            TransferError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink, b"abc");
    }

    #[tokio::test]
    async fn test_transfer_observes_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let mut sink = Vec::new();

        let err = transfer(
            &[1u8; 64][..],
            &mut sink,
            64,
            DEFAULT_BUFFER_SIZE,
            &token,
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Cancelled));
        assert!(sink.is_empty());
    }

    proptest! {
        #[test]
        fn prop_percent_in_range_and_monotonic(
            total in 1u64..10_000_000,
            chunks in proptest::collection::vec(1u64..100_000, 1..50),
        ) {
            let mut so_far = 0u64;
            let mut last = 0u8;
            for chunk in chunks {
                so_far = (so_far + chunk).min(total);
                let pct = percent(so_far, total);
                prop_assert!(pct <= 100);
                prop_assert!(pct >= last);
                last = pct;
            }
        }
    }
}
