use parking_lot::Mutex;
use recipe_sched::ThreadpoolBudget;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Destination for copied step output lines (§3 "Stream sink").
pub trait StreamSink: Send {
    fn write_line(&mut self, line: &str);
}

/// An in-memory sink, mainly for tests and the simulation step runner's
/// annotation stream (§4.H).
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    inner: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().clone()
    }
}

impl StreamSink for BufferSink {
    fn write_line(&mut self, line: &str) {
        self.inner.lock().push(line.to_string());
    }
}

const CLOSE_GUARD: Duration = Duration::from_millis(100);

/// Copies lines from `reader` into `sink` until EOF or cancellation (§4.B).
/// When `annotation_escaping` is set, a line starting with `@@@` is written
/// with a leading `!` so it isn't mistaken for a real annotation.
pub fn spawn_line_copier<R>(
    reader: R,
    mut sink: impl StreamSink + 'static,
    annotation_escaping: bool,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::task::spawn_local(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            match next {
                Ok(Some(line)) => {
                    if annotation_escaping && line.starts_with("@@@") {
                        sink.write_line(&format!("!{line}"));
                    } else {
                        sink.write_line(&line);
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }
    })
}

/// Reaps a copier task after step exit: cancels it, then gives it up to
/// `CLOSE_GUARD` to finish closing its handle. If it doesn't finish in time
/// the handle is flagged leaked and the scheduler's threadpool budget grows
/// by two — one for the stuck reader, one for the closer — rather than
/// blocking the whole pipeline on one misbehaving daemon child (§4.B).
pub async fn reap(mut handle: JoinHandle<()>, cancel: &CancellationToken, budget: &ThreadpoolBudget) -> bool {
    cancel.cancel();
    tokio::select! {
        _ = &mut handle => false,
        _ = tokio::time::sleep(CLOSE_GUARD) => {
            budget.grow(2);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test(flavor = "current_thread")]
    async fn copies_lines_verbatim_in_non_annotation_mode() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (mut writer, reader) = tokio::io::duplex(256);
                let sink = BufferSink::new();
                let cancel = CancellationToken::new();
                let handle = spawn_line_copier(reader, sink.clone(), false, cancel.clone());

                writer.write_all(b"hello\nworld\n").await.unwrap();
                writer.shutdown().await.unwrap();
                drop(writer);
                handle.await.unwrap();

                assert_eq!(sink.lines(), vec!["hello".to_string(), "world".to_string()]);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn escapes_annotation_lines_with_leading_bang() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (mut writer, reader) = tokio::io::duplex(256);
                let sink = BufferSink::new();
                let cancel = CancellationToken::new();
                let handle = spawn_line_copier(reader, sink.clone(), true, cancel.clone());

                writer.write_all(b"@@@STEP_LINK@link@url@@@\n").await.unwrap();
                writer.shutdown().await.unwrap();
                drop(writer);
                handle.await.unwrap();

                assert_eq!(sink.lines(), vec!["!@@@STEP_LINK@link@url@@@".to_string()]);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn final_line_without_trailing_newline_is_delivered() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (mut writer, reader) = tokio::io::duplex(256);
                let sink = BufferSink::new();
                let cancel = CancellationToken::new();
                let handle = spawn_line_copier(reader, sink.clone(), false, cancel.clone());

                writer.write_all(b"partial").await.unwrap();
                writer.shutdown().await.unwrap();
                drop(writer);
                handle.await.unwrap();

                assert_eq!(sink.lines(), vec!["partial".to_string()]);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reap_grows_budget_when_close_blocks_past_guard() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let cancel = CancellationToken::new();
                let handle = tokio::task::spawn_local(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                });
                let budget = ThreadpoolBudget::new(4);
                let leaked = reap(handle, &cancel, &budget).await;
                assert!(leaked);
                assert_eq!(budget.current(), 6);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reap_does_not_grow_budget_on_clean_exit() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let cancel = CancellationToken::new();
                let handle = tokio::task::spawn_local(async {});
                let budget = ThreadpoolBudget::new(4);
                let leaked = reap(handle, &cancel, &budget).await;
                assert!(!leaked);
                assert_eq!(budget.current(), 4);
            })
            .await;
    }
}
