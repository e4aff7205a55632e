//! Streaming reply assembly
//!
//! Opens an assistant turn, concatenates fragments onto it in delivery
//! order, and seals or discards it when the stream ends.

use super::turn::{Transcript, Turn, TurnError};
use crate::api::{ApiError, ChunkStream};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a reply stream ended early
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFailure {
    #[error("reply exceeded the {0:?} stream deadline")]
    TimedOut(Duration),
    #[error("reply cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] ApiError),
    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// Summary of a finished stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub fragments: usize,
    pub chars: usize,
}

/// Failed stream; `partial` is set when content had arrived and was kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyError {
    pub failure: StreamFailure,
    pub partial: Option<StreamSummary>,
}

pub struct StreamAssembler {
    timeout: Duration,
}

impl StreamAssembler {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Assemble one reply into `transcript`.
    ///
    /// `connect` resolves to the fragment stream. `on_update` is called after
    /// every fragment with the fragment and the updated open turn. The whole
    /// call, connection included, is bounded by the stream deadline.
    pub async fn assemble<C, F>(
        &self,
        transcript: &mut Transcript,
        connect: C,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<StreamSummary, AssemblyError>
    where
        C: Future<Output = Result<ChunkStream, ApiError>>,
        F: FnMut(&str, &Turn),
    {
        transcript.open().map_err(|e| AssemblyError {
            failure: e.into(),
            partial: None,
        })?;

        let mut summary = StreamSummary {
            fragments: 0,
            chars: 0,
        };
        let pumped = tokio::time::timeout(
            self.timeout,
            pump(transcript, connect, cancel, &mut summary, &mut on_update),
        )
        .await;
        // The stream and its connection are dropped by now on every path

        let outcome = match pumped {
            Ok(result) => result,
            Err(_elapsed) => Err(StreamFailure::TimedOut(self.timeout)),
        };

        let nothing_arrived = transcript
            .last()
            .is_some_and(|t| t.is_open() && t.content().is_empty());
        match outcome {
            Ok(()) => {
                transcript.seal().map_err(|e| AssemblyError {
                    failure: e.into(),
                    partial: None,
                })?;
                Ok(summary)
            }
            // Dropped even when empty fragments arrived
            Err(failure) if nothing_arrived => {
                let _ = transcript.discard_open();
                Err(AssemblyError {
                    failure,
                    partial: None,
                })
            }
            Err(failure) => {
                let _ = transcript.seal();
                Err(AssemblyError {
                    failure,
                    partial: Some(summary),
                })
            }
        }
    }
}

async fn pump<C, F>(
    transcript: &mut Transcript,
    connect: C,
    cancel: &CancellationToken,
    summary: &mut StreamSummary,
    on_update: &mut F,
) -> Result<(), StreamFailure>
where
    C: Future<Output = Result<ChunkStream, ApiError>>,
    F: FnMut(&str, &Turn),
{
    let mut stream = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(StreamFailure::Cancelled),
        connected = connect => connected?,
    };

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamFailure::Cancelled),
            next = stream.next() => match next {
                Some(Ok(fragment)) => {
                    let turn = transcript.append(&fragment)?;
                    summary.fragments += 1;
                    summary.chars += fragment.chars().count();
                    tracing::trace!(fragment_len = fragment.len(), "Reply fragment applied");
                    on_update(&fragment, turn);
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(items: Vec<Result<&'static str, ApiError>>) -> ChunkStream {
        Box::pin(stream::iter(
            items.into_iter().map(|r| r.map(str::to_string)).collect::<Vec<_>>(),
        ))
    }

    fn opened(transcript: &mut Transcript) {
        transcript.push(Turn::user("question")).unwrap();
    }

    #[tokio::test]
    async fn test_fragments_are_concatenated_in_order() {
        let assembler = StreamAssembler::new(Duration::from_secs(5));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let mut seen = Vec::new();
        let summary = assembler
            .assemble(
                &mut transcript,
                async { Ok(chunks(vec![Ok("Own"), Ok("ership "), Ok("moves")])) },
                &CancellationToken::new(),
                |_, turn| seen.push(turn.content().to_string()),
            )
            .await
            .unwrap();

        assert_eq!(summary.fragments, 3);
        assert_eq!(seen, vec!["Own", "Ownership ", "Ownership moves"]);
        assert_eq!(transcript.last(), Some(&Turn::assistant("Ownership moves")));
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_discards_empty_turn() {
        let assembler = StreamAssembler::new(Duration::from_secs(5));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let err = assembler
            .assemble(
                &mut transcript,
                async { Err(ApiError::server("Server error: 500")) },
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err.failure, StreamFailure::Transport(_)));
        assert_eq!(err.partial, None);
        assert_eq!(transcript.turns(), &[Turn::user("question")]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_partial_content() {
        let assembler = StreamAssembler::new(Duration::from_secs(5));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let err = assembler
            .assemble(
                &mut transcript,
                async {
                    Ok(chunks(vec![
                        Ok("Partial "),
                        Ok("answer"),
                        Err(ApiError::network("connection reset")),
                        Ok("never applied"),
                    ]))
                },
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert_eq!(err.partial.map(|s| s.fragments), Some(2));
        assert_eq!(transcript.last(), Some(&Turn::assistant("Partial answer")));
        assert!(!transcript.has_open_turn());
    }

    #[tokio::test]
    async fn test_empty_fragments_then_failure_discard_turn() {
        let assembler = StreamAssembler::new(Duration::from_secs(5));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let err = assembler
            .assemble(
                &mut transcript,
                async {
                    Ok(chunks(vec![
                        Ok(""),
                        Ok(""),
                        Err(ApiError::network("connection reset")),
                    ]))
                },
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err.failure, StreamFailure::Transport(_)));
        assert_eq!(err.partial, None);
        assert_eq!(transcript.turns(), &[Turn::user("question")]);
    }

    #[tokio::test]
    async fn test_deadline_cancels_hanging_stream() {
        let assembler = StreamAssembler::new(Duration::from_millis(50));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let hanging: ChunkStream = Box::pin(
            stream::iter(vec![Ok::<_, ApiError>("slow ".to_string())]).chain(stream::pending()),
        );
        let err = assembler
            .assemble(
                &mut transcript,
                async { Ok(hanging) },
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert_eq!(err.failure, StreamFailure::TimedOut(Duration::from_millis(50)));
        assert_eq!(transcript.last(), Some(&Turn::assistant("slow ")));
    }

    #[tokio::test]
    async fn test_deadline_covers_connection() {
        let assembler = StreamAssembler::new(Duration::from_millis(50));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let err = assembler
            .assemble(
                &mut transcript,
                std::future::pending::<Result<ChunkStream, ApiError>>(),
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err.failure, StreamFailure::TimedOut(_)));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_reading() {
        let assembler = StreamAssembler::new(Duration::from_secs(5));
        let mut transcript = Transcript::default();
        opened(&mut transcript);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let hanging: ChunkStream = Box::pin(
            stream::iter(vec![Ok::<_, ApiError>("first".to_string())]).chain(stream::pending()),
        );
        let err = assembler
            .assemble(&mut transcript, async { Ok(hanging) }, &cancel, |_, _| {
                trigger.cancel();
            })
            .await
            .unwrap_err();

        assert_eq!(err.failure, StreamFailure::Cancelled);
        assert_eq!(transcript.last(), Some(&Turn::assistant("first")));
    }

    proptest::proptest! {
        #[test]
        fn prop_sealed_content_is_exact_concatenation(
            fragments in proptest::collection::vec("\\PC{0,12}", 0..16)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let expected: String = fragments.concat();
            let items: Vec<Result<String, ApiError>> = fragments.into_iter().map(Ok).collect();

            let mut transcript = Transcript::default();
            let summary = runtime
                .block_on(StreamAssembler::new(Duration::from_secs(5)).assemble(
                    &mut transcript,
                    async { Ok::<ChunkStream, ApiError>(Box::pin(stream::iter(items))) },
                    &CancellationToken::new(),
                    |_, _| {},
                ))
                .unwrap();

            proptest::prop_assert_eq!(summary.chars, expected.chars().count());
            proptest::prop_assert_eq!(transcript.last(), Some(&Turn::assistant(expected)));
        }
    }

    #[tokio::test]
    async fn test_rejects_second_open_stream() {
        let assembler = StreamAssembler::new(Duration::from_secs(5));
        let mut transcript = Transcript::default();
        transcript.open().unwrap();

        let err = assembler
            .assemble(
                &mut transcript,
                async { Ok(chunks(vec![Ok("x")])) },
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap_err();
        assert_eq!(err.failure, StreamFailure::Turn(TurnError::StreamInFlight));
        assert_eq!(transcript.len(), 1);
    }
}
