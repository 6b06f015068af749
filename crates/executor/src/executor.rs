//! The Executor - sends one assembled batch and classifies the result.
//!
//! The executor is the only place that talks to a [`Connection`]. It logs
//! request and response at debug level, hands per-record slices to the
//! caller's handler, and reduces the response to a [`BatchOutcome`].
//!
//! # Outcomes
//!
//! | Outcome | Code | Condition |
//! |---------|------|-----------|
//! | `Success` | 0 | every command status is in the success set |
//! | `TransactionFailure` | 1 | the database rejected the transaction, or the response is unreadable |
//! | `PartialFailure` | 2 | transaction accepted, some statuses outside the success set |
//!
//! Neither failure outcome is an `Err`: the batch ran, and the caller counts
//! it. `Err` is reserved for transport errors and, under strict validation,
//! handler failures.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use parquery_core::{Batch, Blob, CommandResponse, Error, Responses, Result, SuccessStatuses};
use tracing::{debug, error, warn};

use crate::demux::groups;
use crate::json::JsonDisplay;
use crate::{Connection, QueryShape, ResponseHandler};

/// Classification of an executed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every command succeeded
    Success,
    /// The whole transaction was rejected
    TransactionFailure,
    /// Accepted, with some failing commands
    PartialFailure,
}

impl BatchOutcome {
    /// Numeric result code: 0, 1 or 2.
    pub fn code(&self) -> u8 {
        match self {
            BatchOutcome::Success => 0,
            BatchOutcome::TransactionFailure => 1,
            BatchOutcome::PartialFailure => 2,
        }
    }
}

/// Result of [`Executor::execute`].
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// How the batch went
    pub outcome: BatchOutcome,
    /// Raw responses
    pub responses: Responses,
    /// Returned blobs
    pub blobs: Vec<Blob>,
}

/// Sends batches with consistent logging, handler dispatch and
/// classification.
///
/// The executor holds only borrowed configuration, so building one per
/// batch is free.
///
/// # Example
///
/// ```ignore
/// use parquery_executor::{assemble_batch, Executor, QueryShape};
///
/// let batch = assemble_batch(&records)?;
/// let statuses = SuccessStatuses::default();
/// let report = Executor::new(&statuses, QueryShape::new(2, 1)).execute(&mut conn, &batch, Some(0))?;
/// assert_eq!(report.outcome.code(), 0);
/// ```
pub struct Executor<'a> {
    success_statuses: &'a SuccessStatuses,
    shape: QueryShape,
    handler: Option<&'a dyn ResponseHandler>,
    strict: bool,
}

impl<'a> Executor<'a> {
    /// Create an executor with no handler.
    pub fn new(success_statuses: &'a SuccessStatuses, shape: QueryShape) -> Self {
        Self {
            success_statuses,
            shape,
            handler: None,
            strict: false,
        }
    }

    /// Call `handler` once per record of every accepted batch.
    pub fn with_handler(mut self, handler: Option<&'a dyn ResponseHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Propagate handler failures instead of logging them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Send `batch` as one transaction.
    ///
    /// `index_offset` is the absolute index of the batch's first record,
    /// passed through to the handler.
    pub fn execute<C: Connection>(
        &self,
        conn: &mut C,
        batch: &Batch,
        index_offset: Option<usize>,
    ) -> Result<ExecutionReport> {
        debug!(
            target: "parquery::executor",
            commands = batch.commands.len(),
            query = %JsonDisplay(batch.commands.as_slice()),
            "Sending batch"
        );
        let (responses, blobs) = conn.send(&batch.commands, &batch.blobs)?;
        debug!(
            target: "parquery::executor",
            blobs = blobs.len(),
            response = %JsonDisplay(&responses),
            "Received response"
        );

        let accepted = conn.last_call_succeeded();
        if accepted {
            if let Some(handler) = self.handler {
                self.dispatch(handler, batch, &responses, &blobs, index_offset)?;
            }
        } else {
            error!(
                target: "parquery::executor",
                query = %JsonDisplay(batch.commands.as_slice()),
                response = %JsonDisplay(&responses),
                "Transaction failed"
            );
        }

        let outcome = if accepted {
            self.classify(batch, &responses)
        } else {
            BatchOutcome::TransactionFailure
        };

        Ok(ExecutionReport {
            outcome,
            responses,
            blobs,
        })
    }

    /// Reduce the responses of an accepted transaction to an outcome.
    pub fn classify(&self, batch: &Batch, responses: &Responses) -> BatchOutcome {
        let offending: Vec<&CommandResponse> = match responses {
            Responses::PerCommand(list) => list
                .iter()
                .filter(|response| {
                    response
                        .statuses()
                        .into_iter()
                        .any(|status| !self.success_statuses.contains(status))
                })
                .collect(),
            Responses::Whole(_) => {
                if self.success_statuses.contains(responses.whole_status()) {
                    Vec::new()
                } else {
                    warn!(
                        target: "parquery::executor",
                        query = %JsonDisplay(batch.commands.as_slice()),
                        response = %JsonDisplay(responses),
                        "Partial errors"
                    );
                    return BatchOutcome::PartialFailure;
                }
            }
            Responses::Malformed(value) => {
                error!(
                    target: "parquery::executor",
                    response = %value,
                    "Response in unexpected format"
                );
                return BatchOutcome::TransactionFailure;
            }
        };

        if offending.is_empty() {
            BatchOutcome::Success
        } else {
            warn!(
                target: "parquery::executor",
                query = %JsonDisplay(batch.commands.as_slice()),
                failed = %JsonDisplay(&offending),
                "Partial errors"
            );
            BatchOutcome::PartialFailure
        }
    }

    /// Feed each record's slice to the handler.
    ///
    /// Groups are cut one at a time, so every group before a malformed
    /// response still reaches the handler. The first failing group stops
    /// dispatch for this batch. The failure is logged and only returned as
    /// an error under strict validation.
    fn dispatch(
        &self,
        handler: &dyn ResponseHandler,
        batch: &Batch,
        responses: &Responses,
        blobs: &[Blob],
        index_offset: Option<usize>,
    ) -> Result<()> {
        for (i, group) in groups(self.shape, batch, responses, blobs, index_offset).enumerate() {
            let group = match group {
                Ok(group) => group,
                Err(e) => return self.handler_failed(i, e.to_string()),
            };
            let reason = match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(group))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => format!("handler panicked: {}", panic_message(payload.as_ref())),
            };
            return self.handler_failed(i, reason);
        }
        Ok(())
    }

    fn handler_failed(&self, group: usize, reason: String) -> Result<()> {
        error!(
            target: "parquery::executor",
            group,
            error = %reason,
            strict = self.strict,
            "Response handler failed"
        );
        if self.strict {
            Err(Error::HandlerFailure { group, reason })
        } else {
            Ok(())
        }
    }
}

/// Run one pre-assembled batch outside the parallel machinery.
///
/// Same logging, handler dispatch and classification as a worker uses;
/// handler failures are logged, never returned.
pub fn execute_batch<C: Connection>(
    conn: &mut C,
    batch: &Batch,
    success_statuses: &SuccessStatuses,
    shape: QueryShape,
    handler: Option<&dyn ResponseHandler>,
    index_offset: Option<usize>,
) -> Result<ExecutionReport> {
    Executor::new(success_statuses, shape)
        .with_handler(handler)
        .execute(conn, batch, index_offset)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}
