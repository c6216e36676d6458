use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::GenerationError;

use super::policy::BatchOptions;

/// Settled result of one batch item.
#[derive(Debug)]
pub enum BatchOutcome<I, O> {
    Success { index: usize, value: O },
    Failure {
        index: usize,
        input: I,
        error: GenerationError,
    },
}

impl<I, O> BatchOutcome<I, O> {
    pub fn index(&self) -> usize {
        match self {
            Self::Success { index, .. } | Self::Failure { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn value(&self) -> Option<&O> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&GenerationError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// Outcomes in input order; always as long as the input.
#[derive(Debug)]
pub struct BatchResult<I, O> {
    outcomes: Vec<BatchOutcome<I, O>>,
}

impl<I, O> BatchResult<I, O> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[BatchOutcome<I, O>] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<BatchOutcome<I, O>> {
        self.outcomes
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(BatchOutcome::index)
            .collect()
    }

    /// Successful values in input order.
    pub fn into_values(self) -> Vec<O> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                BatchOutcome::Success { value, .. } => Some(value),
                BatchOutcome::Failure { .. } => None,
            })
            .collect()
    }
}

/// Run `op` over `inputs` in consecutive windows of `options.window_size`.
///
/// Every item of a window is dispatched together and the next window starts
/// only after all of them settle. A failing item never aborts its siblings.
/// `on_item_settled` fires once per item, in settlement order.
pub async fn run_batch<I, O, F, Fut, S>(
    inputs: Vec<I>,
    options: BatchOptions,
    op: F,
    mut on_item_settled: S,
) -> BatchResult<I, O>
where
    I: Clone,
    F: Fn(usize, I) -> Fut,
    Fut: Future<Output = Result<O, GenerationError>>,
    S: FnMut(&BatchOutcome<I, O>),
{
    let total = inputs.len();
    let window = options.window_size.max(1);
    let mut slots: Vec<Option<BatchOutcome<I, O>>> = (0..total).map(|_| None).collect();

    let mut remaining = inputs.into_iter().enumerate().peekable();
    let mut window_no = 0usize;

    while remaining.peek().is_some() {
        let chunk: Vec<(usize, I)> = remaining.by_ref().take(window).collect();
        tracing::debug!(
            target: "castforge.batch",
            stage = "batch.window",
            window = window_no,
            size = chunk.len(),
            total
        );

        let mut pending: FuturesUnordered<_> = chunk
            .into_iter()
            .map(|(index, input)| {
                let fut = op(index, input.clone());
                async move { (index, input, fut.await) }
            })
            .collect();

        while let Some((index, input, result)) = pending.next().await {
            let outcome = match result {
                Ok(value) => BatchOutcome::Success { index, value },
                Err(error) => {
                    tracing::warn!(
                        target: "castforge.batch",
                        stage = "batch.item_failed",
                        index,
                        error = %error
                    );
                    BatchOutcome::Failure {
                        index,
                        input,
                        error,
                    }
                }
            };
            on_item_settled(&outcome);
            slots[index] = Some(outcome);
        }

        window_no += 1;
    }

    let outcomes: Vec<_> = slots.into_iter().flatten().collect();
    debug_assert_eq!(outcomes.len(), total);
    BatchResult { outcomes }
}
