//! Boundary to the external variant-effect annotation service.
//!
//! The service is a pure function over a keyed table: every input key gets
//! a result (possibly null-valued) and no key is reordered or dropped. It
//! is side-effect-free, which is what makes retrying with the same input
//! safe.

use std::thread;
use std::time::Duration;

use tracing::warn;

use vat_engine::KeyedTable;
use vat_model::{EnvConfig, GenomeBuild, PipelineError, Result};

pub trait ExternalAnnotator {
    /// Annotate a table of variant keys, returning the same keys with the
    /// service's annotation payload attached.
    fn annotate(
        &self,
        table: &KeyedTable,
        env: &EnvConfig,
        genome_build: GenomeBuild,
    ) -> Result<KeyedTable>;
}

/// Annotator that attaches nothing. Used where no service is configured
/// (offline runs) so the rest of the pipeline is exercised unchanged.
pub struct NoopAnnotator;

impl ExternalAnnotator for NoopAnnotator {
    fn annotate(
        &self,
        table: &KeyedTable,
        _env: &EnvConfig,
        _genome_build: GenomeBuild,
    ) -> Result<KeyedTable> {
        Ok(table.clone())
    }
}

/// Bounded-retry decorator around an annotator.
///
/// Only service failures are retried; configuration and schema errors
/// surface immediately. Retries re-send the same input table.
pub struct RetryingAnnotator<A> {
    inner: A,
    max_attempts: u32,
    backoff: Duration,
}

impl<A> RetryingAnnotator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

impl<A: ExternalAnnotator> ExternalAnnotator for RetryingAnnotator<A> {
    fn annotate(
        &self,
        table: &KeyedTable,
        env: &EnvConfig,
        genome_build: GenomeBuild,
    ) -> Result<KeyedTable> {
        let mut attempt = 1;
        loop {
            match self.inner.annotate(table, env, genome_build) {
                Ok(annotated) => return Ok(annotated),
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        %error,
                        "external annotation failed; retrying"
                    );
                    thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Enforce the service contract on a response: same height, same key set,
/// same order.
pub fn verify_annotator_contract(input: &KeyedTable, output: &KeyedTable) -> Result<()> {
    if input.height() != output.height() {
        return Err(PipelineError::ExternalService(format!(
            "service returned {} rows for {} input keys",
            output.height(),
            input.height()
        )));
    }
    for idx in 0..input.height() {
        if input.row_key(idx) != output.row_key(idx) {
            return Err(PipelineError::ExternalService(format!(
                "service reordered or rewrote key at row {idx}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyAnnotator {
        failures: AtomicU32,
    }

    impl ExternalAnnotator for FlakyAnnotator {
        fn annotate(
            &self,
            table: &KeyedTable,
            _env: &EnvConfig,
            _genome_build: GenomeBuild,
        ) -> Result<KeyedTable> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok()
            {
                return Err(PipelineError::ExternalService("unavailable".to_string()));
            }
            Ok(table.clone())
        }
    }

    #[test]
    fn retries_service_errors_up_to_the_bound() {
        let env = EnvConfig::default();
        let table = KeyedTable::empty(vat_model::KeySchema::LocusAlleles);
        let annotator = RetryingAnnotator::new(FlakyAnnotator {
            failures: AtomicU32::new(2),
        })
        .with_max_attempts(3)
        .with_backoff(Duration::from_millis(1));
        assert!(annotator.annotate(&table, &env, GenomeBuild::Grch38).is_ok());

        let annotator = RetryingAnnotator::new(FlakyAnnotator {
            failures: AtomicU32::new(5),
        })
        .with_max_attempts(3)
        .with_backoff(Duration::from_millis(1));
        let err = annotator
            .annotate(&table, &env, GenomeBuild::Grch38)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ExternalService(_)));
    }
}
