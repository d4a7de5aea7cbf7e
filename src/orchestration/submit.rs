use crate::config::TxPolicy;
use crate::datasource::{ChainError, ChainWriter, TransactionRequest, TxReceipt};
use crate::error::CoreError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

enum SubmitFailure {
    Chain(ChainError),
    TimedOut(Duration),
}

/// Sends transactions through a [`ChainWriter`] under a [`TxPolicy`].
///
/// Only network failures are retried. A rejection or a confirmation timeout
/// ends the attempt, since the transaction may already be in flight.
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
    writer: Arc<dyn ChainWriter>,
    policy: TxPolicy,
}

impl TransactionSubmitter {
    pub fn new(writer: Arc<dyn ChainWriter>, policy: TxPolicy) -> Self {
        Self { writer, policy }
    }

    pub fn policy(&self) -> &TxPolicy {
        &self.policy
    }

    pub async fn submit(
        &self,
        tx: &TransactionRequest,
        gas_limit: Option<u64>,
    ) -> Result<TxReceipt, CoreError> {
        let action = tx.action();
        let backoff = ExponentialBackoff {
            current_interval: self.policy.retry_backoff,
            initial_interval: self.policy.retry_backoff,
            max_elapsed_time: None,
            ..Default::default()
        };
        let attempts = AtomicU32::new(0);

        let result = retry(backoff, || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            match self.submit_once(tx, gas_limit).await {
                Ok(receipt) => Ok(receipt),
                Err(SubmitFailure::Chain(e))
                    if e.is_transient() && attempt <= self.policy.max_retries =>
                {
                    warn!("{} attempt {} failed: {}, retrying", action, attempt, e);
                    Err(backoff::Error::transient(SubmitFailure::Chain(e)))
                }
                Err(failure) => Err(backoff::Error::permanent(failure)),
            }
        })
        .await;

        match result {
            Ok(receipt) => {
                info!(
                    "{} confirmed in block {} ({})",
                    action, receipt.block_number, receipt.tx_hash
                );
                Ok(receipt)
            }
            Err(SubmitFailure::Chain(e)) => {
                error!("{} failed: {}", action, e);
                Err(CoreError::TransactionRejected {
                    action: action.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(SubmitFailure::TimedOut(after)) => {
                error!("{} not confirmed after {:?}", action, after);
                Err(CoreError::TransactionTimedOut {
                    action: action.to_string(),
                    after_ms: after.as_millis() as u64,
                })
            }
        }
    }

    async fn submit_once(
        &self,
        tx: &TransactionRequest,
        gas_limit: Option<u64>,
    ) -> Result<TxReceipt, SubmitFailure> {
        let pending = self.writer.submit(tx, gas_limit);
        match self.policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result.map_err(SubmitFailure::Chain),
                Err(_) => Err(SubmitFailure::TimedOut(limit)),
            },
            None => pending.await.map_err(SubmitFailure::Chain),
        }
    }
}
