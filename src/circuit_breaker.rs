use failsafe::{
    backoff::{self, Exponential},
    failure_policy::{self, ConsecutiveFailures},
    Config, StateMachine,
};
use std::time::Duration;

/// Circuit breaker guarding writes to the record store.
pub type RecordStoreBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for database operations to prevent cascading failures.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// While the circuit is open, writes fail immediately instead of each one
/// waiting out the pool's acquire timeout. Predictions are unaffected.
pub fn create_db_circuit_breaker() -> RecordStoreBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

/// Whether a record-store error says the store itself is unhealthy.
///
/// Only these count against the breaker. Errors the database raises about a
/// single record (constraint violations, numeric overflow, decode errors)
/// leave the circuit closed.
pub fn is_store_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::futures::CircuitBreaker;
    use failsafe::Error;

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let cb = create_db_circuit_breaker();

        for _ in 0..5 {
            let result = cb.call(async { Err::<(), &str>("connection refused") }).await;
            assert!(result.is_err());
        }

        let result = cb.call(async { Ok::<(), &str>(()) }).await;
        match result {
            Err(Error::Rejected) => {}
            _ => panic!("Expected circuit to be open and reject writes"),
        }
    }

    #[tokio::test]
    async fn test_record_level_errors_do_not_open_circuit() {
        let cb = create_db_circuit_breaker();

        for _ in 0..5 {
            let result = cb
                .call_with(is_store_failure, async {
                    Err::<(), _>(sqlx::Error::ColumnNotFound(
                        "numeric field overflow".to_string(),
                    ))
                })
                .await;
            assert!(matches!(result, Err(Error::Inner(_))));
        }

        let result = cb
            .call_with(is_store_failure, async { Ok::<(), sqlx::Error>(()) })
            .await;
        assert!(result.is_ok(), "a healthy write must not be rejected");
    }

    #[tokio::test]
    async fn test_pool_timeouts_open_circuit() {
        let cb = create_db_circuit_breaker();

        for _ in 0..5 {
            let _ = cb
                .call_with(is_store_failure, async {
                    Err::<(), _>(sqlx::Error::PoolTimedOut)
                })
                .await;
        }

        let result = cb
            .call_with(is_store_failure, async { Ok::<(), sqlx::Error>(()) })
            .await;
        assert!(matches!(result, Err(Error::Rejected)));
    }

    #[test]
    fn test_store_failure_classification() {
        assert!(is_store_failure(&sqlx::Error::PoolClosed));
        assert!(is_store_failure(&sqlx::Error::PoolTimedOut));
        assert!(!is_store_failure(&sqlx::Error::RowNotFound));
        assert!(!is_store_failure(&sqlx::Error::ColumnNotFound(
            "income".to_string()
        )));
    }

    #[tokio::test]
    async fn test_circuit_breaker_allows_success() {
        let cb = create_db_circuit_breaker();

        let result = cb.call(async { Ok::<u64, &str>(1) }).await;

        assert!(matches!(result, Ok(1)));
    }
}
