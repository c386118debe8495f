// Panic isolation for operation bodies
use crate::domain::{OperationError, OperationOutcome};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Run an operation future, turning a panic into `OperationError::Panicked`.
///
/// A panicking operation must only fail its own target, never the batch.
pub async fn execute_guarded<F, T>(future: F) -> OperationOutcome<T>
where
    F: Future<Output = OperationOutcome<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let panic_msg = panic_message(payload.as_ref());
            error!(panic_msg = %panic_msg, "Operation panicked");
            Err(OperationError::Panicked(panic_msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guarded_success_passes_through() {
        let outcome = execute_guarded(async { Ok::<_, OperationError>(42) }).await;
        assert_eq!(outcome, Ok(42));
    }

    #[tokio::test]
    async fn test_guarded_error_passes_through() {
        let outcome: OperationOutcome<()> =
            execute_guarded(async { Err(OperationError::Failed("nope".into())) }).await;
        assert_eq!(outcome, Err(OperationError::Failed("nope".into())));
    }

    #[tokio::test]
    async fn test_guarded_panic_becomes_error() {
        let outcome = execute_guarded(async {
            if true {
                panic!("remote call blew up");
            }
            Ok::<(), OperationError>(())
        })
        .await;
        assert_eq!(
            outcome,
            Err(OperationError::Panicked("remote call blew up".into()))
        );
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "Unknown panic");
    }
}
