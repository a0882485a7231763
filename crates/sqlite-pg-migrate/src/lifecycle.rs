//! Ending a connection scope.

use tracing::{debug, error, warn};

use crate::core::Transactional;
use crate::error::Result;

/// Commit `scope` if `outcome` succeeded, roll it back otherwise.
///
/// A failed commit becomes the returned error. A failed rollback is only
/// logged; the original error is returned.
pub async fn complete<S, T>(scope: S, outcome: Result<T>) -> Result<T>
where
    S: Transactional,
{
    let label = scope.label();
    match outcome {
        Ok(value) => {
            scope.commit().await?;
            debug!("{}: committed", label);
            Ok(value)
        }
        Err(err) => {
            error!("{}: {}", label, err);
            match scope.rollback().await {
                Ok(()) => debug!("{}: rolled back", label),
                Err(rollback_err) => warn!("{}: rollback failed: {}", label, rollback_err),
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<&'static str>>>);

    impl Journal {
        fn entries(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeScope {
        journal: Journal,
        fail_commit: bool,
        fail_rollback: bool,
    }

    impl FakeScope {
        fn new(journal: &Journal) -> Self {
            Self {
                journal: journal.clone(),
                fail_commit: false,
                fail_rollback: false,
            }
        }
    }

    #[async_trait]
    impl Transactional for FakeScope {
        fn label(&self) -> &'static str {
            "fake"
        }

        async fn commit(self) -> Result<()> {
            self.journal.0.lock().unwrap().push("commit");
            if self.fail_commit {
                return Err(MigrateError::transfer("genre", "commit refused"));
            }
            Ok(())
        }

        async fn rollback(self) -> Result<()> {
            self.journal.0.lock().unwrap().push("rollback");
            if self.fail_rollback {
                return Err(MigrateError::transfer("genre", "connection lost"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_commits() {
        let journal = Journal::default();
        let value = complete(FakeScope::new(&journal), Ok(42)).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(journal.entries(), vec!["commit"]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_keeps_error() {
        let journal = Journal::default();
        let outcome: Result<()> = Err(MigrateError::invalid("film_work", "rating", "150 is outside [0, 100]"));
        let err = complete(FakeScope::new(&journal), outcome).await.unwrap_err();
        assert!(matches!(err, MigrateError::InvalidField { .. }));
        assert_eq!(journal.entries(), vec!["rollback"]);
    }

    #[tokio::test]
    async fn test_rollback_failure_does_not_mask_error() {
        let journal = Journal::default();
        let mut scope = FakeScope::new(&journal);
        scope.fail_rollback = true;
        let outcome: Result<()> = Err(MigrateError::Config("boom".into()));
        let err = complete(scope, outcome).await.unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[tokio::test]
    async fn test_commit_failure_is_returned() {
        let journal = Journal::default();
        let mut scope = FakeScope::new(&journal);
        scope.fail_commit = true;
        let err = complete(scope, Ok(())).await.unwrap_err();
        assert!(err.to_string().contains("commit refused"));
    }
}
