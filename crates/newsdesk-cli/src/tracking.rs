//! `pipeline_runs` bookkeeping around a unit of work with a deadline.

use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;
use newsdesk_db::RunType;
use serde_json::Value;
use sqlx::PgPool;
use tokio::time::Instant;

/// Lifecycle writes for one tracked run.
#[async_trait]
pub(crate) trait RunTracker: Send + Sync {
    /// Create the run and move it to running. Returns its id.
    async fn begin(&self, run_type: RunType) -> anyhow::Result<i64>;
    async fn complete(&self, run_id: i64, records: i32, metrics: &Value) -> anyhow::Result<()>;
    async fn fail(&self, run_id: i64, message: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl RunTracker for PgPool {
    async fn begin(&self, run_type: RunType) -> anyhow::Result<i64> {
        let run = newsdesk_db::create_pipeline_run(self, run_type, "cli").await?;
        if let Err(e) = newsdesk_db::start_pipeline_run(self, run.id).await {
            fail_best_effort(self, run.id, run_type, &format!("{e:#}")).await;
            return Err(e.into());
        }
        Ok(run.id)
    }

    async fn complete(&self, run_id: i64, records: i32, metrics: &Value) -> anyhow::Result<()> {
        newsdesk_db::complete_pipeline_run(self, run_id, records, metrics).await?;
        Ok(())
    }

    async fn fail(&self, run_id: i64, message: &str) -> anyhow::Result<()> {
        newsdesk_db::fail_pipeline_run(self, run_id, message).await?;
        Ok(())
    }
}

/// Run `work` as a tracked `run_type` run that must finish by `deadline`.
///
/// On success `summarize` supplies the processed count and metrics for the
/// completed row. A work error, an expired deadline, or a failed completion
/// write marks the run failed and is returned as an error.
pub(crate) async fn run_tracked<T, E, F, S>(
    tracker: &dyn RunTracker,
    run_type: RunType,
    deadline: Instant,
    work: F,
    summarize: S,
) -> anyhow::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display + Into<anyhow::Error>,
    S: FnOnce(&T) -> (i32, Value),
{
    let run_id = tracker.begin(run_type).await?;

    let output = match tokio::time::timeout_at(deadline, work).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            fail_best_effort(tracker, run_id, run_type, &format!("{e:#}")).await;
            return Err(e.into());
        }
        Err(_) => {
            let message = "wall-clock deadline exceeded";
            fail_best_effort(tracker, run_id, run_type, message).await;
            anyhow::bail!("{run_type} run {run_id}: {message}");
        }
    };

    let (records, metrics) = summarize(&output);
    if let Err(e) = tracker.complete(run_id, records, &metrics).await {
        fail_best_effort(tracker, run_id, run_type, &format!("{e:#}")).await;
        return Err(e);
    }
    Ok(output)
}

/// Mark a run failed, logging instead of propagating if that write fails too.
async fn fail_best_effort(
    tracker: &dyn RunTracker,
    run_id: i64,
    run_type: RunType,
    message: &str,
) {
    if let Err(mark_err) = tracker.fail(run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {run_type} run as failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Status {
        Running,
        Succeeded(i32),
        Failed(String),
    }

    #[derive(Default)]
    struct MemoryTracker {
        runs: Mutex<Vec<Status>>,
        reject_complete: bool,
    }

    impl MemoryTracker {
        fn statuses(&self) -> Vec<Status> {
            self.runs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RunTracker for MemoryTracker {
        async fn begin(&self, _run_type: RunType) -> anyhow::Result<i64> {
            let mut runs = self.runs.lock().unwrap();
            runs.push(Status::Running);
            Ok(i64::try_from(runs.len()).unwrap())
        }

        async fn complete(&self, run_id: i64, records: i32, _metrics: &Value) -> anyhow::Result<()> {
            if self.reject_complete {
                anyhow::bail!("connection reset");
            }
            self.runs.lock().unwrap()[usize::try_from(run_id - 1).unwrap()] =
                Status::Succeeded(records);
            Ok(())
        }

        async fn fail(&self, run_id: i64, message: &str) -> anyhow::Result<()> {
            self.runs.lock().unwrap()[usize::try_from(run_id - 1).unwrap()] =
                Status::Failed(message.to_string());
            Ok(())
        }
    }

    fn summary(n: &usize) -> (i32, Value) {
        (i32::try_from(*n).unwrap(), serde_json::json!({ "saved": n }))
    }

    #[tokio::test(start_paused = true)]
    async fn work_past_the_deadline_fails_the_run() {
        let tracker = MemoryTracker::default();
        let deadline = Instant::now() + Duration::from_secs(900);
        let work = async {
            tokio::time::sleep(Duration::from_secs(901)).await;
            Ok::<usize, anyhow::Error>(3)
        };

        let err = run_tracked(&tracker, RunType::Pipeline, deadline, work, summary)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("deadline exceeded"), "{err}");
        assert_eq!(
            tracker.statuses(),
            vec![Status::Failed("wall-clock deadline exceeded".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn work_inside_the_deadline_completes_the_run() {
        let tracker = MemoryTracker::default();
        let deadline = Instant::now() + Duration::from_secs(900);
        let work = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<usize, anyhow::Error>(3)
        };

        let saved = run_tracked(&tracker, RunType::Pipeline, deadline, work, summary)
            .await
            .unwrap();

        assert_eq!(saved, 3);
        assert_eq!(tracker.statuses(), vec![Status::Succeeded(3)]);
    }

    #[tokio::test]
    async fn work_error_is_recorded_and_returned() {
        let tracker = MemoryTracker::default();
        let deadline = Instant::now() + Duration::from_secs(900);
        let work = async {
            Err::<usize, anyhow::Error>(anyhow::anyhow!("stage title_filter failed"))
        };

        let err = run_tracked(&tracker, RunType::Digest, deadline, work, summary)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "stage title_filter failed");
        assert_eq!(
            tracker.statuses(),
            vec![Status::Failed("stage title_filter failed".into())]
        );
    }

    #[tokio::test]
    async fn failed_completion_write_marks_the_run_failed() {
        let tracker = MemoryTracker {
            reject_complete: true,
            ..MemoryTracker::default()
        };
        let deadline = Instant::now() + Duration::from_secs(900);

        let work = async { Ok::<usize, anyhow::Error>(1) };

        let err = run_tracked(&tracker, RunType::Pipeline, deadline, work, summary)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert_eq!(tracker.statuses(), vec![Status::Failed("connection reset".into())]);
    }
}
