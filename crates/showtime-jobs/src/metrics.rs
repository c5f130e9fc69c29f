//! Job engine metrics, recorded through the `metrics` facade.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    pub const JOBS_ENQUEUED_TOTAL: &str = "showtime_jobs_enqueued_total";
    pub const JOBS_DEQUEUED_TOTAL: &str = "showtime_jobs_dequeued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "showtime_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "showtime_jobs_failed_total";
    pub const JOBS_RETRIED_TOTAL: &str = "showtime_jobs_retried_total";
    pub const JOBS_DEAD_LETTERED_TOTAL: &str = "showtime_jobs_dead_lettered_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "showtime_jobs_cancelled_total";
    pub const JOBS_TIMED_OUT_TOTAL: &str = "showtime_jobs_timed_out_total";
    pub const JOB_DURATION_SECONDS: &str = "showtime_job_duration_seconds";
    pub const JOB_WAIT_TIME_SECONDS: &str = "showtime_job_wait_time_seconds";
    pub const WORKERS_BUSY: &str = "showtime_workers_busy";
    pub const WORKERS_CONCURRENCY: &str = "showtime_workers_concurrency";
    pub const SCHEDULER_IS_LEADER: &str = "showtime_scheduler_is_leader";
    pub const SCHEDULER_JOBS_TRIGGERED: &str = "showtime_scheduler_jobs_triggered_total";
}

/// Registers metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(names::JOBS_ENQUEUED_TOTAL, "Jobs enqueued");
    describe_counter!(names::JOBS_DEQUEUED_TOTAL, "Jobs claimed by a worker");
    describe_counter!(names::JOBS_COMPLETED_TOTAL, "Jobs completed successfully");
    describe_counter!(names::JOBS_FAILED_TOTAL, "Failed job runs");
    describe_counter!(names::JOBS_RETRIED_TOTAL, "Job retries scheduled");
    describe_counter!(names::JOBS_DEAD_LETTERED_TOTAL, "Jobs moved to the dead letter queue");
    describe_counter!(names::JOBS_CANCELLED_TOTAL, "Jobs cancelled before running");
    describe_counter!(names::JOBS_TIMED_OUT_TOTAL, "Job runs that hit their timeout");
    describe_histogram!(names::JOB_DURATION_SECONDS, "Job run duration in seconds");
    describe_histogram!(
        names::JOB_WAIT_TIME_SECONDS,
        "Time between a job becoming due and starting, in seconds"
    );
    describe_gauge!(names::WORKERS_BUSY, "Worker slots currently running a job");
    describe_gauge!(names::WORKERS_CONCURRENCY, "Worker pool concurrency");
    describe_gauge!(
        names::SCHEDULER_IS_LEADER,
        "Whether this instance holds the scheduler lock (1) or not (0)"
    );
    describe_counter!(names::SCHEDULER_JOBS_TRIGGERED, "Cron entries fired");
}

/// Job lifecycle metrics.
#[derive(Clone, Copy)]
pub struct JobMetrics;

impl JobMetrics {
    pub fn job_enqueued(queue: &str, job_name: &str, delayed: bool) {
        counter!(
            names::JOBS_ENQUEUED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string(),
            "delayed" => delayed.to_string()
        )
        .increment(1);
    }

    pub fn job_dequeued(queue: &str, job_name: &str) {
        counter!(
            names::JOBS_DEQUEUED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    pub fn job_completed(queue: &str, job_name: &str, duration: Duration) {
        counter!(
            names::JOBS_COMPLETED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string()
        )
        .increment(1);
        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_name" => job_name.to_string(),
            "status" => "completed"
        )
        .record(duration.as_secs_f64());
    }

    pub fn job_failed(queue: &str, job_name: &str, error_kind: &str, duration: Duration) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string(),
            "error_type" => error_kind.to_string()
        )
        .increment(1);
        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_name" => job_name.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }

    pub fn job_retried(queue: &str, job_name: &str, attempt: u32) {
        counter!(
            names::JOBS_RETRIED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string(),
            "attempt" => attempt.to_string()
        )
        .increment(1);
    }

    pub fn job_dead_lettered(queue: &str, job_name: &str, reason: &str) {
        counter!(
            names::JOBS_DEAD_LETTERED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn job_cancelled(queue: &str, job_name: &str) {
        counter!(
            names::JOBS_CANCELLED_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    pub fn job_timed_out(queue: &str, job_name: &str) {
        counter!(
            names::JOBS_TIMED_OUT_TOTAL,
            "queue" => queue.to_string(),
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    pub fn job_wait_time(job_name: &str, wait: Duration) {
        histogram!(names::JOB_WAIT_TIME_SECONDS, "job_name" => job_name.to_string())
            .record(wait.as_secs_f64());
    }
}

/// Worker pool metrics.
#[derive(Clone, Copy)]
pub struct WorkerMetrics;

impl WorkerMetrics {
    #[allow(clippy::cast_precision_loss)]
    pub fn update_workers(pool_id: &str, busy: usize, concurrency: usize) {
        gauge!(names::WORKERS_BUSY, "pool_id" => pool_id.to_string()).set(busy as f64);
        gauge!(names::WORKERS_CONCURRENCY, "pool_id" => pool_id.to_string())
            .set(concurrency as f64);
    }
}

/// Scheduler metrics.
#[derive(Clone, Copy)]
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    pub fn update_leader_status(scheduler_id: &str, is_leader: bool) {
        gauge!(names::SCHEDULER_IS_LEADER, "scheduler_id" => scheduler_id.to_string())
            .set(if is_leader { 1.0 } else { 0.0 });
    }

    pub fn job_triggered(job_name: &str) {
        counter!(names::SCHEDULER_JOBS_TRIGGERED, "job_name" => job_name.to_string())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        register_metrics();
        JobMetrics::job_enqueued("bookings", "release-seats-delete-booking", true);
        JobMetrics::job_completed("bookings", "release-seats-delete-booking", Duration::from_millis(20));
        SchedulerMetrics::update_leader_status("scheduler-1", true);
    }
}
