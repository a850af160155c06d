//! Background job scheduler and job implementations.

mod geofence_stats_rollup;
mod pool_metrics;
mod scheduler;
mod submission_retry;
mod vmur_expiry;

pub use geofence_stats_rollup::GeofenceStatsRollupJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::JobScheduler;
pub use submission_retry::SubmissionRetryJob;
pub use vmur_expiry::VmurExpiryJob;
