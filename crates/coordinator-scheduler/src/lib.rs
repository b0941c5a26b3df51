pub mod scheduler;

pub use scheduler::{EpochScheduler, SchedulerHandle};
