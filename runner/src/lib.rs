mod config;
mod copy;
mod error;
mod job;
mod job_type;
mod materialize;
mod register_source;
mod registry;
mod training_set;
mod transformation;
mod watcher;

pub use config::{Config, JobConfig};
pub use copy::{CopyToOnlineConfig, CopyToOnlineFactory, CopyToOnlineRunner};
pub use error::JobError;
pub use job::{Runner, RunnerFactory};
pub use job_type::JobType;
pub use materialize::{MaterializeConfig, MaterializeFactory, MaterializeRunner};
pub use register_source::{RegisterSourceConfig, RegisterSourceFactory, RegisterSourceRunner};
pub use registry::JobRegistry;
pub use training_set::{CreateTrainingSetConfig, CreateTrainingSetFactory, CreateTrainingSetRunner};
pub use transformation::{
    CreateTransformationConfig, CreateTransformationFactory, CreateTransformationRunner,
};
pub use watcher::{AsyncWatcher, CompletionWatcher, JobStatus, SyncWatcher};

#[cfg(test)]
mod tests {
    use dotenv;
    use std::sync::Once;

    static INIT_ENV_LOGGER: Once = Once::new();

    pub fn init_logger() {
        dotenv::dotenv().ok();
        INIT_ENV_LOGGER.call_once(|| env_logger::init());
    }
}
