use std::{path::PathBuf, process::exit, sync::Arc};

use anyhow::bail;
use clap::Parser;
use common_utils::Logged;
use featureform_provider::ProviderRegistry;
use featureform_runner::{Config, JobRegistry, JobType};
use log::{debug, error, info};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Opt {
    /// Job type key, e.g. `MATERIALIZE`
    #[clap(long, env = "JOB_TYPE")]
    pub job_type: String,

    /// Base64 encoded job config
    #[clap(long, env = "CONFIG")]
    pub config: Option<String>,

    /// File holding the raw job config, used when `config` is not set
    #[clap(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

fn load_config(options: &Opt) -> anyhow::Result<Config> {
    match (&options.config, &options.config_file) {
        (Some(encoded), _) => Ok(base64::decode(encoded.trim())?.into()),
        (None, Some(path)) => {
            debug!("Reading job config from `{}`", path.to_string_lossy());
            Ok(std::fs::read(path)?.into())
        }
        (None, None) => bail!("Either --config or --config-file must be set"),
    }
}

async fn run_job(options: &Opt) -> anyhow::Result<()> {
    let job_type: JobType = options.job_type.parse()?;
    let config = load_config(options)?;

    let providers = Arc::new(ProviderRegistry::with_defaults());
    let jobs = JobRegistry::with_defaults(providers);

    let runner = jobs.create(job_type, &config).await.log()?;
    let watcher = runner.run().await.log()?;
    info!("Started {}", watcher);
    watcher.wait().await.log()?;
    info!("{}", watcher);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    common_utils::init_logger();

    let options = Opt::parse();

    if let Err(e) = run_job(&options).await {
        error!("{} job failed: {:#}", options.job_type, e);
        exit(1);
    }
    Ok(())
}
