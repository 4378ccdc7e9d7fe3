use app_maxnorm::{max_norm_ratings, write_report, Params, SeededScatter, ThreadRngScatter};
use common::{init_logger, Engine};
use distributed::{ClusterConfig, LocalCluster};
use eyre::Result;
use log::info;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    time::Duration,
};
use structopt::{clap::AppSettings, StructOpt};

#[derive(StructOpt, Debug)]
#[structopt(setting = AppSettings::AllowNegativeNumbers)]
pub struct Opt {
    /// Scatter fan-out K
    #[structopt(allow_hyphen_values = true)]
    fan_out: String,
    /// Number of products to report, T
    #[structopt(allow_hyphen_values = true)]
    top: String,
    /// Newline-delimited `productId,userId,rating,timestamp` records
    input_file: PathBuf,
    /// Input partitions, defaults to K
    #[structopt(short, long)]
    partitions: Option<usize>,
    /// Scatter deterministically from this seed
    #[structopt(short, long)]
    seed: Option<u64>,
    #[structopt(short, long)]
    output: Option<PathBuf>,

    #[structopt(short, long)]
    workers: Option<usize>,
    #[structopt(short = "r", long, default_value = "10")]
    n_reduce: usize,
    #[structopt(long, default_value = "5000")]
    task_timeout_ms: u64,
    #[structopt(long, default_value = "4")]
    max_attempts: usize,
}

impl Opt {
    fn cluster_config(&self) -> ClusterConfig {
        let default = ClusterConfig::default();
        ClusterConfig {
            workers: self.workers.unwrap_or(default.workers),
            n_reduce: self.n_reduce,
            task_timeout: Duration::from_millis(self.task_timeout_ms),
            max_attempts: self.max_attempts,
        }
    }
}

fn main() -> Result<()> {
    init_logger();

    let opt = Opt::from_args();
    let params = Params::parse(&opt.fan_out, &opt.top)?;

    let cluster = LocalCluster::start(opt.cluster_config())?;
    let ranked = {
        let lines = cluster.text_file(&opt.input_file, opt.partitions.unwrap_or(params.fan_out));
        lines.and_then(|lines| {
            info!("read {} lines in {} partitions", lines.len(), lines.num_partitions());
            match opt.seed {
                Some(seed) => max_norm_ratings(&cluster, lines, &params, SeededScatter(seed)),
                None => max_norm_ratings(&cluster, lines, &params, ThreadRngScatter),
            }
        })
    };
    cluster.shutdown();
    let ranked = ranked?;

    let mut out: Box<dyn Write> = match &opt.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    write_report(&mut out, &params, &opt.input_file, &ranked)?;
    out.flush()?;
    Ok(())
}
