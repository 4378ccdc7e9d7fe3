use app_maxnorm::{max_norm_ratings, write_report, Params, SeededScatter, ThreadRngScatter};
use common::{init_logger, Engine};
use eyre::Result;
use log::info;
use sequential::SequentialEngine;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};
use structopt::{clap::AppSettings, StructOpt};

#[derive(StructOpt, Debug)]
#[structopt(setting = AppSettings::AllowNegativeNumbers)]
struct Opt {
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
}

fn main() -> Result<()> {
    init_logger();

    let opt = Opt::from_args();
    let params = Params::parse(&opt.fan_out, &opt.top)?;

    let engine = SequentialEngine::default();
    let lines = engine.text_file(&opt.input_file, opt.partitions.unwrap_or(params.fan_out))?;
    info!("read {} lines in {} partitions", lines.len(), lines.num_partitions());

    let ranked = match opt.seed {
        Some(seed) => max_norm_ratings(&engine, lines, &params, SeededScatter(seed))?,
        None => max_norm_ratings(&engine, lines, &params, ThreadRngScatter)?,
    };

    let mut out: Box<dyn Write> = match &opt.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    write_report(&mut out, &params, &opt.input_file, &ranked)?;
    out.flush()?;
    Ok(())
}
