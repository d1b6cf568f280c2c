use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::debug;

use imagedb::cli::SubCommandExtend;
use imagedb::{Error, Opts, SubCommand};

async fn run(opts: &Opts) -> anyhow::Result<()> {
    match &opts.subcmd {
        SubCommand::Init(config) => config.run(opts).await,
        SubCommand::Config(config) => config.run(opts).await,
        SubCommand::Save(config) => config.run(opts).await,
        SubCommand::Load(config) => config.run(opts).await,
        SubCommand::Search(config) => config.run(opts).await,
        SubCommand::Delete(config) => config.run(opts).await,
        SubCommand::List(config) => config.run(opts).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let opts = Opts::parse();
    debug!("{:?}", opts);

    match run(&opts).await {
        Ok(()) => ExitCode::SUCCESS,
        // 未找到属于正常结果，使用单独的退出码
        Err(e) => match e.downcast_ref::<Error>() {
            Some(err) if err.is_not_found() => {
                eprintln!("{err}");
                ExitCode::from(2)
            }
            _ => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
