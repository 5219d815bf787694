//! FinChat Bootstrap
//!
//! イメージのビルドとサービスの起動

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use std::process::ExitCode;

use finchat_bootstrap::adapter::config::Config;
use finchat_bootstrap::adapter::http::shutdown_signal;
use finchat_bootstrap::driver::workflow::{exit_code_for, is_build_failure, render_descriptor};
use finchat_bootstrap::driver::{Args, BuildWorkflow, Command, ServeWorkflow};

fn runtime(workers: Option<usize>) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = workers.filter(|w| *w > 0) {
        builder.worker_threads(workers);
    }
    builder.build().context("Failed to start async runtime")
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn run(args: Args) -> Result<()> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    config.apply_process_env()?;

    match args.command {
        Command::Build(build) => {
            let workflow = BuildWorkflow::new(config);
            runtime(None)?.block_on(workflow.execute(&build))?;
        }
        Command::Serve(serve) => {
            let workflow = ServeWorkflow::new(config, &serve);
            // 解決できなければランタイムを起動せずに終了する
            let plan = workflow.prepare()?;
            runtime(workflow.workers())?.block_on(ServeWorkflow::run(plan, shutdown_signal()))?;
        }
        Command::Render => {
            print!("{}", render_descriptor(&config)?);
        }
    }

    Ok(())
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if is_build_failure(&e) {
                error!("✗ Build failed: {:#}", e);
            } else {
                error!("✗ {:#}", e);
            }
            ExitCode::from(exit_code_for(&e))
        }
    }
}
