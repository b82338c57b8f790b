#![allow(clippy::struct_excessive_bools)]
#![forbid(unsafe_code)]

use crate::config::{Args, EchoprobeConfig};
use clap::Parser;
use echoprobe_privilege::Privilege;

mod app;
mod config;
mod report;
mod resolve;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let privilege = Privilege::acquire_privileges()?;
    let cfg = EchoprobeConfig::from(args, &privilege)?;
    app::run_echoprobe(&cfg)
}
