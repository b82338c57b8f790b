use crate::config::{EchoprobeConfig, LogFormat, LogSpanEvents, OutputFormat};
use crate::report::json::JsonReport;
use crate::report::text::{self, TextReport};
use crate::resolve;
use anyhow::Context;
use echoprobe_core::{defaults, Builder, Pinger};
use std::net::IpAddr;
use tracing_subscriber::fmt::format::FmtSpan;

/// Run echoprobe.
pub fn run_echoprobe(cfg: &EchoprobeConfig) -> anyhow::Result<()> {
    configure_logging(cfg);
    let addr = resolve::resolve_target(&cfg.target, cfg.addr_family)?;
    let pinger = make_builder(cfg, addr).build()?;
    tracing::debug!(?pinger);
    if cfg.debug {
        println!("Precision +/- {:?}", pinger.tick_duration());
    }
    set_interrupt_handler(&pinger)?;
    let reason = match cfg.output {
        OutputFormat::Text => {
            println!("{}", text::format_header(&pinger));
            pinger
                .run_with(&TextReport::new(&cfg.target))
                .context("failed to ping target host")?
                .reason
        }
        OutputFormat::Json => {
            let report = JsonReport::new(&cfg.target);
            let outcome = pinger
                .run_with(&report)
                .context("failed to ping target host")?;
            report.write(std::io::stdout().lock(), &outcome.statistics)?;
            outcome.reason
        }
    };
    tracing::debug!(?reason);
    Ok(())
}

/// Make the pinger builder.
///
/// The socket read timeout is capped at the interval so that short intervals remain valid.
fn make_builder(cfg: &EchoprobeConfig, addr: IpAddr) -> Builder {
    Builder::new(addr)
        .target_name(cfg.target.clone())
        .source_addr(cfg.source_addr)
        .privilege_mode(cfg.privilege_mode)
        .payload_size(cfg.payload_size)
        .payload_pattern(cfg.payload_pattern)
        .ttl(cfg.ttl)
        .count(cfg.count)
        .interval(cfg.interval)
        .timeout(cfg.timeout)
        .deadline(cfg.deadline)
        .read_timeout(defaults::DEFAULT_READ_TIMEOUT.min(cfg.interval))
        .drop_privileges(true)
}

/// Stop the pinger, and so print the final statistics, when interrupted.
fn set_interrupt_handler(pinger: &Pinger) -> anyhow::Result<()> {
    let pinger = pinger.clone();
    ctrlc::set_handler(move || {
        tracing::debug!("interrupted");
        pinger.stop();
    })?;
    Ok(())
}

/// Configure the logging subscriber, if verbose logging is enabled.
fn configure_logging(cfg: &EchoprobeConfig) {
    if cfg.verbose {
        let fmt_span = match cfg.log_span_events {
            LogSpanEvents::Off => FmtSpan::NONE,
            LogSpanEvents::Active => FmtSpan::ACTIVE,
            LogSpanEvents::Full => FmtSpan::FULL,
        };
        match cfg.log_format {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .with_writer(std::io::stderr)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .with_writer(std::io::stderr)
                    .pretty()
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .with_writer(std::io::stderr)
                    .json()
                    .init();
            }
        }
    }
}
