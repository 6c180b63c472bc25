use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use sealfig::cli::{Cli, EXIT_TOOL_ERROR, exit_code};
use sealfig::settings::{LogFormat, Settings};
use sealfig::{ConfigResult, ConfigValue, Sealfig, SealfigError, TerminalReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("sealfig: {e}");
            return ExitCode::from(EXIT_TOOL_ERROR);
        }
    };
    init_tracing(
        cli.log_level.as_deref().unwrap_or(&settings.log),
        settings.log_format,
    );

    let sealfig = Sealfig::builder()
        .provider_settings(settings.providers)
        .flag_catalog(Cli::flag_catalog())
        .build();
    let action = cli.into_action();
    tracing::debug!(?action, "running");

    match sealfig.handle(&action, &TerminalReader) {
        Ok(result) => match print_result(&result) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("sealfig: could not write output: {e}");
                ExitCode::from(EXIT_TOOL_ERROR)
            }
        },
        Err(e) => {
            report(&e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing(filter: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let layer = match format {
        LogFormat::Compact => fmt.compact().with_filter(filter).boxed(),
        LogFormat::Full => fmt.with_filter(filter).boxed(),
    };
    tracing_subscriber::registry().with(layer).init();
}

/// Secrets are written as raw bytes; everything else through `Display`.
fn print_result(result: &ConfigResult) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match result {
        ConfigResult::Value(ConfigValue::Secret(bytes)) => {
            stdout.write_all(bytes)?;
            writeln!(stdout)
        }
        other => {
            let text = other.to_string();
            if text.is_empty() {
                return Ok(());
            }
            writeln!(stdout, "{text}")
        }
    }
}

fn report(err: &SealfigError) {
    eprintln!("sealfig: {err}");
    if let SealfigError::NoCryptoConfigured { .. } = err {
        eprintln!("hint: run `sealfig init` first, or use --plain-text to store the value unencrypted");
    }
}
