use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use police_station_sim::config::StationConfig;
use police_station_sim::core::SimTime;
use police_station_sim::report::{print_records, ChannelReporter, TracingReporter};
use police_station_sim::Simulator;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Симуляция приёма заявлений в полицейском участке
#[derive(Parser, Debug)]
#[command(name = "police-station-sim", version, about)]
struct Cli {
    /// Файл конфигурации в формате RON
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    officers: Option<usize>,

    #[arg(long)]
    desks: Option<usize>,

    /// Горизонт моделирования в единицах времени
    #[arg(long)]
    horizon: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Вывести итог в JSON
    #[arg(long)]
    json: bool,

    /// Не печатать поток событий; он виден в логе при RUST_LOG=debug
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn station_config(&self) -> anyhow::Result<StationConfig> {
        let mut config = match &self.config {
            Some(path) => StationConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => StationConfig::default(),
        };
        if let Some(officers) = self.officers {
            config.officers = officers;
        }
        if let Some(desks) = self.desks {
            config.desks = desks;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = SimTime::new(horizon);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Логи идут в stderr, поток событий в stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.station_config()?;
    let mut simulator = Simulator::new(config).context("invalid station configuration")?;

    let summary = if cli.quiet {
        let mut reporter = TracingReporter::default();
        let summary = simulator.run(&mut reporter)?;
        debug!("Событий в логе: {}", reporter.reported());
        summary
    } else {
        let (mut reporter, rx) = ChannelReporter::channel();
        let printer = tokio::spawn(print_records(rx));
        let summary = tokio::task::spawn_blocking(move || simulator.run(&mut reporter)).await??;
        printer.await?;
        summary
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}
