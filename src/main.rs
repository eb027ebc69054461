// thread_music - Turns OS thread scheduling into a multi-track MIDI file

use clap::Parser;
use std::path::PathBuf;
use thread_music::midi::{timestamped_output_path, write_smf};
use thread_music::{Session, SessionConfig};

#[derive(Parser)]
#[command(name = "thread_music")]
#[command(about = "Sonify thread scheduling as a MIDI file", long_about = None)]
struct Cli {
    /// Number of voice threads, the drum voice included
    #[arg(short = 'n', long = "num-threads")]
    num_threads: Option<i64>,

    /// Run length in seconds
    #[arg(short = 't', long = "time")]
    time: Option<i64>,

    /// Number of musical phases
    #[arg(short = 'p', long)]
    phases: Option<i64>,

    /// Seed for phrase generation (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Directory the MIDI file is written to
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// RON config file; command-line values take precedence
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig, thread_music::ConfigError> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };

        if let Some(n) = self.num_threads {
            config.voice_count = n;
        }
        if let Some(t) = self.time {
            config.duration_seconds = t;
        }
        if let Some(p) = self.phases {
            config.phase_count = p;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }

        Ok(config.sanitized())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.session_config()?;

    let path = timestamped_output_path(
        &config.output_dir,
        config.voices(),
        config.duration(),
        config.phases(),
    );

    let outcome = Session::new(&config).run()?;
    for report in &outcome.reports {
        log::debug!(
            "{}: {} iterations, {:.1}% scheduled",
            report.name,
            report.iterations,
            report.scheduled_share * 100.0
        );
    }
    if !outcome.violations.is_empty() {
        log::warn!("{} note pairing problems in the timeline", outcome.violations.len());
    }

    write_smf(&path, &outcome.events, &outcome.grid, outcome.track_count)?;
    log::info!(
        "Wrote {} events on {} tracks to {}",
        outcome.events.len(),
        outcome.track_count,
        path.display()
    );

    Ok(())
}
