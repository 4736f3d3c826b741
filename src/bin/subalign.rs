use std::{fs, path::Path, path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::json;
use subalign::{
    AlignConfig, AlignOutcome, AlignSettings, Aligner, AlignmentRequest, FrameSource,
    MediaFrameSource, ProgressCallback, ProgressInfo, RunOptions, SubtitleDocument, TimeRounding,
    TimecodeTable,
};

const CLI_AFTER_HELP: &str = "Examples:\n  subalign probe input.mkv --json\n  subalign align input.mkv --subs input.srt --picks picks.json --out aligned.srt --progress\n  subalign completions zsh > _subalign";

#[derive(Debug, Parser)]
#[command(
    name = "subalign",
    version,
    about = "Align subtitle lines to video by tracking picked key points",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Align subtitle lines to the video using picked key points.
    #[command(
        about = "Align subtitle lines to the video",
        after_help = "Examples:\n  subalign align input.mkv --subs input.srt --picks picks.json --out aligned.srt\n  subalign align input.mkv --subs input.srt --picks picks.json --out aligned.srt --tolerance 12 --max-backward 500 --max-forward 500"
    )]
    Align {
        /// Input media path.
        input: String,
        /// Subtitle file (.srt) whose lines are realigned.
        #[arg(long)]
        subs: PathBuf,
        /// JSON picks file: an array of {"line", "x", "y"} objects with an
        /// optional "frame" overriding the reference frame.
        #[arg(long)]
        picks: PathBuf,
        /// Output subtitle path.
        #[arg(long)]
        out: PathBuf,
        /// Color tolerance override (0-255).
        #[arg(long)]
        tolerance: Option<i64>,
        /// Max frames to track backwards (0 = unbounded).
        #[arg(long)]
        max_backward: Option<i64>,
        /// Max frames to track forwards (0 = unbounded).
        #[arg(long)]
        max_forward: Option<i64>,
        /// Settings file persisted across sessions.
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Print video stream information.
    #[command(
        about = "Print video stream information",
        after_help = "Examples:\n  subalign probe input.mkv\n  subalign probe input.mkv --json"
    )]
    Probe {
        /// Input media path.
        input: String,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// One entry of the picks file.
#[derive(Debug, Deserialize)]
struct Pick {
    /// Zero-based index of the subtitle line to realign.
    line: usize,
    /// Seed x coordinate.
    x: u32,
    /// Seed y coordinate.
    y: u32,
    /// Reference frame; defaults to the frame at the line's current start.
    #[serde(default)]
    frame: Option<u64>,
}

fn load_picks(path: &Path) -> Result<Vec<Pick>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|error| format!("cannot read picks file {}: {error}", path.display()))?;
    let picks: Vec<Pick> = serde_json::from_str(&content)
        .map_err(|error| format!("invalid picks file {}: {error}", path.display()))?;
    Ok(picks)
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::no_length();
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .expect("valid progress template"),
        );
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total);
        self.bar.set_position(info.current);
        self.bar.set_message(info.message.clone());
    }
}

fn run_align(
    global: &GlobalOptions,
    input: &str,
    subs: &Path,
    picks_path: &Path,
    out: &Path,
    tolerance: Option<i64>,
    max_backward: Option<i64>,
    max_forward: Option<i64>,
    settings_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_writable_path(out, global.overwrite)?;

    // Session configuration: persisted settings overlaid with CLI flags.
    let stored = settings_path
        .map(AlignSettings::load)
        .unwrap_or_default();
    let session = AlignSettings {
        tolerance: tolerance.unwrap_or(stored.tolerance),
        max_backward: max_backward.unwrap_or(stored.max_backward),
        max_forward: max_forward.unwrap_or(stored.max_forward),
    };
    // Invalid values abort here, before the video is even opened, and
    // leave any persisted settings untouched.
    let config = AlignConfig::from_settings(&session)?;

    let mut source = MediaFrameSource::open(input)?;
    let timecodes = source.scan_timecodes()?;
    let mut document = SubtitleDocument::load_srt(subs)?;

    let picks = load_picks(picks_path)?;
    let mut queue = Vec::with_capacity(picks.len());
    for pick in &picks {
        let line = document.lines.get(pick.line).ok_or_else(|| {
            format!(
                "pick targets line {} but {} has only {} lines",
                pick.line,
                subs.display(),
                document.lines.len()
            )
        })?;
        let reference_frame = pick
            .frame
            .unwrap_or_else(|| timecodes.frame_at_time(line.start, TimeRounding::Start));
        queue.push(AlignmentRequest {
            x: pick.x,
            y: pick.y,
            reference_frame,
            line: pick.line,
        });
    }

    let mut options = RunOptions::new();
    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()));
    }

    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    let report = aligner.run(&mut queue, &mut document, &options)?;

    match report.outcome {
        AlignOutcome::Completed => {
            let aligned = report.processed - report.skipped;
            println!(
                "{} {aligned} line(s) aligned, {} skipped",
                "done:".green().bold(),
                report.skipped
            );
        }
        AlignOutcome::Cancelled => {
            eprintln!(
                "{} cancelled with {} pick(s) unprocessed",
                "warning:".yellow().bold(),
                queue.len()
            );
        }
    }

    // Single commit of all modified lines.
    document.save_srt(out)?;

    // Persist the session values now that they are known valid.
    if let Some(path) = settings_path {
        session.save(path)?;
    }

    Ok(())
}

fn run_probe(input: &str, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = MediaFrameSource::open(input)?;
    let timecodes = source.scan_timecodes()?;
    let last_frame = source.frame_count().saturating_sub(1);
    let duration = timecodes.time_at_frame(last_frame, TimeRounding::End);

    if as_json {
        let payload = json!({
            "width": source.width(),
            "height": source.height(),
            "fps": source.frames_per_second(),
            "frame_count": source.frame_count(),
            "duration_seconds": duration.as_secs_f64(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("resolution:  {}x{}", source.width(), source.height());
        println!("fps:         {:.3}", source.frames_per_second());
        println!("frames:      {}", source.frame_count());
        println!("duration:    {:.3}s", duration.as_secs_f64());
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Align {
            input,
            subs,
            picks,
            out,
            tolerance,
            max_backward,
            max_forward,
            settings,
        } => run_align(
            &cli.global,
            &input,
            &subs,
            &picks,
            &out,
            tolerance,
            max_backward,
            max_forward,
            settings.as_deref(),
        ),
        Commands::Probe { input, json } => run_probe(&input, json),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
