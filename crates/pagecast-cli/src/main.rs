use clap::{Args, Parser, Subcommand};
use pagecast_core::{
    catalog::{Catalog, Song, TrackLength, total_length},
    clock::LogicalClock,
    config::PagecastConfig,
    db::Page,
    error::InternalError,
    obs::metrics_report,
    stream::{Emission, PageSource, Recorder},
};
use serde::Serialize;
use std::{path::PathBuf, process::ExitCode, time::Duration};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Page through the pagecast music catalog")]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(long, global = true, env = "PAGECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding bands.csv, albums.csv and songs.csv.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// One resolved page of songs, `[start, end)`.
    Page { start: usize, end: usize },

    /// Every page of songs, pulled until exhaustion.
    Pages(PagesArgs),

    /// Replay the catalog on a logical clock, one page per tick.
    Replay(ReplayArgs),

    /// Songs of one band with their total running time.
    Band { name: String },

    /// Load the catalog and print the runtime counters.
    Stats,
}

#[derive(Args)]
struct PagesArgs {
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Args)]
struct ReplayArgs {
    #[arg(long)]
    page_size: Option<usize>,

    /// Tick interval in logical milliseconds.
    #[arg(long)]
    every_ms: Option<u64>,

    /// Stop after this much logical time; runs to completion when omitted.
    #[arg(long)]
    for_ms: Option<u64>,

    /// Skip ticks closer than this to the last emitted page.
    #[arg(long)]
    coalesce_ms: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.display_with_class());
            if err.is_not_found() {
                eprintln!("hint: point --data-dir at the directory holding the catalog CSV files");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .compact()
        .without_time()
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), InternalError> {
    let mut config = match &cli.config {
        Some(path) => PagecastConfig::load(path)?,
        None => PagecastConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.catalog.data_dir = dir;
    }

    debug!(data_dir = %config.catalog.data_dir.display(), "opening catalog");
    let catalog = Catalog::from_dir(&config.catalog.data_dir);
    let out = Output { json: cli.json };

    match cli.cmd {
        Cmd::Page { start, end } => {
            let page = catalog.songs_query().get_page(start, end)?;
            out.page(&page)
        }
        Cmd::Pages(args) => {
            let page_size = page_size(args.page_size, &config)?;
            for page in catalog.songs_query().stream_pages(page_size) {
                out.page(&page?)?;
            }
            Ok(())
        }
        Cmd::Replay(args) => replay(&catalog, &config, &args, &out),
        Cmd::Band { name } => {
            let songs = catalog.band_songs(&name)?;
            out.band(&name, &songs)
        }
        Cmd::Stats => {
            catalog.bands().load()?;
            catalog.albums().load()?;
            catalog.songs().load()?;
            out.json_or(&metrics_report(), |report| {
                println!("store loads:    {}", report.ops.store_loads);
                println!("records loaded: {}", report.ops.records_loaded);
                for (path, counters) in &report.paths {
                    println!("  {path}: {} records", counters.records_loaded);
                }
            })
        }
    }
}

fn page_size(arg: Option<usize>, config: &PagecastConfig) -> Result<usize, InternalError> {
    match arg.unwrap_or(config.paging.page_size) {
        0 => Err(InternalError::query_unsupported("page size must be at least 1")),
        size => Ok(size),
    }
}

fn replay(
    catalog: &Catalog,
    config: &PagecastConfig,
    args: &ReplayArgs,
    out: &Output,
) -> Result<(), InternalError> {
    let page_size = page_size(args.page_size, config)?;
    let every = args
        .every_ms
        .map_or_else(|| config.stream.interval(), Duration::from_millis);
    let coalesce = args
        .coalesce_ms
        .map(Duration::from_millis)
        .or_else(|| config.stream.coalesce());

    let mut batcher = catalog.songs_query().stream_pages_every(page_size, every);
    if let Some(min_interval) = coalesce {
        batcher = batcher.coalesced(min_interval);
    }

    let clock = LogicalClock::new();
    let recorder = Recorder::new(&clock);
    let subscription = batcher.subscribe(&clock, recorder.observer());

    match args.for_ms {
        Some(limit) => {
            clock.advance_by(Duration::from_millis(limit));
            subscription.cancel();
        }
        None => {
            while clock.pending() > 0 {
                clock.advance_by(batcher.every());
            }
        }
    }

    for recorded in recorder.emissions() {
        let at_ms = recorded.at.as_millis();
        match recorded.emission {
            Emission::Next(page) => out.replay_page(at_ms, &page)?,
            Emission::Completed => out.replay_event(at_ms, "completed")?,
            Emission::Failed(err) => return Err(err.into()),
        }
    }

    Ok(())
}

///
/// Output
///

struct Output {
    json: bool,
}

#[derive(Serialize)]
struct BandView<'a> {
    band: &'a str,
    songs: &'a [Song],
    total: TrackLength,
    total_display: String,
}

#[derive(Serialize)]
struct ReplayLine<'a> {
    at_ms: u64,
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a [Song]>,
}

impl Output {
    fn json_or<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<(), InternalError> {
        if self.json {
            let line = serde_json::to_string(value)
                .map_err(|err| InternalError::stream_internal(err.to_string()))?;
            println!("{line}");
        } else {
            text(value);
        }

        Ok(())
    }

    fn page(&self, page: &Page<Song>) -> Result<(), InternalError> {
        self.json_or(page, |page| {
            let range = page.range();
            println!("-- songs [{}, {}) --", range.start, range.end);
            for song in page.iter() {
                print_song(song);
            }
        })
    }

    fn band(&self, name: &str, songs: &[Song]) -> Result<(), InternalError> {
        let total = total_length(songs);
        let view = BandView {
            band: name,
            songs,
            total,
            total_display: total.to_string(),
        };

        self.json_or(&view, |view| {
            if view.songs.is_empty() {
                println!("no songs for '{}'", view.band);
                return;
            }
            for song in view.songs {
                print_song(song);
            }
            println!("{} songs, {}", view.songs.len(), view.total_display);
        })
    }

    fn replay_page(&self, at_ms: u64, page: &Page<Song>) -> Result<(), InternalError> {
        let line = ReplayLine {
            at_ms,
            event: "page",
            records: Some(page.records()),
        };

        self.json_or(&line, |line| {
            let ids = line
                .records
                .unwrap_or_default()
                .iter()
                .map(|song| song.song_id.to_string())
                .collect::<Vec<_>>();
            println!("{:>8}ms  page [{}]", line.at_ms, ids.join(" "));
        })
    }

    fn replay_event(&self, at_ms: u64, event: &str) -> Result<(), InternalError> {
        let line = ReplayLine {
            at_ms,
            event,
            records: None,
        };

        self.json_or(&line, |line| println!("{:>8}ms  {}", line.at_ms, line.event))
    }
}

fn print_song(song: &Song) {
    println!(
        "{:>4}  {:<40} {:>7}  band {} album {}",
        song.song_id,
        song.name,
        song.length.to_string(),
        song.band_id,
        song.album_id
    );
}
