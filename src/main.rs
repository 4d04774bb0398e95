use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use codesnap::config::EngineConfig;
use codesnap::database::{DatabaseEvent, DatabaseListener};
use codesnap::engine::{IndexServer, NameSearchParams, SearchParams};
use codesnap::output;
use codesnap::project::FileProjectDiscovery;
use codesnap::search::{FilePositionSpan, RegexEngine};
use codesnap::utils::init_logging;
use codesnap::utils::progress::{ProgressBar, ProgressStyle};
use codesnap::watch::DirectoryWatcher;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "codesnap")]
#[command(about = "In-memory, live-updating code search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log indexing progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorWhen::Auto)]
    color: ColorWhen,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorWhen {
    Auto,
    Never,
}

#[derive(Args)]
struct SearchArgs {
    /// Text or regular expression to find
    pattern: String,

    /// Case sensitive search
    #[arg(short = 's', long)]
    case_sensitive: bool,

    /// Only match whole words
    #[arg(short, long)]
    word: bool,

    /// Treat the pattern as a regular expression
    #[arg(short = 'e', long)]
    regex: bool,

    /// Regular expression engine
    #[arg(long)]
    engine: Option<RegexEngine>,

    /// Maximum number of matches (0 uses the configured default)
    #[arg(short, long, default_value_t = 0)]
    max_results: usize,

    /// Only search files whose relative path matches this glob
    #[arg(short, long)]
    glob: Option<String>,

    /// Print only the names of matching files
    #[arg(short = 'l', long)]
    files_with_matches: bool,

    /// Print the match count per file
    #[arg(short, long)]
    count: bool,

    /// Print the path on every line instead of as a heading
    #[arg(long)]
    no_heading: bool,

    /// Emit the raw result as JSON
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn params(&self) -> SearchParams {
        SearchParams {
            search_string: self.pattern.clone(),
            match_case: self.case_sensitive,
            match_whole_word: self.word,
            use_regex: self.regex,
            regex_engine: self.engine,
            max_results: self.max_results,
            file_path_pattern: self.glob.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index the given projects and report statistics
    Index {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },
    /// Search file contents
    Search {
        #[command(flatten)]
        args: SearchArgs,

        #[arg(short, long, default_value = ".")]
        path: Vec<PathBuf>,
    },
    /// Find files by name or glob
    Files {
        pattern: String,

        #[arg(short = 's', long)]
        case_sensitive: bool,

        #[arg(short, long, default_value = ".")]
        path: Vec<PathBuf>,
    },
    /// Find directories by name or glob
    Dirs {
        pattern: String,

        #[arg(short = 's', long)]
        case_sensitive: bool,

        #[arg(short, long, default_value = ".")]
        path: Vec<PathBuf>,
    },
    /// Print the lines around given character spans of one file
    Extract {
        file: PathBuf,

        /// Spans as `position:length`, in characters from the file start
        #[arg(required = true, value_parser = parse_span)]
        spans: Vec<FilePositionSpan>,

        #[arg(long)]
        json: bool,
    },
    /// Show index statistics
    Stats {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Keep the index live and answer queries read from stdin, one per line
    Watch {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },
}

fn parse_span(value: &str) -> Result<FilePositionSpan, String> {
    let (position, length) = value
        .split_once(':')
        .ok_or_else(|| format!("expected position:length, got {value}"))?;
    let position = position.parse().map_err(|e| format!("bad position: {e}"))?;
    let length = length.parse().map_err(|e| format!("bad length: {e}"))?;
    Ok(FilePositionSpan::new(position, length))
}

/// Spinner fed by database progress events.
struct SpinnerListener {
    spinner: ProgressBar,
}

impl DatabaseListener for SpinnerListener {
    fn on_database_event(&self, event: DatabaseEvent) {
        match event {
            DatabaseEvent::Partial(database) => self.spinner.set_message(format!(
                "Loading contents... {} files",
                database.searchable_file_count()
            )),
            DatabaseEvent::Computed { database, .. } | DatabaseEvent::FilesUpdated { database, .. } => {
                self.spinner.set_message(format!(
                    "Loaded {} files",
                    database.searchable_file_count()
                ))
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::load(),
    };
    let color = matches!(cli.color, ColorWhen::Auto);
    let server = Arc::new(IndexServer::new(
        config,
        Arc::new(FileProjectDiscovery::new()),
    ));

    match cli.command {
        Commands::Index { paths } => {
            let start = Instant::now();
            index_roots(&server, &paths, true)?;
            let stats = server.statistics();
            println!(
                "Indexed {} files ({} searchable, {}) in {:.2}s",
                stats.file_count,
                stats.searchable_file_count,
                codesnap::engine::format_size(stats.searchable_bytes),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Search { args, path } => {
            index_roots(&server, &path, false)?;
            run_search(&server, &args, color)?;
        }
        Commands::Files {
            pattern,
            case_sensitive,
            path,
        } => {
            index_roots(&server, &path, false)?;
            let params = NameSearchParams {
                pattern,
                match_case: case_sensitive,
                max_results: server.config().max_results,
            };
            let result = server.search_file_names(&params)?;
            output::print_file_names(&result.names, color)?;
        }
        Commands::Dirs {
            pattern,
            case_sensitive,
            path,
        } => {
            index_roots(&server, &path, false)?;
            let params = NameSearchParams {
                pattern,
                match_case: case_sensitive,
                max_results: server.config().max_results,
            };
            let result = server.search_directory_names(&params)?;
            output::print_directory_names(&result.names, color)?;
        }
        Commands::Extract { file, spans, json } => {
            let file = std::fs::canonicalize(&file)
                .with_context(|| format!("cannot open {}", file.display()))?;
            let dir = file.parent().unwrap_or(&file).to_path_buf();
            index_roots(&server, &[dir], false)?;
            let extracts = server.get_file_extracts(&file, &spans)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&extracts)?);
            } else {
                for extract in &extracts {
                    println!("{}:{}:{}", extract.line_number, extract.column_number, extract.text);
                }
            }
        }
        Commands::Stats { paths, json } => {
            index_roots(&server, &paths, !json)?;
            let stats = server.statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                output::print_statistics(&stats)?;
            }
        }
        Commands::Watch { paths } => {
            index_roots(&server, &paths, true)?;
            run_watch(server, color)?;
        }
    }

    Ok(())
}

/// Register every path and block until the first database is complete.
fn index_roots(server: &IndexServer, paths: &[PathBuf], show_progress: bool) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    if show_progress {
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Scanning...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        server.set_database_listener(Arc::new(SpinnerListener {
            spinner: spinner.clone(),
        }));
    }

    for path in paths {
        server
            .register_root(path)
            .with_context(|| format!("cannot index {}", path.display()))?;
    }
    server.wait_until_idle();

    if show_progress {
        spinner.finish_and_clear();
    }
    Ok(())
}

fn run_search(server: &IndexServer, args: &SearchArgs, color: bool) -> Result<()> {
    let result = server.search_file_contents(&args.params())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.files_with_matches {
        output::print_files_only(&result, color)?;
    } else if args.count {
        output::print_match_counts(&result, color)?;
    } else {
        output::print_content_matches(server, &result, color, !args.no_heading)?;
        output::print_search_summary(&result);
    }
    Ok(())
}

fn run_watch(server: Arc<IndexServer>, color: bool) -> Result<()> {
    let sink = Arc::clone(&server);
    let _watcher = DirectoryWatcher::start(
        &server.roots(),
        server.config().debounce_duration(),
        move |batch| sink.apply_path_changes(batch),
    )?;

    eprintln!("Watching {} root(s). Type a query per line, Ctrl+D to stop.", server.roots().len());
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let pattern = line.trim();
        if pattern.is_empty() {
            continue;
        }
        let args = SearchArgs {
            pattern: pattern.to_string(),
            case_sensitive: false,
            word: false,
            regex: false,
            engine: None,
            max_results: 0,
            glob: None,
            files_with_matches: false,
            count: false,
            no_heading: false,
            json: false,
        };
        if let Err(e) = run_search(&server, &args, color) {
            eprintln!("error: {e}");
        }
        io::stdout().flush()?;
    }
    Ok(())
}
