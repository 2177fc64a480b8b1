use anyhow::Result;
use clap::Parser;
use samplemind::api::{AnalysisLevel, DEFAULT_LIMIT, ExtractionType};
use samplemind::commands::{self, Config};
use samplemind::http::ApiClient;
use std::path::PathBuf;

/// samplemind - SampleMind AI command line client
///
/// Talks to a SampleMind backend with bounded retries, per-attempt
/// timeouts and a response cache for GET requests.
///
/// If the SAMPLEMIND_TOKEN environment variable is set, it is sent as a
/// bearer token.
///
/// Examples:
///   samplemind health
///   samplemind analyze kick.wav snare.wav --level detailed
///   samplemind search "dark pad" --limit 5
#[derive(Parser, Debug)]
#[command(author, version = env!("SAMPLEMIND_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (defaults to http://localhost:8001)
    #[arg(long, env = "SAMPLEMIND_API_URL", value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "SAMPLEMIND_TIMEOUT_MS", value_name = "MS", global = true)]
    timeout_ms: Option<u64>,

    /// Total attempts per request, including the first
    #[arg(long, env = "SAMPLEMIND_MAX_RETRIES", value_name = "N", global = true)]
    max_retries: Option<usize>,

    /// Base delay between attempts in milliseconds; doubles after each failure
    #[arg(long, env = "SAMPLEMIND_BACKOFF_MS", value_name = "MS", global = true)]
    backoff_ms: Option<u64>,

    /// Disable the response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Fail immediately when a response body cannot be decoded
    #[arg(long, global = true)]
    no_retry_on_decode_error: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            backoff_ms: self.backoff_ms,
            no_cache: self.no_cache,
            no_retry_on_decode_error: self.no_retry_on_decode_error,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check backend health
    Health,

    /// Analyze one or more audio files
    Analyze(AnalyzeArgs),

    /// Find samples similar to an audio file
    Similar(SimilarArgs),

    /// Search the sample library
    Search(SearchArgs),

    /// Find samples matching a project's tempo and key
    ProjectSync(ProjectSyncArgs),

    /// Generate MIDI from an audio file
    GenerateMidi(GenerateMidiArgs),

    /// Show sample library statistics
    LibraryStats,

    /// List supported MIDI extraction types
    MidiTypes,

    /// List musical keys accepted by project-sync
    AvailableKeys,

    /// Show backend API information
    Info,
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Audio files to analyze
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Analysis depth: basic, standard, detailed or professional
    #[arg(long, short = 'l', default_value_t = AnalysisLevel::Standard)]
    level: AnalysisLevel,
}

#[derive(clap::Args, Debug)]
struct SimilarArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long, short = 'n', default_value_t = DEFAULT_LIMIT)]
    limit: usize,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    #[arg(value_name = "QUERY")]
    query: String,

    #[arg(long, short = 'n', default_value_t = DEFAULT_LIMIT)]
    limit: usize,
}

#[derive(clap::Args, Debug)]
struct ProjectSyncArgs {
    /// Project tempo in beats per minute
    #[arg(long)]
    bpm: f64,

    /// Project key, e.g. "A minor"
    #[arg(long)]
    key: String,

    #[arg(long, short = 'n', default_value_t = DEFAULT_LIMIT)]
    limit: usize,
}

#[derive(clap::Args, Debug)]
struct GenerateMidiArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// What to extract: melody, harmony, drums or bass_line
    #[arg(long = "type", short = 't', default_value_t = ExtractionType::Melody)]
    extraction_type: ExtractionType,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = samplemind::runtime::RealRuntime;
    let client = ApiClient::connect(cli.config().client_config(&runtime)?)?;

    let output = match cli.command {
        Commands::Health => commands::health(&client).await?,
        Commands::Analyze(args) => {
            commands::analyze(&runtime, &client, &args.files, args.level).await?
        }
        Commands::Similar(args) => {
            commands::similar(&runtime, &client, &args.file, args.limit).await?
        }
        Commands::Search(args) => commands::search(&client, &args.query, args.limit).await?,
        Commands::ProjectSync(args) => {
            commands::project_sync(&client, args.bpm, &args.key, args.limit).await?
        }
        Commands::GenerateMidi(args) => {
            commands::generate_midi(&runtime, &client, &args.file, args.extraction_type).await?
        }
        Commands::LibraryStats => commands::library_stats(&client).await?,
        Commands::MidiTypes => commands::midi_types(&client).await?,
        Commands::AvailableKeys => commands::available_keys(&client).await?,
        Commands::Info => commands::info(&client).await?,
    };

    commands::print_json(&mut std::io::stdout().lock(), &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_health_parsing() {
        let cli = Cli::try_parse_from(["samplemind", "health"]).unwrap();
        assert!(matches!(cli.command, Commands::Health));
        assert_eq!(cli.config(), Config::default());
    }

    #[test]
    fn test_cli_analyze_parsing() {
        let cli = Cli::try_parse_from([
            "samplemind",
            "analyze",
            "kick.wav",
            "snare.wav",
            "--level",
            "professional",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(
                    args.files,
                    vec![PathBuf::from("kick.wav"), PathBuf::from("snare.wav")]
                );
                assert_eq!(args.level, AnalysisLevel::Professional);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_analyze_requires_files() {
        assert!(Cli::try_parse_from(["samplemind", "analyze"]).is_err());
    }

    #[test]
    fn test_cli_search_default_limit() {
        let cli = Cli::try_parse_from(["samplemind", "search", "dark pad"]).unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "dark pad");
                assert_eq!(args.limit, DEFAULT_LIMIT);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_project_sync_parsing() {
        let cli = Cli::try_parse_from([
            "samplemind",
            "project-sync",
            "--bpm",
            "128",
            "--key",
            "A minor",
            "-n",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::ProjectSync(args) => {
                assert_eq!(args.bpm, 128.0);
                assert_eq!(args.key, "A minor");
                assert_eq!(args.limit, 3);
            }
            _ => panic!("Expected ProjectSync command"),
        }
    }

    #[test]
    fn test_cli_generate_midi_type() {
        let cli =
            Cli::try_parse_from(["samplemind", "generate-midi", "loop.wav", "--type", "bass"])
                .unwrap();
        match cli.command {
            Commands::GenerateMidi(args) => {
                assert_eq!(args.file, PathBuf::from("loop.wav"));
                assert_eq!(args.extraction_type, ExtractionType::BassLine);
            }
            _ => panic!("Expected GenerateMidi command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "samplemind",
            "info",
            "--api-url",
            "http://studio.local:9000",
            "--max-retries",
            "5",
            "--timeout-ms",
            "2000",
            "--backoff-ms",
            "10",
            "--no-cache",
            "--no-retry-on-decode-error",
        ])
        .unwrap();
        assert_eq!(
            cli.config(),
            Config {
                api_url: Some("http://studio.local:9000".into()),
                timeout_ms: Some(2000),
                max_retries: Some(5),
                backoff_ms: Some(10),
                no_cache: true,
                no_retry_on_decode_error: true,
            }
        );
    }

    #[test]
    fn test_cli_rejects_unknown_level() {
        let result =
            Cli::try_parse_from(["samplemind", "analyze", "kick.wav", "--level", "extreme"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["samplemind"]).is_err());
    }
}
