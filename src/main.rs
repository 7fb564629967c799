use analytics::{QueryEngine, QueryService};
use clap::{Parser, Subcommand};
use corpus_store::CorpusStore;
use emotion_classifier::load_classifier;
use pulsemap_core::{AppConfig, CoreError, ErrorExt, ErrorReporter};
use std::path::PathBuf;
use std::process::ExitCode;
use topic_engine::default_topic_model;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pulsemap")]
#[command(about = "Keyword-scoped emotion, sentiment and topic analytics over social posts")]
#[command(version)]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, env = "PULSEMAP_CONFIG", default_value = "pulsemap.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Emotion breakdown of a state's posts mentioning a keyword
    StateEmotions { state: String, keyword: String, year: i32 },
    /// Emotion breakdown of a college's posts mentioning a keyword
    CollegeEmotions { college: String, keyword: String, year: i32 },
    /// Topic word cloud for a state
    StateWords { state: String, keyword: String, year: i32 },
    /// Topic word cloud for a college
    CollegeWords { college: String, keyword: String, year: i32 },
    /// Mean sentiment for one state
    StateSentiment { state: String, keyword: String, year: i32 },
    /// Mean sentiment for every state
    SentimentMap { keyword: String, year: i32 },
    /// Most frequent words in a state's posts
    CommonWords { state: String, year: i32 },
}

async fn run(service: &QueryService, command: Command) -> Result<String, CoreError> {
    let output = match command {
        Command::StateEmotions {
            state,
            keyword,
            year,
        } => serde_json::to_string_pretty(&service.state_emotions(&state, &keyword, year).await?)?,
        Command::CollegeEmotions {
            college,
            keyword,
            year,
        } => serde_json::to_string_pretty(
            &service.college_emotions(&college, &keyword, year).await?,
        )?,
        Command::StateWords {
            state,
            keyword,
            year,
        } => serde_json::to_string_pretty(
            &service.state_word_cloud(&state, &keyword, year).await?,
        )?,
        Command::CollegeWords {
            college,
            keyword,
            year,
        } => serde_json::to_string_pretty(
            &service.college_word_cloud(&college, &keyword, year).await?,
        )?,
        Command::StateSentiment {
            state,
            keyword,
            year,
        } => serde_json::to_string_pretty(&service.state_sentiment(&state, &keyword, year).await?)?,
        Command::SentimentMap { keyword, year } => {
            serde_json::to_string_pretty(&service.sentiment_map(&keyword, year).await?)?
        }
        Command::CommonWords { state, year } => {
            serde_json::to_string_pretty(&service.common_words(&state, year).await?)?
        }
    };
    Ok(output)
}

fn fail(reporter: &ErrorReporter, error: &CoreError) -> ExitCode {
    reporter.report(error);
    eprintln!("error [{}]: {}", error.error_code(), error.user_friendly_message());
    ExitCode::FAILURE
}

fn build_service(config: &AppConfig) -> Result<QueryService, CoreError> {
    let store = CorpusStore::new(&config.corpus);
    let corpus = store.load()?;
    let metadata = corpus.metadata();
    tracing::info!(
        "Corpus ready: {} rows, sentiment columns: {}, loaded at {}",
        metadata.rows,
        metadata.has_sentiment,
        metadata.loaded_at
    );
    let classifier = load_classifier(&config.classifier)?;
    let topic_model = default_topic_model(&config.topics);
    Ok(QueryService::new(QueryEngine::new(
        corpus,
        classifier,
        topic_model,
        config,
    )))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config);

    let default_filter = match &config {
        Ok(config) => config.logging.filter.clone(),
        Err(_) => AppConfig::default().logging.filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PULSEMAP_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let reporter = ErrorReporter::new();
    let config = match config {
        Ok(config) => config,
        Err(e) => return fail(&reporter, &CoreError::from(e)),
    };

    tracing::info!("Starting pulsemap with corpus {}", config.corpus.path.display());

    let service = match build_service(&config) {
        Ok(service) => service,
        Err(e) => return fail(&reporter, &e),
    };

    match run(&service, cli.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&reporter, &e),
    }
}
