use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexocr::config::{Config, OcrConfig};
use lexocr::ensemble::{choose_suggestion, Corpus, Ensemble, RecognitionContext};
use lexocr::lookup::{LookupClient, LookupOutcome};
use lexocr::ocr::{load_grayscale, RecognitionKind, TesseractRecognizer};
use lexocr::spelling::LexiconCorrector;

#[derive(Parser)]
#[command(name = "lexocr")]
#[command(about = "Ensemble OCR for short words and lines, validated against a lexicon")]
struct Args {
    /// Cropped image of the word or line to read
    image: PathBuf,

    /// What the crop contains; selects the page segmentation modes to run
    #[arg(long, value_enum, default_value_t = RecognitionKind::Word)]
    kind: RecognitionKind,

    /// Tesseract language code (defaults to OCR_LANGUAGES)
    #[arg(long)]
    lang: Option<String>,

    /// Lexicon file, one entry per line (defaults to CORPUS_PATH)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Print the full recognition result as JSON
    #[arg(long)]
    json: bool,

    /// Print every reading grouped by variant
    #[arg(long)]
    inspect: bool,

    /// Look the chosen word up in the dictionary service
    #[arg(long)]
    lookup: bool,

    /// Suggestion index to look up, or a literal word (defaults to the best guess)
    #[arg(long)]
    pick: Option<String>,

    /// Write the dictionary page here instead of reporting its size
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LEXOCR_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexocr=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let mut config = Config::from_env();
    if let Some(corpus) = args.corpus {
        config.corpus.path = corpus;
    }
    let language = args.lang.unwrap_or_else(|| config.ocr.languages.clone());

    let bytes = tokio::fs::read(&args.image).await?;
    let image = load_grayscale(&bytes, &config.ocr)?;

    tracing::info!("Loading corpus from {}...", config.corpus.path.display());
    let corpus = Arc::new(Corpus::load(&config.corpus.path).await?);
    let corrector = LexiconCorrector::from_corpus(&corpus, config.spelling.max_distance);

    tracing::info!("Initializing Tesseract for {}...", language);
    let recognizer = TesseractRecognizer::new(&OcrConfig {
        languages: language.clone(),
        ..config.ocr.clone()
    });
    if !recognizer.is_available() {
        anyhow::bail!("Tesseract is not available for language '{language}'");
    }

    let ensemble = Ensemble::new(&config, Arc::new(recognizer), Arc::new(corrector))?
        .with_corpus(corpus);
    let context = ensemble.recognize(&image, &language, args.kind).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&context)?);
    } else {
        print_suggestions(&context);
    }
    if args.inspect {
        print_readings(&context);
    }

    if !args.lookup {
        return Ok(());
    }

    let Some(word) = choose_suggestion(&context.suggestions, args.pick.as_deref()) else {
        anyhow::bail!("Nothing to look up: no suggestions and no --pick given");
    };

    let client = LookupClient::new(&config.lookup)?;
    match client.lookup(&word).await {
        LookupOutcome::Found { body, .. } => match args.out {
            Some(path) => {
                tokio::fs::write(&path, body.as_bytes()).await?;
                println!("Saved definition of '{}' to {}", word, path.display());
            }
            None => println!("Fetched definition of '{}' ({} bytes)", word, body.len()),
        },
        LookupOutcome::Rejected { status, .. } => {
            anyhow::bail!("Couldn't fetch '{word}': service answered {status}");
        }
        LookupOutcome::Unreachable {
            attempts,
            last_error,
        } => {
            anyhow::bail!("Couldn't fetch '{word}' after {attempts} attempts: {last_error}");
        }
    }

    Ok(())
}

fn print_suggestions(context: &RecognitionContext) {
    let Some(best) = context.best() else {
        println!("No suggestions");
        return;
    };

    println!("Best guess: {}", best.text);
    for (index, suggestion) in context.suggestions.iter().enumerate() {
        println!(
            "{:>3}  {}  ({:.2})",
            index,
            suggestion.text,
            suggestion.score.value()
        );
    }
}

fn print_readings(context: &RecognitionContext) {
    for group in context.summary_by_variant() {
        match group.variant {
            Some(skew) => println!("variant {skew}:"),
            None => println!("original:"),
        }
        for (mode, text) in &group.readings {
            println!("  {mode}: {text}");
        }
    }
    if context.failed_attempts() > 0 {
        println!("{} attempts failed", context.failed_attempts());
    }
}
