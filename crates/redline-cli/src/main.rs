mod display;
mod extract;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use redline_ai::analyzer::overall_rules_risk;
use redline_ai::http::DEFAULT_BASE_URL;
use redline_ai::{Analyzer, AnalyzerConfig, OpenAiClient, RetryPolicy};
use redline_core::segment::{DEFAULT_MAX_CLAUSE_LEN, DEFAULT_MIN_WORDS};
use redline_core::{Anonymiser, PreparedContract, Report, Segmenter, evaluate_rules, preprocess_contract};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "redline", version)]
#[command(about = "Clause-level risk analysis for legal contracts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the hybrid model + rules analysis and write a JSON report.
    Analyze {
        path: PathBuf,
        /// Write the report here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        model: ModelArgs,
        /// Skip party anonymisation.
        #[arg(long)]
        no_ner: bool,
    },
    /// Print the clauses a document segments into.
    Segment {
        path: PathBuf,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Rules-only scan of a document, or list the rule registry.
    Rules {
        #[arg(required_unless_present = "list")]
        path: Option<PathBuf>,
        #[arg(long)]
        list: bool,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Render a saved JSON report.
    Show { report: PathBuf },
}

#[derive(Args)]
struct InputArgs {
    /// Declared MIME type of the input.
    #[arg(long)]
    mime: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_CLAUSE_LEN)]
    max_clause_len: usize,
    #[arg(long, default_value_t = DEFAULT_MIN_WORDS)]
    min_words: usize,
}

impl InputArgs {
    fn segmenter(&self) -> Segmenter {
        Segmenter::default()
            .with_max_clause_len(self.max_clause_len)
            .with_min_words(self.min_words)
    }

    fn prepare(&self, path: &Path, anonymiser: &Anonymiser) -> anyhow::Result<PreparedContract> {
        let text = extract::extract_text(path, self.mime.as_deref())?;
        preprocess_contract(&text, &self.segmenter(), anonymiser)
            .with_context(|| format!("preparing {}", path.display()))
    }
}

#[derive(Args)]
struct ModelArgs {
    #[arg(long, env = "REDLINE_MODEL", default_value = "gpt-4o-mini")]
    model: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(long, env = "REDLINE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, default_value_t = 0.15)]
    temperature: f32,
    #[arg(long, default_value_t = 2000)]
    max_tokens: u32,
    /// Attempts per model call, including the first.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
    #[arg(long, default_value_t = 2000)]
    retry_delay_ms: u64,
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

impl ModelArgs {
    fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            retry: RetryPolicy {
                max_attempts: self.max_retries,
                base_delay: Duration::from_millis(self.retry_delay_ms),
            },
            request_timeout: Duration::from_secs(self.timeout_secs),
            ..AnalyzerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!("redline v{}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Command::Analyze {
            path,
            output,
            input,
            model,
            no_ner,
        } => analyze(&path, output.as_deref(), &input, &model, no_ner).await,
        Command::Segment { path, input } => {
            let prepared = input.prepare(&path, &Anonymiser::disabled())?;
            let clauses: Vec<_> = prepared.clauses.into_iter().map(|c| c.clause).collect();
            print!("{}", display::render_clauses(&clauses));
            Ok(())
        }
        Command::Rules { path, list, input } => {
            if list {
                print!("{}", display::render_rule_registry(redline_core::rules::rules()));
                return Ok(());
            }
            let path = path.context("a document path is required")?;
            let prepared = input.prepare(&path, &Anonymiser::disabled())?;
            let scan: Vec<_> = prepared
                .clauses
                .into_iter()
                .map(|c| {
                    let hits = evaluate_rules(&c.clause.text);
                    (c.clause, hits)
                })
                .collect();
            print!("{}", display::render_rule_scan(&scan));
            Ok(())
        }
        Command::Show { report } => {
            let text = std::fs::read_to_string(&report)
                .with_context(|| format!("reading {}", report.display()))?;
            let report: Report = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", report.display()))?;
            print!("{}", display::render_report_card(&report));
            Ok(())
        }
    }
}

async fn analyze(
    path: &Path,
    output: Option<&Path>,
    input: &InputArgs,
    model: &ModelArgs,
    no_ner: bool,
) -> anyhow::Result<()> {
    let anonymiser = if no_ner {
        Anonymiser::disabled()
    } else {
        Anonymiser::default()
    };
    let prepared = input.prepare(path, &anonymiser)?;

    let client = OpenAiClient::new(model.base_url.clone(), model.api_key.clone());
    let analyzer = Analyzer::new(client, model.analyzer_config());

    let total = prepared.clauses.len();
    let mut verdicts = Vec::with_capacity(total);
    let completed = tokio::select! {
        _ = analyzer.analyze_clauses_into(&prepared.clauses, &mut verdicts) => true,
        _ = tokio::signal::ctrl_c() => false,
    };
    if !completed {
        warn!(completed = verdicts.len(), total, "interrupted; in-flight clause discarded");
        anyhow::bail!("interrupted after {} of {total} clauses", verdicts.len());
    }

    let summary = analyzer
        .summarize_contract(&prepared, overall_rules_risk(&verdicts))
        .await;
    let report = Report::new(summary, verdicts, prepared.anonymisation_map);
    let json = report.to_json_pretty().context("serializing report")?;

    match output {
        Some(out) => {
            std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
            print!("{}", display::render_report_card(&report));
            eprintln!("Report written to {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
