// src/main.rs
use anyhow::{Context, Result};
use asymptote::{AnalysisResult, AnalyzerConfig};
use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Static asymptotic complexity analysis of begin/end pseudocode", long_about = None)]
struct Cli {
    /// Pseudocode file to analyze (`-` reads stdin)
    input: PathBuf,

    /// Function whose cost is reported (defaults to `main`, then the first uncalled function)
    #[arg(short, long)]
    entry: Option<String>,

    /// TOML file with subroutine costs and analyzer settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print the per-function trace (text format only; JSON always carries it)
    #[arg(long)]
    trace: bool,

    /// Print the wall-clock analysis time
    #[arg(long)]
    timing: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    asymptote::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("\nAnalysis failed:\n{}", e);
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = read_input(&cli.input)?;

    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    if let Some(entry) = &cli.entry {
        config = config.with_entry(entry.clone());
    }

    let started = Instant::now();
    let result = asymptote::analyze_with_config(&source, &config)
        .with_context(|| format!("analyzing {}", cli.input.display()))?;
    let elapsed = started.elapsed();

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text(&result, cli.trace),
    }
    if cli.timing {
        eprintln!("analysis took {:.3} ms", elapsed.as_secs_f64() * 1000.0);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("reading stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn print_text(result: &AnalysisResult, with_trace: bool) {
    println!("entry:      {}", result.entry);
    println!("worst:      {}", result.labels.worst);
    println!("best:       {}", result.labels.best);
    println!("tight:      {}", result.labels.tight);
    println!("confidence: {:?}", result.confidence);
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    if !with_trace {
        return;
    }
    println!();
    for (name, trace) in &result.trace {
        println!("{} {} {} {}", name, trace.labels.worst, trace.labels.best, trace.labels.tight);
        println!("    formula:    {}", trace.formula);
        if let Some(recurrence) = &trace.recurrence {
            println!("    recurrence: {}", recurrence);
        }
        if let Some(method) = trace.method {
            println!("    method:     {:?}", method);
        }
        if let Some(dp) = &trace.dp {
            println!(
                "    dp:         {}D {:?} table `{}` over [{}] bounded by {}",
                dp.dimensions,
                dp.fill,
                dp.table,
                dp.index_variables.join(", "),
                dp.bound
            );
        }
        if trace.hinted {
            println!("    hinted");
        }
        println!("    confidence: {:?}", trace.confidence);
    }
}
