//! proctor CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "proctor", version, about = "Timed markup assessments with rubric grading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a document against a category rubric
    Grade {
        /// Document to grade
        #[arg(long)]
        document: PathBuf,

        /// Category to grade under (default from config)
        #[arg(long)]
        category: Option<String>,

        /// Directory of rubric files layered over the built-in rubrics
        #[arg(long)]
        rubrics: Option<PathBuf>,

        /// Output format: text, json, html, sarif, all (comma-separated)
        #[arg(long, default_value = "text")]
        format: String,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit code 1 if the attempt does not pass
        #[arg(long)]
        require_pass: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a timed, proctored attempt against a document file
    Session {
        /// Document file the learner edits; autosaved while it changes
        #[arg(long)]
        document: PathBuf,

        /// Category to attempt (default from config)
        #[arg(long)]
        category: Option<String>,

        /// Time budget in minutes (default: the category's duration)
        #[arg(long)]
        minutes: Option<u64>,

        /// Directory of rubric files layered over the built-in rubrics
        #[arg(long)]
        rubrics: Option<PathBuf>,

        /// Output format for the finished attempt: json, html, sarif, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the autosaved document for a category
    Restore {
        /// Category whose autosave to print (default from config)
        #[arg(long)]
        category: Option<String>,

        /// Delete the autosave instead of printing it
        #[arg(long)]
        discard: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate rubric TOML files
    Validate {
        /// Path to rubric file or directory
        #[arg(long)]
        rubric: PathBuf,
    },

    /// List available categories
    Categories {
        /// Directory of rubric files layered over the built-in rubrics
        #[arg(long)]
        rubrics: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two attempt records
    Compare {
        /// Baseline attempt JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current attempt JSON
        #[arg(long)]
        current: PathBuf,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config and an editable copy of the built-in rubric
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "proctor=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            document,
            category,
            rubrics,
            format,
            output,
            require_pass,
            config,
        } => commands::grade::execute(
            document,
            category,
            rubrics,
            format,
            output,
            require_pass,
            config,
        ),
        Commands::Session {
            document,
            category,
            minutes,
            rubrics,
            format,
            output,
            config,
        } => {
            commands::session::execute(document, category, minutes, rubrics, format, output, config)
                .await
        }
        Commands::Restore {
            category,
            discard,
            config,
        } => commands::restore::execute(category, discard, config),
        Commands::Validate { rubric } => commands::validate::execute(rubric),
        Commands::Categories { rubrics, config } => commands::categories::execute(rubrics, config),
        Commands::Compare {
            baseline,
            current,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, fail_on_regression, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
