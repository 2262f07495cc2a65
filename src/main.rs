use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use edit_patcher::{
    find_unique, load_from_path, sanitize, EditOperation, EditRequest, EditTool, EditorConfig,
    InMemoryHistory, MatchError, PatchError, PermissionArbiter, PermissionRequest, ReadTracker,
    SessionContext, Workspace,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edit-patcher")]
#[command(about = "Whitespace-insensitive single-occurrence file patching", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the unique whitespace-insensitive match of a pattern
    Locate {
        /// File to search
        #[arg(short, long)]
        file: PathBuf,

        /// Text to find (whitespace other than line breaks is ignored)
        #[arg(short, long)]
        pattern: String,
    },

    /// Create a file, or delete/replace one unique piece of text in it
    Apply {
        /// JSON request file with file_path, old_string and new_string
        #[arg(short, long, conflicts_with_all = ["file", "old", "new"])]
        request: Option<PathBuf>,

        /// Target file (relative to the workspace root)
        #[arg(short, long, required_unless_present = "request")]
        file: Option<PathBuf>,

        /// Text to replace; empty creates the file
        #[arg(long, default_value = "")]
        old: String,

        /// Replacement text; empty deletes the matched text
        #[arg(long, default_value = "")]
        new: String,

        /// Workspace root (defaults to config, then current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Editor config TOML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Session identifier recorded in history
        #[arg(long, default_value = "cli")]
        session: String,

        /// Approve the write without prompting
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "edit_patcher=debug"
        } else {
            "edit_patcher=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Commands::Locate { file, pattern } => cmd_locate(file, &pattern),
        Commands::Apply {
            request,
            file,
            old,
            new,
            workspace,
            config,
            session,
            yes,
        } => cmd_apply(ApplyArgs {
            request,
            file,
            old,
            new,
            workspace,
            config,
            session,
            yes,
        }),
    }
}

fn cmd_locate(file: PathBuf, pattern: &str) -> Result<()> {
    let content = fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    match find_unique(&content, &sanitize(pattern)) {
        Ok(span) => {
            println!(
                "{} {}: bytes [{}, {})",
                "✓".green(),
                file.display(),
                span.start,
                span.end
            );
            println!("{}", &content[span.range()]);
            Ok(())
        }
        Err(MatchError::NotFound) => {
            eprintln!("{} {}", "✗".red(), "CONFLICT: Pattern matched no locations".red());
            eprintln!("  File: {}", file.display());
            eprintln!("  Possible causes:");
            eprintln!("    - Text was changed or removed");
            eprintln!("    - Line breaks differ from the file");
            std::process::exit(1);
        }
        Err(MatchError::Ambiguous { count }) => {
            eprintln!(
                "{} {}",
                "✗".red(),
                format!("CONFLICT: Pattern matched {} locations (expected 1)", count).red()
            );
            eprintln!("  File: {}", file.display());
            eprintln!("  Action: Include more surrounding lines in the pattern");
            std::process::exit(1);
        }
    }
}

struct ApplyArgs {
    request: Option<PathBuf>,
    file: Option<PathBuf>,
    old: String,
    new: String,
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
    session: String,
    yes: bool,
}

fn cmd_apply(args: ApplyArgs) -> Result<()> {
    // 1. Resolve config and workspace
    let config = match &args.config {
        Some(path) => load_from_path(path)?,
        None => EditorConfig::default(),
    };
    let workspace = match args.workspace {
        Some(root) => Workspace::new(root.canonicalize()?),
        None => config.workspace()?,
    };

    // 2. Build the request
    let request = match (&args.request, &args.file) {
        (Some(path), _) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read request {}", path.display()))?;
            match EditRequest::from_json(&json) {
                Ok(request) => request,
                Err(rejection) => anyhow::bail!("{}", rejection),
            }
        }
        (None, Some(file)) => EditRequest {
            file_path: file.display().to_string(),
            old_string: args.old,
            new_string: args.new,
        },
        (None, None) => anyhow::bail!("either --request or --file is required"),
    };
    let op = request.into_operation(&workspace);

    // 3. The file on disk right now is what this invocation has seen
    let tracker = Arc::new(ReadTracker::new());
    if !matches!(op, EditOperation::Create { .. }) && op.path().is_file() {
        tracker.record_read(op.path());
    }

    println!("Workspace: {}", workspace.root().display());

    let tool = EditTool::new(
        workspace,
        tracker,
        Arc::new(TerminalArbiter {
            auto_approve: args.yes,
        }),
        Arc::new(InMemoryHistory::new()),
    )
    .with_diff_generator(Arc::new(config.diff_generator()));

    let ctx = SessionContext::new(args.session, format!("cli-{}", std::process::id()));

    // 4. Run and report
    match tool.execute(&ctx, &op) {
        Ok(response) if response.is_error => {
            eprintln!("{} {}", "✗".red(), response.content);
            std::process::exit(1);
        }
        Ok(response) => {
            println!("{} {}", "✓".green(), response.content);
            if let Some(meta) = response.metadata {
                println!(
                    "  {} additions, {} removals",
                    format!("{}", meta.additions).green(),
                    format!("{}", meta.removals).red()
                );
            }
            Ok(())
        }
        Err(e @ PatchError::PermissionDenied { .. }) => {
            eprintln!("{} {}", "⊘".yellow(), e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Prompts on the terminal, showing the diff of the pending write.
struct TerminalArbiter {
    auto_approve: bool,
}

impl PermissionArbiter for TerminalArbiter {
    fn request(&self, request: &PermissionRequest) -> bool {
        println!("\n{}", request.description.bold());
        display_diff(&request.params.diff);

        if self.auto_approve {
            return true;
        }

        print!("Apply this change? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        }
    }
}

/// Helper: colour a unified diff by line prefix
fn display_diff(diff: &str) {
    for line in diff.lines() {
        let colored = if line.starts_with("+++") || line.starts_with("---") {
            line.dimmed()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        println!("{}", colored);
    }
}
