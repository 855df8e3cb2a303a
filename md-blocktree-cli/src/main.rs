use clap::{Parser, Subcommand};
use md_blocktree::{
    BlockStore, CodeFencePreference, EditorSession, LineEnding, SerializeConfig, render,
};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders a JSON block tree as markdown
    Render {
        file: PathBuf,
        /// Emit CRLF line endings
        #[arg(long)]
        crlf: bool,
        /// Render indented code blocks as fenced blocks
        #[arg(long)]
        always_fenced: bool,
    },
    /// Checks the structural invariants of a JSON block tree
    Check { file: PathBuf },
    /// Prints word statistics for the rendered document
    Stats {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct SkippedReport {
    id: String,
    kind: &'static str,
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Render {
            file,
            crlf,
            always_fenced,
        } => render_command(file, *crlf, *always_fenced),
        Commands::Check { file } => check_command(file),
        Commands::Stats { file, json } => stats_command(file, *json),
    }
}

fn load(path: &Path) -> BlockStore {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("Error: {}: {err}", path.display());
            std::process::exit(1);
        }
    };
    match BlockStore::from_json(&json) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn render_command(path: &Path, crlf: bool, always_fenced: bool) {
    let store = load(path);
    let config = SerializeConfig {
        line_ending: if crlf {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        },
        code_fences: if always_fenced {
            CodeFencePreference::AlwaysFenced
        } else {
            CodeFencePreference::AsWritten
        },
    };
    let rendered = render(&store, &config);

    let mut stdout = std::io::stdout();
    if let Err(err) = stdout.write_all(rendered.markdown.as_bytes()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
    for skipped in &rendered.skipped {
        eprintln!("Skipped {} block {}", skipped.kind, skipped.id);
    }
    if !rendered.skipped.is_empty() {
        std::process::exit(2);
    }
}

fn check_command(path: &Path) {
    let store = load(path);
    match store.verify() {
        Ok(()) => println!("Tree is consistent: {} blocks", store.len()),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn stats_command(path: &Path, json: bool) {
    let session = EditorSession::from_store(load(path));
    let count = session.word_count();

    if json {
        let skipped: Vec<SkippedReport> = render(session.store(), &SerializeConfig::default())
            .skipped
            .into_iter()
            .map(|block| SkippedReport {
                id: block.id.to_string(),
                kind: block.kind,
            })
            .collect();
        let output = serde_json::json!({
            "stats": count,
            "skipped": skipped,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Paragraphs: {}", count.paragraph);
        println!("Words: {}", count.word);
        println!("Characters: {}", count.character);
        println!("All: {}", count.all);
    }
}
