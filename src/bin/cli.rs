#![cfg(not(tarpaulin_include))]

use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tablesnap::export;
use tablesnap::gemini::GeminiClient;
use tablesnap::remote::RemoteGateway;
use tablesnap::session::PROCESSING_STEPS;
use tablesnap::{
    CellPos, Config, ExtractError, Gateway, ImageUpload, NavKey, Phase, Session, TableData,
    TableSource,
};

/// Extract a table from an image and review it in the terminal.
#[derive(Parser, Debug)]
#[command(name = "tablesnap", version)]
struct Args {
    /// Image to extract (png, jpg, jpeg, webp, heic, heif)
    image: Option<PathBuf>,

    /// Upload to a running tablesnap server instead of calling the model directly
    #[arg(long)]
    server: Option<String>,

    /// Show numeric columns as currency
    #[arg(long)]
    currency: bool,

    /// Directory exported files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

enum Backend {
    Direct(Gateway<GeminiClient>),
    Remote(RemoteGateway),
}

impl TableSource for Backend {
    async fn extract(&self, image: &ImageUpload) -> Result<TableData, ExtractError> {
        match self {
            Backend::Direct(gateway) => gateway.extract(image).await,
            Backend::Remote(remote) => remote.extract(image).await,
        }
    }
}

struct Repl {
    session: Session,
    backend: Backend,
    out_dir: PathBuf,
    currency: bool,
    unexported_edits: Arc<AtomicU64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let backend = match &args.server {
        Some(url) => Backend::Remote(RemoteGateway::new(url)),
        None => Backend::Direct(Gateway::new(GeminiClient::from_config(&Config::from_env())?)),
    };

    let mut repl = Repl {
        session: Session::new(),
        backend,
        out_dir: args.out_dir,
        currency: args.currency,
        unexported_edits: Arc::new(AtomicU64::new(0)),
    };

    let mut status = String::from("ok");
    if let Some(image) = &args.image {
        status = repl.open(image).await;
    }

    let mut start_time = Instant::now();
    loop {
        repl.show();

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] {} ({}) > ", elapsed_time, repl.session.phase().name(), status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim_end_matches(['\n', '\r']);
        start_time = Instant::now();

        if matches!(command.trim(), "q" | "quit") {
            let pending = repl.unexported_edits.load(Ordering::Relaxed);
            if pending > 0 && repl.session.grid().is_some() {
                eprintln!("warning: {} edit(s) since the last export were discarded", pending);
            }
            break;
        }
        status = repl.execute(command).await;
    }

    Ok(())
}

impl Repl {
    async fn open(&mut self, path: &Path) -> String {
        let upload = match ImageUpload::from_path(path) {
            Ok(upload) => upload,
            Err(e) => return e.to_string(),
        };
        if let Err(e) = self.session.begin(&upload) {
            return e.to_string();
        }

        println!("Extracting your data from {}...", path.display());
        for step in &PROCESSING_STEPS[..PROCESSING_STEPS.len() - 1] {
            println!("  {}", step);
        }
        let result = self.backend.extract(&upload).await;
        if let Err(e) = self.session.finish(result) {
            return e.to_string();
        }

        let currency = self.currency;
        let counter = Arc::clone(&self.unexported_edits);
        counter.store(0, Ordering::Relaxed);
        match self.session.grid_mut() {
            Some(grid) => {
                println!("  {}", PROCESSING_STEPS[PROCESSING_STEPS.len() - 1]);
                grid.set_format_currency(currency);
                grid.set_focus(CellPos::new(0, 0));
                grid.subscribe(move |_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                });
                "ok".to_string()
            }
            None => "extraction failed".to_string(),
        }
    }

    fn show(&self) {
        match self.session.phase() {
            Phase::Idle => println!("Open an image with: open <path>"),
            Phase::Processing { .. } => println!("Extracting..."),
            Phase::Error { message, .. } => {
                println!("Something went wrong: {}", message);
                println!("Type 'reset' to try again.");
            }
            Phase::Workspace { grid, .. } => {
                print!("{}", grid.render());
                let flagged = grid.uncertain_cells().len();
                if flagged > 0 {
                    println!("{} cell(s) marked ! are uncertain", flagged);
                }
            }
        }
    }

    async fn execute(&mut self, command: &str) -> String {
        let (name, raw) = split_command(command);
        if name == "set" {
            return self.edit(name, raw);
        }
        let rest = raw.trim();

        match name {
            "" => "invalid command".to_string(),
            "help" => {
                print_help();
                "ok".to_string()
            }
            "open" if !rest.is_empty() => self.open(Path::new(rest)).await,
            "reset" => match self.session.reset() {
                Ok(()) => "ok".to_string(),
                Err(e) => e.to_string(),
            },
            _ => self.edit(name, rest),
        }
    }

    fn edit(&mut self, name: &str, rest: &str) -> String {
        let out_dir = self.out_dir.clone();
        let counter = Arc::clone(&self.unexported_edits);
        let Some(grid) = self.session.grid_mut() else {
            return "no table loaded".to_string();
        };

        if let Some(key) = NavKey::from_name(name) {
            return match grid.press(key) {
                Some(_) => "ok".to_string(),
                None => "nothing focused".to_string(),
            };
        }

        match name {
            "goto" => match parse_pair(rest) {
                Some((row, col)) if grid.set_focus(CellPos::new(row, col)) => "ok".to_string(),
                _ => "usage: goto <row> <col>".to_string(),
            },
            "set" => {
                if grid.commit(rest) {
                    "ok".to_string()
                } else {
                    "nothing focused".to_string()
                }
            }
            "rename" => match rest.split_once(' ') {
                Some((col, new_name)) => match parse_index(col) {
                    Some(col) => match grid.rename_column(col, new_name) {
                        Ok(_) => "ok".to_string(),
                        Err(e) => e.to_string(),
                    },
                    None => "usage: rename <col> <name>".to_string(),
                },
                None => "usage: rename <col> <name>".to_string(),
            },
            "add" => format!("added row {}", grid.add_row() + 1),
            "del" => match parse_index(rest).and_then(|row| grid.delete_row(row)) {
                Some(_) => "ok".to_string(),
                None => "usage: del <row>".to_string(),
            },
            "currency" => match rest {
                "on" => {
                    grid.set_format_currency(true);
                    "ok".to_string()
                }
                "off" => {
                    grid.set_format_currency(false);
                    "ok".to_string()
                }
                _ => "usage: currency on|off".to_string(),
            },
            "csv" => {
                let path = output_path(&out_dir, rest, "csv");
                match export::to_csv(grid.table()).map(|csv| fs::write(&path, csv)) {
                    Ok(Ok(())) => {
                        counter.store(0, Ordering::Relaxed);
                        format!("wrote {}", path.display())
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                }
            }
            "xlsx" => {
                let path = output_path(&out_dir, rest, "xlsx");
                match export::to_xlsx(grid.table()).map(|bytes| fs::write(&path, bytes)) {
                    Ok(Ok(())) => {
                        counter.store(0, Ordering::Relaxed);
                        format!("wrote {}", path.display())
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                }
            }
            "tsv" => match export::to_tsv(grid.table()) {
                Ok(tsv) => {
                    println!("{}", tsv);
                    counter.store(0, Ordering::Relaxed);
                    "copied text above".to_string()
                }
                Err(e) => e.to_string(),
            },
            "json" => match serde_json::to_string_pretty(grid.table()) {
                Ok(json) => {
                    println!("{}", json);
                    "ok".to_string()
                }
                Err(e) => e.to_string(),
            },
            _ => "invalid command".to_string(),
        }
    }
}

/// Splits a command line into its name and the text after the first space.
/// The remainder is returned untouched so cell text keeps its own spacing.
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(' ') {
        Some((name, rest)) => (name, rest),
        None => (line.trim_end(), ""),
    }
}

fn output_path(out_dir: &Path, requested: &str, extension: &str) -> PathBuf {
    if requested.is_empty() {
        out_dir.join(export::export_filename(extension))
    } else {
        PathBuf::from(requested)
    }
}

/// Parses a 1-based index as shown in the grid.
fn parse_index(text: &str) -> Option<usize> {
    text.trim().parse::<usize>().ok()?.checked_sub(1)
}

fn parse_pair(text: &str) -> Option<(usize, usize)> {
    let (a, b) = text.split_once(' ')?;
    Some((parse_index(a)?, parse_index(b)?))
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  open <path>: Extract a table from an image");
    println!("  up / down / left / right: Move focus (clamped at the edges)");
    println!("  enter: Move down; on the last row, add a row");
    println!("  goto <row> <col>: Focus a cell");
    println!("  set <text>: Replace the focused cell");
    println!("  rename <col> <name>: Rename a column");
    println!("  add: Append an empty row");
    println!("  del <row>: Delete a row");
    println!("  currency on|off: Toggle currency display for numeric columns");
    println!("  csv [path]: Export CSV");
    println!("  xlsx [path]: Export XLSX");
    println!("  tsv: Print tab-separated text for pasting into a spreadsheet");
    println!("  json: Print the table as JSON");
    println!("  reset: Discard the table and start over");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_cell_spacing() {
        assert_eq!(split_command("set  padded  "), ("set", " padded  "));
        assert_eq!(split_command("  rename 2 Unit Price"), ("rename", "2 Unit Price"));
        assert_eq!(split_command("add  "), ("add", " "));
        assert_eq!(split_command("help"), ("help", ""));
    }

    #[test]
    fn indices_are_one_based() {
        assert_eq!(parse_index("1"), Some(0));
        assert_eq!(parse_index("0"), None);
        assert_eq!(parse_pair("2 3"), Some((1, 2)));
    }
}
