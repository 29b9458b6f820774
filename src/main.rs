//! sigtab - inspect Scala signature pickles
//!
//! # Usage
//!
//! ```bash
//! # Load a raw pickle into fresh roots and list its members
//! sigtab dump Foo.sig --root com.example.Foo
//!
//! # Pickle embedded at an offset, printed as JSON
//! sigtab dump Foo.class --offset 1024 --json
//!
//! # Show the configured phase chain
//! sigtab phases --config sigtab.toml
//! ```

use clap::{Parser, Subcommand};
use diagnostics::{ErrorFormatter, Reporter, StoreReporter};
use sigtab_compiler::config::SymtabConfig;
use sigtab_compiler::dump::SignatureDump;
use sigtab_compiler::error_codes;
use sigtab_compiler::logging;
use sigtab_compiler::pickle::{self, PickleError};
use sigtab_compiler::symtab::SymbolTable;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "sigtab")]
#[command(version = "0.1.0")]
#[command(about = "Inspect Scala signature pickles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpickle a signature and print the members of its roots
    Dump {
        /// File holding the pickle bytes
        file: PathBuf,

        /// Byte offset of the pickle inside the file
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Dotted name of the class root (defaults to the file stem)
        #[arg(long)]
        root: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the phase chain with flag masks and derived predicates
    Phases {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dump {
            file,
            offset,
            root,
            json,
            config,
        } => load_config(config.as_deref()).and_then(|cfg| dump_file(&cfg, &file, offset, root, json)),
        Commands::Phases { config } => load_config(config.as_deref()).map(|cfg| show_phases(&cfg)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<SymtabConfig, String> {
    let config = match path {
        Some(path) => SymtabConfig::from_file(path).map_err(|e| format!("{}: {}", error_codes::format_error_code(e.code()), e))?,
        None => SymtabConfig::default(),
    };
    logging::init(config.log_filter().as_ref());
    Ok(config)
}

fn dump_file(config: &SymtabConfig, file: &Path, offset: usize, root: Option<String>, json: bool) -> Result<(), String> {
    let bytes = std::fs::read(file).map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let root = match root {
        Some(root) => root,
        None => file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| format!("cannot derive a root name from {}", file.display()))?,
    };
    let filename = file.display().to_string();

    let mut table = config.build_table();
    let store = StoreReporter::new();
    table.set_reporter(Box::new(store.clone()));
    let result = load_and_print(&mut table, &bytes, offset, &root, &filename, json);

    // cyclic references and missing classes are reported even when the
    // dump stops early
    let diagnostics = store.diagnostics();
    if !diagnostics.is_empty() {
        eprint!("{}", ErrorFormatter::new().format_diagnostics(&diagnostics));
    }
    result?;
    if store.has_errors() {
        return Err(format!("{} error(s) while reading {}", store.error_count(), filename));
    }
    Ok(())
}

fn load_and_print(
    table: &mut SymbolTable,
    bytes: &[u8],
    offset: usize,
    root: &str,
    filename: &str,
    json: bool,
) -> Result<(), String> {
    let (class, module) = pickle::enter_roots(table, root).map_err(|e| e.to_string())?;
    pickle::unpickle(table, bytes, offset, class, module, filename).map_err(|e| e.to_string())?;

    let mut dump = SignatureDump::collect(table, filename, class, module).map_err(|e| e.to_string())?;
    match pickle::pickle(table, class, module) {
        Ok(repickled) => dump.repickled_bytes = Some(repickled.len()),
        Err(PickleError::Unpicklable(what)) => log::warn!("cannot pickle {} again: {}", root, what),
        Err(e) => return Err(e.to_string()),
    }

    if json {
        let text = dump.to_json().map_err(|e| format!("Failed to serialize dump: {}", e))?;
        println!("{}", text);
    } else {
        print!("{}", dump.render_text());
    }
    Ok(())
}

fn show_phases(config: &SymtabConfig) {
    let chain = config.phase_chain();
    println!("{:>3}  {:<16} {:<40} predicates", "id", "phase", "flag mask");
    for phase in chain.iter() {
        let mut predicates = Vec::new();
        if phase.ref_checked() {
            predicates.push("refchecked");
        }
        if phase.specialized() {
            predicates.push("specialized");
        }
        if phase.erased_types() {
            predicates.push("erased");
        }
        if phase.flat_classes() {
            predicates.push("flat");
        }
        if phase.assigns_fields() {
            predicates.push("fields");
        }
        let late: Vec<&str> = phase
            .flag_mask()
            .names()
            .into_iter()
            .filter(|n| n.starts_with("late_") || n.starts_with("not_"))
            .collect();
        println!(
            "{:>3}  {:<16} {:<40} {}",
            phase.id,
            phase.name,
            if late.is_empty() { "-".to_string() } else { late.join(",") },
            predicates.join(" ")
        );
    }
}
