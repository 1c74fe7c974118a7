use std::fs;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use clap::{Parser, Subcommand};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use thiserror::Error;
use tracing::{debug, info, warn};

use phpantom_core::config::{Config, default_snapshot_path};
use phpantom_core::{
    Declaration, ParsedDocument, ReferenceStore, SharedStore, SnapshotError, StoreError,
    SymbolStore, SymbolTable, read_references_with_limit,
};

/// Index a PHP project and query its symbols.
#[derive(Debug, Parser)]
#[command(name = "phpantom-index", version, about)]
struct Cli {
    /// Worker threads for the file passes (default: available cores).
    #[arg(long, short = 'j', global = true)]
    jobs: Option<NonZeroUsize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyse every PHP file under DIR and print counts.
    Index {
        dir: PathBuf,
        /// Write the symbol store to this file.  Without a value the
        /// user cache directory is used.
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        snapshot: Option<PathBuf>,
    },
    /// Print declarations named exactly NAME.
    Find { dir: PathBuf, name: String },
    /// Print declarations with a word starting with TEXT.
    Match {
        dir: PathBuf,
        text: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot walk project: {0}")]
    Walk(#[from] ignore::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no cache directory available for the snapshot; pass a path")]
    NoCacheDir,
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phpantom_core=info,phpantom_index=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let jobs = cli
        .jobs
        .or_else(|| thread::available_parallelism().ok())
        .map_or(1, NonZeroUsize::get);
    match cli.command {
        Command::Index { dir, snapshot } => {
            let project = Project::index(&dir, jobs)?;
            let mut out = io::stdout().lock();
            writeln!(out, "files:      {}", project.files)?;
            writeln!(out, "symbols:    {}", project.store.read().symbol_count())?;
            writeln!(out, "references: {}", project.reference_count())?;
            if let Some(path) = snapshot {
                let path = if path.as_os_str().is_empty() {
                    default_snapshot_path(&dir).ok_or(CliError::NoCacheDir)?
                } else {
                    path
                };
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                project.store.read().save(&path)?;
                writeln!(out, "snapshot:   {}", path.display())?;
            }
        }
        Command::Find { dir, name } => {
            let project = Project::index(&dir, jobs)?;
            let store = project.store.read();
            print_declarations(&store, store.find(&name, |_| true))?;
        }
        Command::Match { dir, text, limit } => {
            let project = Project::index(&dir, jobs)?;
            let store = project.store.read();
            let found: Vec<&Declaration> = store.match_iterator(&text, |_| true).take(limit).collect();
            print_declarations(&store, found)?;
        }
    }
    Ok(())
}

fn print_declarations(store: &SymbolStore, decls: Vec<&Declaration>) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    for decl in decls {
        let location = match store.symbol_location(decl) {
            Ok(loc) => format!(
                "{}:{}:{}",
                loc.uri,
                loc.range.start.line + 1,
                loc.range.start.character + 1
            ),
            Err(StoreError::MissingLocation { .. } | StoreError::MissingTable { .. }) => {
                "<builtin>".to_string()
            }
            Err(err) => return Err(err.into()),
        };
        let ty = decl.resolved_type();
        if ty.is_empty() {
            writeln!(out, "{:<14} {} {}", decl.kind.to_string(), decl.name, location)?;
        } else {
            writeln!(out, "{:<14} {}: {} {}", decl.kind.to_string(), decl.name, ty, location)?;
        }
    }
    Ok(())
}

/// An indexed project: the shared symbol store plus every file's
/// Reference Table.
struct Project {
    store: SharedStore,
    references: ReferenceStore,
    files: usize,
}

impl Project {
    fn index(root: &Path, jobs: usize) -> Result<Self, CliError> {
        let config = Config::load_from_project(root);
        let paths = collect_files(root, &config)?;
        info!(files = paths.len(), jobs, "indexing {}", root.display());

        let store = if config.index.builtins {
            SymbolStore::with_builtins()
        } else {
            SymbolStore::new()
        };
        let store = SharedStore::new(store);
        let chunk = paths.len().div_ceil(jobs).max(1);

        // declarations: parse in parallel, insert one table at a time
        let documents: Vec<ParsedDocument> = thread::scope(|scope| {
            let workers: Vec<_> = paths
                .chunks(chunk)
                .map(|chunk| {
                    let store = &store;
                    scope.spawn(move || {
                        let mut documents = Vec::with_capacity(chunk.len());
                        for path in chunk {
                            let Some(document) = read_document(path) else {
                                continue;
                            };
                            let table = SymbolTable::create(&document);
                            if let Err(err) = store.write().add(table) {
                                warn!("{err}");
                                continue;
                            }
                            documents.push(document);
                        }
                        documents
                    })
                })
                .collect();
            workers.into_iter().flat_map(join_worker).collect()
        });

        // references: every declaration is in, so readers share the store
        let union_limit = config.analysis.union_limit;
        let chunk = documents.len().div_ceil(jobs).max(1);
        let tables = thread::scope(|scope| {
            let workers: Vec<_> = documents
                .chunks(chunk)
                .map(|chunk| {
                    let store = &store;
                    scope.spawn(move || {
                        let store = store.read();
                        chunk
                            .iter()
                            .map(|document| read_references_with_limit(document, &store, union_limit))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers.into_iter().flat_map(join_worker).collect::<Vec<_>>()
        });

        let mut references = ReferenceStore::new();
        for table in tables {
            references.add(table);
        }
        Ok(Self {
            store,
            references,
            files: documents.len(),
        })
    }

    fn reference_count(&self) -> usize {
        self.references.tables().map(|t| t.references().len()).sum()
    }
}

fn join_worker<T>(handle: thread::ScopedJoinHandle<'_, Vec<T>>) -> Vec<T> {
    match handle.join() {
        Ok(items) => items,
        Err(_) => {
            warn!("worker thread panicked; its files are skipped");
            Vec::new()
        }
    }
}

fn read_document(path: &Path) -> Option<ParsedDocument> {
    match fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let uri = format!("file://{}", path.display());
            debug!(uri = %uri, bytes = bytes.len(), "parsing");
            Some(ParsedDocument::new(uri, text))
        }
        Err(err) => {
            warn!(path = %path.display(), "cannot read file: {err}");
            None
        }
    }
}

/// PHP files under `root`, honouring `.gitignore` and the configured
/// excludes, in a stable order.
fn collect_files(root: &Path, config: &Config) -> Result<Vec<PathBuf>, CliError> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in &config.index.exclude {
        overrides.add(&format!("!{pattern}"))?;
    }
    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .overrides(overrides.build()?)
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_some_and(|t| t.is_file()) && config.index.is_php_file(path) {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}
