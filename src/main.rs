use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use lexi::query::{Inflections, search};
use lexi::store::{ImportOptions, ImportOutcome, Lookup, SourceFormat, Store, import};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lexi")]
#[command(about = "Local dictionary lookup engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dictionary directory (defaults to the platform data dir)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a raw word-list file into the dictionary
    Import {
        /// Source file
        file: PathBuf,

        /// Line format of the source file
        #[arg(long, value_enum, default_value_t = FormatArg::Bullet)]
        format: FormatArg,

        /// Text encoding label of the source file (e.g. utf-8, shift_jis)
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        /// Combine meanings of words already present instead of appending
        /// a self-contained segment
        #[arg(long)]
        merge: bool,

        /// Place the new entries before existing ones
        #[arg(long)]
        head: bool,

        /// Dictionary name recorded in the segment header
        #[arg(long)]
        name: Option<String>,
    },
    /// Look a phrase up
    Lookup {
        /// Phrase to look up
        #[arg(trailing_var_arg = true, required = true)]
        phrase: Vec<String>,

        /// JSON file with custom noun/verb inflection tables
        #[arg(long)]
        tables: Option<PathBuf>,
    },
    /// Show dictionary statistics
    Stats,
    /// Print content hashes of the store and index files
    Hash,
    /// Delete the persisted store and index
    Reset {
        /// Skip the confirmation check
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Bullet,
    Tab,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let dir = match cli.dir {
        Some(dir) => dir,
        None => lexi::utils::get_dictionary_dir()?,
    };
    let store = Store::open(&dir)?;

    match cli.command {
        Commands::Import {
            file,
            format,
            encoding,
            merge,
            head,
            name,
        } => {
            let encoding = encoding_rs::Encoding::for_label(encoding.as_bytes())
                .with_context(|| format!("unknown encoding label {encoding:?}"))?;
            let options = ImportOptions {
                format: match format {
                    FormatArg::Bullet => SourceFormat::Bullet,
                    FormatArg::Tab => SourceFormat::Tab,
                },
                encoding,
                merge_into_existing: merge,
                insert_at_head: head,
                name,
            };
            match import(&store, &file, &options) {
                ImportOutcome::Succeeded => {
                    println!("Imported {}", file.display());
                    println!("Populated buckets: {}", store.snapshot().populated_count());
                }
                ImportOutcome::SourceFileNotFound => {
                    bail!("source file not found: {}", file.display())
                }
                ImportOutcome::IndexMissingWhileStorePresent => {
                    bail!("store file exists without its index; run `lexi reset` first")
                }
                ImportOutcome::NoParseableEntries => {
                    bail!("no parseable entries in {}", file.display())
                }
                ImportOutcome::UnknownFailure => {
                    bail!("import failed; previous dictionary left untouched")
                }
            }
        }
        Commands::Lookup { phrase, tables } => {
            let phrase = phrase.join(" ");
            let tables = match tables {
                Some(path) => Inflections::from_path(&path)?,
                None => Inflections::builtin().clone(),
            };
            let mut lookup = Lookup::new(&store);
            let results = search(&mut lookup, &phrase, &tables)?;
            if results.items.is_empty() {
                println!("No matches for {phrase:?}");
            }
            for item in &results.items {
                println!("{}", item.word);
                for meaning in &item.meanings {
                    println!("  {meaning}");
                }
            }
            if !results.suggestions.is_empty() {
                println!("Suggestions: {}", results.suggestions.join(", "));
            }
        }
        Commands::Stats => {
            let snapshot = store.snapshot();
            println!("Store:             {}", store.store_path().display());
            println!("Store size:        {} bytes", store.store_size());
            println!("Populated buckets: {}", snapshot.populated_count());
            println!("Total spans:       {}", snapshot.span_count());
        }
        Commands::Hash => match store.fingerprint()? {
            Some(fingerprint) => {
                println!("store  {}", fingerprint.store);
                println!("index  {}", fingerprint.index);
            }
            None => bail!("no dictionary files at {}", dir.display()),
        },
        Commands::Reset { force } => {
            if !force {
                bail!(
                    "this deletes the dictionary at {}; pass --force to confirm",
                    dir.display()
                );
            }
            store.reset()?;
            println!("Dictionary reset at {}", dir.display());
        }
    }

    Ok(())
}
