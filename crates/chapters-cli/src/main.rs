use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use chapters_core::{
    AppConfig, Author, Book, BookFilter, CatalogError, CatalogRepository, CatalogStore, EntityKind,
    ExitCode, FavoriteSet, FixedProbe,
};
use chapters_search::{OpenLibraryClient, SearchError};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "chapters",
    about = "Offline-first book and author catalog",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting CHAPTERS_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull the latest snapshot into the local catalog.
    Sync {
        #[arg(value_enum, default_value = "all")]
        what: SyncTarget,
        /// Skip the remote and load the bundled snapshot.
        #[arg(long)]
        offline: bool,
    },

    /// List cached books.
    Books {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        favorites: bool,
        /// Sync books first. Failures are logged and cached data is shown.
        #[arg(long)]
        refresh: bool,
    },

    /// Show a single book.
    Book { id: i64 },

    /// Toggle a book's favorite flag.
    Favorite { id: i64 },

    /// Clear a book's favorite flag.
    Unfavorite { id: i64 },

    /// List cached authors.
    Authors {
        #[arg(long)]
        popular: bool,
        #[arg(long)]
        refresh: bool,
    },

    /// Show an author and the books credited to them.
    Author { id: i64 },

    /// List book categories in catalog order.
    Categories,

    /// Print the favorites list every time it changes, until Ctrl-C.
    WatchFavorites,

    /// Search Open Library.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
        /// Treat the query as an author name.
        #[arg(long, conflicts_with = "isbn")]
        author: bool,
        /// Treat the query as an ISBN.
        #[arg(long)]
        isbn: bool,
    },

    /// Show trending fiction from Open Library.
    Trending {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum SyncTarget {
    Books,
    Authors,
    All,
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Print the config file path.
    Path,
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();
    let json_output = cli.json || std::env::var("CHAPTERS_JSON").as_deref() == Ok("1");
    let mut config = AppConfig::load()?;
    if let Ok(db_path) = std::env::var("CHAPTERS_DB") {
        config.set_database_path(db_path.into());
    }
    let out = Output { json: json_output, start };

    match cli.command {
        Commands::Sync { what, offline } => {
            let repo = open_repository(&config, offline)?;
            let results = match what {
                SyncTarget::Books => vec![(EntityKind::Books, repo.sync_books().await)],
                SyncTarget::Authors => vec![(EntityKind::Authors, repo.sync_authors().await)],
                SyncTarget::All => repo.sync_all().await,
            };
            let summary: Vec<serde_json::Value> = results
                .iter()
                .map(|(kind, result)| match result {
                    Ok(r) => serde_json::json!(r),
                    Err(e) => serde_json::json!({ "kind": kind, "error": e.to_string() }),
                })
                .collect();
            out.emit(&summary, || {
                for (kind, result) in &results {
                    match result {
                        Ok(r) => println!(
                            "Synced {} {} from {} snapshot",
                            r.count, r.kind, r.provenance
                        ),
                        Err(e) => println!("Failed to sync {kind}: {e}"),
                    }
                }
            })?;
            if let Some((_, Err(e))) = results.into_iter().find(|(_, r)| r.is_err()) {
                return Err(e.into());
            }
        }

        Commands::Books { category, favorites, refresh } => {
            let repo = open_repository(&config, false)?;
            if refresh {
                refresh_quietly(&repo, EntityKind::Books).await;
            }
            let filter = match (favorites, category) {
                (true, _) => BookFilter::Favorites,
                (false, Some(c)) => BookFilter::Category(c),
                (false, None) => BookFilter::All,
            };
            let books = repo.store().books(&filter)?;
            out.emit(&books, || {
                if books.is_empty() {
                    println!("No books ({filter}). Run `chapters sync` to load the catalog.");
                }
                for book in &books {
                    print_book_line(book);
                }
            })?;
        }

        Commands::Book { id } => {
            let repo = open_repository(&config, false)?;
            let Some(book) = repo.book(id)? else {
                not_found(&out, "book", id);
            };
            out.emit(&book, || print_book_detail(&book))?;
        }

        Commands::Favorite { id } => {
            let repo = open_repository(&config, false)?;
            let Some(value) = repo.toggle_favorite(id)? else {
                not_found(&out, "book", id);
            };
            out.emit(&serde_json::json!({ "id": id, "is_favorite": value }), || {
                if value {
                    println!("★ Added book {id} to favorites");
                } else {
                    println!("Removed book {id} from favorites");
                }
            })?;
        }

        Commands::Unfavorite { id } => {
            let repo = open_repository(&config, false)?;
            if !repo.set_favorite(id, false)? {
                not_found(&out, "book", id);
            }
            out.emit(&serde_json::json!({ "id": id, "is_favorite": false }), || {
                println!("Removed book {id} from favorites");
            })?;
        }

        Commands::Authors { popular, refresh } => {
            let repo = open_repository(&config, false)?;
            if refresh {
                refresh_quietly(&repo, EntityKind::Authors).await;
            }
            let authors = if popular {
                repo.popular_authors().current()?
            } else {
                repo.authors().current()?
            };
            out.emit(&authors, || {
                if authors.is_empty() {
                    println!("No authors. Run `chapters sync authors` to load them.");
                }
                for a in &authors {
                    let mark = if a.is_popular { "★" } else { " " };
                    println!("{id:>4}  {mark} {name}", id = a.id, name = a.name);
                }
            })?;
        }

        Commands::Author { id } => {
            let repo = open_repository(&config, false)?;
            let Some(author) = repo.author(id)? else {
                not_found(&out, "author", id);
            };
            let books = repo.books_of(&author).current()?;
            out.emit(&serde_json::json!({ "author": &author, "books": &books }), || {
                print_author_detail(&author, &books);
            })?;
        }

        Commands::Categories => {
            let repo = open_repository(&config, false)?;
            let categories = repo.categories()?;
            out.emit(&categories, || {
                for c in &categories {
                    println!("{c}");
                }
            })?;
        }

        Commands::WatchFavorites => {
            let repo = Arc::new(open_repository(&config, false)?);
            let mut favorites = FavoriteSet::new(Arc::clone(&repo)).await?;
            let mut books = repo.favorite_books().current()?;
            loop {
                out.emit(&books, || {
                    println!("── {} favorite(s) ──", books.len());
                    for book in &books {
                        print_book_line(book);
                    }
                })?;
                tokio::select! {
                    next = favorites.next_change() => books = next?,
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }

        // ── Search ─────────────────────────────────────────────────────────

        Commands::Search { query, limit, author, isbn } => {
            let client = OpenLibraryClient::from_config(&config.search)?;
            let resp = if isbn {
                client.search_by_isbn(&query).await?
            } else if author {
                client.search_by_author(&query, limit).await?
            } else {
                client.search(&query, limit).await?
            };
            out.emit(&resp, || {
                if resp.docs.is_empty() {
                    println!("No results for: {query}");
                    return;
                }
                println!("Found {} results (showing {}):", resp.num_found, resp.docs.len());
                for doc in &resp.docs {
                    let title = doc.title.as_deref().unwrap_or("(untitled)");
                    let authors = doc.author_name.join(", ");
                    let year = doc.first_publish_year.map(|y| y.to_string()).unwrap_or_default();
                    println!("  {title:<45}  {authors:<30}  {year}");
                    if let Some(url) = client.cover_url(doc.cover_id, None) {
                        println!("    cover: {url}");
                    }
                }
            })?;
        }

        Commands::Trending { limit } => {
            let client = OpenLibraryClient::from_config(&config.search)?;
            let works = client.trending(limit).await?;
            out.emit(&works, || {
                for work in &works {
                    let title = work.title.as_deref().unwrap_or("(untitled)");
                    println!("  {title:<45}  {}", work.author_names().join(", "));
                }
            })?;
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => match action {
            ConfigAction::List => {
                let kv = config_key_values(&config);
                out.emit(&kv, || {
                    for (k, v) in &kv {
                        println!("{k} = {v}");
                    }
                })?;
            }
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                out.emit(&serde_json::json!({ "path": path }), || {
                    println!("{}", path.display());
                })?;
            }
            ConfigAction::Init { force } => {
                let path = AppConfig::config_path();
                if path.exists() && !force {
                    return Err(CatalogError::Config(format!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    ))
                    .into());
                }
                AppConfig::default().save()?;
                out.emit(&serde_json::json!({ "path": path }), || {
                    println!("Wrote default config to {}", path.display());
                })?;
            }
        },

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            out.emit(&serde_json::json!({ "version": version }), || {
                println!("chapters v{version}");
            })?;
        }
    }

    if std::env::var("CHAPTERS_TIMING").as_deref() == Ok("1") {
        eprintln!("[timing] total {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

struct Output {
    json: bool,
    start: Instant,
}

impl Output {
    /// Print `data` as a JSON envelope, or run `human` for terminal output.
    fn emit<T: serde::Serialize>(&self, data: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            let dur = self.start.elapsed().as_millis();
            print_json(&serde_json::json!({
                "status": "ok",
                "data": data,
                "meta": { "duration_ms": dur }
            }))?;
        } else {
            human();
        }
        Ok(())
    }
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn not_found(out: &Output, what: &str, id: i64) -> ! {
    if out.json {
        let _ = print_json(&serde_json::json!({
            "status": "error",
            "error": "not_found",
            "message": format!("{what} {id} not found"),
        }));
    } else {
        eprintln!("No {what} with id {id}");
    }
    std::process::exit(ExitCode::NotFound as i32);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHAPTERS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_repository(config: &AppConfig, offline: bool) -> Result<CatalogRepository> {
    let store = Arc::new(CatalogStore::open(&config.database_path())?);
    let repo = CatalogRepository::from_config(store, &config.sync)?;
    Ok(if offline {
        repo.with_probe(Arc::new(FixedProbe::offline()))
    } else {
        repo
    })
}

/// Sync one kind, logging failure. The caller shows whatever is cached.
async fn refresh_quietly(repo: &CatalogRepository, kind: EntityKind) {
    if let Err(e) = repo.sync(kind).await {
        warn!(%kind, error = %e, "refresh failed, showing cached data");
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<CatalogError>() {
        return ExitCode::from(err) as i32;
    }
    match e.downcast_ref::<SearchError>() {
        Some(SearchError::InvalidQuery(_)) => ExitCode::InvalidArgs as i32,
        Some(SearchError::Http(_) | SearchError::Api(..)) => ExitCode::NetworkError as i32,
        _ => ExitCode::GeneralError as i32,
    }
}

fn print_book_line(book: &Book) {
    let mark = if book.is_favorite { "★" } else { " " };
    println!(
        "{id:>4}  {mark} {title:<40}  {author:<22}  {category}",
        id = book.id,
        title = book.title,
        author = book.author,
        category = book.category,
    );
}

fn print_book_detail(book: &Book) {
    println!("{}", book.title);
    println!("  by {}", book.author);
    println!("  category:  {}", book.category);
    println!("  favorite:  {}", if book.is_favorite { "yes" } else { "no" });
    if !book.cover_image_url.is_empty() {
        println!("  cover:     {}", book.cover_image_url);
    }
    if !book.description.is_empty() {
        println!("\n{}", book.description);
    }
}

fn print_author_detail(author: &Author, books: &[Book]) {
    println!("{}{}", author.name, if author.is_popular { "  ★ popular" } else { "" });
    if !author.description.is_empty() {
        println!("  {}", author.description);
    }
    if books.is_empty() {
        println!("\nNo books by this author in the catalog.");
    } else {
        println!("\nBooks:");
        for book in books {
            print_book_line(book);
        }
    }
}

fn config_key_values(config: &AppConfig) -> std::collections::BTreeMap<&'static str, String> {
    let mut map = std::collections::BTreeMap::new();
    map.insert("storage.database_path", config.database_path().to_string_lossy().to_string());
    map.insert("sync.books_url", config.sync.books_url.clone());
    map.insert("sync.authors_url", config.sync.authors_url.clone());
    map.insert("sync.timeout_secs", config.sync.timeout_secs.to_string());
    map.insert(
        "sync.probe",
        format!("{}:{}", config.sync.probe_host, config.sync.probe_port),
    );
    map.insert("sync.probe_timeout_ms", config.sync.probe_timeout_ms.to_string());
    map.insert(
        "sync.assets_dir",
        config.sync.assets_dir.clone().unwrap_or_else(|| "(embedded)".to_string()),
    );
    map.insert("search.base_url", config.search.base_url.clone());
    map.insert("search.covers_base_url", config.search.covers_base_url.clone());
    map.insert("search.default_limit", config.search.default_limit.to_string());
    map.insert("search.cover_size", config.search.cover_size.clone());
    map
}
