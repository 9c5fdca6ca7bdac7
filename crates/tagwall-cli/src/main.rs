use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagwall_core::{
    normalize_resource_id, ContextKey, ExtractedMetadata, FilterEngine, Item, MetadataCache,
    NormalizedTagSet, RawItem, SelectionStore, Store, StoreImpl, TagLearningStore, WallConfig,
};
use tracing_subscriber::EnvFilter;

mod config;
mod doctor;

#[derive(Parser)]
#[command(
    name = "tagwall",
    version,
    about = "Tagwall: learned tags, filter selections and metadata cache"
)]
struct Cli {
    /// Database path (overrides settings)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Settings file (default: <config dir>/tagwall/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical tags of a raw tag string
    Parse {
        text: String,
        #[arg(long)]
        json: bool,
    },
    /// Learned tag bank
    Tags {
        #[command(subcommand)]
        cmd: TagCmd,
    },
    /// Persisted filter selection
    Selection {
        #[command(subcommand)]
        cmd: SelectionCmd,
    },
    /// Filter a JSON listing dump with the saved selection (use - for stdin)
    Filter {
        #[arg(short, long)]
        context: String,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Metadata cache
    Cache {
        #[command(subcommand)]
        cmd: CacheCmd,
    },
    /// Show resolved paths and storage health
    Doctor,
}

#[derive(Subcommand)]
enum TagCmd {
    /// Learn tags from one or more raw tag strings
    Learn {
        #[arg(short, long)]
        context: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    List {
        #[arg(short, long)]
        context: String,
        #[arg(long)]
        json: bool,
    },
    /// Contexts with learned tags
    Contexts,
}

#[derive(Subcommand)]
enum SelectionCmd {
    Show {
        #[arg(short, long)]
        context: String,
        #[arg(long)]
        json: bool,
    },
    /// Replace the selection
    Set {
        #[arg(short, long)]
        context: String,
        tags: Vec<String>,
    },
    Toggle {
        #[arg(short, long)]
        context: String,
        tag: String,
    },
    Clear {
        #[arg(short, long)]
        context: String,
    },
}

#[derive(Subcommand)]
enum CacheCmd {
    Get {
        url: String,
        #[arg(long)]
        json: bool,
    },
    /// Store metadata for a details URL (no fields = negative entry)
    Put {
        url: String,
        #[arg(long)]
        thumbnail: Option<String>,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long)]
        video_id: Option<String>,
    },
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete entries older than the TTL
    Prune,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TAGWALL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_store(path: &Path) -> Result<Arc<dyn Store>> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
    }
    let store = StoreImpl::new(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(store))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings_path = cli.config.clone().unwrap_or_else(config::settings_path);
    let settings = config::load_settings(&settings_path);
    let wall = settings.wall_config();
    let db_path = cli.db.clone().unwrap_or_else(|| settings.db_path());

    match cli.command {
        Commands::Parse { text, json } => {
            let tags = NormalizedTagSet::parse(&text).into_vec();
            print_tags(&tags, json)?;
        }
        Commands::Tags { cmd } => {
            let bank = TagLearningStore::new(open_store(&db_path)?);
            match cmd {
                TagCmd::Learn { context, text } => {
                    let ctx = ContextKey::new(context);
                    let added = bank.learn(&ctx, &text)?;
                    println!("learned {added} new tag(s) for {ctx}");
                }
                TagCmd::List { context, json } => {
                    print_tags(&bank.list(&ContextKey::new(context))?, json)?;
                }
                TagCmd::Contexts => {
                    for ctx in bank.contexts()? {
                        println!("{ctx}");
                    }
                }
            }
        }
        Commands::Selection { cmd } => {
            let sel = SelectionStore::new(open_store(&db_path)?);
            match cmd {
                SelectionCmd::Show { context, json } => {
                    let s = sel.load(&ContextKey::new(context))?;
                    print_tags(s.tags(), json)?;
                }
                SelectionCmd::Set { context, tags } => {
                    let s = sel.save(&ContextKey::new(context), &tags)?;
                    println!("selected {}", s.tags().join(", "));
                }
                SelectionCmd::Toggle { context, tag } => {
                    let s = sel.toggle(&ContextKey::new(context), &tag)?;
                    println!("selected {}", s.tags().join(", "));
                }
                SelectionCmd::Clear { context } => {
                    sel.clear(&ContextKey::new(context))?;
                    println!("cleared");
                }
            }
        }
        Commands::Filter {
            context,
            input,
            json,
        } => {
            let store = open_store(&db_path)?;
            run_filter(store, &ContextKey::new(context), &input, json)?;
        }
        Commands::Cache { cmd } => {
            let cache = MetadataCache::new(open_store(&db_path)?, wall.cache_ttl())
                .with_max_entries(wall.cache_max_entries);
            run_cache(&cache, &wall, cmd)?;
        }
        Commands::Doctor => {
            doctor::report(&settings_path, &db_path, &wall)?;
        }
    }

    Ok(())
}

fn print_tags(tags: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tags)?);
    } else {
        for t in tags {
            println!("{t}");
        }
    }
    Ok(())
}

fn run_filter(store: Arc<dyn Store>, ctx: &ContextKey, input: &Path, json: bool) -> Result<()> {
    let text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?
    };
    let raws: Vec<RawItem> =
        serde_json::from_str(&text).context("listing must be a JSON array of items")?;
    let items = Item::from_raw_page(raws, 0);

    let tags: Vec<&str> = items
        .iter()
        .flat_map(|i| i.tags.iter().map(String::as_str))
        .collect();
    TagLearningStore::new(store.clone()).learn(ctx, &tags)?;
    let selection = SelectionStore::new(store).load(ctx)?;
    let visible = FilterEngine::apply(&items, &selection);

    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
    } else {
        for i in &visible {
            println!("{}\t{}\t{}", i.id, preview(&i.title), i.tags.join(", "));
        }
        eprintln!("{} of {} visible", visible.len(), items.len());
    }
    Ok(())
}

fn run_cache(cache: &MetadataCache, wall: &WallConfig, cmd: CacheCmd) -> Result<()> {
    match cmd {
        CacheCmd::Get { url, json } => {
            let key = normalize_resource_id(&wall.origin, &url);
            match cache.get(&key)? {
                Some(e) if json => println!("{}", serde_json::to_string_pretty(&e)?),
                Some(e) if e.is_negative() => println!("{key}\t(no metadata)"),
                Some(e) => {
                    let f = &e.fields;
                    println!(
                        "{key}\t{}\t{}\t{}",
                        f.thumbnail.as_deref().unwrap_or("-"),
                        f.rating.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                        f.video_id.as_deref().unwrap_or("-"),
                    );
                }
                None => {
                    println!("miss {key}");
                }
            }
        }
        CacheCmd::Put {
            url,
            thumbnail,
            rating,
            video_id,
        } => {
            let key = normalize_resource_id(&wall.origin, &url);
            let entry = cache.set(
                &key,
                ExtractedMetadata {
                    thumbnail,
                    rating,
                    video_id,
                },
            )?;
            if rating.is_some() && entry.fields.rating.is_none() {
                eprintln!("rating out of range (0, 10]; discarded");
            }
            println!("cached {key}");
        }
        CacheCmd::Stats { json } => {
            let s = cache.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&s)?);
            } else {
                println!(
                    "total {}\tfresh {}\tstale {}\tnegative {}",
                    s.total, s.fresh, s.stale, s.negative
                );
            }
        }
        CacheCmd::Prune => {
            let n = cache.prune_stale()?;
            println!("pruned {n}");
        }
    }
    Ok(())
}

fn preview(s: &str) -> String {
    let s = s.replace('\n', " ");
    const MAX: usize = 60;
    if s.chars().count() > MAX {
        format!("{}…", s.chars().take(MAX).collect::<String>())
    } else {
        s
    }
}
