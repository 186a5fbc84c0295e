use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use imdb_search::{Query, Search, Store, StoreBuilder};
use lazy_static::lazy_static;

use crate::util::{choose, write_directives, write_json, write_tsv};

mod logger;
mod util;

/// A convenient result type alias for the command line program.
type Result<T> = anyhow::Result<T>;

fn main() {
    if let Err(err) = try_main() {
        // A pipe error occurs when the consumer of this process's output has
        // hung up. This is a normal event, and we should quit gracefully.
        if is_pipe_error(&err) {
            process::exit(0);
        }
        eprintln!("{:?}", err);
        process::exit(1);
    }
}

fn try_main() -> Result<()> {
    logger::init()?;
    log::set_max_level(log::LevelFilter::Info);

    let args = Args::from_matches(&app().get_matches())?;
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    }
    if args.list_directives {
        return write_directives(io::stdout());
    }

    if let Some(ref data_dir) = args.load {
        let mut store = args.builder().create(&args.db)?;
        let stats = store.load(data_dir)?;
        log::info!(
            "loaded {} movies, {} TV shows, {} episodes, {} actors, \
             {} ratings and {} credits",
            stats.movies,
            stats.tvshows,
            stats.episodes,
            stats.actors,
            stats.ratings,
            stats.credits,
        );
        if args.query.is_none() {
            return Ok(());
        }
    }
    let query = match args.query {
        None => anyhow::bail!("run with a query or --load, try --help"),
        Some(ref query) => query,
    };
    if !args.db.exists() {
        anyhow::bail!(
            "no database at {}, create one with --load",
            args.db.display()
        );
    }

    let store = args.open_store()?;
    let query: Query = query.parse()?;
    let mut search =
        Search::new(&store, query.good_threshold(args.good_threshold));
    if args.interactive {
        search = search.chooser(choose);
    }
    let mut results = search.results()?;
    if args.pick {
        match search.pick(&results)? {
            None => anyhow::bail!("no search results available for query"),
            Some(result) => results = vec![result],
        }
    }
    if args.json {
        write_json(io::stdout(), &results)
    } else {
        write_tsv(io::stdout(), &results)
    }
}

#[derive(Debug)]
struct Args {
    db: PathBuf,
    debug: bool,
    good_threshold: f64,
    interactive: bool,
    json: bool,
    list_directives: bool,
    load: Option<PathBuf>,
    no_fuzzy: bool,
    pick: bool,
    query: Option<String>,
}

impl Args {
    fn from_matches(matches: &clap::ArgMatches) -> Result<Args> {
        let query = matches
            .values_of_lossy("query")
            .map(|words| words.join(" "))
            .filter(|q| !q.trim().is_empty());
        let db = match matches.value_of_os("db") {
            Some(db) => PathBuf::from(db),
            None => DB_PATH.clone(),
        };
        let good_threshold =
            matches.value_of_lossy("good-threshold").map_or(Ok(0.25), |t| {
                t.parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid threshold: {}", e))
            })?;
        Ok(Args {
            db,
            debug: matches.is_present("debug"),
            good_threshold,
            interactive: matches.is_present("interactive"),
            json: matches.is_present("json"),
            list_directives: matches.is_present("list-directives"),
            load: matches.value_of_os("load").map(PathBuf::from),
            no_fuzzy: matches.is_present("no-fuzzy"),
            pick: matches.is_present("pick"),
            query,
        })
    }

    fn builder(&self) -> StoreBuilder {
        let mut builder = StoreBuilder::new();
        builder.fuzzy(!self.no_fuzzy);
        builder
    }

    fn open_store(&self) -> Result<Store> {
        Ok(self.builder().open(&self.db)?)
    }
}

lazy_static! {
    // clap wants all of its strings tied to a particular lifetime, but we'd
    // really like to determine some default values dynamically. Using a
    // lazy_static here is one way of safely giving a static lifetime to a
    // value that is computed at runtime.
    static ref DB_PATH: PathBuf =
        env::temp_dir().join("imdb-query").join("imdb.sqlite");
}

fn app() -> clap::App<'static, 'static> {
    use clap::{App, AppSettings, Arg};

    App::new("imdb-query")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .max_term_width(100)
        .setting(AppSettings::UnifiedHelpMessage)
        .after_help(
            "A query is free text mixed with directives in curly braces, \
             e.g., '{show:the simpsons} {seasons:1} {sort:rank desc}'. \
             Run with --list-directives to see every directive.",
        )
        .arg(Arg::with_name("query")
             .multiple(true)
             .help("The search query. Multiple arguments are joined with \
                    spaces."))
        .arg(Arg::with_name("db")
             .long("db")
             .env("IMDB_QUERY_DB")
             .takes_value(true)
             .default_value_os(DB_PATH.as_os_str())
             .help("The location of the SQLite database."))
        .arg(Arg::with_name("load")
             .long("load")
             .takes_value(true)
             .value_name("DATA_DIR")
             .help("Create the database from the TSV files in DATA_DIR. \
                    This overwrites any existing database. If no query is \
                    given, then this exits after loading."))
        .arg(Arg::with_name("no-fuzzy")
             .long("no-fuzzy")
             .help("Disable similarity matching of names. Names are then \
                    matched exactly, or as patterns when they contain % \
                    or _."))
        .arg(Arg::with_name("good-threshold")
             .long("good-threshold")
             .takes_value(true)
             .default_value("0.25")
             .help("The minimum similarity gap between the two best \
                    candidates of a sub-search for the best one to be \
                    picked without asking."))
        .arg(Arg::with_name("interactive")
             .long("interactive")
             .short("i")
             .help("Prompt for a choice when a sub-search (or --pick) has \
                    no clear winner. Otherwise, the best candidate is \
                    used."))
        .arg(Arg::with_name("pick")
             .long("pick")
             .short("p")
             .help("Print only the single best result."))
        .arg(Arg::with_name("json")
             .long("json")
             .help("Print each result as a line of JSON."))
        .arg(Arg::with_name("list-directives")
             .long("list-directives")
             .help("Print every query directive and exit."))
        .arg(Arg::with_name("debug")
             .long("debug")
             .help("Show debug messages, including the SQL of every \
                    search. Use this when filing bugs."))
}

/// Return true if and only if an I/O broken pipe error exists in the causal
/// chain of the given error.
fn is_pipe_error(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(ioerr) = cause.downcast_ref::<io::Error>() {
            if ioerr.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
    }
    false
}
