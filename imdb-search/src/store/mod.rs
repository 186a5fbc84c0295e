use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::error::{Error, Result};

pub use self::load::LoadStats;

mod load;
mod trigram;

/// The version of the database schema.
///
/// If the version stamped on a database doesn't exactly match this version,
/// then the database won't be opened. The caller must then re-create it.
const VERSION: u64 = 1;

/// The schema of a database. Every statement is idempotent.
///
/// Every entity has exactly one row in `name`, keyed by its atom. Each entity
/// also has exactly one row in the table for its kind: `movie`, `tvshow`,
/// `episode` or `actor`. Ratings and credits refer to entities by atom.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS name (
    atom_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS name_by_name ON name (name);

CREATE TABLE IF NOT EXISTS movie (
    atom_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    year INTEGER,
    sequence TEXT NOT NULL DEFAULT '',
    tv INTEGER NOT NULL DEFAULT 0,
    video INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tvshow (
    atom_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    year INTEGER,
    sequence TEXT NOT NULL DEFAULT '',
    year_start INTEGER,
    year_end INTEGER
);

CREATE TABLE IF NOT EXISTS episode (
    atom_id INTEGER PRIMARY KEY,
    tvshow_atom_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    year INTEGER,
    season INTEGER,
    episode_num INTEGER
);
CREATE INDEX IF NOT EXISTS episode_by_tvshow ON episode (tvshow_atom_id);

CREATE TABLE IF NOT EXISTS actor (
    atom_id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    sequence TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS rating (
    atom_id INTEGER PRIMARY KEY,
    votes INTEGER NOT NULL,
    rank INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS credit (
    actor_atom_id INTEGER NOT NULL,
    media_atom_id INTEGER NOT NULL,
    character TEXT NOT NULL DEFAULT '',
    position INTEGER,
    attrs TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (actor_atom_id, media_atom_id, character)
);
CREATE INDEX IF NOT EXISTS credit_by_media ON credit (media_atom_id);
";

/// A relational store of IMDb entities, backed by SQLite.
///
/// A store holds one connection to a database on disk. A store cannot be
/// shared between threads, but [`Store::try_clone`](#method.try_clone)
/// cheaply opens another connection to the same database, which can be sent
/// to another thread.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: PathBuf,
    fuzzy: bool,
    /// Whether the `similarity` function works on this connection. This is
    /// probed at most once.
    supports_fuzzy: Cell<Option<bool>>,
}

impl Store {
    /// Open an existing database using default settings.
    ///
    /// If the database does not exist, if there was a problem opening it or
    /// if its schema version is different from the one supported by this
    /// library, then this returns an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Store> {
        StoreBuilder::new().open(path)
    }

    /// Create a new empty database using default settings.
    ///
    /// This will overwrite any database that may have existed at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Store> {
        StoreBuilder::new().create(path)
    }

    /// Attempt to clone this store, returning a distinct connection to the
    /// same database.
    ///
    /// This is useful when one wants to search the same database from
    /// multiple threads.
    pub fn try_clone(&self) -> Result<Store> {
        StoreBuilder { fuzzy: self.fuzzy }.open(&self.path)
    }

    /// Return the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if and only if names can be matched by similarity.
    ///
    /// This is determined by probing the database the first time it's
    /// called, and the answer is remembered for the life of this store.
    pub fn supports_fuzzy(&self) -> bool {
        if let Some(yes) = self.supports_fuzzy.get() {
            return yes;
        }
        let probe = self.conn.query_row(
            "SELECT similarity('a', 'a')",
            [],
            |row| row.get::<_, f64>(0),
        );
        let yes = match probe {
            Ok(_) => true,
            Err(err) => {
                log::debug!("similarity matching unavailable: {}", err);
                false
            }
        };
        self.supports_fuzzy.set(Some(yes));
        yes
    }

    /// Run a parameterized SQL query and decode every row it produces.
    ///
    /// `params` are bound to the numbered placeholders `?1`, `?2`, ... of
    /// `sql`, in order.
    pub fn query<T, F>(
        &self,
        sql: &str,
        params: &[Value],
        mut decode: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(&Row) -> Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut results = vec![];
        while let Some(row) = rows.next()? {
            results.push(decode(row)?);
        }
        Ok(results)
    }

    fn version(&self) -> Result<u64> {
        let version: i64 = self.conn.pragma_query_value(
            None,
            "user_version",
            |row| row.get(0),
        )?;
        Ok(version as u64)
    }
}

/// A builder for opening or creating a `Store`.
#[derive(Debug)]
pub struct StoreBuilder {
    fuzzy: bool,
}

impl StoreBuilder {
    /// Create a new builder with a default configuration.
    pub fn new() -> StoreBuilder {
        StoreBuilder { fuzzy: true }
    }

    /// Use the current configuration to open an existing database.
    ///
    /// If the database does not exist, if there was a problem opening it or
    /// if its schema version is different from the one supported by this
    /// library, then this returns an error.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Store> {
        let path = path.as_ref();
        log::debug!("opening database {}", path.display());
        if !path.is_file() {
            let err = io::Error::new(
                io::ErrorKind::NotFound,
                "database does not exist",
            );
            return Err(Error::io_path(err, path));
        }
        let store = self.connect(path)?;
        let version = store.version()?;
        if version != VERSION {
            return Err(Error::version(VERSION, version));
        }
        Ok(store)
    }

    /// Use the current configuration to create a new empty database.
    ///
    /// Any directories leading up to `path` are created. This will overwrite
    /// any database that may have existed at `path`.
    pub fn create<P: AsRef<Path>>(&self, path: P) -> Result<Store> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::io_path(e, parent))?;
            }
        }
        if path.exists() {
            fs::remove_file(path).map_err(|e| Error::io_path(e, path))?;
        }
        log::info!("creating database at {}", path.display());

        let store = self.connect(path)?;
        store.conn.execute_batch(SCHEMA)?;
        store.conn.pragma_update(None, "user_version", VERSION as i64)?;
        Ok(store)
    }

    /// Enable or disable similarity matching of names.
    ///
    /// When disabled, the `similarity` SQL function isn't registered, so
    /// searches fall back to exact or pattern matching.
    ///
    /// This is enabled by default.
    pub fn fuzzy(&mut self, yes: bool) -> &mut StoreBuilder {
        self.fuzzy = yes;
        self
    }

    fn connect(&self, path: &Path) -> Result<Store> {
        let conn = Connection::open(path)?;
        if self.fuzzy {
            conn.create_scalar_function(
                "similarity",
                2,
                FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
                |ctx| {
                    let a = ctx.get::<Option<String>>(0)?;
                    let b = ctx.get::<Option<String>>(1)?;
                    Ok(match (a, b) {
                        (Some(a), Some(b)) => trigram::similarity(&a, &b),
                        _ => 0.0,
                    })
                },
            )?;
        }
        Ok(Store {
            conn,
            path: path.to_path_buf(),
            fuzzy: self.fuzzy,
            supports_fuzzy: Cell::new(None),
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> StoreBuilder {
        StoreBuilder::new()
    }
}
