use std::path::Path;
use std::time::Instant;

use rusqlite::{params, Connection, Transaction};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::record::{Actor, Atom, Credit, Episode, Movie, Rating, TvShow};
use crate::store::Store;
use crate::util::{
    csv_path_error, data_path, tsv_file, NiceDuration, DATA_ACTORS,
    DATA_CREDITS, DATA_EPISODES, DATA_MOVIES, DATA_RATINGS, DATA_TVSHOWS,
};

const INSERT_NAME: &str =
    "INSERT OR REPLACE INTO name (atom_id, name) VALUES (?1, ?2)";

/// The number of records loaded from each data file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoadStats {
    /// The number of movies loaded.
    pub movies: u64,
    /// The number of TV shows loaded.
    pub tvshows: u64,
    /// The number of episodes loaded.
    pub episodes: u64,
    /// The number of actors loaded.
    pub actors: u64,
    /// The number of ratings loaded.
    pub ratings: u64,
    /// The number of credits loaded.
    pub credits: u64,
}

impl LoadStats {
    /// The total number of records loaded.
    pub fn total(&self) -> u64 {
        self.movies
            + self.tvshows
            + self.episodes
            + self.actors
            + self.ratings
            + self.credits
    }
}

impl Store {
    /// Load every TSV data file in `data_dir` into this store.
    ///
    /// `data_dir` must contain `movies.tsv`, `tvshows.tsv`, `episodes.tsv`,
    /// `actors.tsv`, `ratings.tsv` and `credits.tsv`, each of which may
    /// instead be gzip compressed with a `.gz` extension. Each file has a
    /// header row and is loaded in its own transaction. Records with an atom
    /// that was already loaded replace the earlier record.
    pub fn load<P: AsRef<Path>>(&mut self, data_dir: P) -> Result<LoadStats> {
        let data_dir = data_dir.as_ref();
        let start = Instant::now();
        let conn = &mut self.conn;
        let stats = LoadStats {
            movies: load_file(conn, data_dir, DATA_MOVIES, |tx, m: Movie| {
                tx.prepare_cached(
                    "INSERT OR REPLACE INTO movie \
                     (atom_id, title, year, sequence, tv, video) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?
                .execute(params![
                    m.atom_id.get(),
                    m.title,
                    m.year,
                    m.sequence,
                    m.tv,
                    m.video,
                ])?;
                insert_name(tx, m.atom_id, &m.title)
            })?,
            tvshows: load_file(conn, data_dir, DATA_TVSHOWS, |tx, t: TvShow| {
                tx.prepare_cached(
                    "INSERT OR REPLACE INTO tvshow \
                     (atom_id, title, year, sequence, year_start, year_end) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?
                .execute(params![
                    t.atom_id.get(),
                    t.title,
                    t.year,
                    t.sequence,
                    t.year_start,
                    t.year_end,
                ])?;
                insert_name(tx, t.atom_id, &t.title)
            })?,
            episodes: load_file(
                conn,
                data_dir,
                DATA_EPISODES,
                |tx, e: Episode| {
                    tx.prepare_cached(
                        "INSERT OR REPLACE INTO episode \
                         (atom_id, tvshow_atom_id, title, year, season, \
                          episode_num) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    )?
                    .execute(params![
                        e.atom_id.get(),
                        e.tvshow_atom_id.get(),
                        e.title,
                        e.year,
                        e.season,
                        e.episode_num,
                    ])?;
                    insert_name(tx, e.atom_id, &e.title)
                },
            )?,
            actors: load_file(conn, data_dir, DATA_ACTORS, |tx, a: Actor| {
                tx.prepare_cached(
                    "INSERT OR REPLACE INTO actor \
                     (atom_id, full_name, sequence) VALUES (?1, ?2, ?3)",
                )?
                .execute(params![a.atom_id.get(), a.full_name, a.sequence])?;
                insert_name(tx, a.atom_id, &a.full_name)
            })?,
            ratings: load_file(conn, data_dir, DATA_RATINGS, |tx, r: Rating| {
                tx.prepare_cached(
                    "INSERT OR REPLACE INTO rating (atom_id, votes, rank) \
                     VALUES (?1, ?2, ?3)",
                )?
                .execute(params![r.atom_id.get(), r.votes, r.rank])?;
                Ok(())
            })?,
            credits: load_file(conn, data_dir, DATA_CREDITS, |tx, c: Credit| {
                tx.prepare_cached(
                    "INSERT OR REPLACE INTO credit \
                     (actor_atom_id, media_atom_id, character, position, \
                      attrs) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?
                .execute(params![
                    c.actor_atom_id.get(),
                    c.media_atom_id.get(),
                    c.character,
                    c.position,
                    c.attrs,
                ])?;
                Ok(())
            })?,
        };
        log::info!(
            "loaded {} records from {} (took {})",
            stats.total(),
            data_dir.display(),
            NiceDuration::since(start)
        );
        Ok(stats)
    }
}

/// Load every record of a single data file in one transaction, returning the
/// number of records loaded.
fn load_file<R, F>(
    conn: &mut Connection,
    data_dir: &Path,
    name: &str,
    mut insert: F,
) -> Result<u64>
where
    R: DeserializeOwned,
    F: FnMut(&Transaction, R) -> Result<()>,
{
    let start = Instant::now();
    let path = data_path(data_dir, name);
    let mut rdr = tsv_file(&path)?;
    let tx = conn.transaction()?;
    let mut count = 0;
    for result in rdr.deserialize() {
        let record: R = result.map_err(|e| csv_path_error(e, &path))?;
        insert(&tx, record)?;
        count += 1;
    }
    tx.commit()?;
    log::debug!(
        "loaded {} records from {} (took {})",
        count,
        path.display(),
        NiceDuration::since(start)
    );
    Ok(count)
}

fn insert_name(tx: &Transaction, atom: Atom, name: &str) -> Result<()> {
    tx.prepare_cached(INSERT_NAME)?.execute(params![atom.get(), name])?;
    Ok(())
}
