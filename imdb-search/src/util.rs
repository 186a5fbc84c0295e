use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time;

use flate2::read::GzDecoder;

use crate::error::{Error, ErrorKind, Result};

/// The TSV file of movies. Each record has the movie's atom, title, year,
/// disambiguating sequence and whether it was made for TV or video.
pub const DATA_MOVIES: &str = "movies.tsv";

/// The TSV file of TV shows. Each record has the show's atom, title, year,
/// sequence and the years it started and stopped airing.
pub const DATA_TVSHOWS: &str = "tvshows.tsv";

/// The TSV file of episodes. Each record joins an episode atom to the atom
/// of its TV show, along with its title, year, season and episode number.
pub const DATA_EPISODES: &str = "episodes.tsv";

/// The TSV file of actors. Each record has an actor's atom, full name and
/// sequence.
pub const DATA_ACTORS: &str = "actors.tsv";

/// The TSV file of ratings. Each record has the atom of a media entity, its
/// number of votes and its rank on a scale of 0 to 100.
pub const DATA_RATINGS: &str = "ratings.tsv";

/// The TSV file of credits. Each record joins an actor atom to a media atom,
/// with the character played, billing position and attributes.
pub const DATA_CREDITS: &str = "credits.tsv";

/// A type that provides a Display impl for std::time::Duration.
#[derive(Debug)]
pub struct NiceDuration(pub time::Duration);

impl fmt::Display for NiceDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:0.4} secs", self.fractional_seconds())
    }
}

impl NiceDuration {
    /// Create a duration corresponding to the amount of time since the
    /// instant given.
    pub fn since(t: time::Instant) -> NiceDuration {
        NiceDuration(time::Instant::now().duration_since(t))
    }

    /// Returns the number of seconds in this duration in fraction form.
    /// The number to the left of the decimal point is the number of seconds,
    /// and the number to the right is the number of milliseconds.
    pub fn fractional_seconds(&self) -> f64 {
        let fractional = (self.0.subsec_nanos() as f64) / 1_000_000_000.0;
        self.0.as_secs() as f64 + fractional
    }
}

/// A function for creating a CSV reader builder that is pre-loaded with the
/// correct settings for reading all of our TSV data files.
pub fn csv_reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).delimiter(b'\t').quoting(false);
    builder
}

/// Find the data file with the given name in `data_dir`.
///
/// A gzip compressed version of the file (with a `.gz` extension) is used
/// when the uncompressed file is absent. If neither exists, then the path to
/// the uncompressed file is returned anyway, so that opening it reports a
/// sensible error.
pub fn data_path(data_dir: &Path, name: &str) -> PathBuf {
    let plain = data_dir.join(name);
    if plain.exists() {
        return plain;
    }
    let gz = data_dir.join(format!("{}.gz", name));
    if gz.exists() {
        gz
    } else {
        plain
    }
}

/// Builds a CSV reader (using `csv_reader_builder`) for the TSV file at the
/// given path. If the path ends with `.gz`, then its contents are
/// decompressed on the fly.
pub fn tsv_file<P: AsRef<Path>>(
    path: P,
) -> Result<csv::Reader<Box<dyn io::Read>>> {
    let path = path.as_ref();
    let file = open_file(path)?;
    let rdr: Box<dyn io::Read> =
        if path.extension().map_or(false, |ext| ext == "gz") {
            Box::new(GzDecoder::new(io::BufReader::new(file)))
        } else {
            Box::new(io::BufReader::new(file))
        };
    Ok(csv_reader_builder().from_reader(rdr))
}

/// Convert a CSV error into our error type, attaching the path of the file
/// being read.
pub fn csv_path_error<P: AsRef<Path>>(err: csv::Error, path: P) -> Error {
    Error::new(ErrorKind::Csv(format!("{}: {}", path.as_ref().display(), err)))
}

/// Opens a file for reading.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io_path(e, path))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn reads_plain_and_gzipped_tsv() {
        let tmp = TempDir::new("imdb-search-util").unwrap();
        let data = "atom_id\tname\n1\tfoo\n2\tbar\n";

        std::fs::write(tmp.path().join("plain.tsv"), data).unwrap();
        let gzfile =
            File::create(tmp.path().join("packed.tsv.gz")).unwrap();
        let mut enc = GzEncoder::new(gzfile, Compression::default());
        enc.write_all(data.as_bytes()).unwrap();
        enc.finish().unwrap();

        for name in &["plain.tsv", "packed.tsv"] {
            let path = data_path(tmp.path(), name);
            let mut rdr = tsv_file(&path).unwrap();
            let rows: Vec<csv::StringRecord> =
                rdr.records().map(|r| r.unwrap()).collect();
            assert_eq!(rows.len(), 2);
            assert_eq!(&rows[1][1], "bar");
        }
    }

    #[test]
    fn missing_data_file_is_io_error() {
        let tmp = TempDir::new("imdb-search-util").unwrap();
        let path = data_path(tmp.path(), "nope.tsv");
        assert_eq!(path, tmp.path().join("nope.tsv"));
        match tsv_file(&path) {
            Err(err) => match *err.kind() {
                ErrorKind::Io { .. } => {}
                ref kind => panic!("unexpected error: {:?}", kind),
            },
            Ok(_) => panic!("expected an error"),
        }
    }
}
