use std::fmt;
use std::path::{Path, PathBuf};

/// A type alias for handling errors throughout imdb-search.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while building, compiling or running a search.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Return a reference to the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Transfer ownership of the kind of this error.
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Create an error reported by a chooser callback.
    ///
    /// Callers that prompt an end user for a choice can use this to abort
    /// the search that asked for the choice.
    pub fn chooser<T: AsRef<str>>(msg: T) -> Error {
        Error { kind: ErrorKind::Chooser(msg.as_ref().to_string()) }
    }

    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }

    pub(crate) fn unknown_entity<T: AsRef<str>>(unk: T) -> Error {
        Error { kind: ErrorKind::UnknownEntity(unk.as_ref().to_string()) }
    }

    pub(crate) fn unknown_directive<T: AsRef<str>>(unk: T) -> Error {
        Error { kind: ErrorKind::UnknownDirective(unk.as_ref().to_string()) }
    }

    pub(crate) fn unknown_sort<T: AsRef<str>>(unk: T) -> Error {
        Error { kind: ErrorKind::UnknownSort(unk.as_ref().to_string()) }
    }

    pub(crate) fn directive_arg<N: AsRef<str>, M: AsRef<str>>(
        name: N,
        msg: M,
    ) -> Error {
        Error {
            kind: ErrorKind::DirectiveArgument {
                name: name.as_ref().to_string(),
                msg: msg.as_ref().to_string(),
            },
        }
    }

    pub(crate) fn sub_search(role: &'static str, err: Error) -> Error {
        Error { kind: ErrorKind::SubSearch { role, err: Box::new(err) } }
    }

    pub(crate) fn bug<T: AsRef<str>>(msg: T) -> Error {
        Error { kind: ErrorKind::Bug(msg.as_ref().to_string()) }
    }

    pub(crate) fn version(expected: u64, got: u64) -> Error {
        Error { kind: ErrorKind::VersionMismatch { expected, got } }
    }

    pub(crate) fn sql(err: rusqlite::Error) -> Error {
        Error { kind: ErrorKind::Sql(err) }
    }

    pub(crate) fn io_path<P: AsRef<Path>>(
        err: std::io::Error,
        path: P,
    ) -> Error {
        Error {
            kind: ErrorKind::Io {
                err,
                path: Some(path.as_ref().to_path_buf()),
            },
        }
    }

    pub(crate) fn number<E: std::error::Error + Send + Sync + 'static>(
        err: E,
    ) -> Error {
        Error { kind: ErrorKind::Number(Box::new(err)) }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        Error::sql(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Io { ref err, .. } => Some(err),
            ErrorKind::Number(ref err) => Some(&**err),
            ErrorKind::Sql(ref err) => Some(err),
            ErrorKind::SubSearch { ref err, .. } => Some(&**err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// The specific kind of error that can occur.
#[derive(Debug)]
pub enum ErrorKind {
    /// A database format version mismatch. This error occurs when the
    /// version stamped on a database is different from the version
    /// supported by this version of imdb-search.
    ///
    /// The versions must be exactly equivalent, otherwise this error is
    /// returned.
    VersionMismatch {
        /// The expected or supported database version.
        expected: u64,
        /// The actual version of the database on disk.
        got: u64,
    },
    /// An error parsing the name of an entity kind.
    ///
    /// The data provided is the unrecognized name.
    UnknownEntity(String),
    /// An error parsing the name of a directive from a free-form query.
    ///
    /// The data provided is the unrecognized name.
    UnknownDirective(String),
    /// A directive was given an argument it could not use. This covers
    /// missing arguments, arguments to directives that take none and
    /// malformed arguments.
    DirectiveArgument {
        /// The name of the directive, as written in the query.
        name: String,
        /// A description of what went wrong.
        msg: String,
    },
    /// An error parsing a sort column or sort direction.
    ///
    /// The data provided is the unrecognized word.
    UnknownSort(String),
    /// An error occurred while parsing a number in a free-form query.
    Number(Box<dyn std::error::Error + Send + Sync>),
    /// An error occurred while building or running a sub-search.
    SubSearch {
        /// A short label describing the sub-search, e.g., "TV show".
        role: &'static str,
        /// The underlying error.
        err: Box<Error>,
    },
    /// A chooser callback refused to make a choice.
    Chooser(String),
    /// An unexpected error occurred that should not have occurred.
    /// Generally, these errors correspond to bugs in this library.
    Bug(String),
    /// An error that occured while reading TSV data.
    Csv(String),
    /// An error reported by SQLite.
    Sql(rusqlite::Error),
    /// An unexpected I/O error occurred.
    Io {
        /// The underlying I/O error.
        err: std::io::Error,
        /// A file path, if the I/O error occurred in the context of a named
        /// file.
        path: Option<PathBuf>,
    },
    /// Hints that destructuring should not be exhaustive.
    ///
    /// This enum may grow additional variants, so this makes sure clients
    /// don't count on exhaustive matching. (Otherwise, adding a new variant
    /// could break existing code.)
    #[doc(hidden)]
    __Nonexhaustive,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::VersionMismatch { expected, got } => write!(
                f,
                "database version mismatch: expected version {} \
                 but got version {}. Please reload the database.",
                expected, got
            ),
            ErrorKind::UnknownEntity(ref unk) => {
                write!(f, "unrecognized entity kind: '{}'", unk)
            }
            ErrorKind::UnknownDirective(ref unk) => {
                write!(f, "unrecognized search directive: '{}'", unk)
            }
            ErrorKind::DirectiveArgument { ref name, ref msg } => {
                write!(f, "invalid use of directive '{}': {}", name, msg)
            }
            ErrorKind::UnknownSort(ref unk) => {
                write!(f, "unrecognized sort column or direction: '{}'", unk)
            }
            ErrorKind::Number(ref err) => {
                write!(f, "error parsing number: {}", err)
            }
            ErrorKind::SubSearch { role, ref err } => {
                write!(f, "{} sub-search: {}", role, err)
            }
            ErrorKind::Chooser(ref msg) => write!(f, "{}", msg),
            ErrorKind::Bug(ref msg) => {
                let report = "Please report this bug with a backtrace at \
                              https://github.com/BurntSushi/imdb-rename";
                write!(f, "BUG: {}\n{}", msg, report)
            }
            ErrorKind::Csv(ref msg) => write!(f, "{}", msg),
            ErrorKind::Sql(ref err) => write!(f, "sqlite error: {}", err),
            ErrorKind::Io { ref err, path: None } => {
                write!(f, "I/O error: {}", err)
            }
            ErrorKind::Io { ref err, path: Some(ref p) } => {
                write!(f, "{}: {}", p.display(), err)
            }
            ErrorKind::__Nonexhaustive => panic!("invalid error"),
        }
    }
}
