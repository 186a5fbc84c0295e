/*!
This crate provides a search engine over an IMDb database stored in SQLite.

Searches are described by a [`Query`](struct.Query.html), which can be built
either with method chaining or by parsing a compact query language made of
free text and curly-brace directives, e.g.,
`{show:the simpsons} {seasons:1} {sort:rank desc}`. A query may contain
nested sub-searches, which are resolved to a single entity before the query
is compiled into one SQL statement spanning movies, TV shows, episodes and
actors.
*/

#![deny(missing_docs)]

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::record::{
    Actor, Atom, Credit, EntityKind, Episode, Movie, Rating, TvShow,
};
pub use crate::search::{
    pick, tokenize, Arity, Chooser, CompiledQuery, Credited, Direction,
    Directive, MatchStrategy, Query, RangeFilter, Ranking, Resolution, Search,
    SearchResult, Sort, SortColumn, DIRECTIVES, ROLE_CAST, ROLE_CREDITS,
    ROLE_RESULT, ROLE_TVSHOW,
};
pub use crate::store::{LoadStats, Store, StoreBuilder};

// A macro that creates an error that represents a bug.
//
// This is used when decoding rows produced by the query compiler. Since those
// rows are shaped by our own SQL, anything unexpected in them is a bug on our
// end rather than bad user input.
macro_rules! bug {
    ($($tt:tt)*) => {{
        return Err($crate::error::Error::bug(format!($($tt)*)));
    }}
}

mod error;
mod record;
mod search;
mod store;
mod util;
