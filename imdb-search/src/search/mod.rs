use crate::error::{Error, Result};
use crate::store::Store;

pub use self::compile::{CompiledQuery, MatchStrategy, Resolution};
pub use self::directive::{Arity, Directive, DIRECTIVES};
pub use self::query::{Direction, Query, Sort, SortColumn};
pub use self::range::RangeFilter;
pub use self::result::{Credited, Ranking, SearchResult};
pub use self::tokenize::tokenize;

use self::compile::{compile, SubSearches};
use self::result::decode_row;

mod compile;
mod directive;
mod query;
mod range;
mod result;
mod tokenize;


/// The label given to a chooser when resolving a TV show sub-query.
pub const ROLE_TVSHOW: &str = "TV show";
/// The label given to a chooser when resolving a credits sub-query.
pub const ROLE_CREDITS: &str = "credited media";
/// The label given to a chooser when resolving a cast sub-query.
pub const ROLE_CAST: &str = "cast member";
/// The label given to a chooser when picking from top-level results.
pub const ROLE_RESULT: &str = "result";

/// A callback that picks one result out of an ambiguous list of candidates.
///
/// The second argument is a short label describing what is being chosen,
/// e.g., `TV show`. Returning `Ok(None)` means no candidate was chosen.
/// Returning an error aborts the search that asked for the choice.
pub type Chooser<'a> =
    dyn FnMut(&[SearchResult], &str) -> Result<Option<SearchResult>> + 'a;

/// A search of a store.
///
/// A search pairs a query with the store it runs against, along with an
/// optional chooser that is consulted whenever a sub-query (or
/// [`Search::pick`](struct.Search.html#method.pick)) produces results
/// that are too close to call.
///
/// Running a search never changes it, so calling `results` repeatedly on an
/// unchanged store produces the same results.
pub struct Search<'s> {
    store: &'s Store,
    query: Query,
    chooser: Option<Box<Chooser<'s>>>,
}

impl<'s> Search<'s> {
    /// Create a new search of the given store.
    pub fn new(store: &'s Store, query: Query) -> Search<'s> {
        Search { store, query, chooser: None }
    }

    /// Create a new search of the given store from the free-form query
    /// syntax.
    pub fn parse(store: &'s Store, qstr: &str) -> Result<Search<'s>> {
        Ok(Search::new(store, qstr.parse()?))
    }

    /// Set the chooser used to resolve ambiguous results.
    ///
    /// Without a chooser, the first of several ambiguous results is picked.
    pub fn chooser<F>(mut self, chooser: F) -> Search<'s>
    where
        F: FnMut(&[SearchResult], &str) -> Result<Option<SearchResult>> + 's,
    {
        self.chooser = Some(Box::new(chooser));
        self
    }

    /// Return the query of this search.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Run this search and return its results.
    ///
    /// Sub-queries are resolved first, in the order TV show, credited media
    /// and then cast member. If any of them picks nothing, then no results
    /// are returned.
    pub fn results(&mut self) -> Result<Vec<SearchResult>> {
        run(self.store, &self.query, &mut self.chooser)
    }

    /// Resolve the sub-queries of this search and compile it, without
    /// running it.
    pub fn compile(&mut self) -> Result<CompiledQuery> {
        prepare(self.store, &self.query, &mut self.chooser)
    }

    /// Pick a single result from the results of this search.
    ///
    /// This uses the good threshold of this search's query. See the
    /// [`pick`](fn.pick.html) function for details.
    pub fn pick(
        &mut self,
        results: &[SearchResult],
    ) -> Result<Option<SearchResult>> {
        pick(
            results,
            self.query.good_threshold,
            self.chooser.as_deref_mut(),
            ROLE_RESULT,
        )
    }
}

/// Pick a single result from a list of results ordered best first.
///
/// If there are no results, then `None` is returned. If there is one, then it
/// is returned. If both of the first two results have a similarity and the
/// first beats the second by at least `good_threshold`, then the first is
/// returned. Otherwise, the chooser decides, given the full list and the
/// label `what`. Without a chooser, the first result is returned.
pub fn pick(
    results: &[SearchResult],
    good_threshold: f64,
    chooser: Option<&mut Chooser<'_>>,
    what: &str,
) -> Result<Option<SearchResult>> {
    let (first, second) = match results {
        [] => return Ok(None),
        [only] => return Ok(Some(only.clone())),
        [first, second, ..] => (first, second),
    };
    if first.has_similarity()
        && second.has_similarity()
        && first.similarity - second.similarity >= good_threshold
    {
        return Ok(Some(first.clone()));
    }
    match chooser {
        None => Ok(Some(first.clone())),
        Some(choose) => choose(results, what),
    }
}

fn run(
    store: &Store,
    query: &Query,
    chooser: &mut Option<Box<Chooser<'_>>>,
) -> Result<Vec<SearchResult>> {
    let compiled = prepare(store, query, chooser)?;
    store.query(compiled.sql(), compiled.params(), decode_row)
}

fn prepare(
    store: &Store,
    query: &Query,
    chooser: &mut Option<Box<Chooser<'_>>>,
) -> Result<CompiledQuery> {
    let subs = SubSearches {
        tvshow: resolve(store, query, &query.tvshow, ROLE_TVSHOW, chooser)?,
        credits: resolve(store, query, &query.credits, ROLE_CREDITS, chooser)?,
        cast: resolve(store, query, &query.cast, ROLE_CAST, chooser)?,
    };
    let compiled = compile(query, &subs, store.supports_fuzzy());
    if query.debug {
        log::info!("compiled search for '{}':\n{}", query, compiled);
    } else {
        log::debug!("compiled search for '{}':\n{}", query, compiled);
    }
    Ok(compiled)
}

fn resolve(
    store: &Store,
    parent: &Query,
    sub: &Option<Box<Query>>,
    role: &'static str,
    chooser: &mut Option<Box<Chooser<'_>>>,
) -> Result<Resolution> {
    let mut sub = match *sub {
        None => return Ok(Resolution::NotRequested),
        Some(ref sub) => (**sub).clone(),
    };
    sub.good_threshold = parent.good_threshold;
    sub.debug = sub.debug || parent.debug;

    let candidates =
        run(store, &sub, chooser).map_err(|e| Error::sub_search(role, e))?;
    let picked = pick(
        &candidates,
        sub.good_threshold,
        chooser.as_deref_mut(),
        role,
    )?;
    Ok(match picked {
        None => {
            log::debug!("{} sub-search '{}' picked nothing", role, sub);
            Resolution::Unresolved
        }
        Some(result) => {
            log::debug!("{} sub-search '{}' picked {}", role, sub, result);
            Resolution::Resolved(result.id)
        }
    })
}
