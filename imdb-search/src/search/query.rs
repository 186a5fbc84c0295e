use std::fmt;
use std::result;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::record::EntityKind;
use crate::search::directive;
use crate::search::range::RangeFilter;

/// The characters that make a search term a pattern instead of a name.
///
/// `%` matches any sequence of characters and `_` matches any single
/// character.
const WILDCARDS: &[char] = &['%', '_'];

/// A query that can be used to search the database.
///
/// A query consists of zero or more free-text terms along with zero or more
/// filters. Filters are matched conjunctively. That is, a search result must
/// satisfy every filter on a query to match.
///
/// A query may also carry up to three sub-queries: one naming a TV show
/// (whose episodes are searched), one naming a piece of media (whose cast is
/// searched) and one naming an actor (whose credits are searched). Each
/// sub-query is resolved to a single entity before its parent runs.
///
/// Queries can be built by chaining methods or by parsing the free-form query
/// syntax, which consists of search terms mixed with directives in curly
/// braces, e.g., `{show:the simpsons} {seasons:1-2} {sort:rank desc}`. The
/// two forms are equivalent.
///
/// The `Serialize` and `Deserialize` implementations for this type use the
/// free-form query syntax.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub(super) terms: Vec<String>,
    pub(super) entities: Vec<EntityKind>,
    pub(super) year: RangeFilter,
    pub(super) rank: RangeFilter,
    pub(super) votes: RangeFilter,
    pub(super) season: RangeFilter,
    pub(super) episode: RangeFilter,
    pub(super) billed: RangeFilter,
    pub(super) no_tv: bool,
    pub(super) no_video: bool,
    pub(super) tvshow: Option<Box<Query>>,
    pub(super) credits: Option<Box<Query>>,
    pub(super) cast: Option<Box<Query>>,
    pub(super) sorts: Vec<Sort>,
    pub(super) limit: Option<usize>,
    pub(super) fuzzy: bool,
    pub(super) ignore_case: bool,
    pub(super) good_threshold: f64,
    pub(super) min_similarity: f64,
    pub(super) debug: bool,
}

impl Default for Query {
    fn default() -> Query {
        Query::new()
    }
}

impl Query {
    /// The default maximum number of results returned by a search.
    pub const DEFAULT_LIMIT: usize = 30;

    /// The default difference in similarity between the top two results
    /// required to pick the top result automatically.
    pub const DEFAULT_GOOD_THRESHOLD: f64 = 0.25;

    /// The default minimum similarity a name must have with the search terms
    /// to match, when fuzzy matching is used.
    pub const DEFAULT_MIN_SIMILARITY: f64 = 0.3;

    /// Create a new empty query.
    pub fn new() -> Query {
        Query {
            terms: vec![],
            entities: vec![],
            year: RangeFilter::none(),
            rank: RangeFilter::none(),
            votes: RangeFilter::none(),
            season: RangeFilter::none(),
            episode: RangeFilter::none(),
            billed: RangeFilter::none(),
            no_tv: false,
            no_video: false,
            tvshow: None,
            credits: None,
            cast: None,
            sorts: vec![],
            limit: Some(Query::DEFAULT_LIMIT),
            fuzzy: true,
            ignore_case: false,
            good_threshold: Query::DEFAULT_GOOD_THRESHOLD,
            min_similarity: Query::DEFAULT_MIN_SIMILARITY,
            debug: false,
        }
    }

    /// Parse the free-form query syntax and apply every term and directive
    /// in it to this query.
    ///
    /// Parsing a string into a `Query` is equivalent to calling this on an
    /// empty query.
    pub fn extend_from_str(mut self, qstr: &str) -> Result<Query> {
        directive::apply_all(&mut self, qstr)?;
        Ok(self)
    }

    /// Add a free-text search term.
    ///
    /// Terms are joined together with a single space to form the name to
    /// search for. If the term contains a wildcard (`%` or `_`), then fuzzy
    /// matching is disabled for this query and the name is matched as a
    /// case-insensitive pattern instead.
    pub fn text(mut self, term: &str) -> Query {
        self.add_text(term);
        self
    }

    /// Add an entity kind to filter by.
    ///
    /// Multiple kinds can be added to a query, and search results must match
    /// at least one of them. When no kind is added, every kind matches.
    pub fn entity(mut self, kind: EntityKind) -> Query {
        self.add_entity(kind);
        self
    }

    /// Set the range of years to filter by.
    pub fn years(mut self, range: RangeFilter) -> Query {
        self.year = range;
        self
    }

    /// Set the range of ranks (on a scale of `0` to `100`) to filter by.
    ///
    /// Entities without a rating never match a rank filter.
    pub fn rank(mut self, range: RangeFilter) -> Query {
        self.rank = range;
        self
    }

    /// Set the range of vote counts to filter by.
    ///
    /// Entities without a rating never match a vote filter.
    pub fn votes(mut self, range: RangeFilter) -> Query {
        self.votes = range;
        self
    }

    /// Set the range of seasons to filter by.
    ///
    /// This automatically limits all results to episodes.
    pub fn seasons(mut self, range: RangeFilter) -> Query {
        self.season = range;
        self.add_entity(EntityKind::Episode);
        self
    }

    /// Set the range of episode numbers to filter by.
    ///
    /// This automatically limits all results to episodes.
    pub fn episodes(mut self, range: RangeFilter) -> Query {
        self.episode = range;
        self.add_entity(EntityKind::Episode);
        self
    }

    /// Set the range of billing positions to filter by.
    ///
    /// Billing positions only exist on credits, so this filter only matches
    /// anything when the query has a cast or credits sub-query.
    pub fn billed(mut self, range: RangeFilter) -> Query {
        self.billed = range;
        self
    }

    /// Exclude movies that were made for TV.
    pub fn no_tv(mut self, yes: bool) -> Query {
        self.no_tv = yes;
        self
    }

    /// Exclude movies that were made for video.
    pub fn no_video(mut self, yes: bool) -> Query {
        self.no_video = yes;
        self
    }

    /// Restrict results to episodes of the TV show found by the given
    /// sub-query.
    ///
    /// The sub-query is always restricted to TV shows. Calling this again
    /// replaces the previous sub-query.
    pub fn tvshow(mut self, sub: Query) -> Query {
        self.set_tvshow(sub);
        self
    }

    /// Restrict results to actors credited in the media found by the given
    /// sub-query.
    ///
    /// If the sub-query has no entity kinds, it is restricted to movies, TV
    /// shows and episodes. Calling this again replaces the previous
    /// sub-query.
    pub fn credits(mut self, sub: Query) -> Query {
        self.set_credits(sub);
        self
    }

    /// Restrict results to media in which the actor found by the given
    /// sub-query is credited.
    ///
    /// The sub-query is always restricted to actors. Calling this again
    /// replaces the previous sub-query.
    pub fn cast(mut self, sub: Query) -> Query {
        self.set_cast(sub);
        self
    }

    /// Add a sort key.
    ///
    /// Sort keys accumulate. Results are ordered by the first key added, then
    /// the second, and so on. When fuzzy matching is in effect, results are
    /// always ordered by similarity first.
    pub fn sort(mut self, column: SortColumn, direction: Direction) -> Query {
        self.sorts.push(Sort { column, direction });
        self
    }

    /// Set the maximum number of results to be returned by a search.
    pub fn limit(mut self, limit: usize) -> Query {
        self.limit = Some(limit);
        self
    }

    /// Remove the cap on the number of results returned by a search.
    pub fn unlimited(mut self) -> Query {
        self.limit = None;
        self
    }

    /// Enable or disable fuzzy matching of names.
    ///
    /// Fuzzy matching is enabled by default, but it only takes effect when
    /// the store supports it.
    pub fn fuzzy(mut self, yes: bool) -> Query {
        self.fuzzy = yes;
        self
    }

    /// Match names case insensitively when fuzzy matching isn't in effect.
    pub fn ignore_case(mut self, yes: bool) -> Query {
        self.ignore_case = yes;
        self
    }

    /// Set the minimum difference in similarity between the first and second
    /// results for the first result to be picked without asking a chooser.
    ///
    /// Sub-queries always use the threshold of the query they belong to.
    pub fn good_threshold(mut self, threshold: f64) -> Query {
        self.good_threshold = threshold;
        self
    }

    /// Set the minimum similarity (in `[0, 1]`) that a name must have to
    /// match when fuzzy matching is in effect.
    pub fn min_similarity(mut self, similarity: f64) -> Query {
        self.min_similarity = similarity;
        self
    }

    /// Log the compiled SQL of this query (and its sub-queries) when it runs.
    pub fn debug(mut self, yes: bool) -> Query {
        self.debug = yes;
        self
    }

    /// Return the free-text portion of this query, if there is one.
    pub fn name(&self) -> Option<String> {
        if self.terms.is_empty() {
            None
        } else {
            Some(self.terms.join(" "))
        }
    }

    /// Return the maximum number of results, if capped.
    pub fn get_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Return the good threshold used to pick results.
    pub fn get_good_threshold(&self) -> f64 {
        self.good_threshold
    }

    pub(super) fn add_text(&mut self, term: &str) {
        if term.contains(WILDCARDS) {
            self.fuzzy = false;
        }
        self.terms.push(term.to_string());
    }

    pub(super) fn add_entity(&mut self, kind: EntityKind) {
        if !self.entities.contains(&kind) {
            self.entities.push(kind);
        }
    }

    pub(super) fn set_tvshow(&mut self, mut sub: Query) {
        sub.entities = vec![EntityKind::TvShow];
        self.tvshow = Some(Box::new(sub));
    }

    pub(super) fn set_credits(&mut self, mut sub: Query) {
        if sub.entities.is_empty() {
            sub.entities = EntityKind::MEDIA.to_vec();
        }
        self.credits = Some(Box::new(sub));
    }

    pub(super) fn set_cast(&mut self, mut sub: Query) {
        sub.entities = vec![EntityKind::Actor];
        self.cast = Some(Box::new(sub));
    }

    pub(super) fn has_wildcard(&self) -> bool {
        self.terms.iter().any(|t| t.contains(WILDCARDS))
    }
}

impl FromStr for Query {
    type Err = Error;

    fn from_str(qstr: &str) -> Result<Query> {
        Query::new().extend_from_str(qstr)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts: Vec<String> = vec![];
        for kind in &self.entities {
            parts.push(format!("{{{}}}", kind));
        }
        let ranges = [
            ("years", &self.year),
            ("rank", &self.rank),
            ("votes", &self.votes),
            ("seasons", &self.season),
            ("episodes", &self.episode),
            ("billed", &self.billed),
        ];
        for &(name, range) in ranges.iter() {
            if !range.is_none() {
                parts.push(format!("{{{}:{}}}", name, range));
            }
        }
        if self.no_tv {
            parts.push("{notv}".to_string());
        }
        if self.no_video {
            parts.push("{novideo}".to_string());
        }
        let subs = [
            ("show", &self.tvshow),
            ("credits", &self.credits),
            ("cast", &self.cast),
        ];
        for &(name, sub) in subs.iter() {
            if let Some(ref sub) = *sub {
                parts.push(format!("{{{}:{}}}", name, sub));
            }
        }
        for sort in &self.sorts {
            parts.push(format!("{{sort:{}}}", sort));
        }
        match self.limit {
            Some(Query::DEFAULT_LIMIT) => {}
            Some(limit) => parts.push(format!("{{limit:{}}}", limit)),
            None => parts.push("{limit:-1}".to_string()),
        }
        if self.min_similarity != Query::DEFAULT_MIN_SIMILARITY {
            parts.push(format!("{{similar:{}}}", self.min_similarity));
        }
        if !self.fuzzy && !self.has_wildcard() {
            parts.push("{nofuzzy}".to_string());
        }
        if self.ignore_case {
            parts.push("{nocase}".to_string());
        }
        if self.debug {
            parts.push("{debug}".to_string());
        }
        parts.extend(self.terms.iter().cloned());
        write!(f, "{}", parts.join(" "))
    }
}

impl Serialize for Query {
    fn serialize<S>(&self, s: S) -> result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for Query {
    fn deserialize<D>(d: D) -> result::Result<Query, D::Error>
    where
        D: Deserializer<'a>,
    {
        use serde::de::Error;

        let querystr = String::deserialize(d)?;
        querystr.parse().map_err(|e: self::Error| D::Error::custom(e.to_string()))
    }
}

/// A column that search results can be sorted by.
///
/// Only these columns may be used as sort keys. Each column has a default
/// direction that is used when a sort directive doesn't name one:
///
/// | column       | default    |
/// |--------------|------------|
/// | `entity`     | ascending  |
/// | `id`         | ascending  |
/// | `name`       | ascending  |
/// | `year`       | descending |
/// | `similarity` | descending |
/// | `rank`       | descending |
/// | `votes`      | descending |
/// | `season`     | ascending  |
/// | `episode`    | ascending  |
/// | `billing`    | ascending  |
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum SortColumn {
    Entity,
    Id,
    Name,
    Year,
    Similarity,
    Rank,
    Votes,
    Season,
    Episode,
    Billing,
}

impl SortColumn {
    /// Returns a list of strings representing the possible sort columns.
    pub fn possible_names() -> &'static [&'static str] {
        &[
            "entity", "id", "name", "year", "similarity", "rank", "votes",
            "season", "episode", "billing",
        ]
    }

    /// The direction used when none is given explicitly.
    pub fn default_direction(&self) -> Direction {
        match *self {
            SortColumn::Year
            | SortColumn::Similarity
            | SortColumn::Rank
            | SortColumn::Votes => Direction::Desc,
            SortColumn::Entity
            | SortColumn::Id
            | SortColumn::Name
            | SortColumn::Season
            | SortColumn::Episode
            | SortColumn::Billing => Direction::Asc,
        }
    }

    /// Return the canonical name of this column.
    pub fn as_str(&self) -> &'static str {
        match *self {
            SortColumn::Entity => "entity",
            SortColumn::Id => "id",
            SortColumn::Name => "name",
            SortColumn::Year => "year",
            SortColumn::Similarity => "similarity",
            SortColumn::Rank => "rank",
            SortColumn::Votes => "votes",
            SortColumn::Season => "season",
            SortColumn::Episode => "episode",
            SortColumn::Billing => "billing",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<SortColumn> {
        match &*s.to_lowercase() {
            "entity" | "kind" => Ok(SortColumn::Entity),
            "id" | "atom" => Ok(SortColumn::Id),
            "name" | "title" => Ok(SortColumn::Name),
            "year" => Ok(SortColumn::Year),
            "similarity" | "sim" => Ok(SortColumn::Similarity),
            "rank" => Ok(SortColumn::Rank),
            "votes" => Ok(SortColumn::Votes),
            "season" => Ok(SortColumn::Season),
            "episode" => Ok(SortColumn::Episode),
            "billing" | "billed" | "position" => Ok(SortColumn::Billing),
            unk => Err(Error::unknown_sort(unk)),
        }
    }
}

/// The direction of a sort key.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

impl Direction {
    /// The SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match *self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Direction> {
        match &*s.to_lowercase() {
            "asc" | "ascending" => Ok(Direction::Asc),
            "desc" | "descending" => Ok(Direction::Desc),
            unk => Err(Error::unknown_sort(unk)),
        }
    }
}

/// A single sort key: a column and a direction.
///
/// This parses from one or two words, e.g., `rank desc` or `year`. When the
/// direction is omitted, the column's default direction is used.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Sort {
    /// The column to sort by.
    pub column: SortColumn,
    /// The direction to sort in.
    pub direction: Direction,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

impl FromStr for Sort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Sort> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let (column, direction) = match words.as_slice() {
            [column] => {
                let column: SortColumn = column.parse()?;
                (column, column.default_direction())
            }
            [column, direction] => (column.parse()?, direction.parse()?),
            _ => {
                return Err(Error::directive_arg(
                    "sort",
                    format!(
                        "expected a column and an optional direction, \
                         but got '{}'",
                        s
                    ),
                ))
            }
        };
        Ok(Sort { column, direction })
    }
}
