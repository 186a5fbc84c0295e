use std::fmt;

use rusqlite::types::Value;

use crate::record::{Atom, EntityKind};
use crate::search::query::{Query, SortColumn};
use crate::search::range::RangeFilter;

/// How the free-text portion of a query is matched against names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchStrategy {
    /// Names must equal the search text exactly.
    Exact,
    /// The search text is a case insensitive pattern, where `%` and `_` are
    /// wildcards.
    Pattern,
    /// Names must be similar to the search text, as measured by trigram
    /// similarity. Results are ordered by similarity.
    Similarity,
}

impl MatchStrategy {
    /// Choose how the given query matches names, given whether the store
    /// supports similarity matching.
    pub fn for_query(query: &Query, fuzzy_capable: bool) -> MatchStrategy {
        if query.fuzzy && fuzzy_capable {
            MatchStrategy::Similarity
        } else if query.has_wildcard() || query.ignore_case {
            MatchStrategy::Pattern
        } else {
            MatchStrategy::Exact
        }
    }
}

/// The outcome of resolving one sub-query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// The query has no sub-query in this role.
    NotRequested,
    /// The sub-query picked exactly this entity.
    Resolved(Atom),
    /// The sub-query ran but nothing was picked. The parent query then
    /// matches nothing.
    Unresolved,
}

impl Default for Resolution {
    fn default() -> Resolution {
        Resolution::NotRequested
    }
}

/// The resolutions of every sub-query of a query.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct SubSearches {
    pub(crate) tvshow: Resolution,
    pub(crate) credits: Resolution,
    pub(crate) cast: Resolution,
}

/// A query compiled to SQL, ready to run against a store.
///
/// Every user supplied value is bound as a numbered parameter. The SQL text
/// itself only ever contains fixed fragments and allow-listed column names.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
    sql: String,
    params: Vec<Value>,
    strategy: MatchStrategy,
}

impl CompiledQuery {
    /// The SQL text of this query.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The values bound to `?1`, `?2`, ... in the SQL text, in order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// How names are matched by this query.
    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.sql)?;
        write!(f, "-- params:")?;
        for (i, value) in self.params.iter().enumerate() {
            write!(f, " ?{}=", i + 1)?;
            match *value {
                Value::Null => write!(f, "NULL")?,
                Value::Integer(n) => write!(f, "{}", n)?,
                Value::Real(n) => write!(f, "{}", n)?,
                Value::Text(ref s) => write!(f, "{:?}", s)?,
                Value::Blob(ref b) => write!(f, "<{} bytes>", b.len())?,
            }
        }
        Ok(())
    }
}

/// The column names of every row produced by a compiled query, in order.
pub(crate) const COLUMNS: &[&str] = &[
    "entity",
    "id",
    "name",
    "year",
    "similarity",
    "votes",
    "rank",
    "tv",
    "video",
    "year_start",
    "year_end",
    "tvshow_name",
    "season",
    "episode_num",
    "credit_actor",
    "credit_media",
    "character",
    "position",
    "credit_attrs",
];

/// A list of parameter values that hands out placeholders as values are
/// added.
#[derive(Debug, Default)]
struct Params(Vec<Value>);

impl Params {
    fn push(&mut self, value: Value) -> String {
        self.0.push(value);
        format!("?{}", self.0.len())
    }

    fn int(&mut self, n: u32) -> String {
        self.push(Value::Integer(n as i64))
    }
}

/// Compile a query into a single SQL statement.
///
/// `subs` are the resolutions of the query's sub-queries, which must have
/// been computed beforehand. An unresolved sub-query makes the statement
/// match nothing.
pub(crate) fn compile(
    query: &Query,
    subs: &SubSearches,
    fuzzy_capable: bool,
) -> CompiledQuery {
    let strategy = MatchStrategy::for_query(query, fuzzy_capable);
    let mut params = Params::default();
    let text = query.name();

    let similarity = match (strategy, &text) {
        (MatchStrategy::Similarity, Some(text)) => {
            format!("similarity(n.name, {})", params.push(text_value(text)))
        }
        _ => "-1.0".to_string(),
    };
    let text_filter = match (strategy, &text) {
        (_, None) => "1 = 1".to_string(),
        (MatchStrategy::Exact, Some(text)) => {
            format!("n.name = {}", params.push(text_value(text)))
        }
        (MatchStrategy::Pattern, Some(text)) => {
            format!("n.name LIKE {}", params.push(text_value(text)))
        }
        (MatchStrategy::Similarity, Some(_)) => format!(
            "{} >= {}",
            similarity,
            params.push(Value::Real(query.min_similarity))
        ),
    };

    // A single credit join: media crediting an actor when a cast member is
    // requested, actors credited in media otherwise. When both roles are
    // present, both ends of the same credit row are constrained.
    let credit_join = if subs.cast != Resolution::NotRequested {
        Some("JOIN credit c ON c.media_atom_id = n.atom_id")
    } else if subs.credits != Resolution::NotRequested {
        Some("JOIN credit c ON c.actor_atom_id = n.atom_id")
    } else {
        None
    };
    let credit_col = |col: &str| -> String {
        if credit_join.is_some() {
            format!("c.{}", col)
        } else {
            "NULL".to_string()
        }
    };

    let mut sql = String::new();
    sql.push_str("SELECT\n");
    let mut select = vec![];
    select.push(format!(
        "CASE {} END",
        EntityKind::ALL
            .iter()
            .map(|&k| format!(
                "WHEN {}.atom_id IS NOT NULL THEN '{}'",
                alias(k),
                k.as_str()
            ))
            .collect::<Vec<String>>()
            .join(" ")
    ));
    select.push(
        "COALESCE(m.atom_id, t.atom_id, e.atom_id, a.atom_id)".to_string(),
    );
    select.push("n.name".to_string());
    select.push("COALESCE(m.year, t.year, e.year, 0)".to_string());
    select.push(similarity.clone());
    select.push("COALESCE(r.votes, 0)".to_string());
    select.push("COALESCE(r.rank, 0)".to_string());
    select.push("m.tv".to_string());
    select.push("m.video".to_string());
    select.push("t.year_start".to_string());
    select.push("t.year_end".to_string());
    select.push("pt.title".to_string());
    select.push("e.season".to_string());
    select.push("e.episode_num".to_string());
    select.push(credit_col("actor_atom_id"));
    select.push(credit_col("media_atom_id"));
    select.push(credit_col("character"));
    select.push(credit_col("position"));
    select.push(credit_col("attrs"));
    let select: Vec<String> = select
        .into_iter()
        .zip(COLUMNS)
        .map(|(expr, name)| format!("  {} AS {}", expr, name))
        .collect();
    sql.push_str(&select.join(",\n"));
    sql.push_str("\nFROM name n\n");
    sql.push_str("LEFT JOIN movie m ON m.atom_id = n.atom_id\n");
    sql.push_str("LEFT JOIN tvshow t ON t.atom_id = n.atom_id\n");
    sql.push_str("LEFT JOIN episode e ON e.atom_id = n.atom_id\n");
    sql.push_str("LEFT JOIN tvshow pt ON pt.atom_id = e.tvshow_atom_id\n");
    sql.push_str("LEFT JOIN actor a ON a.atom_id = n.atom_id\n");
    sql.push_str("LEFT JOIN rating r ON r.atom_id = n.atom_id\n");
    if let Some(join) = credit_join {
        sql.push_str(join);
        sql.push('\n');
    }

    let mut conds = vec![];
    let kinds: &[EntityKind] = if query.entities.is_empty() {
        &EntityKind::ALL
    } else {
        &query.entities
    };
    conds.push(format!(
        "({})",
        kinds
            .iter()
            .map(|&k| format!("{}.atom_id IS NOT NULL", alias(k)))
            .collect::<Vec<String>>()
            .join(" OR ")
    ));
    conds.push(resolution(&mut params, "e.tvshow_atom_id", subs.tvshow));
    conds.push(resolution(&mut params, "c.media_atom_id", subs.credits));
    conds.push(resolution(&mut params, "c.actor_atom_id", subs.cast));
    conds.push(range(
        &mut params,
        "COALESCE(m.year, t.year, e.year)",
        &query.year,
    ));
    conds.push(range(&mut params, "r.rank", &query.rank));
    conds.push(range(&mut params, "r.votes", &query.votes));
    conds.push(range(&mut params, "e.season", &query.season));
    conds.push(range(&mut params, "e.episode_num", &query.episode));
    conds.push(range(&mut params, &credit_col("position"), &query.billed));
    conds.push(flag("COALESCE(m.tv, 0) = 0", query.no_tv));
    conds.push(flag("COALESCE(m.video, 0) = 0", query.no_video));
    conds.push(text_filter);
    sql.push_str("WHERE ");
    sql.push_str(&conds.join("\n  AND "));
    sql.push('\n');

    let mut order = vec![];
    if strategy == MatchStrategy::Similarity && text.is_some() {
        order.push("similarity DESC NULLS LAST".to_string());
    }
    for sort in &query.sorts {
        order.push(format!(
            "{} {} NULLS LAST",
            sort_alias(sort.column),
            sort.direction.as_sql()
        ));
    }
    if !order.is_empty() {
        sql.push_str("ORDER BY ");
        sql.push_str(&order.join(", "));
        sql.push('\n');
    }
    if let Some(limit) = query.limit {
        let limit = params.push(Value::Integer(limit as i64));
        sql.push_str(&format!("LIMIT {}\n", limit));
    }
    CompiledQuery { sql, params: params.0, strategy }
}

fn text_value(text: &str) -> Value {
    Value::Text(text.to_string())
}

fn alias(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Movie => "m",
        EntityKind::TvShow => "t",
        EntityKind::Episode => "e",
        EntityKind::Actor => "a",
    }
}

fn sort_alias(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Entity => "entity",
        SortColumn::Id => "id",
        SortColumn::Name => "name",
        SortColumn::Year => "year",
        SortColumn::Similarity => "similarity",
        SortColumn::Rank => "rank",
        SortColumn::Votes => "votes",
        SortColumn::Season => "season",
        SortColumn::Episode => "episode_num",
        SortColumn::Billing => "position",
    }
}

fn resolution(params: &mut Params, column: &str, res: Resolution) -> String {
    match res {
        Resolution::NotRequested => "1 = 1".to_string(),
        Resolution::Resolved(atom) => {
            format!("{} = {}", column, params.int(atom.get()))
        }
        Resolution::Unresolved => "1 = 0".to_string(),
    }
}

fn range(params: &mut Params, expr: &str, range: &RangeFilter) -> String {
    match (range.min(), range.max()) {
        (None, None) => "1 = 1".to_string(),
        (Some(min), None) => format!("{} >= {}", expr, params.int(min)),
        (None, Some(max)) => format!("{} <= {}", expr, params.int(max)),
        (Some(min), Some(max)) => format!(
            "{} BETWEEN {} AND {}",
            expr,
            params.int(min),
            params.int(max)
        ),
    }
}

fn flag(cond: &str, enabled: bool) -> String {
    if enabled {
        cond.to_string()
    } else {
        "1 = 1".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(n: u32) -> Atom {
        Atom::new(n).unwrap()
    }

    fn compiled(qstr: &str, subs: SubSearches, fuzzy: bool) -> CompiledQuery {
        let query: Query = qstr.parse().unwrap();
        compile(&query, &subs, fuzzy)
    }

    #[test]
    fn strategy_selection() {
        let q = Query::new().text("matrix");
        assert_eq!(MatchStrategy::for_query(&q, true), MatchStrategy::Similarity);
        assert_eq!(MatchStrategy::for_query(&q, false), MatchStrategy::Exact);

        let q = Query::new().text("matrix%");
        assert_eq!(MatchStrategy::for_query(&q, true), MatchStrategy::Pattern);

        let q = Query::new().text("matrix").ignore_case(true);
        assert_eq!(MatchStrategy::for_query(&q, false), MatchStrategy::Pattern);

        let q = Query::new().text("matrix").fuzzy(false);
        assert_eq!(MatchStrategy::for_query(&q, true), MatchStrategy::Exact);
    }

    #[test]
    fn empty_query_is_unconstrained() {
        let cq = compiled("", SubSearches::default(), true);
        assert!(cq.sql().contains(
            "m.atom_id IS NOT NULL OR t.atom_id IS NOT NULL \
             OR e.atom_id IS NOT NULL OR a.atom_id IS NOT NULL"
        ));
        assert!(cq.sql().contains("-1.0 AS similarity"));
        assert!(!cq.sql().contains("ORDER BY"));
        assert!(!cq.sql().contains("JOIN credit"));
        assert!(!cq.sql().contains("1 = 0"));
        // The only parameter is the default limit.
        assert_eq!(cq.params(), &[Value::Integer(30)]);
    }

    #[test]
    fn similarity_orders_first() {
        let cq = compiled("{sort:year} matrix", SubSearches::default(), true);
        assert_eq!(cq.strategy(), MatchStrategy::Similarity);
        assert!(cq.sql().contains("similarity(n.name, ?1) >= ?2"));
        assert!(cq.sql().contains(
            "ORDER BY similarity DESC NULLS LAST, year DESC NULLS LAST"
        ));
        assert_eq!(cq.params()[0], Value::Text("matrix".to_string()));
        assert_eq!(cq.params()[1], Value::Real(0.3));
    }

    #[test]
    fn exact_and_pattern() {
        let cq = compiled("The Matrix", SubSearches::default(), false);
        assert!(cq.sql().contains("n.name = ?1"));
        assert!(!cq.sql().contains("ORDER BY"));

        let cq = compiled("the matrix%", SubSearches::default(), true);
        assert!(cq.sql().contains("n.name LIKE ?1"));
        assert!(cq.sql().contains("-1.0 AS similarity"));
        assert_eq!(cq.params()[0], Value::Text("the matrix%".to_string()));
    }

    #[test]
    fn ranges() {
        let cq = compiled(
            "{years:1990-1999} {rank:70-} {votes:-5000} {limit:-1}",
            SubSearches::default(),
            true,
        );
        assert!(cq
            .sql()
            .contains("COALESCE(m.year, t.year, e.year) BETWEEN ?1 AND ?2"));
        assert!(cq.sql().contains("r.rank >= ?3"));
        assert!(cq.sql().contains("r.votes <= ?4"));
        assert!(!cq.sql().contains("LIMIT"));
        assert_eq!(
            cq.params(),
            &[
                Value::Integer(1990),
                Value::Integer(1999),
                Value::Integer(70),
                Value::Integer(5000),
            ]
        );
    }

    #[test]
    fn entity_filter() {
        let cq = compiled("{movie} {tv}", SubSearches::default(), true);
        assert!(cq
            .sql()
            .contains("(m.atom_id IS NOT NULL OR t.atom_id IS NOT NULL)\n"));
    }

    #[test]
    fn flags() {
        let cq = compiled("{notv} {novideo}", SubSearches::default(), true);
        assert!(cq.sql().contains("COALESCE(m.tv, 0) = 0"));
        assert!(cq.sql().contains("COALESCE(m.video, 0) = 0"));
    }

    #[test]
    fn resolved_tvshow() {
        let subs = SubSearches {
            tvshow: Resolution::Resolved(atom(1)),
            ..SubSearches::default()
        };
        let cq = compiled("{show:simpsons} {seasons:1}", subs, true);
        assert!(cq.sql().contains("e.tvshow_atom_id = ?1"));
        assert!(cq.sql().contains("e.season BETWEEN ?2 AND ?3"));
        assert_eq!(cq.params()[0], Value::Integer(1));
    }

    #[test]
    fn unresolved_matches_nothing() {
        let subs = SubSearches {
            tvshow: Resolution::Unresolved,
            ..SubSearches::default()
        };
        let cq = compiled("{show:nope}", subs, true);
        assert!(cq.sql().contains("1 = 0"));
    }

    #[test]
    fn credit_joins() {
        let subs = SubSearches {
            cast: Resolution::Resolved(atom(30)),
            ..SubSearches::default()
        };
        let cq = compiled("{cast:keanu} {billed:1}", subs, true);
        assert!(cq
            .sql()
            .contains("JOIN credit c ON c.media_atom_id = n.atom_id\n"));
        assert!(cq.sql().contains("c.actor_atom_id = ?1"));
        assert!(cq.sql().contains("c.position BETWEEN ?2 AND ?3"));
        assert!(cq.sql().contains("c.character AS character"));

        let subs = SubSearches {
            credits: Resolution::Resolved(atom(20)),
            ..SubSearches::default()
        };
        let cq = compiled("{credits:matrix}", subs, true);
        assert!(cq
            .sql()
            .contains("JOIN credit c ON c.actor_atom_id = n.atom_id\n"));
        assert!(cq.sql().contains("c.media_atom_id = ?1"));

        let subs = SubSearches {
            credits: Resolution::Resolved(atom(20)),
            cast: Resolution::Resolved(atom(30)),
            ..SubSearches::default()
        };
        let cq = compiled("{credits:matrix} {cast:keanu}", subs, true);
        assert_eq!(cq.sql().matches("JOIN credit").count(), 1);
        assert!(cq.sql().contains("c.media_atom_id = ?1"));
        assert!(cq.sql().contains("c.actor_atom_id = ?2"));
    }

    #[test]
    fn billing_without_credits_matches_nothing() {
        let cq = compiled("{billed:1-3}", SubSearches::default(), true);
        assert!(cq.sql().contains("NULL AS position"));
        assert!(cq.sql().contains("NULL BETWEEN ?1 AND ?2"));
    }

    #[test]
    fn sort_keys_use_column_aliases() {
        let cq = compiled(
            "{sort:season} {sort:episode desc} {sort:billing}",
            SubSearches::default(),
            true,
        );
        assert!(cq.sql().contains(
            "ORDER BY season ASC NULLS LAST, episode_num DESC NULLS LAST, \
             position ASC NULLS LAST"
        ));
    }

    #[test]
    fn compile_is_deterministic() {
        let query: Query = "{show:x} {years:2000-} foo".parse().unwrap();
        let subs = SubSearches {
            tvshow: Resolution::Resolved(atom(7)),
            ..SubSearches::default()
        };
        let a = compile(&query, &subs, true);
        let b = compile(&query, &subs, true);
        assert_eq!(a.sql(), b.sql());
        assert_eq!(a.params(), b.params());
    }
}
