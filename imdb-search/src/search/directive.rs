use std::fmt;

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::record::EntityKind;
use crate::search::query::{Query, Sort};
use crate::search::range::RangeFilter;
use crate::search::tokenize::tokenize;
use crate::search::{ROLE_CAST, ROLE_CREDITS, ROLE_TVSHOW};

/// Whether a directive takes an argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    /// The directive is a flag, e.g., `{movie}`.
    None,
    /// The directive requires an argument, e.g., `{years:1990-}`. The string
    /// describes the argument.
    Required(&'static str),
}

/// A single directive recognized by the query syntax.
///
/// A directive is written as `{name}` or `{name:argument}`. Every directive
/// has a canonical name and may have synonyms, all of which are matched
/// case insensitively.
pub struct Directive {
    name: &'static str,
    synonyms: &'static [&'static str],
    arity: Arity,
    description: &'static str,
    handler: fn(&mut Query, &str) -> Result<()>,
}

impl Directive {
    /// The canonical name of this directive.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Alternative names that refer to this directive.
    pub fn synonyms(&self) -> &'static [&'static str] {
        self.synonyms
    }

    /// Whether this directive takes an argument.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// A short human readable description of this directive.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Returns a usage string for this directive, e.g., `{years:RANGE}`.
    pub fn usage(&self) -> String {
        match self.arity {
            Arity::None => format!("{{{}}}", self.name),
            Arity::Required(arg) => format!("{{{}:{}}}", self.name, arg),
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("synonyms", &self.synonyms)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Every directive recognized by the query syntax.
pub static DIRECTIVES: &[Directive] = &[
    Directive {
        name: "movie",
        synonyms: &["movies"],
        arity: Arity::None,
        description: "limit results to movies",
        handler: |q, _| {
            q.add_entity(EntityKind::Movie);
            Ok(())
        },
    },
    Directive {
        name: "tvshow",
        synonyms: &["tv", "tvshows"],
        arity: Arity::None,
        description: "limit results to TV shows",
        handler: |q, _| {
            q.add_entity(EntityKind::TvShow);
            Ok(())
        },
    },
    Directive {
        name: "episode",
        synonyms: &[],
        arity: Arity::None,
        description: "limit results to episodes",
        handler: |q, _| {
            q.add_entity(EntityKind::Episode);
            Ok(())
        },
    },
    Directive {
        name: "actor",
        synonyms: &["actors"],
        arity: Arity::None,
        description: "limit results to actors",
        handler: |q, _| {
            q.add_entity(EntityKind::Actor);
            Ok(())
        },
    },
    Directive {
        name: "years",
        synonyms: &["year"],
        arity: Arity::Required("RANGE"),
        description: "limit results to the given range of years",
        handler: |q, arg| {
            q.year = range("years", arg)?;
            Ok(())
        },
    },
    Directive {
        name: "rank",
        synonyms: &[],
        arity: Arity::Required("RANGE"),
        description: "limit results to ratings with a rank (0-100) in range",
        handler: |q, arg| {
            q.rank = range("rank", arg)?;
            Ok(())
        },
    },
    Directive {
        name: "votes",
        synonyms: &[],
        arity: Arity::Required("RANGE"),
        description: "limit results to ratings with a vote count in range",
        handler: |q, arg| {
            q.votes = range("votes", arg)?;
            Ok(())
        },
    },
    Directive {
        name: "billed",
        synonyms: &["billing"],
        arity: Arity::Required("RANGE"),
        description: "limit credits to the given billing positions",
        handler: |q, arg| {
            q.billed = range("billed", arg)?;
            Ok(())
        },
    },
    Directive {
        name: "seasons",
        synonyms: &["s"],
        arity: Arity::Required("RANGE"),
        description: "limit episodes to the given seasons",
        handler: |q, arg| {
            q.season = range("seasons", arg)?;
            q.add_entity(EntityKind::Episode);
            Ok(())
        },
    },
    Directive {
        name: "episodes",
        synonyms: &["e"],
        arity: Arity::Required("RANGE"),
        description: "limit episodes to the given episode numbers",
        handler: |q, arg| {
            q.episode = range("episodes", arg)?;
            q.add_entity(EntityKind::Episode);
            Ok(())
        },
    },
    Directive {
        name: "notv",
        synonyms: &[],
        arity: Arity::None,
        description: "exclude movies made for TV",
        handler: |q, _| {
            q.no_tv = true;
            Ok(())
        },
    },
    Directive {
        name: "novideo",
        synonyms: &[],
        arity: Arity::None,
        description: "exclude movies made for video",
        handler: |q, _| {
            q.no_video = true;
            Ok(())
        },
    },
    Directive {
        name: "limit",
        synonyms: &[],
        arity: Arity::Required("N"),
        description: "return at most N results (a negative N removes the cap)",
        handler: |q, arg| {
            let n = arg.parse::<i64>().map_err(|e| {
                Error::directive_arg("limit", format!("'{}': {}", arg, e))
            })?;
            q.limit = if n < 0 { None } else { Some(n as usize) };
            Ok(())
        },
    },
    Directive {
        name: "sort",
        synonyms: &[],
        arity: Arity::Required("COLUMN [asc|desc]"),
        description: "order results by a column, may be repeated",
        handler: |q, arg| {
            let sort: Sort = arg.parse()?;
            q.sorts.push(sort);
            Ok(())
        },
    },
    Directive {
        name: "show",
        synonyms: &[],
        arity: Arity::Required("QUERY"),
        description: "limit results to episodes of the TV show found by QUERY",
        handler: |q, arg| {
            let sub = sub_query(ROLE_TVSHOW, arg)?;
            q.set_tvshow(sub);
            Ok(())
        },
    },
    Directive {
        name: "credits",
        synonyms: &[],
        arity: Arity::Required("QUERY"),
        description: "limit results to the cast of the media found by QUERY",
        handler: |q, arg| {
            let sub = sub_query(ROLE_CREDITS, arg)?;
            q.set_credits(sub);
            Ok(())
        },
    },
    Directive {
        name: "cast",
        synonyms: &[],
        arity: Arity::Required("QUERY"),
        description: "limit results to media crediting the actor found by QUERY",
        handler: |q, arg| {
            let sub = sub_query(ROLE_CAST, arg)?;
            q.set_cast(sub);
            Ok(())
        },
    },
    Directive {
        name: "similar",
        synonyms: &["sim"],
        arity: Arity::Required("FLOAT"),
        description: "the minimum similarity (0.0-1.0) of fuzzy name matches",
        handler: |q, arg| {
            let sim = arg.parse::<f64>().map_err(|e| {
                Error::directive_arg("similar", format!("'{}': {}", arg, e))
            })?;
            if !(0.0..=1.0).contains(&sim) {
                return Err(Error::directive_arg(
                    "similar",
                    format!("'{}' is not in the range 0.0-1.0", arg),
                ));
            }
            q.min_similarity = sim;
            Ok(())
        },
    },
    Directive {
        name: "nofuzzy",
        synonyms: &[],
        arity: Arity::None,
        description: "match names exactly instead of by similarity",
        handler: |q, _| {
            q.fuzzy = false;
            Ok(())
        },
    },
    Directive {
        name: "nocase",
        synonyms: &[],
        arity: Arity::None,
        description: "match names case insensitively when not fuzzy",
        handler: |q, _| {
            q.ignore_case = true;
            Ok(())
        },
    },
    Directive {
        name: "debug",
        synonyms: &[],
        arity: Arity::None,
        description: "log the compiled SQL of the search",
        handler: |q, _| {
            q.debug = true;
            Ok(())
        },
    },
];

lazy_static! {
    static ref BY_NAME: FnvHashMap<&'static str, &'static Directive> = {
        let mut map = FnvHashMap::default();
        for d in DIRECTIVES {
            map.insert(d.name, d);
            for syn in d.synonyms {
                map.insert(*syn, d);
            }
        }
        map
    };
    static ref SPLIT: Regex =
        Regex::new(r"(?s)^(?P<name>[^:]*)(?::(?P<arg>.*))?$").unwrap();
}

/// Look up a directive by its canonical name or one of its synonyms.
pub fn find(name: &str) -> Option<&'static Directive> {
    BY_NAME.get(&*name.to_lowercase()).copied()
}

/// Tokenize the given query string and apply every token to `query`.
///
/// Bare words become search terms. Tokens in braces are directives.
pub(crate) fn apply_all(query: &mut Query, qstr: &str) -> Result<()> {
    for token in tokenize(qstr) {
        if token.starts_with('{') {
            apply_directive(query, &token)?;
        } else {
            query.add_text(&token);
        }
    }
    Ok(())
}

fn apply_directive(query: &mut Query, token: &str) -> Result<()> {
    let inner = &token[1..];
    let inner = inner.strip_suffix('}').unwrap_or(inner);
    let caps = match SPLIT.captures(inner) {
        Some(caps) => caps,
        None => bug!("directive split regex failed on {:?}", inner),
    };
    let name = caps.name("name").map_or("", |m| m.as_str()).trim();
    let arg = caps
        .name("arg")
        .map(|m| m.as_str().trim())
        .filter(|arg| !arg.is_empty());
    let directive = match find(name) {
        Some(directive) => directive,
        None => return Err(Error::unknown_directive(name)),
    };
    match (directive.arity, arg) {
        (Arity::None, None) => (directive.handler)(query, ""),
        (Arity::None, Some(arg)) => Err(Error::directive_arg(
            directive.name,
            format!("takes no argument, but got '{}'", arg),
        )),
        (Arity::Required(what), None) => Err(Error::directive_arg(
            directive.name,
            format!("requires an argument ({})", what),
        )),
        (Arity::Required(_), Some(arg)) => (directive.handler)(query, arg),
    }
}

fn range(name: &'static str, arg: &str) -> Result<RangeFilter> {
    arg.parse().map_err(|e: Error| {
        Error::directive_arg(name, format!("invalid range '{}': {}", arg, e))
    })
}

fn sub_query(role: &'static str, arg: &str) -> Result<Query> {
    arg.parse().map_err(|e| Error::sub_search(role, e))
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::record::EntityKind;
    use crate::search::query::{Direction, Query, SortColumn};
    use crate::search::range::RangeFilter;

    use super::*;

    fn parse(qstr: &str) -> Query {
        qstr.parse().unwrap()
    }

    fn parse_err(qstr: &str) -> Error {
        match qstr.parse::<Query>() {
            Ok(q) => panic!("expected error, but got {:?}", q),
            Err(err) => err,
        }
    }

    #[test]
    fn names_and_synonyms_are_unique() {
        let mut count = 0;
        for d in DIRECTIVES {
            count += 1 + d.synonyms.len();
            assert!(std::ptr::eq(find(d.name).unwrap(), d));
            for syn in d.synonyms {
                assert!(std::ptr::eq(find(syn).unwrap(), d));
            }
        }
        assert_eq!(count, BY_NAME.len());
    }

    #[test]
    fn directives_match_fluent_calls() {
        let got = parse(
            "{years:1999-2003} {votes:500-} {limit:10} {sort:rank desc} \
             the   matrix",
        );
        let expected = Query::new()
            .years(RangeFilter::between(1999, 2003))
            .votes(RangeFilter::at_least(500))
            .limit(10)
            .sort(SortColumn::Rank, Direction::Desc)
            .text("the")
            .text("matrix");
        assert_eq!(got, expected);
    }

    #[test]
    fn directives_case_and_synonyms() {
        let got = parse("{TV}{Movies}{year:1990}{sim:0.5}{NoCase}{debug}");
        let expected = Query::new()
            .entity(EntityKind::TvShow)
            .entity(EntityKind::Movie)
            .years(RangeFilter::exactly(1990))
            .min_similarity(0.5)
            .ignore_case(true)
            .debug(true);
        assert_eq!(got, expected);
    }

    #[test]
    fn season_and_episode_imply_episodes() {
        let got = parse("{s:1-2}{e:3}");
        let expected = Query::new()
            .seasons(RangeFilter::between(1, 2))
            .episodes(RangeFilter::exactly(3));
        assert_eq!(got, expected);
        assert_eq!(got.entities, vec![EntityKind::Episode]);

        assert_eq!(
            parse("{seasons:1}"),
            Query::new().seasons(RangeFilter::exactly(1))
        );
        assert_eq!(
            parse("{movie} {episodes:4}"),
            Query::new()
                .entity(EntityKind::Movie)
                .episodes(RangeFilter::exactly(4))
        );
    }

    #[test]
    fn sub_queries() {
        let got = parse("{show:{years:1989-} the simpsons} {seasons:1}");
        let expected = Query::new()
            .tvshow(
                Query::new()
                    .years(RangeFilter::at_least(1989))
                    .text("the")
                    .text("simpsons"),
            )
            .seasons(RangeFilter::exactly(1))
            .entity(EntityKind::Episode);
        assert_eq!(got, expected);

        let got = parse("{cast:keanu reeves} {credits:the matrix}");
        let expected = Query::new()
            .cast(Query::new().text("keanu").text("reeves"))
            .credits(Query::new().text("the").text("matrix"));
        assert_eq!(got, expected);
    }

    #[test]
    fn limit_and_flags() {
        assert_eq!(parse("{limit:-1}"), Query::new().unlimited());
        assert_eq!(parse("{limit:0}"), Query::new().limit(0));
        assert_eq!(
            parse("{notv}{novideo}{nofuzzy}"),
            Query::new().no_tv(true).no_video(true).fuzzy(false)
        );
    }

    #[test]
    fn whitespace_inside_directives() {
        assert_eq!(
            parse("{ years : 1990 - 1999 }"),
            Query::new().years(RangeFilter::between(1990, 1999))
        );
        match *parse_err("{limit: }").kind() {
            ErrorKind::DirectiveArgument { ref name, .. } => {
                assert_eq!(name, "limit")
            }
            ref kind => panic!("unexpected error: {:?}", kind),
        }
    }

    #[test]
    fn unterminated_directive() {
        assert_eq!(
            parse("foo {years:1990"),
            Query::new().text("foo").years(RangeFilter::exactly(1990))
        );
    }

    #[test]
    fn errors() {
        match *parse_err("{wat}").kind() {
            ErrorKind::UnknownDirective(ref name) => assert_eq!(name, "wat"),
            ref kind => panic!("unexpected error: {:?}", kind),
        }
        match *parse_err("{years:abc}").kind() {
            ErrorKind::DirectiveArgument { ref name, .. } => {
                assert_eq!(name, "years")
            }
            ref kind => panic!("unexpected error: {:?}", kind),
        }
        match *parse_err("{limit}").kind() {
            ErrorKind::DirectiveArgument { ref name, .. } => {
                assert_eq!(name, "limit")
            }
            ref kind => panic!("unexpected error: {:?}", kind),
        }
        match *parse_err("{movie:yes}").kind() {
            ErrorKind::DirectiveArgument { ref name, .. } => {
                assert_eq!(name, "movie")
            }
            ref kind => panic!("unexpected error: {:?}", kind),
        }
        match *parse_err("{similar:1.5}").kind() {
            ErrorKind::DirectiveArgument { ref name, .. } => {
                assert_eq!(name, "similar")
            }
            ref kind => panic!("unexpected error: {:?}", kind),
        }
        match *parse_err("{sort:budget}").kind() {
            ErrorKind::UnknownSort(ref name) => assert_eq!(name, "budget"),
            ref kind => panic!("unexpected error: {:?}", kind),
        }
    }

    #[test]
    fn sub_query_errors_name_their_role() {
        match *parse_err("{show:{wat} simpsons}").kind() {
            ErrorKind::SubSearch { role, ref err } => {
                assert_eq!(role, ROLE_TVSHOW);
                match *err.kind() {
                    ErrorKind::UnknownDirective(ref name) => {
                        assert_eq!(name, "wat")
                    }
                    ref kind => panic!("unexpected error: {:?}", kind),
                }
            }
            ref kind => panic!("unexpected error: {:?}", kind),
        }
    }

    #[test]
    fn display_round_trips() {
        let qstrs = [
            "{movie} {years:1999-2003} {votes:500-} {sort:rank desc} matrix",
            "{episode} {seasons:1} {show:{tvshow} {years:1989-} simpsons}",
            "{credits:{movie} {limit:5} the matrix} {billed:-3}",
            "{cast:{actor} keanu} {notv} {novideo} {limit:-1}",
            "{similar:0.5} {nocase} {debug} the matrix%",
            "{nofuzzy} The Matrix",
            "{actor} {movie} {tvshow} reeves",
            "{seasons:2} {movie} homer",
        ];
        for qstr in qstrs.iter() {
            let q1 = parse(qstr);
            let q2 = parse(&q1.to_string());
            assert_eq!(q1, q2, "round trip of {:?} via {:?}", qstr, q1.to_string());
        }
    }

    #[test]
    fn display_keeps_entity_order() {
        let queries = [
            Query::new().entity(EntityKind::Actor).entity(EntityKind::Movie),
            Query::new()
                .entity(EntityKind::TvShow)
                .seasons(RangeFilter::exactly(1))
                .entity(EntityKind::Movie),
        ];
        for q in queries.iter() {
            let got: Query = q.to_string().parse().unwrap();
            assert_eq!(&got, q, "round trip via {:?}", q.to_string());
        }
        assert_eq!(
            queries[0].to_string(),
            "{actor} {movie}",
        );
    }
}
