use std::fmt;

use rusqlite::Row;
use serde::Serialize;

use crate::error::Result;
use crate::record::{Atom, EntityKind};

/// A single search result.
///
/// Every result has an entity kind, its atom, its name and a rendering of
/// kind specific attributes. Results produced by a query with a cast or
/// credits sub-query also carry the credit that joined them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
    /// The kind of this entity.
    pub entity: EntityKind,
    /// The atom of this entity.
    pub id: Atom,
    /// The name of this entity. For actors, this is their full name.
    pub name: String,
    /// The year associated with this entity, or `0` if there isn't one.
    pub year: u32,
    /// Kind specific attributes, e.g., `(TV)` for a TV movie or
    /// `(TV show: The Simpsons, #1.2)` for an episode.
    pub attrs: String,
    /// The similarity between this entity's name and the search text, or
    /// `-1` if similarity wasn't computed.
    pub similarity: f64,
    /// The rating of this entity. Entities without a rating have zero votes
    /// and a zero rank.
    pub rank: Ranking,
    /// The credit joining this result to a cast or credits sub-query.
    pub credit: Option<Credited>,
}

impl SearchResult {
    /// Returns true if and only if a similarity was computed for this result.
    pub fn has_similarity(&self) -> bool {
        self.similarity > -1.0
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.year > 0 {
            write!(f, " ({})", self.year)?;
        }
        if !self.attrs.is_empty() {
            write!(f, " {}", self.attrs)?;
        }
        Ok(())
    }
}

/// The votes and rank of a rated entity.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Ranking {
    /// The number of votes.
    pub votes: u32,
    /// The rank, on a scale of `0` to `100`.
    pub rank: u32,
}

/// The credit that joined a search result to a cast or credits sub-query.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Credited {
    /// The credited actor.
    pub actor: Atom,
    /// The media the actor is credited in.
    pub media: Atom,
    /// The character played.
    pub character: String,
    /// The billing position, if known.
    pub position: Option<u32>,
    /// Free-form credit attributes, e.g., `(voice)`.
    pub attrs: String,
}

/// The kind specific attributes of an entity, before rendering.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Attrs<'a> {
    Movie { tv: bool, video: bool },
    TvShow { start: Option<u32>, end: Option<u32> },
    Episode { show: &'a str, season: Option<u32>, episode: Option<u32> },
    Actor,
}

impl<'a> fmt::Display for Attrs<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Attrs::Movie { tv, video } => {
                let mut tags = vec![];
                if tv {
                    tags.push("(TV)");
                }
                if video {
                    tags.push("(V)");
                }
                write!(f, "{}", tags.join(" "))
            }
            Attrs::TvShow { start, end } => {
                write!(f, "{}-{}", Year(start), Year(end))
            }
            Attrs::Episode { show, season: Some(s), episode: Some(e) } => {
                write!(f, "(TV show: {}, #{}.{})", show, s, e)
            }
            Attrs::Episode { show, .. } => write!(f, "(TV show: {})", show),
            Attrs::Actor => Ok(()),
        }
    }
}

/// An optional year, rendered as `????` when unknown.
struct Year(Option<u32>);

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            None => write!(f, "????"),
            Some(year) => write!(f, "{}", year),
        }
    }
}

/// Decode a single row produced by a compiled query.
pub(crate) fn decode_row(row: &Row) -> Result<SearchResult> {
    let discriminator: Option<String> = row.get("entity")?;
    let entity = match discriminator
        .as_deref()
        .and_then(EntityKind::from_discriminator)
    {
        Some(entity) => entity,
        None => bug!("unrecognized entity discriminator: {:?}", discriminator),
    };
    let id = atom(row.get("id")?)?;
    let name: String = row.get("name")?;
    let year: u32 = row.get("year")?;
    let similarity: f64 = row.get("similarity")?;
    let rank = Ranking { votes: row.get("votes")?, rank: row.get("rank")? };
    let show_name: Option<String> = row.get("tvshow_name")?;
    let attrs = match entity {
        EntityKind::Movie => Attrs::Movie {
            tv: row.get::<_, Option<bool>>("tv")?.unwrap_or(false),
            video: row.get::<_, Option<bool>>("video")?.unwrap_or(false),
        },
        EntityKind::TvShow => Attrs::TvShow {
            start: row.get("year_start")?,
            end: row.get("year_end")?,
        },
        EntityKind::Episode => Attrs::Episode {
            show: show_name.as_deref().unwrap_or(""),
            season: row.get("season")?,
            episode: row.get("episode_num")?,
        },
        EntityKind::Actor => Attrs::Actor,
    }
    .to_string();
    let credit = match row.get::<_, Option<u32>>("credit_actor")? {
        None => None,
        Some(actor) => Some(Credited {
            actor: atom(actor)?,
            media: atom(row.get("credit_media")?)?,
            character: row
                .get::<_, Option<String>>("character")?
                .unwrap_or_default(),
            position: row.get("position")?,
            attrs: row
                .get::<_, Option<String>>("credit_attrs")?
                .unwrap_or_default(),
        }),
    };
    Ok(SearchResult { entity, id, name, year, attrs, similarity, rank, credit })
}

fn atom(id: u32) -> Result<Atom> {
    match Atom::new(id) {
        Some(atom) => Ok(atom),
        None => bug!("search produced the reserved atom 0"),
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::error::ErrorKind;

    use super::*;

    #[test]
    fn movie_attrs() {
        let a = Attrs::Movie { tv: false, video: false };
        assert_eq!(a.to_string(), "");
        let a = Attrs::Movie { tv: true, video: false };
        assert_eq!(a.to_string(), "(TV)");
        let a = Attrs::Movie { tv: true, video: true };
        assert_eq!(a.to_string(), "(TV) (V)");
    }

    #[test]
    fn tvshow_attrs() {
        let a = Attrs::TvShow { start: Some(1989), end: None };
        assert_eq!(a.to_string(), "1989-????");
        let a = Attrs::TvShow { start: Some(1999), end: Some(2013) };
        assert_eq!(a.to_string(), "1999-2013");
        let a = Attrs::TvShow { start: None, end: None };
        assert_eq!(a.to_string(), "????-????");
    }

    #[test]
    fn episode_attrs() {
        let a = Attrs::Episode {
            show: "The Simpsons",
            season: Some(1),
            episode: Some(2),
        };
        assert_eq!(a.to_string(), "(TV show: The Simpsons, #1.2)");
        let a =
            Attrs::Episode { show: "The Simpsons", season: Some(1), episode: None };
        assert_eq!(a.to_string(), "(TV show: The Simpsons)");
    }

    #[test]
    fn actor_attrs() {
        assert_eq!(Attrs::Actor.to_string(), "");
    }

    fn decode(select: &str) -> Result<SearchResult> {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare(select).unwrap();
        let mut rows = stmt.query([]).unwrap();
        let row = rows.next().unwrap().unwrap();
        decode_row(row)
    }

    const EPISODE_ROW: &str = "
        SELECT 'episode' AS entity, 2 AS id, 'Bart the Genius' AS name,
               1990 AS year, 0.5 AS similarity, 1200 AS votes, 78 AS rank,
               NULL AS tv, NULL AS video, NULL AS year_start,
               NULL AS year_end, 'The Simpsons' AS tvshow_name,
               1 AS season, 2 AS episode_num,
               32 AS credit_actor, 2 AS credit_media,
               'Homer Simpson' AS character, 1 AS position,
               '(voice)' AS credit_attrs
    ";

    #[test]
    fn decode_episode_with_credit() {
        let r = decode(EPISODE_ROW).unwrap();
        assert_eq!(r.entity, EntityKind::Episode);
        assert_eq!(r.id.get(), 2);
        assert_eq!(r.year, 1990);
        assert_eq!(r.attrs, "(TV show: The Simpsons, #1.2)");
        assert_eq!(r.rank, Ranking { votes: 1200, rank: 78 });
        assert!(r.has_similarity());
        let credit = r.credit.unwrap();
        assert_eq!(credit.actor.get(), 32);
        assert_eq!(credit.character, "Homer Simpson");
        assert_eq!(credit.position, Some(1));
        assert_eq!(credit.attrs, "(voice)");
    }

    #[test]
    fn decode_unknown_discriminator_is_bug() {
        let select = EPISODE_ROW.replace("'episode' AS entity", "'game' AS entity");
        match decode(&select) {
            Err(err) => match *err.kind() {
                ErrorKind::Bug(_) => {}
                ref kind => panic!("unexpected error: {:?}", kind),
            },
            Ok(r) => panic!("expected a bug, but got {:?}", r),
        }
    }

    #[test]
    fn display() {
        let mut r = decode(EPISODE_ROW).unwrap();
        assert_eq!(
            r.to_string(),
            "Bart the Genius (1990) (TV show: The Simpsons, #1.2)"
        );
        r.year = 0;
        r.attrs = String::new();
        assert_eq!(r.to_string(), "Bart the Genius");
    }
}
