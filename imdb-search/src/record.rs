use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// An opaque identifier for a single entity in the database.
///
/// Atoms are assigned when the data is ingested and are never produced by
/// the search engine itself. They are always strictly positive; the value `0`
/// is reserved and never refers to anything.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd,
    Serialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Atom(u32);

impl Atom {
    /// Create a new atom from its integer value.
    ///
    /// If the value given is `0`, then `None` is returned.
    pub fn new(id: u32) -> Option<Atom> {
        if id == 0 {
            None
        } else {
            Some(Atom(id))
        }
    }

    /// Return the integer value of this atom.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Atom {
    type Error = String;

    fn try_from(id: u32) -> Result<Atom, String> {
        Atom::new(id).ok_or_else(|| "atom identifiers must be non-zero".into())
    }
}

impl From<Atom> for u32 {
    fn from(atom: Atom) -> u32 {
        atom.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of an entity. These form a partitioning of every entity in the
/// database, where every entity has exactly one kind.
///
/// The order of the variants is significant: when a row could be read as
/// more than one kind, the first kind in this order wins.
///
/// This type has a `FromStr` implementation that recognizes a few common
/// sense synonyms. For example, `tv` and `tvshow` both map to `TvShow`.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[allow(missing_docs)]
pub enum EntityKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tvshow")]
    TvShow,
    #[serde(rename = "episode")]
    Episode,
    #[serde(rename = "actor")]
    Actor,
}

impl EntityKind {
    /// All entity kinds, in cascade order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Movie,
        EntityKind::TvShow,
        EntityKind::Episode,
        EntityKind::Actor,
    ];

    /// All kinds of media, i.e., everything that can have a cast.
    pub const MEDIA: [EntityKind; 3] =
        [EntityKind::Movie, EntityKind::TvShow, EntityKind::Episode];

    /// Return a string representation of this entity kind.
    ///
    /// This is the same string used to discriminate between entity kinds in
    /// compiled queries.
    pub fn as_str(&self) -> &'static str {
        match *self {
            EntityKind::Movie => "movie",
            EntityKind::TvShow => "tvshow",
            EntityKind::Episode => "episode",
            EntityKind::Actor => "actor",
        }
    }

    /// Convert the exact discriminator string used in compiled queries back
    /// to an entity kind. Unlike `FromStr`, no synonyms are accepted.
    pub(crate) fn from_discriminator(s: &str) -> Option<EntityKind> {
        EntityKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(kind: &str) -> Result<EntityKind, Error> {
        match &*kind.to_lowercase() {
            "movie" | "movies" | "film" => Ok(EntityKind::Movie),
            "tvshow" | "tvshows" | "tv" | "tvseries" => Ok(EntityKind::TvShow),
            "episode" | "episodes" | "tvepisode" => Ok(EntityKind::Episode),
            "actor" | "actors" | "actress" => Ok(EntityKind::Actor),
            unk => Err(Error::unknown_entity(unk)),
        }
    }
}

/// A movie record, as found in `movies.tsv`.
#[derive(Clone, Debug, Deserialize)]
pub struct Movie {
    /// The atom of this movie.
    pub atom_id: Atom,
    /// The title of this movie.
    pub title: String,
    /// The release year, if known.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub year: Option<u32>,
    /// A disambiguating sequence for movies with the same title and year,
    /// e.g., `I` or `II`.
    pub sequence: String,
    /// Whether this movie was made for TV.
    #[serde(deserialize_with = "number_as_bool")]
    pub tv: bool,
    /// Whether this movie was made for video.
    #[serde(deserialize_with = "number_as_bool")]
    pub video: bool,
}

/// A TV show record, as found in `tvshows.tsv`.
#[derive(Clone, Debug, Deserialize)]
pub struct TvShow {
    /// The atom of this TV show.
    pub atom_id: Atom,
    /// The title of this TV show.
    pub title: String,
    /// The year this TV show is best known by, if known. This is usually the
    /// same as its start year.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub year: Option<u32>,
    /// A disambiguating sequence for shows with the same title and year.
    pub sequence: String,
    /// The year this TV show started airing, if known.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub year_start: Option<u32>,
    /// The year this TV show stopped airing, if it has.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub year_end: Option<u32>,
}

/// An episode record, as found in `episodes.tsv`.
///
/// An episode joins itself to the TV show it belongs to via `tvshow_atom_id`.
#[derive(Clone, Debug, Deserialize)]
pub struct Episode {
    /// The atom of this episode.
    pub atom_id: Atom,
    /// The atom of the TV show this episode belongs to.
    pub tvshow_atom_id: Atom,
    /// The title of this episode.
    pub title: String,
    /// The year this episode aired, if known.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub year: Option<u32>,
    /// The season this episode belongs to, if known.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub season: Option<u32>,
    /// The episode number within its season, if known.
    #[serde(rename = "episode", deserialize_with = "csv::invalid_option")]
    pub episode_num: Option<u32>,
}

/// An actor record, as found in `actors.tsv`.
#[derive(Clone, Debug, Deserialize)]
pub struct Actor {
    /// The atom of this actor.
    pub atom_id: Atom,
    /// The full name of this actor, e.g., `Reeves, Keanu`.
    pub full_name: String,
    /// A disambiguating sequence for actors with the same name.
    pub sequence: String,
}

/// A rating associated with a single media entity, as found in
/// `ratings.tsv`.
#[derive(Clone, Debug, Deserialize)]
pub struct Rating {
    /// The atom of the rated entity.
    pub atom_id: Atom,
    /// The number of votes involved in this rating.
    pub votes: u32,
    /// The rank, on a scale of `0` to `100`.
    pub rank: u32,
}

/// A single credit of an actor in some media, as found in `credits.tsv`.
#[derive(Clone, Debug, Deserialize)]
pub struct Credit {
    /// The atom of the credited actor.
    pub actor_atom_id: Atom,
    /// The atom of the media the actor is credited in.
    pub media_atom_id: Atom,
    /// The character played, if known.
    pub character: String,
    /// The billing position, if known.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub position: Option<u32>,
    /// Free-form credit attributes, e.g., `(voice)`.
    pub attrs: String,
}

fn number_as_bool<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    i32::deserialize(de).map(|n| n != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_zero_is_reserved() {
        assert!(Atom::new(0).is_none());
        assert_eq!(Atom::new(5).unwrap().get(), 5);
        assert!(Atom::try_from(0).is_err());
    }

    #[test]
    fn entity_kind_parse() {
        assert_eq!("movie".parse::<EntityKind>().unwrap(), EntityKind::Movie);
        assert_eq!("TV".parse::<EntityKind>().unwrap(), EntityKind::TvShow);
        assert_eq!(
            "episodes".parse::<EntityKind>().unwrap(),
            EntityKind::Episode
        );
        assert!("videogame".parse::<EntityKind>().is_err());
    }

    #[test]
    fn entity_kind_discriminator_is_strict() {
        for kind in EntityKind::ALL.iter() {
            assert_eq!(
                EntityKind::from_discriminator(kind.as_str()),
                Some(*kind)
            );
        }
        assert_eq!(EntityKind::from_discriminator("tv"), None);
        assert_eq!(EntityKind::from_discriminator("Movie"), None);
    }

    #[test]
    fn entity_kind_order() {
        assert!(EntityKind::Movie < EntityKind::TvShow);
        assert!(EntityKind::TvShow < EntityKind::Episode);
        assert!(EntityKind::Episode < EntityKind::Actor);
    }
}
