use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{Entity, RecordFields};
use crate::core::{Record, SqlValue};
use crate::error::Result;

/// `created` / `modified` pair carried by the catalog's main tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamps {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Timestamps {
    fn take(fields: &mut RecordFields) -> Result<Self> {
        Ok(Self {
            created: fields.take_timestamp("created")?,
            modified: fields.take_timestamp("modified")?,
        })
    }
}

macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(format!(
                        "'{}' is not one of {}",
                        other,
                        Self::LABELS.join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl From<$name> for SqlValue {
            fn from(v: $name) -> Self {
                SqlValue::Text(v.label().to_string())
            }
        }
    };
}

labelled_enum! {
    /// Kind of film work.
    FilmWorkType {
        Movie => "movie",
        TvShow => "tv_show",
    }
}

labelled_enum! {
    Gender {
        Male => "male",
        Female => "female",
    }
}

labelled_enum! {
    /// Part a person played in a film work.
    Role {
        Actor => "actor",
        Director => "director",
        Writer => "writer",
    }
}

/// A movie or TV show.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmWork {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub rating: f64,
    pub film_type: FilmWorkType,
    pub certificate: Option<String>,
    pub file_path: Option<String>,
    pub timestamps: Timestamps,
}

impl Entity for FilmWork {
    const TABLE: &'static str = "film_work";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "title",
        "description",
        "creation_date",
        "rating",
        "type",
        "certificate",
        "file_path",
        "created",
        "modified",
    ];

    fn from_record(record: Record) -> Result<Self> {
        let mut fields = RecordFields::new(Self::TABLE, record);
        let film_work = Self {
            id: fields.take_id()?,
            title: fields.take_text("title")?,
            description: fields.take_optional_text("description")?,
            creation_date: fields.take_nullable_date("creation_date")?,
            rating: fields.take_rating("rating")?,
            film_type: fields.take_choice("type")?,
            certificate: fields.take_optional_text("certificate")?,
            file_path: fields.take_nullable_text("file_path")?,
            timestamps: Timestamps::take(&mut fields)?,
        };
        fields.finish()?;
        Ok(film_work)
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.title.into(),
            self.description.into(),
            self.creation_date.into(),
            self.rating.into(),
            self.film_type.into(),
            self.certificate.into(),
            self.file_path.into(),
            self.timestamps.created.into(),
            self.timestamps.modified.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub timestamps: Timestamps,
}

impl Entity for Genre {
    const TABLE: &'static str = "genre";
    const FIELDS: &'static [&'static str] = &["id", "name", "description", "created", "modified"];

    fn from_record(record: Record) -> Result<Self> {
        let mut fields = RecordFields::new(Self::TABLE, record);
        let genre = Self {
            id: fields.take_id()?,
            name: fields.take_text("name")?,
            description: fields.take_optional_text("description")?,
            timestamps: Timestamps::take(&mut fields)?,
        };
        fields.finish()?;
        Ok(genre)
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.name.into(),
            self.description.into(),
            self.timestamps.created.into(),
            self.timestamps.modified.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub full_name: String,
    pub gender: Option<Gender>,
    pub timestamps: Timestamps,
}

impl Entity for Person {
    const TABLE: &'static str = "person";
    const FIELDS: &'static [&'static str] = &["id", "full_name", "gender", "created", "modified"];

    fn from_record(record: Record) -> Result<Self> {
        let mut fields = RecordFields::new(Self::TABLE, record);
        let person = Self {
            id: fields.take_id()?,
            full_name: fields.take_text("full_name")?,
            gender: fields.take_optional_choice("gender")?,
            timestamps: Timestamps::take(&mut fields)?,
        };
        fields.finish()?;
        Ok(person)
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.full_name.into(),
            self.gender.into(),
            self.timestamps.created.into(),
            self.timestamps.modified.into(),
        ]
    }
}

/// Link between a genre and a film work.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreFilmWork {
    pub id: Uuid,
    pub genre_id: Uuid,
    pub film_work_id: Uuid,
    pub created: DateTime<Utc>,
}

impl Entity for GenreFilmWork {
    const TABLE: &'static str = "genre_film_work";
    const FIELDS: &'static [&'static str] = &["id", "genre_id", "film_work_id", "created"];
    const DEPENDS_ON: &'static [&'static str] = &["genre", "film_work"];

    fn from_record(record: Record) -> Result<Self> {
        let mut fields = RecordFields::new(Self::TABLE, record);
        let link = Self {
            id: fields.take_id()?,
            genre_id: fields.take_uuid("genre_id")?,
            film_work_id: fields.take_uuid("film_work_id")?,
            created: fields.take_timestamp("created")?,
        };
        fields.finish()?;
        Ok(link)
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.genre_id.into(),
            self.film_work_id.into(),
            self.created.into(),
        ]
    }
}

/// Link between a person and a film work, with the person's role if known.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonFilmWork {
    pub id: Uuid,
    pub person_id: Uuid,
    pub film_work_id: Uuid,
    pub role: Option<Role>,
    pub created: DateTime<Utc>,
}

impl Entity for PersonFilmWork {
    const TABLE: &'static str = "person_film_work";
    const FIELDS: &'static [&'static str] =
        &["id", "person_id", "film_work_id", "role", "created"];
    const DEPENDS_ON: &'static [&'static str] = &["person", "film_work"];

    fn from_record(record: Record) -> Result<Self> {
        let mut fields = RecordFields::new(Self::TABLE, record);
        let link = Self {
            id: fields.take_id()?,
            person_id: fields.take_uuid("person_id")?,
            film_work_id: fields.take_uuid("film_work_id")?,
            role: fields.take_nullable_choice("role")?,
            created: fields.take_timestamp("created")?,
        };
        fields.finish()?;
        Ok(link)
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.person_id.into(),
            self.film_work_id.into(),
            self.role.into(),
            self.created.into(),
        ]
    }
}
