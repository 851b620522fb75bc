use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{
    de::{self, IgnoredAny, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_with::{serde_as, DefaultOnError};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    #[error("Post content is empty")]
    EmptyContent,
    #[error("Comment content is empty")]
    EmptyComment,
    #[error("Unknown reaction type: {0}")]
    UnknownReaction(String),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Heart,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Heart => "heart",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "heart" => Ok(ReactionKind::Heart),
            other => Err(Error::UnknownReaction(other.to_string())),
        }
    }
}

pub type ReactionCounts = BTreeMap<ReactionKind, u64>;

/// Author reference, owned by the server.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UserObj {
    pub id: UserId,
    pub username: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(alias = "avatar")]
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Location {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Reaction {
    pub user_id: UserId,
    pub reaction_type: ReactionKind,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub user_obj: UserObj,
    pub content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub user_obj: UserObj,
    pub content: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub image_upload_urls: Option<Vec<String>>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub location: Option<Location>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_reaction_counts")]
    pub reaction_counts: ReactionCounts,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub user_reaction: Option<ReactionKind>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub is_heat_report: bool,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub heat_severity: Option<String>,
}

impl Post {
    pub fn total_reactions(&self) -> u64 {
        self.reaction_counts.values().sum()
    }

    pub fn reaction_count(&self, kind: ReactionKind) -> u64 {
        self.reaction_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Whether the viewer's own reaction, if any, is reflected in a counted bucket.
    pub fn counted_user_reaction(&self) -> bool {
        match self.user_reaction {
            Some(kind) => self.reaction_count(kind) > 0,
            None => true,
        }
    }

    pub fn image_count(&self) -> usize {
        self.image_upload_urls.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PostCreate {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_upload_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_heat_report: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_severity: Option<String>,
}

impl PostCreate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_images(mut self, image_upload_ids: Vec<String>) -> Self {
        self.image_upload_ids = Some(image_upload_ids);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_heat_report(mut self, temperature: f64, heat_severity: impl Into<String>) -> Self {
        self.is_heat_report = Some(true);
        self.temperature = Some(temperature);
        self.heat_severity = Some(heat_severity.into());
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_upload_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    pub fn new(content: impl Into<String>) -> Result<Self, Error> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::EmptyComment);
        }
        Ok(Self { content })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReactionRequest {
    pub reaction_type: ReactionKind,
}

// the api emits naive iso timestamps (no offset) for some records, treat those as utc

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DeserializeTimestamp;

    impl<'de> Visitor<'de> for DeserializeTimestamp {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("iso 8601 timestamp, with or without offset")
        }

        fn visit_str<E>(self, value: &str) -> Result<DateTime<Utc>, E>
        where
            E: de::Error,
        {
            parse_timestamp(value)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {}", value)))
        }
    }

    deserializer.deserialize_str(DeserializeTimestamp)
}

// counts for reaction kinds this client does not know are dropped

fn deserialize_reaction_counts<'de, D>(deserializer: D) -> Result<ReactionCounts, D::Error>
where
    D: Deserializer<'de>,
{
    struct DeserializeReactionCounts;

    impl<'de> Visitor<'de> for DeserializeReactionCounts {
        type Value = ReactionCounts;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("map of reaction type to count")
        }

        fn visit_map<A>(self, mut map: A) -> Result<ReactionCounts, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut counts = ReactionCounts::new();
            while let Some(key) = map.next_key::<String>()? {
                match key.parse::<ReactionKind>() {
                    Ok(kind) => {
                        counts.insert(kind, map.next_value()?);
                    }
                    Err(_) => {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
            }
            Ok(counts)
        }
    }

    deserializer.deserialize_map(DeserializeReactionCounts)
}

#[derive(Debug, Deserialize)]
struct WrappedTimestamp(#[serde(deserialize_with = "deserialize_timestamp")] DateTime<Utc>);

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<WrappedTimestamp>::deserialize(deserializer)
        .map(|opt_wrapped| opt_wrapped.map(|wrapped| wrapped.0))
}
