#![forbid(unsafe_code)]

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::formats::Flexible;
use serde_with::{DefaultOnError, DurationSeconds, serde_as};
use std::{fmt, time::Duration};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API credentials and the operator allow-list.
///
/// `recipients` doubles as the query allow-list: only these chat ids may
/// query the agent, and every alert goes to all of them.
#[serde_as]
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Telegram {
    pub token: String,

    #[serde(deserialize_with = "recipient_list")]
    pub recipients: Vec<i64>,

    pub api_base: String,

    /// Long-poll timeout for `getUpdates`.
    #[serde_as(as = "DefaultOnError<DurationSeconds<u64, Flexible>>")]
    pub poll_timeout: Duration,
}

impl Default for Telegram {
    fn default() -> Self {
        Self {
            token: String::new(),
            recipients: Vec::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout: Duration::from_secs(25),
        }
    }
}

impl Telegram {
    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

impl fmt::Debug for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telegram")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("recipients", &self.recipients)
            .field("api_base", &self.api_base)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

/// Accepts `[1, 2]`, `["1", "2"]` or a single delimited string `"1, 2;3 4"`.
/// Unparseable entries are dropped.
fn recipient_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RecipientVisitor;

    impl<'de> Visitor<'de> for RecipientVisitor {
        type Value = Vec<i64>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of chat ids or a delimited string of chat ids")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(vec![v])
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(i64::try_from(v).map(|v| vec![v]).unwrap_or_default())
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(parse_delimited(v))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::new();
            while let Some(item) = seq.next_element::<RecipientItem>()? {
                match item {
                    RecipientItem::Id(id) => out.push(id),
                    RecipientItem::Text(text) => out.extend(parse_delimited(&text)),
                }
            }
            Ok(out)
        }
    }

    let mut ids = deserializer.deserialize_any(RecipientVisitor)?;
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecipientItem {
    Id(i64),
    Text(String),
}

fn parse_delimited(raw: &str) -> Vec<i64> {
    raw.split([',', ';', ' '])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_recipients_are_parsed() {
        assert_eq!(parse_delimited("1, 2;3 x 4"), vec![1, 2, 3, 4]);
        assert!(parse_delimited("  ").is_empty());
    }

    #[test]
    fn debug_redacts_token() {
        let telegram = Telegram {
            token: "123:secret".into(),
            ..Default::default()
        };
        let rendered = format!("{telegram:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
