use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::datetime::parse_export_date;
use crate::text::{StopwordSet, TextNormalizer};

/// A message record exactly as it appears in the export.
#[derive(Debug, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_unixtime: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub text: TextContent,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawMessage")]
pub struct Message {
    /// Identifier of the message, unique within a transcript.
    pub id: i64,
    /// `"message"` or `"service"`. Absent in hand-written transcripts.
    pub kind: Option<String>,
    /// The date of the message, if the export carries one.
    pub date: Option<DateTime<Utc>>,
    /// The author of the message. Will be None for service messages and
    /// deleted accounts.
    pub author: Option<String>,
    /// The message text, either plain or split into formatted fragments.
    pub text: TextContent,
    /// Id of the message this one replies to. It may point to a message
    /// missing from the export.
    pub reply_to_message_id: Option<i64>,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        let date = raw
            .date
            .as_deref()
            .and_then(parse_export_date)
            .or_else(|| raw.date_unixtime.as_deref().and_then(parse_export_date));

        Message {
            id: raw.id,
            kind: raw.kind,
            date,
            author: raw.from,
            text: raw.text,
            reply_to_message_id: raw.reply_to_message_id,
        }
    }
}

impl Message {
    pub fn new(id: i64, author: impl Into<String>, text: impl Into<TextContent>) -> Self {
        Message {
            id,
            kind: Some("message".to_string()),
            date: None,
            author: Some(author.into()),
            text: text.into(),
            reply_to_message_id: None,
        }
    }

    pub fn replying_to(mut self, id: i64) -> Self {
        self.reply_to_message_id = Some(id);
        self
    }

    /// The text as a single string, flattening fragments when needed.
    ///
    /// The message itself is left untouched.
    pub fn plain_text(&self) -> Cow<'_, str> {
        match &self.text {
            TextContent::Plain(text) => Cow::Borrowed(text),
            TextContent::Fragments(fragments) => Cow::Owned(crate::replies::flatten_text(fragments)),
        }
    }
}

/// The `text` field of a message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextContent {
    Plain(String),
    Fragments(Vec<Fragment>),
}

impl Default for TextContent {
    fn default() -> Self {
        TextContent::Plain(String::new())
    }
}

impl From<&str> for TextContent {
    fn from(text: &str) -> Self {
        TextContent::Plain(text.to_string())
    }
}

impl From<String> for TextContent {
    fn from(text: String) -> Self {
        TextContent::Plain(text)
    }
}

impl From<Vec<Fragment>> for TextContent {
    fn from(fragments: Vec<Fragment>) -> Self {
        TextContent::Fragments(fragments)
    }
}

/// One piece of a formatted message text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    Plain(String),
    /// A formatted span such as `{"type": "bold", "text": "..."}`.
    Tagged {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        text: String,
    },
    /// Anything else. Contributes no text.
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct RawTranscript {
    #[serde(default)]
    name: Option<String>,
    messages: Vec<Message>,
}

/// An ordered, read-only chat export.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawTranscript")]
pub struct Transcript {
    name: Option<String>,
    messages: Vec<Message>,
    by_id: HashMap<i64, usize>,
}

impl From<RawTranscript> for Transcript {
    fn from(raw: RawTranscript) -> Self {
        Transcript::new(raw.name, raw.messages)
    }
}

impl Transcript {
    /// Builds a transcript and indexes its messages by id. When ids repeat,
    /// the first message wins.
    pub fn new(name: Option<String>, messages: Vec<Message>) -> Self {
        let mut by_id = HashMap::with_capacity(messages.len());
        for (idx, message) in messages.iter().enumerate() {
            by_id.entry(message.id).or_insert(idx);
        }
        Transcript {
            name,
            messages,
            by_id,
        }
    }

    /// Name of the chat, if the export has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Looks up a message by id.
    pub fn get(&self, id: i64) -> Option<&Message> {
        self.by_id.get(&id).map(|&idx| &self.messages[idx])
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Earliest and latest message dates, when any message is dated.
    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut dates = self.messages.iter().filter_map(|m| m.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

/// Shared text resources, built once and borrowed by every analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub normalizer: TextNormalizer,
    pub stopwords: StopwordSet,
}

impl Default for AnalysisConfig {
    /// Default normalizer and the bundled Persian stopword list.
    fn default() -> Self {
        let normalizer = TextNormalizer::default();
        let stopwords = StopwordSet::persian(&normalizer);
        AnalysisConfig {
            normalizer,
            stopwords,
        }
    }
}

impl AnalysisConfig {
    /// Loads a newline-delimited stopword file, normalizing every entry with
    /// the default normalizer.
    pub fn load<P: AsRef<std::path::Path>>(stopwords_path: P) -> crate::Result<Self> {
        let normalizer = TextNormalizer::default();
        let stopwords = StopwordSet::load(stopwords_path, &normalizer)?;
        Ok(AnalysisConfig {
            normalizer,
            stopwords,
        })
    }
}

/// Name of the image written by [`crate::ChatStatistics::generate_word_cloud`].
pub const WORD_CLOUD_FILE_NAME: &str = "word_cloud.png";

#[derive(Debug, Clone)]
pub struct WordCloudOptions {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// A color name such as `"white"` or a hex code such as `"#1e1e1e"`.
    pub background_color: String,
    /// Font size of the most frequent word.
    pub max_font_size: u32,
    /// Words that would be drawn smaller than this are dropped.
    pub min_font_size: u32,
    /// Maximum number of distinct words drawn.
    pub max_words: usize,
    /// How strongly frequency drives font size, between `0.0` (all words get
    /// `max_font_size`) and `1.0` (size proportional to frequency).
    pub relative_scaling: f32,
    /// Empty pixels kept around every word.
    pub margin: u32,
    /// A TrueType/OpenType font covering the Arabic presentation forms.
    /// Defaults to the bundled DejaVu Sans, relative to the crate root.
    pub font_path: PathBuf,
}

impl Default for WordCloudOptions {
    fn default() -> Self {
        WordCloudOptions {
            width: 800,
            height: 600,
            background_color: "white".to_string(),
            max_font_size: 130,
            min_font_size: 4,
            max_words: 200,
            relative_scaling: 0.5,
            margin: 2,
            font_path: PathBuf::from("data/fonts/DejaVuSans.ttf"),
        }
    }
}
