pub mod datetime;
pub mod error;
pub mod models;
pub mod replies;
pub mod shaping;
pub mod text;
pub mod wordcloud;

pub use crate::error::{Error, RenderError, Result};
pub use crate::models::{
    AnalysisConfig, Fragment, Message, TextContent, Transcript, WORD_CLOUD_FILE_NAME, WordCloudOptions,
};
pub use crate::replies::{DEFAULT_TOP_N, QuestionReplyAnalyzer};
pub use crate::text::{NormalizerOptions, StopwordSet, TextNormalizer};
pub use crate::wordcloud::WordCloud;

use std::fs::File;
use std::path::{Path, PathBuf};
use memmap2::Mmap;

/// Parses a chat export: a JSON object with a `messages` array.
pub fn parse_str(s: &str) -> Result<Transcript> {
    Ok(serde_json::from_str(s)?)
}

/// Convenience helper that memory-maps a chat export file and parses it without
/// copying its contents into an intermediate `String`.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Transcript> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
    let mmap = unsafe { Mmap::map(&file)? };
    let text = std::str::from_utf8(&mmap).map_err(|_| Error::InvalidUtf8)?;
    parse_str(text)
}

/// Statistics over one chat export.
///
/// The transcript is never modified; every analysis borrows the same
/// [`AnalysisConfig`].
pub struct ChatStatistics<'c> {
    transcript: Transcript,
    config: &'c AnalysisConfig,
}

impl<'c> ChatStatistics<'c> {
    pub fn new(transcript: Transcript, config: &'c AnalysisConfig) -> Self {
        Self { transcript, config }
    }

    /// Loads the chat export at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P, config: &'c AnalysisConfig) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("loading chat data from {}", path.display());
        let transcript = parse_file(path)?;

        match transcript.date_range() {
            Some((first, last)) => tracing::info!(
                "loaded {} messages from {} to {}",
                transcript.len(),
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            ),
            None => tracing::info!("loaded {} messages", transcript.len()),
        }

        Ok(Self::new(transcript, config))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The normalized, shaped text the word cloud is drawn from.
    pub fn word_cloud_text(&self) -> String {
        text::word_cloud_text(self.transcript.messages(), self.config)
    }

    /// Renders the word cloud and writes it to `output_dir` as
    /// [`WORD_CLOUD_FILE_NAME`]. Returns the path of the written file.
    pub fn generate_word_cloud<P: AsRef<Path>>(&self, output_dir: P, options: &WordCloudOptions) -> Result<PathBuf> {
        let text = self.word_cloud_text();
        let cloud = WordCloud::generate(&text, options)?;
        let path = output_dir.as_ref().join(WORD_CLOUD_FILE_NAME);
        cloud.to_file(&path)?;
        Ok(path)
    }

    pub fn is_question(&self, message_id: i64) -> bool {
        QuestionReplyAnalyzer::new(&self.transcript).is_question(message_id)
    }

    /// The `top_n` users who replied most often to questions.
    pub fn top_users(&self, top_n: usize) -> Vec<(String, usize)> {
        QuestionReplyAnalyzer::new(&self.transcript).top_users(top_n)
    }
}
