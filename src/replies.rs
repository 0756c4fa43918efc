use std::collections::HashMap;

use crate::models::{Fragment, Transcript};

/// Number of users returned by [`crate::ChatStatistics::top_users`] when the
/// caller has no preference.
pub const DEFAULT_TOP_N: usize = 10;

const QUESTION_MARKS: [char; 2] = ['?', '\u{061F}'];

/// Concatenates the text of a fragmented message.
///
/// Plain fragments and formatted fragments with a `text` field contribute
/// their text; anything else is ignored.
pub fn flatten_text(fragments: &[Fragment]) -> String {
    let mut text = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Plain(s) => text.push_str(s),
            Fragment::Tagged { text: s, .. } => text.push_str(s),
            Fragment::Other(_) => {}
        }
    }
    text
}

/// Returns `true` if the text contains `?` or the Arabic question mark `؟`.
pub fn contains_question_mark(text: &str) -> bool {
    text.contains(QUESTION_MARKS)
}

/// Ranks authors by how many questions they replied to.
pub struct QuestionReplyAnalyzer<'a> {
    transcript: &'a Transcript,
}

impl<'a> QuestionReplyAnalyzer<'a> {
    pub fn new(transcript: &'a Transcript) -> Self {
        Self { transcript }
    }

    /// Checks whether the message with `message_id` asks a question.
    ///
    /// Unknown ids are not questions.
    pub fn is_question(&self, message_id: i64) -> bool {
        match self.transcript.get(message_id) {
            Some(message) => contains_question_mark(&message.plain_text()),
            None => {
                tracing::trace!("message {} not found in transcript", message_id);
                false
            }
        }
    }

    /// Counts, per author, the replies made to questions. Authors appear in
    /// the order of their first such reply.
    pub fn reply_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for message in self.transcript.messages() {
            let Some(reply_to) = message.reply_to_message_id else {
                continue;
            };
            if !self.is_question(reply_to) {
                continue;
            }
            let Some(author) = message.author.as_deref() else {
                tracing::debug!("reply {} to question {} has no author", message.id, reply_to);
                continue;
            };

            match positions.get(author) {
                Some(&idx) => counts[idx].1 += 1,
                None => {
                    positions.insert(author, counts.len());
                    counts.push((author.to_string(), 1));
                }
            }
        }

        counts
    }

    /// The `top_n` authors with the most replies to questions, most first.
    /// Ties keep the order in which the authors first answered.
    pub fn top_users(&self, top_n: usize) -> Vec<(String, usize)> {
        tracing::info!("getting top {} users", top_n);
        let mut counts = self.reply_counts();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(top_n);
        counts
    }
}
