//! Text cleanup for the word cloud: filtering, normalization, tokenization
//! and display shaping of Persian chat text.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use unicode_bidi::BidiInfo;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::models::{AnalysisConfig, Message, TextContent};
use crate::shaping;

lazy_static! {
    static ref LATIN_PREFIX: Regex = Regex::new(r"(?i)^[A-Za-z]+").unwrap();
    static ref DECORATIVE_SYMBOLS: Regex = Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}", // emoticons
        r"\x{1F300}-\x{1F5FF}", // symbols & pictographs
        r"\x{1F680}-\x{1F6FF}", // transport & map symbols
        r"\x{1F1E0}-\x{1F1FF}", // flags
        r"\x{2702}-\x{27B0}",
        r"\x{24C2}-\x{1F251}",
        r"\x{1F926}-\x{1F937}",
        r"\x{10000}-\x{10FFFF}",
        r"\x{200D}",
        r"\x{2640}-\x{2642}",
        r"\x{2600}-\x{2B55}",
        r"\x{23CF}",
        r"\x{23E9}",
        r"\x{231A}",
        r"\x{3030}",
        r"\x{FE0F}",
        r"\x{200C}",
        r"\x{200E}\x{200F}",
        r"\x{2066}-\x{2069}",
        "]+"
    ))
    .unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SPACE_BEFORE_PUNCTUATION: Regex = Regex::new(r" ([.,!?:;،؛؟»)\]])").unwrap();
    static ref MI_PREFIX: Regex = Regex::new(r"(^|\s)(ن?می) ").unwrap();
}

const ZWNJ: char = '\u{200C}';

/// Returns `false` when the text starts with Latin letters.
///
/// Only the start of the text is checked, so mixed text that begins with
/// Persian is accepted.
pub fn is_likely_target_language(text: &str) -> bool {
    !LATIN_PREFIX.is_match(text)
}

/// Deletes emoji, pictographs, flags and invisible joiner/direction marks.
/// Every other character is kept in order.
pub fn remove_decorative_symbols(text: &str) -> String {
    DECORATIVE_SYMBOLS.replace_all(text, "").into_owned()
}

/// Splits text into words using Unicode word boundaries. Punctuation and
/// symbols are dropped; words joined with a zero-width non-joiner stay whole.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_string).collect()
}

/// Drops every token found in `stopwords`, keeping the order of the rest.
pub fn filter_stopwords(tokens: Vec<String>, stopwords: &StopwordSet) -> Vec<String> {
    tokens
        .into_iter()
        .filter(|token| !stopwords.contains(token))
        .collect()
}

/// Shapes Arabic-script letters and reorders the text into visual
/// (left-to-right) order.
///
/// Call it once on the final text: shaping fragments separately breaks
/// joining at their boundaries.
pub fn reshape_for_display(text: &str) -> String {
    let shaped = shaping::reshape(text);
    let bidi = BidiInfo::new(&shaped, None);
    let mut out = String::with_capacity(shaped.len());
    for para in &bidi.paragraphs {
        let line = para.range.clone();
        out.push_str(&bidi.reorder_line(para, line));
    }
    out
}

/// Configuration options for [`TextNormalizer`].
#[derive(Debug, Clone, Copy)]
pub struct NormalizerOptions {
    /// Strip harakat, superscript alef and tatweel.
    pub remove_diacritics: bool,
    /// Write ASCII and Arabic-Indic digits as Persian digits.
    pub persian_numbers: bool,
    /// Attach the `می`/`نمی` verb prefix to the next word with a zero-width
    /// non-joiner.
    pub join_mi_prefix: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            remove_diacritics: true,
            persian_numbers: true,
            join_mi_prefix: true,
        }
    }
}

/// Orthographic normalizer for Persian text.
///
/// Normalization is idempotent: normalizing twice gives the same result as
/// normalizing once.
///
/// # Examples
///
/// ```
/// use chat_stats::text::TextNormalizer;
///
/// let normalizer = TextNormalizer::default();
/// assert_eq!(normalizer.normalize("  كتاب   ي  "), "کتاب ی");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer {
    options: NormalizerOptions,
}

impl TextNormalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> NormalizerOptions {
        self.options
    }

    pub fn normalize(&self, text: &str) -> String {
        let opts = self.options;

        let text: String = if opts.remove_diacritics {
            let stripped: String = text.chars().filter(|&c| !is_diacritic(c)).collect();
            stripped.nfkc().filter(|&c| !is_diacritic(c)).collect()
        } else {
            text.nfkc().collect()
        };

        let text: String = text
            .chars()
            .map(unify_letter)
            .map(|c| if opts.persian_numbers { persian_digit(c) } else { c })
            .collect();

        let text = WHITESPACE.replace_all(&text, " ");
        let text = SPACE_BEFORE_PUNCTUATION.replace_all(text.trim(), "$1");

        if opts.join_mi_prefix {
            let joined = format!("${{1}}${{2}}{ZWNJ}");
            MI_PREFIX.replace_all(&text, joined.as_str()).into_owned()
        } else {
            text.into_owned()
        }
    }
}

fn is_diacritic(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}')
}

/// Maps Arabic letter variants to their Persian counterparts.
fn unify_letter(c: char) -> char {
    match c {
        '\u{0643}' => '\u{06A9}', // kaf
        '\u{064A}' | '\u{0649}' => '\u{06CC}', // yeh, alef maksura
        _ => c,
    }
}

fn persian_digit(c: char) -> char {
    let zero = match c {
        '0'..='9' => '0',
        '\u{0660}'..='\u{0669}' => '\u{0660}',
        _ => return c,
    };
    char::from_u32(0x06F0 + (c as u32 - zero as u32)).unwrap_or(c)
}

/// Normalized words excluded from the word cloud.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
}

/// Persian stopword list shipped with the crate.
const BUNDLED_STOPWORDS: &str = include_str!("../data/stopwords.txt");

impl StopwordSet {
    /// Builds a set from raw words, trimming and normalizing each one. Blank
    /// entries are ignored.
    pub fn from_words<I, S>(words: I, normalizer: &TextNormalizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| normalizer.normalize(w.as_ref().trim()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Reads a newline-delimited stopword file.
    pub fn load<P: AsRef<Path>>(path: P, normalizer: &TextNormalizer) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::from_io(e, path))?;
        let set = Self::from_words(content.lines(), normalizer);
        tracing::debug!("loaded {} stopwords from {}", set.len(), path.display());
        Ok(set)
    }

    /// The bundled Persian stopword list.
    pub fn persian(normalizer: &TextNormalizer) -> Self {
        Self::from_words(BUNDLED_STOPWORDS.lines(), normalizer)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Turns the plain-text messages of a chat into the text drawn by the word
/// cloud.
///
/// Messages whose text is split into fragments, or that start with Latin
/// letters, are skipped. The rest are tokenized, stripped of stopwords and
/// concatenated; the result is normalized, cleaned of decorative symbols and
/// finally shaped for display.
pub fn word_cloud_text(messages: &[Message], config: &AnalysisConfig) -> String {
    tracing::info!("digging data from {} messages", messages.len());

    let pieces: Vec<String> = messages
        .par_iter()
        .filter_map(|msg| match &msg.text {
            TextContent::Plain(text) if is_likely_target_language(text) => {
                let tokens = filter_stopwords(tokenize(text), &config.stopwords);
                Some(tokens.join(" "))
            }
            _ => None,
        })
        .collect();

    tracing::debug!(
        "{} of {} messages kept for the word cloud",
        pieces.len(),
        messages.len()
    );

    let mut content = String::new();
    for piece in &pieces {
        content.push(' ');
        content.push_str(piece);
    }

    let content = config.normalizer.normalize(&content);
    let content = remove_decorative_symbols(&content);
    reshape_for_display(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopwords(words: &[&str]) -> StopwordSet {
        StopwordSet::from_words(words, &TextNormalizer::default())
    }

    #[test]
    fn test_is_likely_target_language() {
        assert!(is_likely_target_language("سلام خوبی؟"));
        assert!(is_likely_target_language("سلام hello"));
        assert!(is_likely_target_language("123 abc"));
        assert!(is_likely_target_language(""));
        assert!(!is_likely_target_language("hello سلام"));
        assert!(!is_likely_target_language("Hi"));
        assert!(!is_likely_target_language("zZ"));
    }

    #[test]
    fn test_remove_decorative_symbols() {
        assert_eq!(remove_decorative_symbols("سلام 😀👍🏽"), "سلام ");
        assert_eq!(remove_decorative_symbols("a\u{200D}b\u{200C}c\u{FE0F}"), "abc");
        assert_eq!(remove_decorative_symbols("\u{2067}متن\u{2069}"), "متن");
        assert_eq!(remove_decorative_symbols("\u{200F}x\u{200E}"), "x");
        assert_eq!(remove_decorative_symbols("☀ sun ✂"), " sun ");
        assert_eq!(remove_decorative_symbols("plain text, 42."), "plain text, 42.");
    }

    #[test]
    fn test_remove_decorative_symbols_is_a_deletion() {
        let input = "x🇮🇷y ❤️ z\u{200C}w";
        let output = remove_decorative_symbols(input);
        let mut rest = input.chars();
        for c in output.chars() {
            assert!(rest.any(|d| d == c), "{c:?} out of order");
        }
        assert_eq!(output, "xy  zw");
    }

    #[test]
    fn test_normalize_letters_and_digits() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize("كيك"), "کیک");
        assert_eq!(normalizer.normalize("موسى"), "موسی");
        assert_eq!(normalizer.normalize("سال 1400 و ١٤٠٠"), "سال ۱۴۰۰ و ۱۴۰۰");
    }

    #[test]
    fn test_normalize_diacritics_and_spacing() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize("کِتابـــ"), "کتاب");
        assert_eq!(normalizer.normalize("  سلام   دنیا  "), "سلام دنیا");
        assert_eq!(normalizer.normalize("خوبی ؟ آره ."), "خوبی؟ آره.");
        assert_eq!(normalizer.normalize("می روم"), "می\u{200C}روم");
        assert_eq!(normalizer.normalize("من نمی دانم"), "من نمی\u{200C}دانم");
    }

    #[test]
    fn test_normalize_presentation_forms() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize("\u{FEB3}\u{FEFC}\u{FEE1}"), "سلام");
    }

    #[test]
    fn test_normalize_options() {
        let normalizer = TextNormalizer::new(NormalizerOptions {
            remove_diacritics: false,
            persian_numbers: false,
            join_mi_prefix: false,
        });
        assert_eq!(normalizer.normalize("می روم 12"), "می روم 12");
        assert_eq!(normalizer.normalize("کِتاب"), "کِتاب");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "",
            "   ",
            "سلام دنیا",
            "  كيك   و  چاي ١٢٣ 456  ",
            "می می روم نمی دانم",
            "خوبی ؟؟ آره . باشه !",
            "کِتابـــ هایِ  مَن",
            "\u{FEB3}\u{FEFC}\u{FEE1} \u{FB90}",
            "mixed text با فارسی 😀 and ZWNJ\u{200C}here",
            "e\u{0301} caf\u{00E9} ﬁ ½",
            "tab\tand\nnewline\u{00A0}nbsp",
        ];
        let options = [
            NormalizerOptions::default(),
            NormalizerOptions {
                remove_diacritics: false,
                persian_numbers: false,
                join_mi_prefix: false,
            },
        ];
        for opts in options {
            let normalizer = TextNormalizer::new(opts);
            for sample in samples {
                let once = normalizer.normalize(sample);
                assert_eq!(normalizer.normalize(&once), once, "input: {sample:?}");
            }
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("سلام، خوبی؟"), vec!["سلام", "خوبی"]);
        assert_eq!(tokenize("می\u{200C}روم خانه"), vec!["می\u{200C}روم", "خانه"]);
        assert_eq!(tokenize("..."), Vec::<String>::new());
    }

    #[test]
    fn test_filter_stopwords() {
        let set = stopwords(&["از", "به", "كه"]);
        let tokens = vec!["من", "به", "خانه", "از", "مدرسه", "که", "رفتم"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            filter_stopwords(tokens, &set),
            vec!["من", "خانه", "مدرسه", "رفتم"]
        );
    }

    #[test]
    fn test_stopword_set_normalizes_entries() {
        let set = stopwords(&["  كه  ", "", "   ", "ي"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("که"));
        assert!(set.contains("ی"));
        assert!(!set.contains("كه"));
    }

    #[test]
    fn test_bundled_stopwords() {
        let set = StopwordSet::persian(&TextNormalizer::default());
        assert!(!set.is_empty());
        assert!(set.contains("از"));
        assert!(set.contains("که"));
    }

    #[test]
    fn test_stopword_load_missing_file() {
        let err = StopwordSet::load("/nonexistent/stopwords.txt", &TextNormalizer::default())
            .unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[test]
    fn test_reshape_for_display_reverses_rtl() {
        // isolated beh, space, isolated alef in visual order
        assert_eq!(reshape_for_display("ب ا"), "\u{FE8D} \u{FE8F}");
        assert_eq!(reshape_for_display("abc"), "abc");
    }

    #[test]
    fn test_word_cloud_text_pipeline() {
        let config = AnalysisConfig {
            normalizer: TextNormalizer::default(),
            stopwords: stopwords(&["از"]),
        };
        let messages = vec![
            Message::new(1, "A", "ب از ا"),
            Message::new(2, "B", "hello ب"),
            Message::new(3, "C", vec![crate::models::Fragment::Plain("ب".to_string())]),
        ];
        assert_eq!(word_cloud_text(&messages, &config), "\u{FE8D} \u{FE8F}");
    }

    #[test]
    fn test_word_cloud_text_all_latin_is_empty() {
        let config = AnalysisConfig::default();
        let messages = vec![Message::new(1, "A", "Hello"), Message::new(2, "B", "World")];
        assert_eq!(word_cloud_text(&messages, &config), "");
    }
}
