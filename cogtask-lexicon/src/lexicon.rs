use lazy_static::lazy_static;
use std::collections::{BTreeMap, HashSet};
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref BUILTIN: BTreeMap<&'static str, &'static str> = {
        let mut m = BTreeMap::new();
        m.insert("animals", include_str!("../lexicons/animals.txt"));
        m.insert("foods", include_str!("../lexicons/foods.txt"));
        m
    };
}

const TERMINAL_PUNCTUATION: &[char] = &['.', ',', '!', '?'];

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error(
        "unknown built-in lexicon category `{0}` (available: {})",
        Lexicon::builtin_categories().join(", ")
    )]
    UnknownCategory(String),

    #[error("lexicon is missing its `# {0}:` header")]
    MissingHeader(&'static str),

    #[error("lexicon `{0}` contains no words")]
    Empty(String),
}

/// A versioned category word list (animals, foods, ...).
///
/// Word files are plain text, one entry per line, with `# lexicon: <name>`
/// and `# version: <tag>` header comments.
#[derive(Debug, Clone)]
pub struct Lexicon {
    category: String,
    version: String,
    words: HashSet<Atom>,
}

impl Lexicon {
    pub fn builtin(category: &str) -> Result<Self, LexiconError> {
        let text = BUILTIN
            .get(category)
            .ok_or_else(|| LexiconError::UnknownCategory(category.to_string()))?;
        Self::parse(text)
    }

    pub fn builtin_categories() -> Vec<&'static str> {
        BUILTIN.keys().copied().collect()
    }

    pub fn parse(text: &str) -> Result<Self, LexiconError> {
        let mut category = None;
        let mut version = None;
        let mut words = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if let Some(comment) = line.strip_prefix('#') {
                let comment = comment.trim();
                if let Some(v) = comment.strip_prefix("lexicon:") {
                    category = Some(v.trim().to_string());
                } else if let Some(v) = comment.strip_prefix("version:") {
                    version = Some(v.trim().to_string());
                }
                continue;
            }
            if !line.is_empty() {
                words.push(line);
            }
        }

        let category = category.ok_or(LexiconError::MissingHeader("lexicon"))?;
        let version = version.ok_or(LexiconError::MissingHeader("version"))?;
        Self::from_words(category, version, words)
    }

    pub fn from_words<I, S>(
        category: impl Into<String>,
        version: impl Into<String>,
        words: I,
    ) -> Result<Self, LexiconError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = category.into();
        let words: HashSet<Atom> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .map(|w| Atom::from(w.as_str()))
            .collect();
        if words.is_empty() {
            return Err(LexiconError::Empty(category));
        }
        Ok(Self {
            category,
            version: version.into(),
            words,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Exact lookup of an already-normalized word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&Atom::from(word))
    }

    /// Trim, lowercase, drop terminal punctuation, and prefer the singular
    /// form of a plural when the singular is listed.
    pub fn normalize(&self, raw: &str) -> String {
        let w = raw
            .trim()
            .to_lowercase()
            .trim_end_matches(TERMINAL_PUNCTUATION)
            .trim_end()
            .to_string();
        if w.ends_with('s') && w.chars().count() > 3 {
            let singular = &w[..w.len() - 1];
            if self.contains(singular) {
                return singular.to_string();
            }
        }
        w
    }

    pub fn is_member(&self, raw: &str) -> bool {
        let normalized = self.normalize(raw);
        !normalized.is_empty() && self.contains(&normalized)
    }
}
