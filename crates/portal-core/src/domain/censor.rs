//! Masking of banned words in published text.

/// Replaces every banned word with as many `*` as it has characters. A word
/// is matched as written in the list and with its first letter capitalized,
/// anywhere in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Censor {
    words: Vec<String>,
}

impl Censor {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        // Longer words first so a banned word containing another is masked whole.
        words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        words.dedup();
        Self { words }
    }

    /// Parse a comma separated list such as `CENSORED_WORDS=foo,bar`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for word in &self.words {
            let stars = "*".repeat(word.chars().count());
            result = result.replace(word.as_str(), &stars);
            let capitalized = capitalize(word);
            if capitalized != *word {
                result = result.replace(capitalized.as_str(), &stars);
            }
        }
        result
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_lowercase_and_capitalized_forms() {
        let censor = Censor::from_list("darn, heck");
        assert_eq!(
            censor.apply("Darn it, what the heck. HECK."),
            "**** it, what the ****. HECK."
        );
    }

    #[test]
    fn star_count_follows_characters_not_bytes() {
        let censor = Censor::new(["ёлки"]);
        assert_eq!(censor.apply("Ёлки-палки"), "****-палки");
    }

    #[test]
    fn empty_list_leaves_text_alone() {
        let censor = Censor::from_list(" , ");
        assert!(censor.is_empty());
        assert_eq!(censor.apply("anything goes"), "anything goes");
    }
}
