use anyhow::Result;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use regex::Regex;
use serde::Deserialize;
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::Path,
};
use tracing::warn;

#[derive(Debug, Deserialize)]
struct QuestionEntry {
    regex: String,
    responses: Vec<String>,
}

/// Canned dota answers for `ask`, picked by the first pattern a question
/// matches.
#[derive(Debug, Default)]
pub struct Questions {
    entries: Vec<(Regex, Vec<String>)>,
}

impl Questions {
    /// A missing file means `ask` never answers.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("No se cargaron preguntas de {}: {}", path.display(), e);
                return Ok(Self::default());
            }
        };

        let entries: Vec<QuestionEntry> = serde_json::from_str(&raw)?;
        let entries = entries
            .into_iter()
            .filter(|entry| !entry.responses.is_empty())
            .map(|entry| -> Result<(Regex, Vec<String>)> { Ok((Regex::new(&entry.regex)?, entry.responses)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the dota response answering `question`. Asking the same thing
    /// twice gets the same answer.
    pub fn answer(&self, question: &str) -> Option<&str> {
        let mut hasher = DefaultHasher::new();
        question.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        self.entries
            .iter()
            .find(|(pattern, _)| pattern.is_match(question))
            .and_then(|(_, responses)| responses.choose(&mut rng))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn questions(dir: &Path) -> Questions {
        let file = dir.join("questions.json");
        std::fs::write(
            &file,
            r#"[
                {"regex": "(?i)^(is|are|will|can|do|does) ", "responses": ["axe_yes_01", "axe_no_01", "axe_maybe_01"]},
                {"regex": "(?i)^why", "responses": ["lina_because_01"]},
                {"regex": "never", "responses": []}
            ]"#,
        )
        .unwrap();
        Questions::load(&file).unwrap()
    }

    #[test]
    fn test_first_matching_pattern_answers() {
        let dir = tempfile::tempdir().unwrap();
        let questions = questions(dir.path());

        assert_eq!(questions.len(), 2);
        assert_eq!(questions.answer("Why is the sky blue?"), Some("lina_because_01"));

        let answer = questions.answer("Will it rain today?").unwrap();
        assert!(["axe_yes_01", "axe_no_01", "axe_maybe_01"].contains(&answer));
    }

    #[test]
    fn test_same_question_same_answer() {
        let dir = tempfile::tempdir().unwrap();
        let questions = questions(dir.path());

        let first = questions.answer("is mango a fruit?");
        for _ in 0..10 {
            assert_eq!(questions.answer("is mango a fruit?"), first);
        }
    }

    #[test]
    fn test_unmatched_questions() {
        let dir = tempfile::tempdir().unwrap();
        let questions = questions(dir.path());

        assert_eq!(questions.answer("hello there"), None);
        assert_eq!(questions.answer(""), None);
    }

    #[test]
    fn test_missing_file() {
        let questions = Questions::load(Path::new("/nonexistent/questions.json")).unwrap();
        assert!(questions.is_empty());
        assert_eq!(questions.answer("is this thing on?"), None);
    }
}
