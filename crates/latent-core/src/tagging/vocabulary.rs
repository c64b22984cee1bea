//! Candidate label vocabulary for zero-shot tagging.
//!
//! Labels come either inline from configuration or from a plain text file
//! with one label per line. Order is preserved because it breaks ties when
//! ranking.

use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::error::PipelineError;

/// An ordered, duplicate-free list of candidate labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from labels, trimming whitespace and dropping blanks
    /// and repeats (first occurrence wins).
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let labels = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty() && seen.insert(l.clone()))
            .collect();
        Self { labels }
    }

    /// Load a vocabulary file.
    ///
    /// One label per line; blank lines and lines starting with `#` are skipped.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::ModelLoad {
            message: format!("Failed to read vocabulary {:?}: {}", path, e),
        })?;

        let vocabulary = Self::from_labels(
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#')),
        );

        tracing::info!(
            "Loaded vocabulary: {} labels from {:?}",
            vocabulary.len(),
            path
        );
        Ok(vocabulary)
    }

    /// Resolve the vocabulary configured for a run.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let vocabulary = match config.vocabulary_file() {
            Some(path) => Self::load(&path)?,
            None => Self::from_labels(&config.tagging.labels),
        };

        if vocabulary.is_empty() {
            return Err(PipelineError::ModelLoad {
                message: "Tag vocabulary is empty".to_string(),
            });
        }
        Ok(vocabulary)
    }

    /// All labels in vocabulary order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Render the encoder prompt for every label.
    pub fn prompts(&self, template: &str) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| template.replace("{label}", label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_labels_dedups_and_trims() {
        let vocab = Vocabulary::from_labels(["render", " diagram ", "", "render"]);
        assert_eq!(vocab.labels(), &["render", "diagram"]);
    }

    #[test]
    fn test_load_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(
            &path,
            "# studio tags\nurbanism\n\n  # indented comment\necology\n",
        )
        .unwrap();

        let vocab = Vocabulary::load(&path).unwrap();
        assert_eq!(vocab.labels(), &["urbanism", "ecology"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Vocabulary::load(Path::new("/nonexistent/labels.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad { .. }));
    }

    #[test]
    fn test_from_config_defaults() {
        let vocab = Vocabulary::from_config(&Config::default()).unwrap();
        assert_eq!(vocab.len(), 10);
        assert_eq!(vocab.labels()[0], "parametric");
    }

    #[test]
    fn test_from_config_rejects_empty() {
        let mut config = Config::default();
        config.tagging.labels.clear();
        assert!(Vocabulary::from_config(&config).is_err());
    }

    #[test]
    fn test_prompts_apply_template() {
        let vocab = Vocabulary::from_labels(["dog", "city"]);
        assert_eq!(
            vocab.prompts("a photo of a {label}"),
            vec!["a photo of a dog", "a photo of a city"]
        );
    }
}
