//! Directory batch runs: one narration per `.txt` document.
//!
//! Documents are processed one after another. A document that fails is
//! recorded and the batch moves on; a document whose output already exists
//! is skipped, so an interrupted batch can simply be run again.

use std::path::{Path, PathBuf};

use crate::error::{NarrateError, Result};
use crate::narrator::Narrator;

/// Where to read documents from and where to write their audio.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Output container extension, e.g. `"mp3"`.
    pub extension: String,
    pub bgm: Option<PathBuf>,
}

impl BatchOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            extension: "mp3".to_string(),
            bgm: None,
        }
    }

    pub fn output_for(&self, document: &Path) -> PathBuf {
        let mut name = document
            .file_stem()
            .unwrap_or(document.as_os_str())
            .to_os_string();
        name.push(".");
        name.push(self.extension.trim_start_matches('.'));
        self.output_dir.join(name)
    }
}

/// Outcome of a batch. `failed` pairs each document with its error.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, NarrateError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }
}

/// `.txt` files directly inside `dir`, sorted by name.
pub async fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if is_text && entry.file_type().await?.is_file() {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

/// Narrate every document in `options.input_dir`.
///
/// Only problems with the directories themselves fail the call; per-document
/// errors end up in [`BatchReport::failed`].
pub async fn narrate_directory(
    narrator: &Narrator,
    options: &BatchOptions,
) -> Result<BatchReport> {
    if options.input_dir.as_os_str().is_empty() {
        return Err(NarrateError::MissingPath("input directory"));
    }
    if options.output_dir.as_os_str().is_empty() {
        return Err(NarrateError::MissingPath("output directory"));
    }
    let documents = list_documents(&options.input_dir).await?;
    tokio::fs::create_dir_all(&options.output_dir).await?;
    log::info!(
        "Batch: {} documents in {}",
        documents.len(),
        options.input_dir.display()
    );

    let mut report = BatchReport::default();
    for document in documents {
        let output = options.output_for(&document);
        if tokio::fs::try_exists(&output).await? {
            log::info!("Skipping {} (output exists)", document.display());
            report.skipped.push(document);
            continue;
        }

        match narrator
            .narrate_file(&document, &output, options.bgm.as_deref())
            .await
        {
            Ok(outcome) => {
                log::info!(
                    "Finished {} -> {}",
                    document.display(),
                    outcome.output.display()
                );
                report.succeeded.push(document);
            }
            Err(e) => {
                log::warn!("Failed {}: {e}", document.display());
                report.failed.push((document, e));
            }
        }
    }

    log::info!(
        "Batch finished: {} succeeded, {} skipped, {} failed",
        report.succeeded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{decode_tags, ScriptedEngine};
    use crate::NarratorConfig;

    fn narrator(engine: ScriptedEngine) -> Narrator {
        Narrator::new(Arc::new(engine), NarratorConfig::default()).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn wav_options(input: &Path, output: &Path) -> BatchOptions {
        BatchOptions {
            extension: "wav".to_string(),
            ..BatchOptions::new(input, output)
        }
    }

    #[tokio::test]
    async fn failing_document_does_not_stop_the_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "01-intro.txt", "Welcome.");
        let broken = write(input.path(), "02-empty.txt", "   \n\n");
        write(input.path(), "03-outro.txt", "Goodbye.");
        write(input.path(), "notes.md", "ignored");

        let report = narrate_directory(
            &narrator(ScriptedEngine::new()),
            &wav_options(input.path(), output.path()),
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken);
        assert!(matches!(report.failed[0].1, NarrateError::EmptyInput));

        let intro = std::fs::read(output.path().join("01-intro.wav")).unwrap();
        assert_eq!(decode_tags(&intro), "Welcome.");
        assert!(output.path().join("03-outro.wav").exists());
        assert!(!output.path().join("02-empty.wav").exists());
    }

    #[tokio::test]
    async fn synthesis_failure_is_recorded_per_document() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "a.txt", "Fine.");
        write(input.path(), "b.txt", "Boom.");

        let engine = ScriptedEngine::new().with_failure("Boom.");
        let report = narrate_directory(&narrator(engine), &wav_options(input.path(), output.path()))
            .await
            .unwrap();

        assert_eq!(report.succeeded, vec![input.path().join("a.txt")]);
        assert!(matches!(report.failed[0].1, NarrateError::Synthesis { .. }));
        assert_eq!(report.total(), 2);
    }

    #[tokio::test]
    async fn existing_outputs_are_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "done.txt", "Already.");
        write(input.path(), "todo.txt", "Pending.");
        std::fs::write(output.path().join("done.wav"), b"previous run").unwrap();

        let engine = Arc::new(ScriptedEngine::new());
        let narrator = Narrator::new(engine.clone(), NarratorConfig::default()).unwrap();
        let report = narrate_directory(&narrator, &wav_options(input.path(), output.path()))
            .await
            .unwrap();

        assert_eq!(report.skipped, vec![input.path().join("done.txt")]);
        assert_eq!(report.succeeded, vec![input.path().join("todo.txt")]);
        assert_eq!(engine.calls(), 1);
        assert_eq!(
            std::fs::read(output.path().join("done.wav")).unwrap(),
            b"previous run"
        );
    }

    #[tokio::test]
    async fn missing_input_directory_fails_the_batch() {
        let output = tempfile::tempdir().unwrap();
        let err = narrate_directory(
            &narrator(ScriptedEngine::new()),
            &wav_options(&output.path().join("nope"), output.path()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NarrateError::Io(_)));
    }

    #[tokio::test]
    async fn only_text_files_are_listed() {
        let input = tempfile::tempdir().unwrap();
        write(input.path(), "b.TXT", "Second.");
        write(input.path(), "a.txt", "First.");
        write(input.path(), "cover.png", "");
        std::fs::create_dir(input.path().join("drafts.txt")).unwrap();

        let documents = list_documents(input.path()).await.unwrap();
        assert_eq!(
            documents,
            vec![input.path().join("a.txt"), input.path().join("b.TXT")]
        );
    }

    #[test]
    fn output_path_uses_stem_and_extension() {
        let options = BatchOptions {
            extension: ".m4a".to_string(),
            ..BatchOptions::new("in", "out")
        };
        assert_eq!(
            options.output_for(Path::new("in/chapter.one.txt")),
            PathBuf::from("out/chapter.one.m4a")
        );
    }
}
