use crate::config::{BatchLimits, BillingConfig};
use crate::error::{BillError, Result};
use crate::package::{archive_name, master_archive, BillArtifacts, OutputPackager};
use crate::render::{DocumentProducer, PrintHtmlProducer, Renderer, TeraRenderer};
use crate::workbook::{JsonWorkbookParser, WorkbookParser};
use crate::{BillProcessor, DEFAULT_TOLERANCE};
use chrono::{Local, NaiveDateTime};
use log::{info, warn};

/// One uploaded input file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub error: BillError,
}

/// Result of a batch: the bills that made it and, separately, the ones that did not.
#[derive(Debug)]
pub struct BatchOutcome {
    pub outputs: Vec<BillArtifacts>,
    pub failures: Vec<FileFailure>,
    pub generated_at: NaiveDateTime,
}

impl BatchOutcome {
    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }

    pub fn archive_name(&self) -> String {
        archive_name(self.generated_at)
    }

    /// Master zip over the successful bills only.
    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        master_archive(&self.outputs)
    }
}

/// Gates checked before any file is processed: at least one file, no more than
/// `max_files`, and none larger than `max_file_bytes`.
pub fn admit(files: &[SourceFile], limits: &BatchLimits) -> Result<()> {
    if files.is_empty() {
        return Err(BillError::EmptyInput("no files to process".to_string()));
    }

    if files.len() > limits.max_files {
        return Err(BillError::Admission(format!(
            "{} files submitted, at most {} can be processed together",
            files.len(),
            limits.max_files
        )));
    }

    if let Some(file) = files
        .iter()
        .find(|file| file.bytes.len() as u64 > limits.max_file_bytes)
    {
        return Err(BillError::Admission(format!(
            "{} is {} bytes, the limit is {} bytes",
            file.name,
            file.bytes.len(),
            limits.max_file_bytes
        )));
    }

    Ok(())
}

/// Runs every admitted file through parse, extraction, reconciliation, audit
/// and packaging. A failing file is recorded and skipped; it never stops the batch.
pub struct BatchProcessor {
    config: BillingConfig,
    parser: Box<dyn WorkbookParser>,
    renderer: Box<dyn Renderer>,
    producer: Box<dyn DocumentProducer>,
}

impl BatchProcessor {
    /// JSON workbooks, embedded Tera templates and print-ready HTML.
    pub fn new(config: BillingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parser: Box::new(JsonWorkbookParser),
            renderer: Box::new(TeraRenderer::new()?),
            producer: Box::new(PrintHtmlProducer),
        })
    }

    pub fn with_parser(mut self, parser: Box<dyn WorkbookParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_producer(mut self, producer: Box<dyn DocumentProducer>) -> Self {
        self.producer = producer;
        self
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn run(&self, files: &[SourceFile]) -> Result<BatchOutcome> {
        self.run_at(files, Local::now().naive_local())
    }

    /// Like [`run`](Self::run) with a fixed generation timestamp.
    pub fn run_at(&self, files: &[SourceFile], generated_at: NaiveDateTime) -> Result<BatchOutcome> {
        admit(files, &self.config.limits)?;

        let mut outcome = BatchOutcome {
            outputs: Vec::new(),
            failures: Vec::new(),
            generated_at,
        };

        for (idx, file) in files.iter().enumerate() {
            info!("Processing {} ({}/{})", file.name, idx + 1, files.len());

            match self.process_file(file, generated_at) {
                Ok(artifacts) => outcome.outputs.push(artifacts),
                Err(error) => {
                    warn!("Skipping {}: {}", file.name, error);
                    outcome.failures.push(FileFailure {
                        name: file.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Batch finished: {} processed, {} failed",
            outcome.outputs.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    pub fn process_file(&self, file: &SourceFile, generated_at: NaiveDateTime) -> Result<BillArtifacts> {
        let workbook = self.parser.parse(&file.name, &file.bytes)?;
        let data = BillProcessor::process_with_verification(&workbook, &self.config, DEFAULT_TOLERANCE)?;

        OutputPackager::new(self.renderer.as_ref(), self.producer.as_ref())
            .package(&file.name, &data, generated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_of_size(name: &str, size: usize) -> SourceFile {
        SourceFile::new(name, vec![b' '; size])
    }

    #[test]
    fn test_admit_rejects_empty_batch() {
        let err = admit(&[], &BatchLimits::default()).unwrap_err();
        assert!(matches!(err, BillError::EmptyInput(_)));
    }

    #[test]
    fn test_admit_rejects_too_many_files() {
        let files: Vec<SourceFile> = (0..11).map(|i| file_of_size(&format!("{}.json", i), 1)).collect();
        let err = admit(&files, &BatchLimits::default()).unwrap_err();
        assert!(matches!(err, BillError::Admission(_)));
        assert!(admit(&files[..10], &BatchLimits::default()).is_ok());
    }

    #[test]
    fn test_admit_rejects_oversized_file() {
        let limits = BatchLimits {
            max_files: 10,
            max_file_bytes: 16,
        };
        let files = vec![file_of_size("small.json", 16), file_of_size("large.json", 17)];
        let err = admit(&files, &limits).unwrap_err();
        assert!(err.to_string().contains("large.json"));
    }

    #[test]
    fn test_unparseable_file_is_recorded_not_fatal() {
        let processor = BatchProcessor::new(BillingConfig::default()).unwrap();
        let outcome = processor
            .run(&[SourceFile::new("broken.json", b"{not json".to_vec())])
            .unwrap();

        assert!(!outcome.has_outputs());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].name, "broken.json");
        assert!(outcome.failures[0].error.is_validation());
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let mut config = BillingConfig::default();
        config.premium_rate = -0.5;
        assert!(matches!(
            BatchProcessor::new(config),
            Err(BillError::InvalidRate { .. })
        ));
    }
}
