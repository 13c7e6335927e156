use crate::error::{BillError, Result};
use crate::render::{fallback_markup, render_with_fallback, DocumentProducer, Renderer};
use crate::reports::{assemble_views, ReportKind};
use crate::schema::ReportData;
use crate::utils::format_indian_amount;
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const COMBINED_NAME: &str = "combined";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const SUMMARY_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const SOURCE_EXTENSIONS: [&str; 4] = [".xlsx", ".xlsm", ".xls", ".json"];

/// All files produced for one input, keyed by file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillArtifacts {
    pub source_name: String,
    pub files: BTreeMap<String, Vec<u8>>,
}

impl BillArtifacts {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|bytes| bytes.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.keys().map(|name| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Name of this bill's archive inside the master zip: `<stem>_reports.zip`.
    pub fn archive_entry_name(&self) -> String {
        format!("{}_reports.zip", source_stem(&self.source_name))
    }

    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        zip_entries(self.files.iter().map(|(name, bytes)| (name.as_str(), bytes.as_slice())))
    }
}

/// Turns one [`ReportData`] into its artifact set: one document and one HTML
/// mirror per report, the combined document and `summary.txt`.
pub struct OutputPackager<'a> {
    renderer: &'a dyn Renderer,
    producer: &'a dyn DocumentProducer,
}

impl<'a> OutputPackager<'a> {
    pub fn new(renderer: &'a dyn Renderer, producer: &'a dyn DocumentProducer) -> Self {
        Self { renderer, producer }
    }

    pub fn package(
        &self,
        source_name: &str,
        data: &ReportData,
        generated_at: NaiveDateTime,
    ) -> Result<BillArtifacts> {
        let mut artifacts = BillArtifacts::new(source_name);
        let extension = self.producer.extension();
        let mut documents = Vec::new();
        let mut kinds = Vec::new();

        for view in assemble_views(data) {
            let kind = view.kind();
            let markup = render_with_fallback(self.renderer, &view);

            let document = match self.producer.produce(&markup, kind.layout()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Producing {} failed, retrying with fallback markup: {}", kind, e);
                    self.producer
                        .produce(&fallback_markup(&view), kind.layout())
                        .map_err(|e| BillError::Document {
                            document: kind.template_id().to_string(),
                            reason: e.to_string(),
                        })?
                }
            };

            artifacts.insert(format!("{}.{}", kind.template_id(), extension), document.clone());
            artifacts.insert(format!("{}.html", kind.template_id()), markup.into_bytes());
            documents.push(document);
            kinds.push(kind);
        }

        let combined = match self.producer.combine(&documents) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Combining documents for {} failed, using the first document: {}", source_name, e);
                documents.first().cloned().ok_or_else(|| {
                    BillError::Packaging(format!("no documents produced for {}", source_name))
                })?
            }
        };
        artifacts.insert(format!("{}.{}", COMBINED_NAME, extension), combined);
        artifacts.insert(SUMMARY_FILE, summary_text(data, &kinds, generated_at).into_bytes());

        debug!("Packaged {} artifacts for {}", artifacts.len(), source_name);
        Ok(artifacts)
    }
}

pub fn summary_text(data: &ReportData, kinds: &[ReportKind], generated_at: NaiveDateTime) -> String {
    let mut text = String::new();
    text.push_str("BILL PROCESSING SUMMARY\n");
    text.push_str(&format!(
        "Generated on: {}\n\n",
        generated_at.format(SUMMARY_TIMESTAMP_FORMAT)
    ));

    text.push_str(&format!("Agreement No: {}\n", data.title.agreement_no));
    text.push_str(&format!("Name of Work: {}\n", data.title.name_of_work));
    text.push_str(&format!("Name of Firm: {}\n\n", data.title.name_of_firm));

    text.push_str("Reports Generated:\n");
    for kind in kinds {
        text.push_str(&format!("- {}\n", kind.document_title()));
    }

    let summary = &data.summary;
    text.push_str("\nTotals:\n");
    text.push_str(&format!("Grand Total: {}\n", format_indian_amount(summary.grand_total)));
    text.push_str(&format!(
        "Total Deductions: {}\n",
        format_indian_amount(summary.total_deductions)
    ));
    text.push_str(&format!("Net Payable: {}\n", format_indian_amount(summary.net_payable)));
    text.push_str(&format!("{}\n", data.payable_words));

    text
}

/// Input file name without directories and without its spreadsheet or JSON extension.
pub fn source_stem(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let lower = base.to_ascii_lowercase();
    for ext in SOURCE_EXTENSIONS {
        if lower.ends_with(ext) {
            return &base[..base.len() - ext.len()];
        }
    }
    base
}

pub fn archive_name(generated_at: NaiveDateTime) -> String {
    format!("bill_reports_{}.zip", generated_at.format(ARCHIVE_TIMESTAMP_FORMAT))
}

pub fn mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Writes `(name, bytes)` pairs into an in-memory deflated zip.
pub fn zip_entries<'e, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'e str, &'e [u8])>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Entry names for the nested archives, in input order. Bills sharing a stem
/// get `_2`, `_3`, ... so no two entries collide.
pub fn nested_entry_names(bills: &[BillArtifacts]) -> Vec<String> {
    let mut taken = HashSet::new();
    bills
        .iter()
        .map(|bill| {
            let stem = source_stem(&bill.source_name);
            let mut name = bill.archive_entry_name();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}_{}_reports.zip", stem, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// One zip holding a nested `<stem>_reports.zip` per bill.
pub fn master_archive(bills: &[BillArtifacts]) -> Result<Vec<u8>> {
    let mut nested = Vec::with_capacity(bills.len());
    for (bill, name) in bills.iter().zip(nested_entry_names(bills)) {
        nested.push((name, bill.to_zip_bytes()?));
    }
    zip_entries(nested.iter().map(|(name, bytes)| (name.as_str(), bytes.as_slice())))
}

/// Reads a zip produced by [`zip_entries`] back into name → bytes.
pub fn unzip_entries(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = BTreeMap::new();

    for idx in 0..archive.len() {
        let mut file = archive.by_index(idx)?;
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        entries.insert(file.name().to_string(), content);
    }

    Ok(entries)
}
