use contract_bill_builder::{BatchProcessor, BillingConfig, SourceFile};
use std::fs;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: batch_to_zip <workbook.json>...");
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());
        files.push(SourceFile::new(name, fs::read(path)?));
    }

    let config = match std::env::var("BILL_CONFIG") {
        Ok(path) => BillingConfig::from_json_file(Path::new(&path))?,
        Err(_) => BillingConfig::default(),
    }
    .with_env_overrides();

    let processor = BatchProcessor::new(config)?;
    let outcome = processor.run(&files)?;

    for bill in &outcome.outputs {
        println!("✅ {} ({} files)", bill.source_name, bill.len());
    }
    for failure in &outcome.failures {
        println!("❌ {}: {}", failure.name, failure.error);
    }

    if !outcome.has_outputs() {
        anyhow::bail!("no file could be processed");
    }

    let archive = outcome.archive_name();
    fs::write(&archive, outcome.to_zip_bytes()?)?;
    println!("\n📦 Wrote {}", archive);
    Ok(())
}
