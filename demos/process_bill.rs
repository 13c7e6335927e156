use contract_bill_builder::{
    format_indian_amount, process_with_verification, BillingConfig, OutputPackager,
    PrintHtmlProducer, TeraRenderer, Workbook, DEFAULT_TOLERANCE,
};
use std::fs;
use std::path::PathBuf;

const SAMPLE_WORKBOOK: &str = r#"{
    "Title": [
        ["Agreement No.", "48/2023-24"],
        ["Name of Work", "Repair of Udaipur - Salumber road"],
        ["Name of Contractor", "M/s ABC Builders"],
        ["Date of Commencement", "2024-01-15"],
        ["Date of Completion", "2024-06-15"],
        ["Date of Measurement", "2024-06-20"]
    ],
    "Work Order": [
        ["Serial No.", "Description", "Unit", "Quantity", "Rate", "Amount", "Remark"],
        [1, "Earthwork in excavation", "cum", 250, 180, 45000, ""],
        [2, "Cement concrete 1:2:4", "cum", 40, 5200, 208000, ""],
        [3, "Brick masonry in CM 1:6", "cum", 30, 4100, 123000, ""]
    ],
    "Bill Quantity": [
        ["Serial No.", "Description", "Unit", "Quantity", "Rate", "Amount"],
        [1, "Earthwork in excavation", "cum", 262.5, 180, 0],
        [2, "Cement concrete 1:2:4", "cum", 38, 5200, 197600],
        [3, "Brick masonry in CM 1:6", "cum", 30, 4100, 123000]
    ],
    "Extra Items": [
        ["Serial No.", "Description", "Unit", "Quantity", "Rate", "Amount", "Remark"],
        ["E1", "Dewatering with diesel pump", "hour", 24, 350, 8400, ""]
    ]
}"#;

fn main() -> anyhow::Result<()> {
    let input = std::env::args().nth(1);
    let json = match &input {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE_WORKBOOK.to_string(),
    };

    let workbook = Workbook::from_json_str(&json)?;
    let config = BillingConfig::default().with_env_overrides();
    let data = process_with_verification(&workbook, &config, DEFAULT_TOLERANCE)?;

    println!("📄 Agreement {} - {}", data.title.agreement_no, data.title.name_of_work);
    println!("   Bill total:        {:>14}", format_indian_amount(data.summary.bill_total));
    println!("   Extra items:       {:>14}", format_indian_amount(data.summary.extra_items_sum));
    println!("   Grand total:       {:>14}", format_indian_amount(data.summary.grand_total));
    println!("   Total deductions:  {:>14}", format_indian_amount(data.summary.total_deductions));
    println!("   Net payable:       {:>14}", format_indian_amount(data.summary.net_payable));
    println!("   {}", data.payable_words);
    println!(
        "   Deviation (H - F): {:>14}",
        format_indian_amount(data.deviation_summary.net_difference)
    );

    for note in &data.notes {
        println!("   - {}", note);
    }

    let renderer = TeraRenderer::new()?;
    let producer = PrintHtmlProducer;
    let source_name = input.as_deref().unwrap_or("sample.json");
    let artifacts = OutputPackager::new(&renderer, &producer).package(
        source_name,
        &data,
        chrono::Local::now().naive_local(),
    )?;

    let out_dir = PathBuf::from("bill_output");
    fs::create_dir_all(&out_dir)?;
    for (name, bytes) in &artifacts.files {
        fs::write(out_dir.join(name), bytes)?;
    }

    println!("\n✅ Wrote {} files to {}", artifacts.len(), out_dir.display());
    Ok(())
}
