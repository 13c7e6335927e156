//! # Contract Bill Builder
//!
//! A library for turning a contractor's billing workbook into the statutory
//! document set of a works bill: first page, deviation statement, note sheet,
//! certificates II and III, and an extra-items report when there are extra items.
//!
//! ## Core Concepts
//!
//! - **Work Order**: the contractual scope, one line per item with quantity and rate
//! - **Bill Quantity**: what was actually executed, keyed by the same serial numbers
//! - **Extra Items**: work outside the order; it has no baseline and counts entirely as excess
//! - **Reconciliation**: Work Order is left-joined with Bill Quantity, each line is split into
//!   excess or saving, then premium and statutory deductions are applied to the grand total
//! - **Consistency**: every report is a view of one [`ReportData`], and
//!   [`verify_report_consistency`] re-derives its totals from the item lists
//!
//! ## Example
//!
//! ```rust,ignore
//! use contract_bill_builder::*;
//!
//! let workbook = Workbook::from_json_str(r#"{
//!     "Title": [["Agreement No", "48/2023-24"], ["Name of Work", "Road repair"]],
//!     "Work Order": [[1, "Earthwork", "cum", 10, 5, 50]],
//!     "Bill Quantity": [[1, "Earthwork", "cum", 12, 5, 0]]
//! }"#)?;
//!
//! let config = BillingConfig::default();
//! let data = process_bill(&workbook, &config)?;
//! assert_eq!(data.deviation_items[0].excess_qty, 2.0);
//!
//! let renderer = TeraRenderer::new()?;
//! let producer = PrintHtmlProducer;
//! let artifacts = OutputPackager::new(&renderer, &producer)
//!     .package("bill.json", &data, chrono::Local::now().naive_local())?;
//! ```

pub mod audit;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod package;
pub mod render;
pub mod reports;
pub mod schema;
pub mod utils;
pub mod workbook;

pub use audit::{verify_report_consistency, ConsistencyAuditor};
pub use batch::{admit, BatchOutcome, BatchProcessor, FileFailure, SourceFile};
pub use config::{BatchLimits, BillingConfig, CertificateDetails, DeductionRates};
pub use engine::{
    deviation_for, deviation_items, extra_items_as_deviation, merge_items, reconcile, Reconciler,
};
pub use error::{BillError, Result};
pub use ingestion::*;
pub use package::{
    archive_name, master_archive, mime_type, nested_entry_names, source_stem, summary_text,
    unzip_entries, zip_entries, BillArtifacts, OutputPackager,
};
pub use render::{
    fallback_markup, render_with_fallback, DocumentProducer, PrintHtmlProducer, Renderer,
    TeraRenderer,
};
pub use reports::{
    assemble_view, assemble_views, LayoutHint, Orientation, ReportKind, ReportView, ViewHeader,
};
pub use schema::*;
pub use utils::*;
pub use workbook::{Cell, JsonWorkbookParser, Sheet, SheetRow, Workbook, WorkbookParser};

use log::{debug, info};

/// Absolute tolerance, in rupees, used when auditing computed totals.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

pub struct BillProcessor;

impl BillProcessor {
    pub fn process(workbook: &Workbook, config: &BillingConfig) -> Result<ReportData> {
        config.validate()?;

        let bill = extract_bill(workbook)?;

        info!(
            "Processing bill for agreement '{}' ({})",
            bill.title.agreement_no, bill.title.name_of_firm
        );
        debug!(
            "Work order total {:.2}, bill quantity total {:.2}, extra items total {:.2}",
            bill.work_order.total, bill.bill_quantity.total, bill.extra_items.total
        );

        let derived = bill
            .work_order
            .items
            .iter()
            .chain(&bill.bill_quantity.items)
            .chain(&bill.extra_items.items)
            .filter(|item| item.amount_derived)
            .count();
        if derived > 0 {
            debug!("{} line amounts were computed from quantity x rate", derived);
        }

        Ok(reconcile(&bill, config))
    }

    pub fn process_with_verification(
        workbook: &Workbook,
        config: &BillingConfig,
        tolerance: f64,
    ) -> Result<ReportData> {
        let data = Self::process(workbook, config)?;

        verify_report_consistency(&data, tolerance)?;

        Ok(data)
    }
}

pub fn process_bill(workbook: &Workbook, config: &BillingConfig) -> Result<ReportData> {
    BillProcessor::process(workbook, config)
}

pub fn process_with_verification(
    workbook: &Workbook,
    config: &BillingConfig,
    tolerance: f64,
) -> Result<ReportData> {
    BillProcessor::process_with_verification(workbook, config, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: Vec<Cell>) -> SheetRow {
        SheetRow::new(cells)
    }

    fn item(serial: f64, description: &str, qty: f64, rate: f64, amount: f64) -> SheetRow {
        row(vec![
            Cell::Number(serial),
            Cell::from(description),
            Cell::from("cum"),
            Cell::Number(qty),
            Cell::Number(rate),
            Cell::Number(amount),
        ])
    }

    fn sample_workbook() -> Workbook {
        Workbook::new()
            .with_sheet(
                TITLE_SHEET,
                vec![
                    row(vec![Cell::from("Agreement No."), Cell::from("48/2023-24")]),
                    row(vec![Cell::from("Name of Work"), Cell::from("Road repair")]),
                    row(vec![Cell::from("Name of Firm"), Cell::from("ABC Builders")]),
                ],
            )
            .with_sheet(
                WORK_ORDER_SHEET,
                vec![
                    row(vec![Cell::from("Serial No."), Cell::from("Description")]),
                    item(1.0, "Earthwork", 10.0, 5.0, 50.0),
                    item(2.0, "Concrete", 4.0, 100.0, 400.0),
                ],
            )
            .with_sheet(
                BILL_QUANTITY_SHEET,
                vec![
                    item(1.0, "Earthwork", 12.0, 5.0, 0.0),
                    item(2.0, "Concrete", 3.0, 100.0, 300.0),
                ],
            )
    }

    #[test]
    fn test_end_to_end_processing() {
        let config = BillingConfig::default();
        let data = process_bill(&sample_workbook(), &config).unwrap();

        assert_eq!(data.title.agreement_no, "48/2023-24");
        assert_eq!(data.bill_items.len(), 2);
        assert_eq!(data.bill_items[0].amount_bill, 60.0);
        assert_eq!(data.summary.bill_total, 360.0);
        assert_eq!(data.work_order_amount, 450.0);
        assert!(!data.has_extra_items());
        assert_eq!(data.notes.len(), 6);

        assert!(verify_report_consistency(&data, DEFAULT_TOLERANCE).is_ok());
    }

    #[test]
    fn test_process_with_verification() {
        let config = BillingConfig::default();
        let result = process_with_verification(&sample_workbook(), &config, DEFAULT_TOLERANCE);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_before_extraction() {
        let mut config = BillingConfig::default();
        config.deductions.income_tax = 1.5;

        let err = process_bill(&Workbook::new(), &config).unwrap_err();
        assert!(matches!(err, BillError::InvalidRate { .. }));
    }

    #[test]
    fn test_custom_premium_rate() {
        let mut config = BillingConfig::default();
        config.premium_rate = 0.10;

        let data = process_bill(&sample_workbook(), &config).unwrap();
        assert!((data.summary.bill_premium - 36.0).abs() < 1e-9);
        assert!((data.summary.grand_total - 396.0).abs() < 1e-9);
    }
}
