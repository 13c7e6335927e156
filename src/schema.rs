use crate::config::CertificateDetails;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Header fields read from the Title sheet. Fields the sheet does not mention stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleInfo {
    #[schemars(description = "Agreement number of the contract")]
    pub agreement_no: String,

    #[schemars(description = "Name of the work as written on the agreement")]
    pub name_of_work: String,

    #[schemars(description = "Name of the contracting firm")]
    pub name_of_firm: String,

    #[schemars(description = "Date of commencement, dd/mm/yyyy when recognisable")]
    pub date_commencement: String,

    #[schemars(description = "Stipulated date of completion, dd/mm/yyyy when recognisable")]
    pub date_completion: String,

    #[schemars(description = "Actual date of completion; defaults to the stipulated date")]
    pub actual_completion: String,

    #[schemars(description = "Date of measurement, dd/mm/yyyy when recognisable")]
    pub measurement_date: String,
}

/// One row of the Work Order, Bill Quantity or Extra Items sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LineItem {
    #[schemars(description = "Serial number; blank for continuation rows")]
    pub serial_no: String,
    pub description: String,
    pub unit: String,
    pub quantity: f64,
    #[schemars(description = "Rate in rupees per unit")]
    pub rate: f64,
    pub amount: f64,
    pub remark: String,
    #[serde(default)]
    #[schemars(description = "True when the sheet carried no amount and it was computed as quantity x rate")]
    pub amount_derived: bool,
}

/// Extracted items of one sheet plus the sum of their amounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemSheet {
    pub items: Vec<LineItem>,
    pub total: f64,
}

impl ItemSheet {
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let total = items.iter().map(|item| item.amount).sum();
        Self { items, total }
    }
}

/// Everything the extractor pulls out of one workbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedBill {
    pub title: TitleInfo,
    pub work_order: ItemSheet,
    pub bill_quantity: ItemSheet,
    pub extra_items: ItemSheet,
}

/// A work-order line joined with the bill line carrying the same serial number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergedItem {
    pub serial_no: String,
    pub description: String,
    pub unit: String,
    pub quantity_wo: f64,
    #[schemars(description = "Work-order rate, used for both sides of the comparison")]
    pub rate: f64,
    pub amount_wo: f64,
    pub quantity_bill: f64,
    pub amount_bill: f64,
    pub remark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeviationItem {
    pub serial_no: String,
    pub description: String,
    pub unit: String,
    pub qty_wo: f64,
    pub rate: f64,
    pub amt_wo: f64,
    pub qty_bill: f64,
    pub amt_bill: f64,
    pub excess_qty: f64,
    pub excess_amt: f64,
    pub saving_qty: f64,
    pub saving_amt: f64,
    pub remark: String,
}

/// The levy and deduction cascade, in computation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialSummary {
    pub bill_total: f64,
    pub bill_premium: f64,
    pub bill_grand_total: f64,
    pub extra_items_base: f64,
    pub extra_premium: f64,
    pub extra_items_sum: f64,
    pub grand_total: f64,
    #[schemars(description = "Security deposit")]
    pub sd_amount: f64,
    #[schemars(description = "Income tax")]
    pub it_amount: f64,
    #[schemars(description = "GST, rounded up to the next even rupee")]
    pub gst_amount: f64,
    #[schemars(description = "Labour cess")]
    pub lc_amount: f64,
    pub total_deductions: f64,
    pub net_payable: f64,
}

/// Statement totals: F = work order, H = executed, J = excess, L = saving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeviationSummary {
    pub work_order_total: f64,
    pub executed_total: f64,
    pub overall_excess: f64,
    pub overall_saving: f64,
    pub tender_premium_f: f64,
    pub grand_total_f: f64,
    pub tender_premium_h: f64,
    pub grand_total_h: f64,
    pub tender_premium_j: f64,
    pub grand_total_j: f64,
    pub tender_premium_l: f64,
    pub grand_total_l: f64,
    #[schemars(description = "grand_total_h - grand_total_f; positive means overall excess")]
    pub net_difference: f64,
}

/// The fully computed bill. Every report view is derived from this one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportData {
    pub title: TitleInfo,
    pub bill_items: Vec<MergedItem>,
    pub deviation_items: Vec<DeviationItem>,
    pub extra_items: Vec<LineItem>,
    #[schemars(description = "Sum of all work-order amounts")]
    pub work_order_amount: f64,
    #[schemars(description = "Tender premium applied to bill and extra items, as a fraction")]
    pub premium_rate: f64,
    pub summary: FinancialSummary,
    pub deviation_summary: DeviationSummary,
    #[schemars(description = "grand_total as a percentage of the work order amount")]
    pub completion_percent: f64,
    #[schemars(description = "extra_items_sum as a percentage of the work order amount")]
    pub extra_items_percent: f64,
    pub notes: Vec<String>,
    #[schemars(description = "net_payable in words; paise are not spelled out")]
    pub payable_words: String,
    #[schemars(description = "Amount paid on previous bills; zero for a first and final bill")]
    pub last_bill_amount: f64,
    pub certificate: CertificateDetails,
}

impl ReportData {
    pub fn has_extra_items(&self) -> bool {
        !self.extra_items.is_empty()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportData)
    }

    /// JSON schema of the data handed to templates.
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
