//! Report Assembler: maps one [`ReportData`] onto the payload each document
//! template consumes. Nothing here computes money; views only select and
//! relabel figures the engine already produced.

use crate::config::CertificateDetails;
use crate::engine::extra_items_as_deviation;
use crate::schema::{
    DeviationItem, DeviationSummary, FinancialSummary, LineItem, MergedItem, ReportData, TitleInfo,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    FirstPage,
    DeviationStatement,
    NoteSheet,
    CertificateIi,
    CertificateIii,
    ExtraItems,
}

impl ReportKind {
    /// Every kind in packaging order; the combined document follows this order.
    pub const ALL: [ReportKind; 6] = [
        ReportKind::FirstPage,
        ReportKind::DeviationStatement,
        ReportKind::NoteSheet,
        ReportKind::CertificateIi,
        ReportKind::CertificateIii,
        ReportKind::ExtraItems,
    ];

    pub fn template_id(&self) -> &'static str {
        match self {
            ReportKind::FirstPage => "first_page",
            ReportKind::DeviationStatement => "deviation_statement",
            ReportKind::NoteSheet => "note_sheet",
            ReportKind::CertificateIi => "certificate_ii",
            ReportKind::CertificateIii => "certificate_iii",
            ReportKind::ExtraItems => "extra_items",
        }
    }

    pub fn document_title(&self) -> &'static str {
        match self {
            ReportKind::FirstPage => "CONTRACTOR BILL",
            ReportKind::DeviationStatement => "DEVIATION STATEMENT",
            ReportKind::NoteSheet => "FINAL BILL SCRUTINY SHEET",
            ReportKind::CertificateIi => "CERTIFICATE II - CERTIFICATE AND SIGNATURES",
            ReportKind::CertificateIii => "CERTIFICATE III - MEMORANDUM OF PAYMENTS",
            ReportKind::ExtraItems => "EXTRA ITEMS REPORT",
        }
    }

    pub fn layout(&self) -> LayoutHint {
        match self {
            ReportKind::DeviationStatement => LayoutHint::landscape(),
            _ => LayoutHint::portrait(),
        }
    }

    /// Only the extra-items report depends on the input having extra items.
    pub fn is_conditional(&self) -> bool {
        matches!(self, ReportKind::ExtraItems)
    }

    pub fn from_template_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.template_id() == id)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Page setup handed to the document producer. Paper is always A4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LayoutHint {
    pub orientation: Orientation,
    pub margin_mm: f64,
}

impl LayoutHint {
    pub const MARGIN_MM: f64 = 10.0;

    pub fn portrait() -> Self {
        Self {
            orientation: Orientation::Portrait,
            margin_mm: Self::MARGIN_MM,
        }
    }

    pub fn landscape() -> Self {
        Self {
            orientation: Orientation::Landscape,
            margin_mm: Self::MARGIN_MM,
        }
    }
}

/// Heading block shared by every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewHeader {
    pub document_title: String,
    pub title: TitleInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FirstPageView {
    pub header: ViewHeader,
    pub items: Vec<MergedItem>,
    pub extra_items: Vec<LineItem>,
    pub premium_percent: f64,
    pub summary: FinancialSummary,
    pub last_bill_amount: f64,
    pub payable_words: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeviationStatementView {
    pub header: ViewHeader,
    pub items: Vec<DeviationItem>,
    /// Empty unless the bill has extra items.
    pub extra_items: Vec<DeviationItem>,
    pub premium_percent: f64,
    pub summary: DeviationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoteSheetView {
    pub header: ViewHeader,
    pub work_order_amount: f64,
    pub completion_percent: f64,
    pub extra_items_percent: f64,
    pub summary: FinancialSummary,
    pub last_bill_amount: f64,
    pub notes: Vec<String>,
    pub payable_words: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CertificateIiView {
    pub header: ViewHeader,
    pub certificate: CertificateDetails,
    pub grand_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CertificateIiiView {
    pub header: ViewHeader,
    pub certificate: CertificateDetails,
    pub summary: FinancialSummary,
    pub last_bill_amount: f64,
    pub payable_words: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtraItemsView {
    pub header: ViewHeader,
    pub items: Vec<LineItem>,
    pub premium_percent: f64,
    pub extra_items_base: f64,
    pub extra_premium: f64,
    pub extra_items_sum: f64,
}

/// The payload one template renders. Serializes as the inner view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReportView {
    FirstPage(FirstPageView),
    DeviationStatement(DeviationStatementView),
    NoteSheet(NoteSheetView),
    CertificateIi(CertificateIiView),
    CertificateIii(CertificateIiiView),
    ExtraItems(ExtraItemsView),
}

impl ReportView {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportView::FirstPage(_) => ReportKind::FirstPage,
            ReportView::DeviationStatement(_) => ReportKind::DeviationStatement,
            ReportView::NoteSheet(_) => ReportKind::NoteSheet,
            ReportView::CertificateIi(_) => ReportKind::CertificateIi,
            ReportView::CertificateIii(_) => ReportKind::CertificateIii,
            ReportView::ExtraItems(_) => ReportKind::ExtraItems,
        }
    }

    pub fn header(&self) -> &ViewHeader {
        match self {
            ReportView::FirstPage(view) => &view.header,
            ReportView::DeviationStatement(view) => &view.header,
            ReportView::NoteSheet(view) => &view.header,
            ReportView::CertificateIi(view) => &view.header,
            ReportView::CertificateIii(view) => &view.header,
            ReportView::ExtraItems(view) => &view.header,
        }
    }
}

fn header_for(kind: ReportKind, data: &ReportData) -> ViewHeader {
    ViewHeader {
        document_title: kind.document_title().to_string(),
        title: data.title.clone(),
    }
}

pub fn assemble_view(data: &ReportData, kind: ReportKind) -> ReportView {
    let header = header_for(kind, data);
    let premium_percent = data.premium_rate * 100.0;

    match kind {
        ReportKind::FirstPage => ReportView::FirstPage(FirstPageView {
            header,
            items: data.bill_items.clone(),
            extra_items: data.extra_items.clone(),
            premium_percent,
            summary: data.summary.clone(),
            last_bill_amount: data.last_bill_amount,
            payable_words: data.payable_words.clone(),
        }),
        ReportKind::DeviationStatement => ReportView::DeviationStatement(DeviationStatementView {
            header,
            items: data.deviation_items.clone(),
            extra_items: if data.has_extra_items() {
                extra_items_as_deviation(&data.extra_items)
            } else {
                Vec::new()
            },
            premium_percent,
            summary: data.deviation_summary.clone(),
        }),
        ReportKind::NoteSheet => ReportView::NoteSheet(NoteSheetView {
            header,
            work_order_amount: data.work_order_amount,
            completion_percent: data.completion_percent,
            extra_items_percent: data.extra_items_percent,
            summary: data.summary.clone(),
            last_bill_amount: data.last_bill_amount,
            notes: data.notes.clone(),
            payable_words: data.payable_words.clone(),
        }),
        ReportKind::CertificateIi => ReportView::CertificateIi(CertificateIiView {
            header,
            certificate: data.certificate.clone(),
            grand_total: data.summary.grand_total,
        }),
        ReportKind::CertificateIii => ReportView::CertificateIii(CertificateIiiView {
            header,
            certificate: data.certificate.clone(),
            summary: data.summary.clone(),
            last_bill_amount: data.last_bill_amount,
            payable_words: data.payable_words.clone(),
        }),
        ReportKind::ExtraItems => ReportView::ExtraItems(ExtraItemsView {
            header,
            items: data.extra_items.clone(),
            premium_percent,
            extra_items_base: data.summary.extra_items_base,
            extra_premium: data.summary.extra_premium,
            extra_items_sum: data.summary.extra_items_sum,
        }),
    }
}

/// The five fixed views plus the extra-items view when the bill has extra items,
/// in packaging order.
pub fn assemble_views(data: &ReportData) -> Vec<ReportView> {
    ReportKind::ALL
        .into_iter()
        .filter(|kind| !kind.is_conditional() || data.has_extra_items())
        .map(|kind| assemble_view(data, kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with_extras(extras: Vec<LineItem>) -> ReportData {
        ReportData {
            title: TitleInfo {
                agreement_no: "48/2023-24".to_string(),
                ..Default::default()
            },
            extra_items: extras,
            premium_rate: 0.04,
            ..Default::default()
        }
    }

    #[test]
    fn test_template_ids_round_trip() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::from_template_id(kind.template_id()), Some(kind));
        }
        assert_eq!(ReportKind::from_template_id("unknown"), None);
        assert_eq!(ReportKind::CertificateIi.to_string(), "certificate_ii");
    }

    #[test]
    fn test_only_deviation_statement_is_landscape() {
        for kind in ReportKind::ALL {
            let layout = kind.layout();
            assert_eq!(layout.margin_mm, 10.0);
            let expected = if kind == ReportKind::DeviationStatement {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            };
            assert_eq!(layout.orientation, expected);
        }
    }

    #[test]
    fn test_five_views_without_extra_items() {
        let views = assemble_views(&data_with_extras(vec![]));
        let kinds: Vec<ReportKind> = views.iter().map(|v| v.kind()).collect();
        assert_eq!(kinds, ReportKind::ALL[..5].to_vec());

        match &views[1] {
            ReportView::DeviationStatement(view) => assert!(view.extra_items.is_empty()),
            other => panic!("unexpected view {:?}", other.kind()),
        }
    }

    #[test]
    fn test_six_views_with_extra_items() {
        let extra = LineItem {
            serial_no: "E1".to_string(),
            quantity: 2.0,
            rate: 10.0,
            amount: 20.0,
            ..Default::default()
        };
        let views = assemble_views(&data_with_extras(vec![extra]));
        assert_eq!(views.len(), 6);
        assert_eq!(views[5].kind(), ReportKind::ExtraItems);

        match &views[1] {
            ReportView::DeviationStatement(view) => {
                assert_eq!(view.extra_items.len(), 1);
                assert_eq!(view.extra_items[0].excess_amt, 20.0);
                assert_eq!(view.premium_percent, 4.0);
            }
            other => panic!("unexpected view {:?}", other.kind()),
        }
    }

    #[test]
    fn test_view_serializes_without_variant_tag() {
        let view = assemble_view(&data_with_extras(vec![]), ReportKind::CertificateIi);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["header"]["document_title"], "CERTIFICATE II - CERTIFICATE AND SIGNATURES");
        assert_eq!(json["header"]["title"]["agreement_no"], "48/2023-24");
        assert_eq!(view.header().title.agreement_no, "48/2023-24");
    }
}
