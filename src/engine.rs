use crate::config::BillingConfig;
use crate::schema::{
    DeviationItem, DeviationSummary, ExtractedBill, FinancialSummary, LineItem, MergedItem,
    ReportData,
};
use crate::utils::{amount_in_words, percent_of, round_up_to_even};
use log::debug;
use std::collections::HashMap;

/// Joins the two sheets, runs the levy cascade and builds the shared [`ReportData`].
pub struct Reconciler<'a> {
    config: &'a BillingConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a BillingConfig) -> Self {
        Self { config }
    }

    pub fn reconcile(&self, bill: &ExtractedBill) -> ReportData {
        let bill_items = merge_items(&bill.work_order.items, &bill.bill_quantity.items);
        let deviation_items = deviation_items(&bill_items);
        let extra_items = bill.extra_items.items.clone();

        let summary = self.compute_summary(&bill_items, &extra_items);
        let deviation_summary = self.deviation_summary(&deviation_items, &extra_items);

        let work_order_amount = bill.work_order.total;
        let completion_percent = percent_of(summary.grand_total, work_order_amount);
        let extra_items_percent = percent_of(summary.extra_items_sum, work_order_amount);
        let notes = self.generate_notes(completion_percent, extra_items_percent, summary.extra_items_sum);

        debug!(
            "Reconciled {} items: grand total {:.2}, deductions {:.2}, net payable {:.2}",
            bill_items.len(),
            summary.grand_total,
            summary.total_deductions,
            summary.net_payable
        );

        ReportData {
            title: bill.title.clone(),
            bill_items,
            deviation_items,
            extra_items,
            work_order_amount,
            premium_rate: self.config.premium_rate,
            payable_words: amount_in_words(summary.net_payable),
            summary,
            deviation_summary,
            completion_percent,
            extra_items_percent,
            notes,
            last_bill_amount: 0.0,
            certificate: self.config.certificate.clone(),
        }
    }

    /// The levy cascade. Every deduction is a share of `grand_total`; the premium
    /// applies separately to the bill base and to the extra-items base.
    pub fn compute_summary(&self, bill_items: &[MergedItem], extra_items: &[LineItem]) -> FinancialSummary {
        let rate = self.config.premium_rate;
        let deductions = &self.config.deductions;

        let bill_total: f64 = bill_items.iter().map(|item| item.amount_bill).sum();
        let (bill_premium, bill_grand_total) = with_premium(bill_total, rate);

        let extra_items_base: f64 = extra_items.iter().map(|item| item.amount).sum();
        let (extra_premium, extra_items_sum) = with_premium(extra_items_base, rate);

        let grand_total = bill_grand_total + extra_items_sum;

        let sd_amount = grand_total * deductions.security_deposit;
        let it_amount = grand_total * deductions.income_tax;
        let gst_amount = round_up_to_even(grand_total * deductions.gst);
        let lc_amount = grand_total * deductions.labour_cess;

        let total_deductions = sd_amount + it_amount + gst_amount + lc_amount;
        let net_payable = grand_total - total_deductions;

        FinancialSummary {
            bill_total,
            bill_premium,
            bill_grand_total,
            extra_items_base,
            extra_premium,
            extra_items_sum,
            grand_total,
            sd_amount,
            it_amount,
            gst_amount,
            lc_amount,
            total_deductions,
            net_payable,
        }
    }

    /// F/H/J/L totals of the deviation statement. Extra items have no work-order
    /// baseline, so their whole amount lands on the executed and excess sides.
    pub fn deviation_summary(&self, deviation_items: &[DeviationItem], extra_items: &[LineItem]) -> DeviationSummary {
        let rate = self.config.premium_rate;
        let extra_items_total: f64 = extra_items.iter().map(|item| item.amount).sum();

        let work_order_total: f64 = deviation_items.iter().map(|item| item.amt_wo).sum();
        let executed_total =
            deviation_items.iter().map(|item| item.amt_bill).sum::<f64>() + extra_items_total;
        let overall_excess =
            deviation_items.iter().map(|item| item.excess_amt).sum::<f64>() + extra_items_total;
        let overall_saving: f64 = deviation_items.iter().map(|item| item.saving_amt).sum();

        let (tender_premium_f, grand_total_f) = with_premium(work_order_total, rate);
        let (tender_premium_h, grand_total_h) = with_premium(executed_total, rate);
        let (tender_premium_j, grand_total_j) = with_premium(overall_excess, rate);
        let (tender_premium_l, grand_total_l) = with_premium(overall_saving, rate);

        DeviationSummary {
            work_order_total,
            executed_total,
            overall_excess,
            overall_saving,
            tender_premium_f,
            grand_total_f,
            tender_premium_h,
            grand_total_h,
            tender_premium_j,
            grand_total_j,
            tender_premium_l,
            grand_total_l,
            net_difference: grand_total_h - grand_total_f,
        }
    }

    /// The six note-sheet remarks. The approval threshold is quoted, never enforced.
    pub fn generate_notes(&self, completion_percent: f64, extra_items_percent: f64, extra_items_sum: f64) -> Vec<String> {
        let threshold = self.config.approval_threshold_percent;

        vec![
            format!(
                "The work has been completed {:.2}% of the Work Order Amount.",
                completion_percent
            ),
            format!(
                "Requisite Deviation Statement is enclosed. The Overall Excess is less than or equal to {}% and is having approval jurisdiction under this office.",
                threshold
            ),
            "Work was completed in time.".to_string(),
            format!(
                "The amount of Extra items is Rs. {} which is {:.2}% of the Work Order Amount; under {}%, approval of the same is to be granted by this office.",
                extra_items_sum.trunc() as i64,
                extra_items_percent,
                threshold
            ),
            "Quality Control (QC) test reports attached.".to_string(),
            "Please peruse above details for necessary decision-making.".to_string(),
        ]
    }
}

pub fn reconcile(bill: &ExtractedBill, config: &BillingConfig) -> ReportData {
    Reconciler::new(config).reconcile(bill)
}

/// Returns `(premium, base + premium)`.
pub fn with_premium(base: f64, rate: f64) -> (f64, f64) {
    let premium = base * rate;
    (premium, base + premium)
}

/// Left join of work-order items onto bill items by serial number.
///
/// Work-order order is preserved. Duplicate bill serials resolve last-write-wins,
/// blank serials never match, and bill lines without a work-order counterpart
/// are dropped.
pub fn merge_items(work_order_items: &[LineItem], bill_items: &[LineItem]) -> Vec<MergedItem> {
    let mut bill_lookup: HashMap<&str, &LineItem> = HashMap::new();
    for item in bill_items {
        if !item.serial_no.is_empty() {
            bill_lookup.insert(item.serial_no.as_str(), item);
        }
    }

    work_order_items
        .iter()
        .map(|wo_item| {
            let bill_item = if wo_item.serial_no.is_empty() {
                None
            } else {
                bill_lookup.get(wo_item.serial_no.as_str()).copied()
            };

            MergedItem {
                serial_no: wo_item.serial_no.clone(),
                description: wo_item.description.clone(),
                unit: wo_item.unit.clone(),
                quantity_wo: wo_item.quantity,
                rate: wo_item.rate,
                amount_wo: wo_item.amount,
                quantity_bill: bill_item.map(|b| b.quantity).unwrap_or(0.0),
                amount_bill: bill_item.map(|b| b.amount).unwrap_or(0.0),
                remark: wo_item.remark.clone(),
            }
        })
        .collect()
}

pub fn deviation_items(merged_items: &[MergedItem]) -> Vec<DeviationItem> {
    merged_items.iter().map(deviation_for).collect()
}

/// Splits the quantity difference into excess or saving, priced at the work-order rate.
pub fn deviation_for(item: &MergedItem) -> DeviationItem {
    let qty_wo = item.quantity_wo;
    let qty_bill = item.quantity_bill;

    let (excess_qty, saving_qty) = if qty_bill > qty_wo {
        (qty_bill - qty_wo, 0.0)
    } else {
        (0.0, qty_wo - qty_bill)
    };

    DeviationItem {
        serial_no: item.serial_no.clone(),
        description: item.description.clone(),
        unit: item.unit.clone(),
        qty_wo,
        rate: item.rate,
        amt_wo: item.amount_wo,
        qty_bill,
        amt_bill: item.amount_bill,
        excess_qty,
        excess_amt: excess_qty * item.rate,
        saving_qty,
        saving_amt: saving_qty * item.rate,
        remark: item.remark.clone(),
    }
}

/// Extra items as deviation rows: zero work-order baseline, everything is excess.
pub fn extra_items_as_deviation(extra_items: &[LineItem]) -> Vec<DeviationItem> {
    extra_items
        .iter()
        .map(|item| DeviationItem {
            serial_no: item.serial_no.clone(),
            description: item.description.clone(),
            unit: item.unit.clone(),
            qty_wo: 0.0,
            rate: item.rate,
            amt_wo: 0.0,
            qty_bill: item.quantity,
            amt_bill: item.amount,
            excess_qty: item.quantity,
            excess_amt: item.amount,
            saving_qty: 0.0,
            saving_amt: 0.0,
            remark: if item.remark.is_empty() {
                "Extra Item".to_string()
            } else {
                item.remark.clone()
            },
        })
        .collect()
}
