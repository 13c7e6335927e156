use crate::error::{BillError, Result};
use crate::schema::{DeviationItem, ReportData};
use crate::utils::round_up_to_even;

/// Re-derives every total in a [`ReportData`] from its line items and reports
/// the first figure that disagrees by more than `tolerance`.
pub struct ConsistencyAuditor<'a> {
    data: &'a ReportData,
    tolerance: f64,
}

impl<'a> ConsistencyAuditor<'a> {
    pub fn new(data: &'a ReportData, tolerance: f64) -> Self {
        Self { data, tolerance }
    }

    pub fn verify(&self) -> Result<()> {
        self.verify_financial_summary()?;
        self.verify_deviation_items()?;
        self.verify_deviation_summary()?;
        Ok(())
    }

    fn verify_financial_summary(&self) -> Result<()> {
        let data = self.data;
        let summary = &data.summary;

        let bill_total: f64 = data.bill_items.iter().map(|item| item.amount_bill).sum();
        self.check("summary.bill_total", bill_total, summary.bill_total)?;

        let extra_base: f64 = data.extra_items.iter().map(|item| item.amount).sum();
        self.check("summary.extra_items_base", extra_base, summary.extra_items_base)?;

        self.check(
            "summary.bill_grand_total",
            summary.bill_total * (1.0 + data.premium_rate),
            summary.bill_grand_total,
        )?;
        self.check(
            "summary.extra_items_sum",
            summary.extra_items_base * (1.0 + data.premium_rate),
            summary.extra_items_sum,
        )?;
        self.check(
            "summary.grand_total",
            summary.bill_grand_total + summary.extra_items_sum,
            summary.grand_total,
        )?;

        if summary.gst_amount.fract() != 0.0 || summary.gst_amount % 2.0 != 0.0 {
            return Err(BillError::ConsistencyViolation {
                field: "summary.gst_amount".to_string(),
                expected: round_up_to_even(summary.gst_amount),
                actual: summary.gst_amount,
            });
        }

        self.check(
            "summary.total_deductions",
            summary.sd_amount + summary.it_amount + summary.gst_amount + summary.lc_amount,
            summary.total_deductions,
        )?;
        self.check(
            "summary.net_payable",
            summary.grand_total - summary.total_deductions,
            summary.net_payable,
        )?;

        Ok(())
    }

    fn verify_deviation_items(&self) -> Result<()> {
        for item in &self.data.deviation_items {
            verify_deviation_item(item, self.tolerance)?;
        }
        Ok(())
    }

    fn verify_deviation_summary(&self) -> Result<()> {
        let data = self.data;
        let deviation = &data.deviation_summary;

        let work_order_total: f64 = data.deviation_items.iter().map(|item| item.amt_wo).sum();
        self.check(
            "deviation_summary.work_order_total",
            work_order_total,
            deviation.work_order_total,
        )?;

        let executed_total = data.deviation_items.iter().map(|item| item.amt_bill).sum::<f64>()
            + data.summary.extra_items_base;
        self.check(
            "deviation_summary.executed_total",
            executed_total,
            deviation.executed_total,
        )?;

        self.check(
            "deviation_summary.net_difference",
            deviation.grand_total_h - deviation.grand_total_f,
            deviation.net_difference,
        )?;

        // H with premium is the same money as the bill's grand total.
        self.check(
            "deviation_summary.grand_total_h",
            data.summary.grand_total,
            deviation.grand_total_h,
        )?;

        Ok(())
    }

    fn check(&self, field: &str, expected: f64, actual: f64) -> Result<()> {
        if (expected - actual).abs() > self.tolerance {
            return Err(BillError::ConsistencyViolation {
                field: field.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

fn verify_deviation_item(item: &DeviationItem, tolerance: f64) -> Result<()> {
    let field = |name: &str| format!("deviation_items[{}].{}", item.serial_no, name);

    if item.excess_qty > 0.0 && item.saving_qty > 0.0 {
        return Err(BillError::ConsistencyViolation {
            field: field("saving_qty"),
            expected: 0.0,
            actual: item.saving_qty,
        });
    }

    let expected_delta = item.qty_bill - item.qty_wo;
    let actual_delta = item.excess_qty - item.saving_qty;
    if (expected_delta - actual_delta).abs() > tolerance {
        return Err(BillError::ConsistencyViolation {
            field: field("excess_qty"),
            expected: expected_delta,
            actual: actual_delta,
        });
    }

    Ok(())
}

pub fn verify_report_consistency(data: &ReportData, tolerance: f64) -> Result<()> {
    ConsistencyAuditor::new(data, tolerance).verify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BillingConfig;
    use crate::engine::reconcile;
    use crate::schema::{ExtractedBill, ItemSheet, LineItem};

    fn item(serial: &str, quantity: f64, rate: f64) -> LineItem {
        LineItem {
            serial_no: serial.to_string(),
            quantity,
            rate,
            amount: quantity * rate,
            ..Default::default()
        }
    }

    fn sample_report() -> ReportData {
        let bill = ExtractedBill {
            work_order: ItemSheet::from_items(vec![item("1", 10.0, 500.0), item("2", 8.0, 120.0)]),
            bill_quantity: ItemSheet::from_items(vec![item("1", 12.0, 500.0), item("2", 5.0, 120.0)]),
            extra_items: ItemSheet::from_items(vec![item("E1", 2.0, 75.0)]),
            ..Default::default()
        };
        reconcile(&bill, &BillingConfig::default())
    }

    #[test]
    fn test_reconciled_report_is_consistent() {
        let data = sample_report();
        assert!(verify_report_consistency(&data, 0.01).is_ok());
    }

    #[test]
    fn test_tampered_net_payable_is_flagged() {
        let mut data = sample_report();
        data.summary.net_payable += 10.0;

        match verify_report_consistency(&data, 0.01) {
            Err(BillError::ConsistencyViolation { field, .. }) => {
                assert_eq!(field, "summary.net_payable");
            }
            other => panic!("expected ConsistencyViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_gst_is_flagged() {
        let mut data = sample_report();
        data.summary.gst_amount += 1.0;
        let err = verify_report_consistency(&data, 0.01).unwrap_err();
        assert!(err.to_string().contains("summary.gst_amount"));
    }

    #[test]
    fn test_both_excess_and_saving_is_flagged() {
        let mut data = sample_report();
        data.deviation_items[0].saving_qty = 1.0;
        let err = verify_report_consistency(&data, 0.01).unwrap_err();
        assert!(err.to_string().contains("deviation_items[1].saving_qty"));
    }
}
