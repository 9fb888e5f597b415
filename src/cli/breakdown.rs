use super::ui;
use crate::client::TricountClient;
use crate::core::breakdown::{MonthlyBreakdown, TargetMonth, sorted_desc};
use anyhow::Result;
use std::collections::HashMap;
use tracing::warn;

fn amount_line(label: &str, value: f64, currency: &str) -> String {
    format!("{label}: {value:.2} {currency}\n")
}

fn push_section(output: &mut String, title: &str, nets: &HashMap<String, f64>, currency: &str) {
    output.push_str(&format!("{}\n", ui::style_text(title, ui::StyleType::Title)));
    for (label, value) in sorted_desc(nets) {
        output.push_str(&amount_line(label, value, currency));
    }
}

impl MonthlyBreakdown {
    /// Renders the four report sections followed by any allocation warnings.
    pub fn display_as_report(&self, month: TargetMonth, currency: &str) -> String {
        let mut output = String::new();

        // Values can be negative when incomes exceed expenses in a category
        push_section(
            &mut output,
            &format!("=== Net per category for {month} ==="),
            &self.per_category,
            currency,
        );

        output.push('\n');
        output.push_str(&format!(
            "{}\n",
            ui::style_text(
                &format!("=== Monthly totals ({month}) ==="),
                ui::StyleType::Title
            )
        ));
        output.push_str(&amount_line("Expenses", self.totals.expenses, currency));
        output.push_str(&amount_line("Incomes", self.totals.incomes, currency));
        output.push_str(&format!(
            "{}: {}\n",
            ui::style_text("Net", ui::StyleType::TotalLabel),
            ui::style_text(
                &format!("{:.2} {currency}", self.totals.net),
                ui::StyleType::TotalValue
            )
        ));

        output.push('\n');
        push_section(
            &mut output,
            &format!("=== Net per person (Beneficiary) for {month} ==="),
            &self.per_beneficiary,
            currency,
        );

        output.push('\n');
        push_section(
            &mut output,
            &format!("=== Net per payer (Payer) for {month} ==="),
            &self.per_payer,
            currency,
        );

        for mismatch in &self.diagnostics {
            output.push_str(&format!(
                "\n{}\n",
                ui::style_text(&format!("Warning: {mismatch}"), ui::StyleType::Warning)
            ));
        }

        output.trim_end().to_string()
    }
}

/// Prints one report per month, refreshing the registry between reports.
pub async fn run(client: &TricountClient, months: &[TargetMonth], currency: &str) -> Result<()> {
    for (i, month) in months.iter().enumerate() {
        if i > 0 {
            if let Err(e) = client.refresh().await {
                warn!(error = %e, "Keeping previously fetched registry data");
            }
            ui::print_separator();
        }

        let breakdown = client.monthly_breakdown(*month).await;
        println!("{}", breakdown.display_as_report(*month, currency));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::breakdown::{AllocationMismatch, Totals};
    use crate::core::registry::{RegistryPayload, RegistryProvider};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one registry, then fails every later fetch.
    struct FlakyRegistryProvider {
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl RegistryProvider for FlakyRegistryProvider {
        async fn fetch_registry(&self) -> Result<RegistryPayload> {
            if self.call_count.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(anyhow!("Network unreachable"));
            }
            Ok(RegistryPayload::new(json!({
                "Response": [{"Registry": {"all_registry_entry": [
                    {"RegistryEntry": {
                        "id": 1,
                        "date": "2025-07-04 12:00:00",
                        "amount": {"value": "-5.00"},
                        "category": "FOOD"
                    }}
                ]}}]
            })))
        }
    }

    fn sample_breakdown() -> MonthlyBreakdown {
        MonthlyBreakdown {
            per_category: HashMap::from([
                ("FOOD".to_string(), 42.5),
                ("SALARY".to_string(), -100.0),
                ("TRANSPORT".to_string(), 7.0),
            ]),
            per_payer: HashMap::from([("Alice".to_string(), -50.5)]),
            per_beneficiary: HashMap::from([
                ("Alice".to_string(), -60.0),
                ("Bob".to_string(), 9.5),
            ]),
            totals: Totals {
                expenses: 49.5,
                incomes: 100.0,
                net: -50.5,
            },
            diagnostics: vec![AllocationMismatch {
                entry_id: Some("3".to_string()),
                allocated: -1.0,
                amount: -2.0,
            }],
        }
    }

    #[test]
    fn test_report_lines() {
        console::set_colors_enabled(false);
        let month: TargetMonth = "2025-07".parse().unwrap();
        let report = sample_breakdown().display_as_report(month, "EUR");
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "=== Net per category for 2025-07 ===");
        assert_eq!(lines[1], "FOOD: 42.50 EUR");
        assert_eq!(lines[2], "TRANSPORT: 7.00 EUR");
        assert_eq!(lines[3], "SALARY: -100.00 EUR");
        assert!(report.contains("=== Monthly totals (2025-07) ==="));
        assert!(report.contains("Expenses: 49.50 EUR"));
        assert!(report.contains("Incomes: 100.00 EUR"));
        assert!(report.contains("Net: -50.50 EUR"));
        assert!(report.contains(
            "=== Net per person (Beneficiary) for 2025-07 ===\nBob: 9.50 EUR\nAlice: -60.00 EUR"
        ));
        assert!(report.contains("=== Net per payer (Payer) for 2025-07 ===\nAlice: -50.50 EUR"));
        assert!(report.ends_with("Warning: allocations (-1) != entry amount (-2) for ID=3"));
    }

    #[test]
    fn test_empty_report_keeps_sections() {
        console::set_colors_enabled(false);
        let month: TargetMonth = "2024-02".parse().unwrap();
        let report = MonthlyBreakdown::default().display_as_report(month, "CHF");

        assert!(report.starts_with("=== Net per category for 2024-02 ==="));
        assert!(report.contains("Expenses: 0.00 CHF"));
        assert!(report.contains("Net: 0.00 CHF"));
        assert!(report.ends_with("=== Net per payer (Payer) for 2024-02 ==="));
    }

    #[tokio::test]
    async fn test_run_keeps_previous_registry_when_refresh_fails() {
        let provider = Arc::new(FlakyRegistryProvider {
            call_count: AtomicUsize::new(0),
        });
        let client = TricountClient::with_provider(provider.clone()).await.unwrap();
        let months: Vec<TargetMonth> =
            vec!["2025-07".parse().unwrap(), "2025-08".parse().unwrap()];

        let result = run(&client, &months, "EUR").await;

        assert!(result.is_ok(), "Breakdown run failed with: {:?}", result.err());
        assert_eq!(provider.call_count.load(Ordering::SeqCst), 2);
        let july = client.monthly_breakdown(months[0]).await;
        assert_eq!(july.per_category.get("FOOD"), Some(&5.0));
    }
}
