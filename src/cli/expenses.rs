use super::ui;
use crate::client::TricountClient;
use anyhow::{Result, bail};
use comfy_table::Cell;
use std::collections::BTreeMap;

fn expenses_table(amounts: &[f64], currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell(&format!("Amount ({currency})")),
    ]);
    for (i, amount) in amounts.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), ui::amount_cell(*amount)]);
    }
    table.to_string()
}

fn member_totals_table(totals: &BTreeMap<String, f64>, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Member"),
        ui::header_cell(&format!("Expenses ({currency})")),
    ]);
    for (name, total) in totals {
        table.add_row(vec![Cell::new(name), ui::amount_cell(*total)]);
    }
    table.to_string()
}

/// Lists expense amounts, optionally only one member's share of them.
///
/// Without a member, the listing is followed by each member's total.
pub async fn run(client: &TricountClient, user_id: Option<&str>, currency: &str) -> Result<()> {
    let title = match user_id {
        Some(id) => {
            let users = client.list_users().await;
            let Some(name) = users.get(id) else {
                bail!("No member with id {id} in this tricount");
            };
            format!("Expenses of {name}")
        }
        None => "All expenses".to_string(),
    };

    let amounts = client.list_expense_amounts(user_id).await;
    let total: f64 = amounts.iter().sum();

    println!("{}\n", ui::style_text(&title, ui::StyleType::Title));
    if amounts.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }
    println!("{}", expenses_table(&amounts, currency));
    println!(
        "\nTotal ({}): {}",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total:.2}"), ui::StyleType::TotalValue)
    );

    if user_id.is_none() {
        let totals = client.expense_totals_per_user().await;
        if !totals.is_empty() {
            println!(
                "\n{}\n",
                ui::style_text("Expenses per member", ui::StyleType::Title)
            );
            println!("{}", member_totals_table(&totals, currency));
        }
    }
    Ok(())
}
