use super::ui;
use crate::client::TricountClient;
use anyhow::Result;
use comfy_table::Cell;
use std::collections::BTreeMap;

fn users_table(users: &BTreeMap<String, String>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("ID"), ui::header_cell("Name")]);
    for (id, name) in users {
        table.add_row(vec![Cell::new(id), Cell::new(name)]);
    }
    table.to_string()
}

pub async fn run(client: &TricountClient) -> Result<()> {
    let users = client.list_users().await;
    if users.is_empty() {
        println!("No members found in this tricount.");
        return Ok(());
    }

    println!("{}\n", ui::style_text("Tricount members", ui::StyleType::Title));
    println!("{}", users_table(&users));
    Ok(())
}
