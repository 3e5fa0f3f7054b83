use crate::discovery::{ApprovalRow, FailureReport, SkipReason};
use crate::operators::OperatorRegistry;
use alloy_primitives::{Address, TxHash};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

pub const TITLE: &str = "Revoke NFT Operator Approvals";

pub const HELP: &str = "What is this?

When you list an NFT on a marketplace such as OpenSea, you sign a
setApprovalForAll transaction. It lets the marketplace's operator contract
move every token you hold in that collection, now and in the future, without
asking you again. Those approvals stay in place after you stop using the
marketplace.

`approvals scan` lists every collection you have interacted with where a known
operator still holds such an approval. `approvals revoke <contract>` sends
setApprovalForAll(operator, false) from your wallet to clear it.";

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

/// Builds block-explorer links.
#[derive(Debug, Clone)]
pub struct Explorer {
    base_url: String,
}

impl Explorer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.base_url, address)
    }

    pub fn tx_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/tx/{}", self.base_url, tx_hash)
    }
}

pub fn revoke_command(row: &ApprovalRow) -> String {
    format!(
        "approvals revoke {} --operator {}",
        row.token.address, row.operator.name
    )
}

pub fn format_approvals(
    rows: &[ApprovalRow],
    failures: &[FailureReport],
    explorer: &Explorer,
    format: &OutputFormat,
) -> String {
    match format {
        OutputFormat::Table => format_approvals_table(rows, failures, explorer),
        OutputFormat::Json => format_approvals_json(rows, failures, explorer),
        OutputFormat::Csv => format_approvals_csv(rows),
    }
}

fn format_approvals_table(
    rows: &[ApprovalRow],
    failures: &[FailureReport],
    explorer: &Explorer,
) -> String {
    let mut output = String::new();

    if rows.is_empty() {
        output.push_str("No operator approvals found.");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Token", "Approved Operator", "Actions"]);

        for row in rows {
            table.add_row(vec![
                Cell::new(format_token_cell(row, explorer)),
                Cell::new(format!(
                    "{}\n{}",
                    row.operator.name,
                    explorer.address_url(&row.operator.address)
                )),
                Cell::new(revoke_command(row)),
            ]);
        }
        output.push_str(&table.to_string());
    }

    if !failures.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Unchecked Contract", "Reason"]);

        for failure in failures {
            table.add_row(vec![
                Cell::new(failure.contract),
                Cell::new(&failure.reason),
            ]);
        }
        output.push_str("\n\n");
        output.push_str(&table.to_string());
    }

    output
}

fn format_token_cell(row: &ApprovalRow, explorer: &Explorer) -> String {
    let name = row
        .token
        .collection_name
        .as_deref()
        .unwrap_or("Unnamed collection");
    let mut cell = match row.token.symbol.as_deref() {
        Some(symbol) if !symbol.is_empty() => format!("{name} ({symbol})"),
        _ => name.to_string(),
    };
    cell.push('\n');
    cell.push_str(&explorer.address_url(&row.token.address));
    if let Some(thumbnail) = &row.token.thumbnail {
        cell.push('\n');
        cell.push_str(thumbnail);
    }
    cell
}

fn format_approvals_json(
    rows: &[ApprovalRow],
    failures: &[FailureReport],
    explorer: &Explorer,
) -> String {
    let approvals: Vec<_> = rows
        .iter()
        .map(|row| {
            json!({
                "key": row.key,
                "token": {
                    "address": format!("{:?}", row.token.address),
                    "collection_name": row.token.collection_name,
                    "symbol": row.token.symbol,
                    "thumbnail": row.token.thumbnail,
                    "explorer_url": explorer.address_url(&row.token.address),
                },
                "operator": {
                    "name": row.operator.name,
                    "address": format!("{:?}", row.operator.address),
                    "explorer_url": explorer.address_url(&row.operator.address),
                },
                "action": revoke_command(row),
            })
        })
        .collect();

    let failures: Vec<_> = failures
        .iter()
        .map(|failure| {
            json!({
                "contract": format!("{:?}", failure.contract),
                "reason": failure.reason,
            })
        })
        .collect();

    serde_json::to_string_pretty(&json!({
        "approvals": approvals,
        "failures": failures,
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

fn format_approvals_csv(rows: &[ApprovalRow]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "key",
        "token_address",
        "collection_name",
        "symbol",
        "thumbnail",
        "operator",
        "operator_address",
    ]);

    for row in rows {
        let _ = wtr.write_record([
            row.key.as_str(),
            format!("{:?}", row.token.address).as_str(),
            row.token.collection_name.as_deref().unwrap_or_default(),
            row.token.symbol.as_deref().unwrap_or_default(),
            row.token.thumbnail.as_deref().unwrap_or_default(),
            row.operator.name.as_str(),
            format!("{:?}", row.operator.address).as_str(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_operators(
    registry: &OperatorRegistry,
    explorer: &Explorer,
    format: &OutputFormat,
) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec!["Operator", "Address", "Explorer"]);

            for operator in registry.iter() {
                table.add_row(vec![
                    Cell::new(operator.name),
                    Cell::new(format!("{:?}", operator.address)),
                    Cell::new(explorer.address_url(&operator.address)),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let operators: Vec<_> = registry
                .iter()
                .map(|operator| {
                    json!({
                        "name": operator.name,
                        "address": format!("{:?}", operator.address),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&operators).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["name", "address"]);
            for operator in registry.iter() {
                let _ = wtr.write_record([operator.name, format!("{:?}", operator.address).as_str()]);
            }
            String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
        }
    }
}

pub fn format_skipped(reason: &SkipReason) -> String {
    format!("Approval discovery did not run: {reason}.")
}

pub fn format_revoked(row: &ApprovalRow, tx_hash: &TxHash, explorer: &Explorer) -> String {
    format!(
        "Revoked {} approval on {}: {}",
        row.operator.name,
        row.token
            .collection_name
            .as_deref()
            .unwrap_or("unnamed collection"),
        explorer.tx_url(tx_hash)
    )
}

pub fn format_about() -> String {
    format!("{TITLE}\n\n{HELP}")
}
