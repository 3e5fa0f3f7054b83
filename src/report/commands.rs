use crate::discovery::{ApprovalRow, ApprovalSession, DiscoveryOutcome};
use crate::operators::OperatorRegistry;
use crate::report::formatters::{
    Explorer, OutputFormat, format_about, format_approvals, format_operators, format_revoked,
    format_skipped,
};
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::Address;
use anyhow::Result;
use std::str::FromStr;

pub async fn cmd_scan(
    session: &ApprovalSession,
    signer: Option<&PrivateKeySigner>,
    chain_id: u64,
    explorer: &Explorer,
    format: &OutputFormat,
) -> Result<()> {
    let output = match session.discover(signer, chain_id).await? {
        DiscoveryOutcome::Skipped(reason) => format_skipped(&reason),
        DiscoveryOutcome::Completed { rows, failures } => {
            format_approvals(&rows, &failures, explorer, format)
        }
    };
    println!("{output}");

    Ok(())
}

pub struct RevokeQuery {
    pub contract: String,
    pub operator: Option<String>,
}

pub async fn cmd_revoke(
    session: &ApprovalSession,
    signer: Option<&PrivateKeySigner>,
    chain_id: u64,
    query: RevokeQuery,
    explorer: &Explorer,
    format: &OutputFormat,
) -> Result<()> {
    let contract = Address::from_str(&query.contract)
        .map_err(|_| anyhow::anyhow!("Invalid contract address: {}", query.contract))?;

    let operator = query
        .operator
        .as_deref()
        .map(|name| {
            session
                .operators()
                .find(name)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("Unknown operator: {}", name))
        })
        .transpose()?;

    let rows = match session.discover(signer, chain_id).await? {
        DiscoveryOutcome::Skipped(reason) => {
            return Err(anyhow::anyhow!("Cannot revoke: {}", reason));
        }
        DiscoveryOutcome::Completed { rows, .. } => rows,
    };

    let targets = select_rows(rows, contract, operator.map(|op| op.name));
    if targets.is_empty() {
        return Err(anyhow::anyhow!(
            "No standing operator approval found on {}",
            contract
        ));
    }

    for row in &targets {
        let tx_hash = session.revoke(&row.action, signer, chain_id).await?;
        println!("{}", format_revoked(row, &tx_hash, explorer));
    }

    let state = session.snapshot();
    println!(
        "{}",
        format_approvals(&state.rows, &state.failures, explorer, format)
    );

    Ok(())
}

fn select_rows(
    rows: Vec<ApprovalRow>,
    contract: Address,
    operator: Option<&str>,
) -> Vec<ApprovalRow> {
    rows.into_iter()
        .filter(|row| row.token.address == contract)
        .filter(|row| operator.is_none_or(|name| row.operator.name == name))
        .collect()
}

pub fn cmd_operators(
    registry: &OperatorRegistry,
    explorer: &Explorer,
    format: &OutputFormat,
) -> Result<()> {
    let output = format_operators(registry, explorer, format);
    println!("{output}");

    Ok(())
}

pub fn cmd_about() -> Result<()> {
    println!("{}", format_about());

    Ok(())
}
