use alloy::primitives::{Address, B256, U256, utils::format_ether};
use fundraise_contract_clients::CampaignCard;
use term_table::row::Row;
use term_table::table_cell::{Alignment as CellAlignment, TableCell};
use term_table::{Table, TableStyle};

/// Everything the `status` command shows.
pub struct StatusView<'a> {
    pub address: Address,
    pub balance: U256,
    pub chain_id: u64,
    pub contract: Address,
    pub rpc_url: &'a str,
    pub campaign_count: u64,
}

fn label_row(label: &str, value: impl ToString) -> Row {
    Row::new(vec![
        TableCell::builder(label)
            .alignment(CellAlignment::Right)
            .build(),
        TableCell::builder(value.to_string())
            .alignment(CellAlignment::Left)
            .build(),
    ])
}

fn header_row(text: impl ToString, columns: usize) -> Row {
    Row::new(vec![
        TableCell::builder(text.to_string())
            .col_span(columns)
            .alignment(CellAlignment::Center)
            .build(),
    ])
}

/// Balance to 4 decimals, as shown in the wallet banner.
fn short_eth(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, frac)) => format!("{whole}.{:0<4}", &frac[..frac.len().min(4)]),
        None => format!("{formatted}.0000"),
    }
}

pub fn status_table(view: &StatusView<'_>) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    table.add_row(header_row("🔗 CONNECTED TO CHAINFUNDRAISE 🔗", 2));
    table.add_row(label_row("Account", view.address));
    table.add_row(label_row("Balance", format!("{} ETH", short_eth(view.balance))));
    table.add_row(label_row("Network", format!("chain id {}", view.chain_id)));
    table.add_row(label_row("Contract", view.contract));
    table.add_row(label_row("RPC URL", view.rpc_url));
    table.add_row(label_row("Campaigns", view.campaign_count));
    table.render()
}

pub fn campaigns_table(cards: &[CampaignCard]) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    table.add_row(Row::new(
        ["ID", "Title", "Status", "Progress", "Min", "Deadline", "Time left"]
            .into_iter()
            .map(|heading| TableCell::builder(heading).alignment(CellAlignment::Center).build())
            .collect::<Vec<_>>(),
    ));

    for card in cards {
        let status = if card.withdrawn {
            format!("{} · Withdrawn", card.status)
        } else {
            card.status.to_string()
        };
        table.add_row(Row::new(vec![
            TableCell::builder(format!("#{}", card.id))
                .alignment(CellAlignment::Right)
                .build(),
            TableCell::new(&card.title),
            TableCell::new(status),
            TableCell::new(card.progress_text()),
            TableCell::new(format!("{} ETH", card.min_contribution_eth)),
            TableCell::new(&card.deadline),
            TableCell::new(card.time_left_text()),
        ]));
    }
    table.render()
}

pub fn campaign_detail(card: &CampaignCard, own_contribution: Option<U256>) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    table.add_row(header_row(format!("#{} {}", card.id, card.title), 2));
    table.add_row(label_row("Status", card.status));
    table.add_row(label_row("Creator", &card.creator));
    table.add_row(label_row("Progress", card.progress_text()));
    table.add_row(label_row(
        "Min contribution",
        format!("{} ETH", card.min_contribution_eth),
    ));
    table.add_row(label_row("Deadline", &card.deadline));
    table.add_row(label_row("Time left", card.time_left_text()));
    table.add_row(label_row("Withdrawn", if card.withdrawn { "yes" } else { "no" }));
    if let Some(amount) = own_contribution {
        table.add_row(label_row("Your contribution", format!("{} ETH", format_ether(amount))));
    }
    table.render()
}

pub fn no_matches(term: &str) -> String {
    format!("No campaigns found matching \"{term}\"")
}

/// Explorer page of a transaction.
pub fn tx_link(explorer_url: &str, tx_hash: B256) -> String {
    format!("{}/tx/{tx_hash}", explorer_url.trim_end_matches('/'))
}

pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_link() {
        let hash = B256::with_last_byte(0xab);
        assert_eq!(
            tx_link("https://etherscan.io/", hash),
            format!("https://etherscan.io/tx/{hash}")
        );
        assert!(tx_link("https://etherscan.io", hash).ends_with("00ab"));
    }

    #[test]
    fn test_short_eth() {
        assert_eq!(short_eth(U256::from(1_500_000_000_000_000_000u128)), "1.5000");
        assert_eq!(short_eth(U256::from(123_456_789_000_000_000u128)), "0.1234");
        assert_eq!(short_eth(U256::ZERO), "0.0000");
    }

    #[test]
    fn test_no_matches_message() {
        assert_eq!(no_matches("solar"), "No campaigns found matching \"solar\"");
    }

    #[test]
    fn test_status_table_contains_fields() {
        let view = StatusView {
            address: Address::repeat_byte(0x11),
            balance: U256::from(2_000_000_000_000_000_000u128),
            chain_id: 31337,
            contract: Address::repeat_byte(0x22),
            rpc_url: "http://127.0.0.1:8545",
            campaign_count: 4,
        };
        let rendered = status_table(&view);
        assert!(rendered.contains("2.0000 ETH"));
        assert!(rendered.contains("chain id 31337"));
        assert!(rendered.contains("http://127.0.0.1:8545"));
    }
}
