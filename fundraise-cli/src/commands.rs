use alloy::primitives::{Address, U256, utils::format_ether};
use fundraise_contract_clients::{
    CampaignCard, CreateCampaign, FundraiseError, Session, TxOutcome, WalletConnection,
    card::filter_cards, validation::parse_eth_amount,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::{ClientConfig, Command};
use crate::deploy::{deploy_contract, read_artifact};
use crate::prompt::confirm;
use crate::render::{self, StatusView};
use crate::watch::run_watch;

pub async fn run(
    command: Command,
    config: &ClientConfig,
    shutdown_token: CancellationToken,
) -> Result<(), FundraiseError> {
    match command {
        Command::Status => status(&connect(config).await?).await,
        Command::List { search } => list(config, &connect(config).await?, search).await,
        Command::Show { id } => show(config, &connect(config).await?, id).await,
        Command::Create {
            title,
            goal,
            duration_days,
            min_contribution,
        } => {
            let request =
                CreateCampaign::from_user_input(&title, &goal, duration_days, &min_contribution)?;
            create(config, &connect(config).await?, request, &goal, duration_days).await
        }
        Command::Contribute { id, amount } => {
            let value = parse_eth_amount(&amount)?;
            contribute(config, &connect(config).await?, id, value).await
        }
        Command::Withdraw { id } => withdraw(config, &connect(config).await?, id).await,
        Command::Refund { id } => refund(config, &connect(config).await?, id).await,
        Command::Contribution { id, address } => {
            let session = connect(config).await?;
            let contributor = address.unwrap_or_else(|| session.address());
            let amount = session
                .orchestrator()
                .contribution_of(id, Some(contributor))
                .await?;
            print_contribution(config, id, contributor, amount)
        }
        Command::Watch {
            refresh_secs,
            poll_secs,
        } => run_watch(config, refresh_secs, poll_secs, shutdown_token).await,
        Command::Deploy { artifact } => deploy(config, &artifact).await,
    }
}

async fn connect(config: &ClientConfig) -> Result<Session, FundraiseError> {
    Session::connect(config.contract.clone(), &config.account).await
}

async fn status(session: &Session) -> Result<(), FundraiseError> {
    let balance = session.wallet().own_balance().await?;
    let campaign_count = session.orchestrator().campaign_count().await?;
    println!(
        "{}",
        render::status_table(&StatusView {
            address: session.address(),
            balance,
            chain_id: session.network(),
            contract: session.config().contract_address,
            rpc_url: &session.config().rpc_url,
            campaign_count,
        })
    );
    Ok(())
}

async fn list(
    config: &ClientConfig,
    session: &Session,
    search: Option<String>,
) -> Result<(), FundraiseError> {
    let orchestrator = session.orchestrator();
    let now = orchestrator.now();
    let cards: Vec<CampaignCard> = orchestrator
        .board()
        .campaigns()
        .await?
        .iter()
        .map(|campaign| CampaignCard::at(campaign, now))
        .collect();
    let cards = match &search {
        Some(term) => filter_cards(cards, term),
        None => cards,
    };

    if config.json {
        println!("{}", render::json(&cards)?);
    } else if cards.is_empty() {
        match &search {
            Some(term) => println!("{}", render::no_matches(term)),
            None => println!("No campaigns yet. Create the first one with `fundraise create`."),
        }
    } else {
        println!("{}", render::campaigns_table(&cards));
    }
    Ok(())
}

async fn show(config: &ClientConfig, session: &Session, id: u64) -> Result<(), FundraiseError> {
    let orchestrator = session.orchestrator();
    let campaign = orchestrator.board().campaign(id).await?;
    let card = CampaignCard::at(&campaign, orchestrator.now());
    if config.json {
        println!("{}", render::json(&card)?);
        return Ok(());
    }
    let own = orchestrator.contribution_of(id, None).await?;
    let own = (!own.is_zero()).then_some(own);
    println!("{}", render::campaign_detail(&card, own));
    Ok(())
}

async fn create(
    config: &ClientConfig,
    session: &Session,
    request: CreateCampaign,
    goal: &str,
    duration_days: u64,
) -> Result<(), FundraiseError> {
    for hint in request.hints() {
        warn!("⚠️  {hint}");
    }
    confirm(
        &format!(
            "Create campaign \"{}\" with a goal of {goal} ETH for {duration_days} days?",
            request.title
        ),
        config.assume_yes,
    )?;
    let title = request.title.clone();
    let outcome = session.orchestrator().create_campaign(request).await?;
    match outcome.campaign_id {
        Some(id) => println!("Campaign \"{title}\" created successfully! ID: {id}"),
        None => println!("Campaign \"{title}\" created."),
    }
    print_tx(config, &outcome);
    Ok(())
}

async fn contribute(
    config: &ClientConfig,
    session: &Session,
    id: u64,
    value: U256,
) -> Result<(), FundraiseError> {
    confirm(
        &format!("Contribute {} ETH to campaign #{id}?", format_ether(value)),
        config.assume_yes,
    )?;
    let outcome = session.orchestrator().contribute(id, value).await?;
    println!(
        "Contribution of {} ETH made to campaign {id}",
        format_ether(value)
    );
    print_tx(config, &outcome);
    Ok(())
}

async fn withdraw(config: &ClientConfig, session: &Session, id: u64) -> Result<(), FundraiseError> {
    confirm(&format!("Withdraw funds from campaign #{id}?"), config.assume_yes)?;
    let outcome = session.orchestrator().withdraw_funds(id).await?;
    println!("Successfully withdrew funds from campaign {id}");
    print_tx(config, &outcome);
    Ok(())
}

async fn refund(config: &ClientConfig, session: &Session, id: u64) -> Result<(), FundraiseError> {
    confirm(&format!("Claim refund from campaign #{id}?"), config.assume_yes)?;
    let outcome = session.orchestrator().claim_refund(id).await?;
    println!("Refund claimed from campaign {id}");
    print_tx(config, &outcome);
    Ok(())
}

fn print_contribution(
    config: &ClientConfig,
    id: u64,
    contributor: Address,
    amount: U256,
) -> Result<(), FundraiseError> {
    if config.json {
        let value = serde_json::json!({
            "campaignId": id,
            "contributor": contributor,
            "amountWei": amount.to_string(),
            "amountEth": format_ether(amount),
        });
        println!("{}", render::json(&value)?);
    } else {
        println!(
            "{contributor} contributed {} ETH to campaign {id}",
            format_ether(amount)
        );
    }
    Ok(())
}

fn print_tx(config: &ClientConfig, outcome: &TxOutcome) {
    println!("Transaction: {}", render::tx_link(&config.explorer_url, outcome.tx_hash));
    info!(tx_hash = ?outcome.tx_hash, gas_used = outcome.gas_used, "transaction details");
}

async fn deploy(config: &ClientConfig, artifact: &std::path::Path) -> Result<(), FundraiseError> {
    let bytecode = read_artifact(artifact)?;
    let wallet = WalletConnection::connect(
        &config.contract.rpc_url,
        &config.account,
        config.contract.max_ws_retries,
    )
    .await?;

    info!(
        "Deploying ChainFundraise with account: {}, balance: {} ETH",
        wallet.address(),
        format_ether(wallet.own_balance().await?)
    );
    confirm(
        &format!("Deploy ChainFundraise from {}?", wallet.address()),
        config.assume_yes,
    )?;

    let (address, tx_hash) = deploy_contract(&wallet, bytecode).await?;
    println!("ChainFundraise deployed at address: {address}");
    println!(
        "Transaction: {}",
        render::tx_link(&config.explorer_url, tx_hash)
    );

    config
        .state_file
        .save_value("CONTRACT_ADDRESS", &address.to_string())?;
    config
        .state_file
        .save_value("RPC_URL", &config.contract.rpc_url)?;
    println!(
        "Saved CONTRACT_ADDRESS to {}",
        config.state_file.path().display()
    );
    Ok(())
}
