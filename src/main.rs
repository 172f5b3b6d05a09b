use anyhow::Result;
use log::info;

use ledgerchain::{Blockchain, Transaction, Wallet};

// Walk through a full submit -> mine -> query cycle on a fresh ledger.
fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let ledger = Blockchain::new();

    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let miner = Wallet::generate();

    info!("alice: {}", alice.address());
    info!("alice secret key: {}", hex::encode(alice.secret_key_bytes()));
    info!("bob:   {}", bob.address());
    info!("miner: {}", miner.address());

    let mut tx = Transaction::new(alice.address().clone(), bob.address().clone(), 50.0);
    tx.sign(&alice)?;
    ledger.submit_transaction(tx)?;
    info!("submitted transfer alice -> bob: 50");

    ledger.mine_pending_transactions(miner.address())?;
    info!("chain length: {}", ledger.chain().len());

    // The miner's reward lands with the next mined block
    ledger.mine_pending_transactions(miner.address())?;

    info!("balance alice: {}", ledger.balance_of(alice.address()));
    info!("balance bob:   {}", ledger.balance_of(bob.address()));
    info!("balance miner: {}", ledger.balance_of(miner.address()));

    for tx in ledger.transaction_history(bob.address()) {
        info!("bob history: {:?} -> {}: {}", tx.sender, tx.recipient, tx.amount);
    }

    info!("chain valid: {}", ledger.is_valid());

    Ok(())
}
