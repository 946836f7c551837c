//! mailsync - Inbox sync service
//!
//! Serves the sync endpoint by default. A few subcommands manage the local
//! store:
//!
//! ```text
//! mailsync [serve]
//! mailsync link <user-id> <email> <access-token>
//! mailsync session <user-id> <bearer-token>
//! mailsync sync <user-id>
//! ```

use anyhow::{Result, bail};
use log::{error, info};
use mail::{
    Account, Credential, GmailClient, MailStore, ServiceConfig, SqliteMailStore, sync_account,
};
use std::sync::Arc;

mod server;

use server::SyncService;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let config = ServiceConfig::load()?;
    info!("Using database at {:?}", config.db_path);
    let store = Arc::new(SqliteMailStore::new(&config.db_path)?);
    let remote = Arc::new(GmailClient::with_base_url(&config.gmail_base_url));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["serve"] => {
            let service = Arc::new(SyncService::new(store, remote, config.sync_options()));
            server::serve(service, &config.listen_addr, config.workers)
        }
        ["link", user_id, email, access_token] => {
            link_account(store.as_ref(), user_id, email, access_token)
        }
        ["session", user_id, token] => {
            store.create_session(user_id, token)?;
            info!("Registered session for user {}", user_id);
            Ok(())
        }
        ["sync", user_id] => {
            let report = sync_account(
                remote.as_ref(),
                store.as_ref(),
                user_id,
                &config.sync_options(),
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        _ => bail!(
            "usage: mailsync [serve] | link <user-id> <email> <access-token> | \
             session <user-id> <bearer-token> | sync <user-id>"
        ),
    }
}

/// Link a mailbox to a user, or replace the stored credential of an
/// existing link
fn link_account(store: &dyn MailStore, user_id: &str, email: &str, access_token: &str) -> Result<()> {
    let credential = Credential::new(access_token);

    match store.find_account_for_user(user_id)? {
        Some(account) => {
            store.update_account_credential(account.id, &credential)?;
            info!("Updated credential for account {}", account.id);
        }
        None => {
            let account = store.create_account(Account::new(user_id, email).with_credential(credential))?;
            info!("Linked {} to user {} as account {}", email, user_id, account.id);
        }
    }
    Ok(())
}
