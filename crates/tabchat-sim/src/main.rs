use std::time::Duration;

use tracing::{info, warn};

use tabchat_core::{ChatContext, ChatError, Origin, OriginConfig, User};

/// How long a tab waits for a sibling's notification before giving up.
const SYNC_WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tabchat_sim=debug,tabchat_core=debug,tabchat_db=info,tabchat_sync=info".into()
            }),
        )
        .init();

    let origin = Origin::open(OriginConfig::from_env());
    info!("Origin storage at {}", origin.config().db_path.display());

    let mut alice = open_tab(&origin, "alice")?;
    let mut bob = open_tab(&origin, "bob")?;
    alice.poll_sync();

    let message = alice.send_message("alice", "bob", "hi");
    info!("alice sent {} to bob", message.id);

    wait_for_sync(&mut bob).await;
    report(&bob, "alice");

    bob.select_conversation("alice")?;
    info!("bob opened the chat with alice");
    report(&bob, "alice");

    let cleared = alice.clear_conversation("bob")?;
    info!("alice cleared {} message(s) with bob", cleared);
    wait_for_sync(&mut bob).await;

    report(&alice, "bob");
    report(&bob, "alice");

    Ok(())
}

fn open_tab(origin: &Origin, identity: &str) -> anyhow::Result<ChatContext> {
    let mut tab = origin.open_context()?;
    match tab.register_user(User::new(identity)) {
        Ok(()) => {}
        Err(ChatError::DuplicateUser(name)) => info!("{} already registered", name),
        Err(e) => return Err(e.into()),
    }
    tab.login(identity)?;
    Ok(tab)
}

async fn wait_for_sync(tab: &mut ChatContext) {
    match tokio::time::timeout(SYNC_WAIT, tab.sync_next()).await {
        Ok(true) => {
            tab.poll_sync();
        }
        Ok(false) => warn!("Channels closed before a notification arrived"),
        Err(_) => warn!("No notification within {:?}", SYNC_WAIT),
    }
}

fn report(tab: &ChatContext, peer: &str) {
    let Some(identity) = tab.active_identity() else {
        return;
    };

    match tab.get_visible_messages(peer) {
        Ok(messages) => {
            let bodies: Vec<&str> = messages.map(|m| m.body.as_str()).collect();
            info!(
                "{} sees {} message(s) with {}: {:?}, unread {:?}",
                identity,
                bodies.len(),
                peer,
                bodies,
                tab.get_unread_counts()
            );
        }
        Err(e) => warn!("{} cannot read the chat with {}: {}", identity, peer, e),
    }
}
