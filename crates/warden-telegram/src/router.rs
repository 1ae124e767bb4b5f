use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tracing::{info, warn};

use warden_core::{
    banlist::BannedWords,
    broadcast::{dispatcher::DispatchConfig, session::BroadcastController},
    config::Config,
    domain::UserId,
    messaging::port::TransportPort,
    moderation::ModerationEngine,
    registry::Registry,
    scheduler::{ActionRunner, Scheduler},
};

use crate::handlers;
use crate::TelegramTransport;

/// Everything the update handlers need, injected through dptree.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub admin: UserId,
    pub registry: Arc<Registry>,
    pub banned: Arc<BannedWords>,
    pub scheduler: Scheduler,
    pub transport: Arc<dyn TransportPort>,
    pub moderation: ModerationEngine,
    pub controller: BroadcastController,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!("warden started: @{}", me.username()),
        Err(e) => warn!("could not fetch bot identity: {e}"),
    }

    let registry = Arc::new(Registry::open(&cfg.db_path)?);
    let banned = Arc::new(BannedWords::load(&cfg.banned_words_path)?);

    let transport: Arc<dyn TransportPort> = Arc::new(TelegramTransport::new(bot.clone()));
    let scheduler = Scheduler::spawn(ActionRunner {
        transport: transport.clone(),
        registry: registry.clone(),
        dispatch: DispatchConfig {
            send_interval: cfg.broadcast_send_interval,
            failure_sample_limit: cfg.failure_sample_limit,
        },
    });

    let admin = UserId(cfg.admin_id);
    let moderation = ModerationEngine::new(
        admin,
        cfg.warning_delete_delay,
        registry.clone(),
        banned.clone(),
        scheduler.clone(),
        transport.clone(),
    );
    let controller = BroadcastController::new(
        admin,
        cfg.preview_max_len,
        registry.clone(),
        scheduler.clone(),
    );

    let state = Arc::new(AppState {
        cfg,
        admin,
        registry,
        banned,
        scheduler: scheduler.clone(),
        transport,
        moderation,
        controller,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_chat_member().endpoint(handlers::handle_chat_member))
        .branch(Update::filter_my_chat_member().endpoint(handlers::handle_my_chat_member));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    // Pending delayed actions are lost here; nothing persists them.
    scheduler.shutdown();
    Ok(())
}
