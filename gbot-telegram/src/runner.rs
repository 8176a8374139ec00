//! Dispatcher runner: converts Telegram updates into escrow events and routes
//! them to the service. Messages drive the conversation sessions and commands;
//! callback queries carry the inline-button actions.

use anyhow::Result;
use gbot_core::{DealId, Event, User};
use gbot_escrow::{EscrowConfig, EscrowService, NoVerification, SessionOutcome, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::KeyboardRemove;
use teloxide::{dptree, Bot};
use tracing::{info, instrument};

use crate::adapters::{parse_command_arg, parse_start_payload, to_core_user, CallbackCommand};
use crate::config::TelegramConfig;
use crate::keyboards::{
    currency_keyboard, main_keyboard, BTN_CREATE_DEAL, BTN_MANAGE_WALLET, BTN_SUPPORT,
};
use crate::notifier::TelegramNotifier;

const GREETING: &str = "Welcome to the escrow desk — a safe P2P middleman.\n\n\
💼 Buy and sell anything with a minimal fee.\n\
Pick a section below:";

const WALLET_FIRST: &str = "Set your wallet currency first via 'Manage payout details'.";

/// Builds the service and runs the teloxide dispatcher until shutdown.
#[instrument(skip(config))]
pub async fn run_bot(config: TelegramConfig) -> Result<()> {
    let bot = Bot::new(config.bot_token.clone());

    // Share links must carry the real username, so refine the configured one.
    let mut bot_username = config.bot_username.clone();
    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            bot_username = username.clone();
            info!(username = %username, "bot username resolved before dispatch");
        }
    }

    let service = EscrowService::new(
        EscrowConfig {
            bot_username,
            operator_handle: config.operator_handle.clone(),
            verification_timeout: Duration::from_secs(config.verification_timeout_secs),
        },
        Arc::new(TelegramNotifier::new(bot.clone())),
        Arc::new(NoVerification),
    );
    let sessions = Arc::new(SessionStore::new());

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("starting escrow bot dispatcher");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![service, sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Handles escrow events off the update path so the dispatcher stays responsive.
fn dispatch(service: Arc<EscrowService>, event: Event) {
    tokio::spawn(async move {
        service.handle(event).await;
    });
}

async fn on_message(
    bot: Bot,
    msg: Message,
    service: Arc<EscrowService>,
    sessions: Arc<SessionStore>,
) -> ResponseResult<()> {
    let (Some(text), Some(tg_user)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };
    let user = to_core_user(tg_user);
    info!(user_id = user.id, message_content = %text, "Received message");

    // Share-link entry: /start deal<id>.
    if let Some(deal_id) = parse_start_payload(text) {
        dispatch(service, Event::JoinDeal { user, deal_id });
        return Ok(());
    }
    if text.starts_with("/start") {
        bot.send_message(msg.chat.id, GREETING)
            .reply_markup(main_keyboard())
            .await?;
        return Ok(());
    }
    // Out-of-band admin bootstrap.
    if text == "/pepeteam" {
        dispatch(service, Event::GrantAdmin { user_id: user.id });
        return Ok(());
    }
    if let Some(arg) = parse_command_arg(text, "/buy") {
        let id = arg.trim_start_matches('#');
        if id.is_empty() {
            bot.send_message(msg.chat.id, "Usage: /buy <deal_id>").await?;
        } else {
            dispatch(
                service,
                Event::AdminConfirmPayment {
                    caller_id: user.id,
                    deal_id: DealId::new(id),
                },
            );
        }
        return Ok(());
    }
    if let Some(arg) = parse_command_arg(text, "/verify") {
        let id = arg.trim_start_matches('#');
        if id.is_empty() {
            bot.send_message(msg.chat.id, "Usage: /verify <deal_id>").await?;
        } else {
            dispatch(
                service,
                Event::AdminVerifyTransfer {
                    caller_id: user.id,
                    deal_id: DealId::new(id),
                },
            );
        }
        return Ok(());
    }

    match text {
        BTN_SUPPORT => {
            bot.send_message(
                msg.chat.id,
                format!("🆘 Support: {}", service.config().operator_handle),
            )
            .await?;
        }
        BTN_MANAGE_WALLET => {
            sessions.begin_wallet_setup(user.id).await;
            bot.send_message(msg.chat.id, "💳 Pick your wallet currency:")
                .reply_markup(currency_keyboard())
                .await?;
        }
        BTN_CREATE_DEAL => {
            if service.wallet_of(user.id).await.is_none() {
                bot.send_message(msg.chat.id, WALLET_FIRST).await?;
            } else {
                sessions.begin_deal_creation(user.id).await;
                bot.send_message(msg.chat.id, "Enter the deal amount (digits only, e.g. 100):")
                    .await?;
            }
        }
        _ => advance_session(&bot, &msg, &service, &sessions, &user, text).await?,
    }

    Ok(())
}

/// Feeds free text into the user's active session, if any, and reacts to the
/// outcome: prompts for the next step or emits the completed event.
async fn advance_session(
    bot: &Bot,
    msg: &Message,
    service: &Arc<EscrowService>,
    sessions: &SessionStore,
    user: &User,
    text: &str,
) -> ResponseResult<()> {
    let Some(outcome) = sessions.advance(user.id, text).await else {
        return Ok(());
    };

    match outcome {
        SessionOutcome::Rejected { reply } => {
            bot.send_message(msg.chat.id, reply).await?;
        }
        SessionOutcome::CurrencyChosen { currency } => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ Wallet currency set: {}\nEnter your receiving details (card, TON address, other):",
                    currency
                ),
            )
            .reply_markup(KeyboardRemove::new())
            .await?;
        }
        SessionOutcome::WalletReady { currency, address } => {
            dispatch(
                service.clone(),
                Event::RegisterWallet {
                    user_id: user.id,
                    currency,
                    address,
                },
            );
            bot.send_message(msg.chat.id, "Back to the main menu:")
                .reply_markup(main_keyboard())
                .await?;
        }
        SessionOutcome::AmountAccepted { amount } => {
            let currency = service
                .wallet_of(user.id)
                .await
                .map(|p| p.currency.to_string())
                .unwrap_or_default();
            bot.send_message(
                msg.chat.id,
                format!("📝 Describe what you offer in this deal for {} {}:", amount, currency),
            )
            .await?;
        }
        SessionOutcome::DealReady {
            amount,
            description,
        } => {
            dispatch(
                service.clone(),
                Event::CreateDeal {
                    user: user.clone(),
                    amount,
                    description,
                },
            );
        }
    }

    Ok(())
}

async fn on_callback(bot: Bot, q: CallbackQuery, service: Arc<EscrowService>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let caller_id = q.from.id.0 as i64;
    info!(user_id = caller_id, data = %data, "Received callback");

    let event = match CallbackCommand::parse(data) {
        Some(CallbackCommand::ConfirmPayment(deal_id)) => Event::AdminConfirmPayment {
            caller_id,
            deal_id,
        },
        Some(CallbackCommand::ExitDeal(deal_id)) => Event::ExitDeal {
            user_id: caller_id,
            deal_id,
        },
        Some(CallbackCommand::ConfirmGiftSent(deal_id)) => Event::SellerConfirmGiftSent {
            user_id: caller_id,
            deal_id,
        },
        None => {
            info!(data = %data, "unknown callback data ignored");
            return Ok(());
        }
    };

    dispatch(service, event);
    Ok(())
}
