use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use freelancer_cards::card::CardSelectors;
use freelancer_cards::{
    CardInteractionController, CardUpdate, ControllerConfig, HttpApiClient, Page, Rect, ToastKind,
};
use kuchiki::NodeRef;
use tracing_subscriber::EnvFilter;

const CARD_HEIGHT: f64 = 320.0;
const VIEWPORT_WIDTH: f64 = 1280.0;

fn main() {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let mut args = std::env::args().skip(1);
    let Some(page_path) = args.next() else {
        eprintln!("usage: freelancer-cards <page.html> [click:<selector> | hover:<selector> | scroll:<offset> | advance:<ms> | toast:<kind>:<message> | update:<id>:<json>]...");
        std::process::exit(2);
    };
    let actions: Vec<String> = args.collect();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Failed to start runtime: {err}");
            std::process::exit(1);
        });

    if let Err(err) = rt.block_on(run(PathBuf::from(page_path), actions)) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(page_path: PathBuf, actions: Vec<String>) -> Result<()> {
    let config_path = std::env::var("CARDS_CONFIG").ok().map(PathBuf::from);
    let config = ControllerConfig::load(config_path).context("failed to load controller config")?;

    let html = std::fs::read_to_string(&page_path)
        .with_context(|| format!("failed to read {}", page_path.display()))?;
    let api = HttpApiClient::new(config.base_url.clone(), &config.user_agent)?;
    let mut controller =
        CardInteractionController::new(Page::parse(&html), Arc::new(api), config)?;

    for action in &actions {
        apply_action(&mut controller, action)
            .await
            .with_context(|| format!("action '{action}' failed"))?;
    }

    controller.settle().await;

    println!("{}", controller.page().to_html());
    match controller.location().href() {
        Some(href) => eprintln!("location: {href}"),
        None => eprintln!("location: unchanged"),
    }
    Ok(())
}

async fn apply_action(controller: &mut CardInteractionController, action: &str) -> Result<()> {
    let (kind, argument) = action
        .split_once(':')
        .ok_or_else(|| anyhow!("expected <kind>:<argument>"))?;

    match kind {
        "click" => {
            let target = select(controller, argument)?;
            let outcome = controller.handle_click(&target).await;
            tracing::info!(actions = ?outcome.actions, prevented = outcome.default_prevented, "click dispatched");
        }
        "hover" => {
            let target = select(controller, argument)?;
            controller.handle_hover(&target);
        }
        "scroll" => {
            let offset: f64 = argument.parse().context("scroll offset must be a number")?;
            let cards = CardSelectors::compile()?.card.select_all(controller.page().document());
            let viewport = Rect::new(0.0, offset, VIEWPORT_WIDTH, 800.0);
            controller.handle_viewport(viewport, |node| stacked_layout(&cards, node));
        }
        "toast" => {
            let (kind, message) = argument
                .split_once(':')
                .ok_or_else(|| anyhow!("expected toast:<kind>:<message>"))?;
            controller.show_toast(message, kind.parse::<ToastKind>()?)?;
        }
        "advance" => {
            let delta: u64 = argument.parse().context("advance takes milliseconds")?;
            controller.advance_time(delta);
        }
        "update" => {
            let (freelancer_id, payload) = argument
                .split_once(':')
                .ok_or_else(|| anyhow!("expected update:<id>:<json>"))?;
            let update: CardUpdate = serde_json::from_str(payload)?;
            if !controller.update_card(freelancer_id, &update) {
                tracing::warn!(%freelancer_id, "no card to update");
            }
        }
        other => bail!("unknown action '{other}'"),
    }
    Ok(())
}

fn select(controller: &CardInteractionController, selector: &str) -> Result<NodeRef> {
    controller
        .page()
        .select_first(selector)?
        .ok_or_else(|| anyhow!("nothing matches '{selector}'"))
}

/// Cards laid out one per row, in document order.
fn stacked_layout(cards: &[NodeRef], node: &NodeRef) -> Option<Rect> {
    let index = cards.iter().position(|card| card == node)?;
    Some(Rect::new(
        0.0,
        index as f64 * CARD_HEIGHT,
        VIEWPORT_WIDTH,
        CARD_HEIGHT,
    ))
}
