use kuchiki::NodeRef;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::config::CurrencyFormat;
use crate::currency::format_amount;
use crate::dom::{attribute, element, CompiledSelector, DomError, Page};

pub const FREELANCER_ID_ATTR: &str = "data-freelancer-id";
pub const HOVERED_CLASS: &str = "hovered";
pub const VISIBLE_CLASS: &str = "visible";
pub const FILLED_CLASS: &str = "filled";
pub const OVERFLOW_TAG_CLASS: &str = "more-skills";
pub const ONLINE_INDICATOR_CLASS: &str = "online-indicator";

/// Fresh data for one rendered card.
///
/// `rating` and `hourly_rate` apply only when truthy, so `0` leaves the card
/// untouched. `is_online` applies whenever the key is present; `null` reads
/// as offline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CardUpdate {
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "present_flag")]
    pub is_online: Option<bool>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
}

fn present_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Some(is_truthy(&value)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(truthy_number),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_number(number: f64) -> bool {
    number != 0.0 && !number.is_nan()
}

/// Selectors for everything the controller looks for inside the page.
pub struct CardSelectors {
    pub card: CompiledSelector,
    pub contact: CompiledSelector,
    pub hire: CompiledSelector,
    pub skill_tag: CompiledSelector,
    pub non_card_target: CompiledSelector,
    pub toast_close: CompiledSelector,
    pub rating_number: CompiledSelector,
    pub star: CompiledSelector,
    pub online_indicator: CompiledSelector,
    pub image_container: CompiledSelector,
    pub hourly_rate: CompiledSelector,
}

impl CardSelectors {
    pub fn compile() -> Result<Self, DomError> {
        Ok(Self {
            card: CompiledSelector::compile("[data-freelancer-id]")?,
            contact: CompiledSelector::compile(".btn-contact")?,
            hire: CompiledSelector::compile(".btn-hire")?,
            skill_tag: CompiledSelector::compile(".skill-tag")?,
            non_card_target: CompiledSelector::compile("button, .skill-tag")?,
            toast_close: CompiledSelector::compile(".toast-close")?,
            rating_number: CompiledSelector::compile(".rating-number")?,
            star: CompiledSelector::compile(".star")?,
            online_indicator: CompiledSelector::compile(".online-indicator")?,
            image_container: CompiledSelector::compile(".profile-image-container")?,
            hourly_rate: CompiledSelector::compile(".hourly-rate")?,
        })
    }

    pub fn freelancer_id(&self, card: &NodeRef) -> Option<String> {
        attribute(card, FREELANCER_ID_ATTR)
    }

    pub fn find_card(&self, root: &NodeRef, freelancer_id: &str) -> Option<NodeRef> {
        self.card
            .select_all(root)
            .into_iter()
            .find(|card| self.freelancer_id(card).as_deref() == Some(freelancer_id))
    }
}

/// Applies `update` to `card`, each field independently.
pub fn apply_update(
    page: &mut Page,
    card: &NodeRef,
    update: &CardUpdate,
    selectors: &CardSelectors,
    currency: &CurrencyFormat,
) {
    if let Some(rating) = update.rating.filter(|rating| truthy_number(*rating)) {
        update_rating(page, card, rating, selectors);
    }

    if let Some(online) = update.is_online {
        update_online(page, card, online, selectors);
    }

    if let Some(rate) = update.hourly_rate.filter(|rate| truthy_number(*rate)) {
        if let Some(node) = selectors.hourly_rate.select_first(card) {
            page.set_text(&node, &format_amount(rate, currency));
        }
    }
}

fn update_rating(page: &mut Page, card: &NodeRef, rating: f64, selectors: &CardSelectors) {
    if let Some(number) = selectors.rating_number.select_first(card) {
        page.set_text(&number, &format_rating(rating));
    }

    let filled = rating.floor();
    for (index, star) in selectors.star.select_all(card).iter().enumerate() {
        if (index as f64) < filled {
            page.add_class(star, FILLED_CLASS);
        } else {
            page.remove_class(star, FILLED_CLASS);
        }
    }
}

/// One decimal place, ties rounded away from zero like `toFixed(1)`.
pub fn format_rating(rating: f64) -> String {
    format!("{:.1}", (rating * 10.0).round() / 10.0)
}

fn update_online(page: &mut Page, card: &NodeRef, online: bool, selectors: &CardSelectors) {
    let existing = selectors.online_indicator.select_all(card);
    if online {
        if !existing.is_empty() {
            return;
        }
        match selectors.image_container.select_first(card) {
            Some(container) => {
                let indicator = element(
                    "span",
                    &[("class", ONLINE_INDICATOR_CLASS), ("title", "Online")],
                );
                page.append_child(&container, indicator);
            }
            None => debug!(target: "cards", "card has no profile image container"),
        }
    } else {
        for indicator in existing {
            page.remove(&indicator);
        }
    }
}
