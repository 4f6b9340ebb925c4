use std::sync::Arc;

use kuchiki::NodeRef;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::analytics::{Analytics, AnalyticsHook};
use crate::card::{
    apply_update, CardSelectors, CardUpdate, HOVERED_CLASS, OVERFLOW_TAG_CLASS, VISIBLE_CLASS,
};
use crate::config::ControllerConfig;
use crate::dom::{has_class, text_of, DomError, Page};
use crate::net::{endpoints, ApiClient, ApiError};
use crate::preload::{PreloadCache, SessionStorage};
use crate::styles::{
    inject_once, CARD_ANIMATION_CSS, CARD_ANIMATION_STYLE_ID, TOAST_CSS, TOAST_STYLE_ID,
};
use crate::timers::TimerRegistry;
use crate::toast::{toast_id_of, ToastId, ToastKind, ToastStack};
use crate::visibility::{Rect, VisibilityObserver};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_META: &str = "csrf-token";

const OPENING_CHAT: &str = "Opening chat...";
const CHAT_FAILED: &str = "Could not start the chat. Please try again.";

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("dom error: {0}")]
    Dom(#[from] DomError),
}

/// Effects sequenced on the controller's virtual clock.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    Navigate(String),
    ToastExit(ToastId),
    ToastRemove(ToastId),
}

/// What one delegated click did. Several actions can come from one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    OpenChat { freelancer_id: String },
    ViewProfile { freelancer_id: String },
    SkillSearch { skill: String },
    CardView { freelancer_id: String },
    CloseToast(ToastId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub actions: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Opened { location: String },
    Failed,
}

/// Where the page has been sent. The controller never leaves the page on its
/// own; embedders read this to perform the actual navigation.
#[derive(Debug, Clone, Default)]
pub struct Location {
    history: Vec<String>,
}

impl Location {
    pub fn href(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn assign(&mut self, href: String) {
        self.history.push(href);
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    chat_id: Option<Value>,
}

struct PendingChat {
    freelancer_id: String,
    request: JoinHandle<Result<Value, ApiError>>,
}

/// Interaction controller for the freelancer cards rendered in one page.
pub struct CardInteractionController {
    page: Page,
    config: ControllerConfig,
    api: Arc<dyn ApiClient>,
    selectors: CardSelectors,
    analytics: Analytics,
    preload: PreloadCache,
    observer: VisibilityObserver,
    toasts: ToastStack,
    timers: TimerRegistry<Effect>,
    background: JoinSet<()>,
    location: Location,
}

impl CardInteractionController {
    /// Wires the controller to `page`: observes every card already present
    /// and injects the entrance animation stylesheet.
    ///
    /// Preloads and analytics beacons are spawned on the current tokio
    /// runtime; without one they are skipped and logged. `open_chat` and
    /// `handle_click` must be awaited on a tokio runtime.
    pub fn new(
        page: Page,
        api: Arc<dyn ApiClient>,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        Self::with_session_storage(page, api, config, SessionStorage::new())
    }

    pub fn with_session_storage(
        mut page: Page,
        api: Arc<dyn ApiClient>,
        config: ControllerConfig,
        storage: SessionStorage,
    ) -> Result<Self, ControllerError> {
        let selectors = CardSelectors::compile()?;
        let mut observer = VisibilityObserver::new(&config.visibility);
        for card in selectors.card.select_all(page.document()) {
            observer.observe(card);
        }
        inject_once(&mut page, CARD_ANIMATION_STYLE_ID, CARD_ANIMATION_CSS)?;

        info!(
            target: "cards",
            cards = observer.observed_count(),
            "card interaction controller ready"
        );

        Ok(Self {
            analytics: Analytics::new(Arc::clone(&api), config.user_agent.clone()),
            page,
            api,
            selectors,
            preload: PreloadCache::new(storage),
            observer,
            toasts: ToastStack::new(),
            timers: TimerRegistry::new(),
            background: JoinSet::new(),
            location: Location::default(),
            config,
        })
    }

    pub fn with_analytics_hook(mut self, hook: AnalyticsHook) -> Self {
        self.analytics.set_hook(hook);
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn session_storage(&self) -> &SessionStorage {
        self.preload.storage()
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn toast_count(&self) -> usize {
        self.toasts.len()
    }

    pub fn find_card(&self, freelancer_id: &str) -> Option<NodeRef> {
        self.selectors.find_card(self.page.document(), freelancer_id)
    }

    /// Starts visibility tracking for a card inserted after construction.
    pub fn observe_card(&mut self, card: NodeRef) -> bool {
        self.observer.observe(card)
    }

    /// Delegated click handler for any node in the page.
    pub async fn handle_click(&mut self, target: &NodeRef) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if self.selectors.toast_close.closest(target).is_some() {
            if let Some(id) = toast_id_of(target) {
                self.close_toast(id);
                outcome.actions.push(CardAction::CloseToast(id));
            }
            return outcome;
        }

        let Some(card) = self.selectors.card.closest(target) else {
            return outcome;
        };
        let Some(freelancer_id) = self.selectors.freelancer_id(&card) else {
            return outcome;
        };

        // Independent checks: one click may trigger several of these.
        let mut pending_chat = None;
        if self.selectors.contact.closest(target).is_some() {
            outcome.default_prevented = true;
            pending_chat = Some(self.begin_chat(&freelancer_id));
            outcome.actions.push(CardAction::OpenChat {
                freelancer_id: freelancer_id.clone(),
            });
        }

        if self.selectors.hire.closest(target).is_some() {
            self.view_profile(&freelancer_id);
            outcome.actions.push(CardAction::ViewProfile {
                freelancer_id: freelancer_id.clone(),
            });
        }

        if let Some(tag) = self.selectors.skill_tag.closest(target) {
            if !has_class(&tag, OVERFLOW_TAG_CLASS) {
                let skill = text_of(&tag);
                self.search_by_skill(&skill);
                outcome.actions.push(CardAction::SkillSearch { skill });
            }
        }

        if self.selectors.non_card_target.closest(target).is_none() {
            self.track_event(
                "freelancer_card_view",
                json!({ "freelancer_id": freelancer_id }),
            );
            outcome.actions.push(CardAction::CardView { freelancer_id });
        }

        if let Some(pending) = pending_chat {
            self.complete_chat(pending).await;
        }

        outcome
    }

    /// Delegated hover handler. Returns whether this was the card's first hover.
    pub fn handle_hover(&mut self, target: &NodeRef) -> bool {
        let Some(card) = self.selectors.card.closest(target) else {
            return false;
        };
        if !self.page.add_class(&card, HOVERED_CLASS) {
            return false;
        }
        if let Some(freelancer_id) = self.selectors.freelancer_id(&card) {
            self.preload_profile_data(&freelancer_id);
        }
        true
    }

    /// Feeds a viewport change to the visibility observer. Returns how many
    /// cards entered the viewport.
    pub fn handle_viewport<F>(&mut self, viewport: Rect, layout: F) -> usize
    where
        F: Fn(&NodeRef) -> Option<Rect>,
    {
        let entries = self.observer.measure(viewport, layout);
        let mut entered = 0;
        for entry in entries.into_iter().filter(|entry| entry.is_intersecting) {
            entered += 1;
            self.page.add_class(&entry.target, VISIBLE_CLASS);
            if let Some(freelancer_id) = self.selectors.freelancer_id(&entry.target) {
                self.track_event(
                    "freelancer_impression",
                    json!({ "freelancer_id": freelancer_id, "ratio": entry.ratio }),
                );
            }
        }
        entered
    }

    pub async fn open_chat(&mut self, freelancer_id: &str) -> ChatOutcome {
        let pending = self.begin_chat(freelancer_id);
        self.complete_chat(pending).await
    }

    fn begin_chat(&mut self, freelancer_id: &str) -> PendingChat {
        self.notify(OPENING_CHAT, ToastKind::Info);

        let csrf = self.page.meta_content(CSRF_META).unwrap_or_default();
        let body = json!({
            "freelancer_id": freelancer_id,
            "message": self.config.chat_message,
        });
        let api = Arc::clone(&self.api);
        let request = tokio::spawn(async move {
            api.post_json(
                endpoints::CHAT_INITIATE,
                body,
                vec![(CSRF_HEADER.to_string(), csrf)],
            )
            .await
        });

        self.track_event(
            "freelancer_contact",
            json!({ "freelancer_id": freelancer_id }),
        );

        PendingChat {
            freelancer_id: freelancer_id.to_string(),
            request,
        }
    }

    async fn complete_chat(&mut self, pending: PendingChat) -> ChatOutcome {
        let PendingChat {
            freelancer_id,
            request,
        } = pending;

        let chat_id = match request.await {
            Ok(Ok(body)) => match serde_json::from_value::<ChatResponse>(body) {
                Ok(ChatResponse {
                    success: true,
                    chat_id: Some(chat_id),
                }) => Some(chat_id),
                Ok(response) => {
                    warn!(target: "cards", %freelancer_id, success = response.success, "chat was not initiated");
                    None
                }
                Err(err) => {
                    warn!(target: "cards", %freelancer_id, error = %err, "unexpected chat response");
                    None
                }
            },
            Ok(Err(err)) => {
                warn!(target: "cards", %freelancer_id, error = %err, "chat request failed");
                None
            }
            Err(err) => {
                error!(target: "cards", %freelancer_id, error = %err, "chat request task failed");
                None
            }
        };

        match chat_id {
            Some(chat_id) => {
                let chat_id = match chat_id {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                let location = endpoints::chat_location(&chat_id);
                self.navigate(location.clone());
                ChatOutcome::Opened { location }
            }
            None => {
                self.notify(CHAT_FAILED, ToastKind::Error);
                ChatOutcome::Failed
            }
        }
    }

    pub fn view_profile(&mut self, freelancer_id: &str) {
        if let Some(card) = self.find_card(freelancer_id) {
            self.page.set_style(&card, "transform", "scale(0.98)");
            self.page.set_style(&card, "opacity", "0.8");
        }

        self.timers.set_timeout(
            self.config.timings.profile_navigation_ms,
            Effect::Navigate(endpoints::profile_location(freelancer_id)),
        );
        self.track_event(
            "freelancer_profile_view",
            json!({ "freelancer_id": freelancer_id }),
        );
    }

    pub fn search_by_skill(&mut self, skill: &str) {
        let matching: Vec<NodeRef> = self
            .selectors
            .skill_tag
            .select_all(self.page.document())
            .into_iter()
            .filter(|tag| text_of(tag) == skill)
            .collect();
        for tag in &matching {
            self.page.set_style(tag, "background-color", "#667eea");
            self.page.set_style(tag, "color", "#fff");
            self.page.set_style(tag, "transform", "scale(1.05)");
        }
        debug!(target: "cards", skill, highlighted = matching.len(), "skill search");

        self.timers.set_timeout(
            self.config.timings.skill_navigation_ms,
            Effect::Navigate(endpoints::skill_search_location(skill)),
        );
        self.track_event("skill_search", json!({ "skill": skill }));
    }

    /// Best-effort preview fetch. Returns whether a request was started.
    pub fn preload_profile_data(&mut self, freelancer_id: &str) -> bool {
        self.reap_finished();
        self.preload
            .preload(Arc::clone(&self.api), &mut self.background, freelancer_id)
    }

    pub fn is_preloaded(&self, freelancer_id: &str) -> bool {
        self.preload.is_preloaded(freelancer_id)
    }

    pub fn track_event(&mut self, event: &str, data: Value) {
        self.reap_finished();
        self.analytics.track(&mut self.background, event, data);
    }

    pub fn show_toast(&mut self, message: &str, kind: ToastKind) -> Result<ToastId, ControllerError> {
        inject_once(&mut self.page, TOAST_STYLE_ID, TOAST_CSS)?;
        let id = self.toasts.show(&mut self.page, message, kind)?;
        let timer = self
            .timers
            .set_timeout(self.config.timings.toast_lifetime_ms, Effect::ToastExit(id));
        self.toasts.track_timer(id, timer);
        Ok(id)
    }

    fn notify(&mut self, message: &str, kind: ToastKind) {
        if let Err(err) = self.show_toast(message, kind) {
            error!(target: "toast", error = %err, "failed to show toast");
        }
    }

    /// Removes a toast immediately. Returns `false` if it was already gone.
    pub fn close_toast(&mut self, id: ToastId) -> bool {
        match self.toasts.remove(&mut self.page, id) {
            Some(timers) => {
                for timer in timers {
                    self.timers.clear_timer(timer);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_toast_visible(&self, id: ToastId) -> bool {
        self.toasts.contains(id)
    }

    /// Returns `false` when no card carries `freelancer_id`.
    pub fn update_card(&mut self, freelancer_id: &str, update: &CardUpdate) -> bool {
        let Some(card) = self.find_card(freelancer_id) else {
            debug!(target: "cards", %freelancer_id, "update for unknown card");
            return false;
        };
        apply_update(
            &mut self.page,
            &card,
            update,
            &self.selectors,
            &self.config.currency,
        );
        true
    }

    /// Moves the virtual clock forward, running every effect that comes due.
    pub fn advance_time(&mut self, delta_ms: u64) {
        let until = self.timers.now_ms().saturating_add(delta_ms);
        while let Some((_, effect)) = self.timers.pop_due(until) {
            self.apply_effect(effect);
        }
        self.timers.finish_advance(until);
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Navigate(href) => self.navigate(href),
            Effect::ToastExit(id) => {
                if self.toasts.begin_exit(&mut self.page, id) {
                    let timer = self
                        .timers
                        .set_timeout(self.config.timings.toast_exit_ms, Effect::ToastRemove(id));
                    self.toasts.track_timer(id, timer);
                }
            }
            Effect::ToastRemove(id) => {
                self.toasts.remove(&mut self.page, id);
            }
        }
    }

    fn navigate(&mut self, href: String) {
        info!(target: "cards", %href, "navigating");
        self.location.assign(href);
    }

    /// Waits for outstanding preloads and analytics beacons.
    pub async fn settle(&mut self) {
        while let Some(result) = self.background.join_next().await {
            if let Err(err) = result {
                warn!(target: "cards", error = %err, "background task failed");
            }
        }
    }

    /// Drops background tasks that already finished.
    fn reap_finished(&mut self) {
        while let Some(result) = self.background.try_join_next() {
            if let Err(err) = result {
                warn!(target: "cards", error = %err, "background task failed");
            }
        }
    }

    pub fn background_tasks(&self) -> usize {
        self.background.len()
    }
}
