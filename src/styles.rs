use crate::dom::{element, DomError, Page};

pub const CARD_ANIMATION_STYLE_ID: &str = "freelancer-card-animations";
pub const TOAST_STYLE_ID: &str = "freelancer-toast-styles";

pub const CARD_ANIMATION_CSS: &str = r#"
.freelancer-card {
    opacity: 0;
    transform: translateY(20px);
    transition: opacity 0.6s ease, transform 0.6s ease;
}
.freelancer-card.visible {
    opacity: 1;
    transform: translateY(0);
}
.freelancer-card:nth-child(even) {
    transition-delay: 0.1s;
}
.freelancer-card:nth-child(3n) {
    transition-delay: 0.2s;
}
"#;

pub const TOAST_CSS: &str = r#"
.toast {
    position: fixed;
    top: 20px;
    right: 20px;
    display: flex;
    align-items: center;
    gap: 12px;
    padding: 12px 16px;
    border-radius: 8px;
    color: #fff;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.15);
    z-index: 10000;
    animation: slideIn 0.3s ease;
}
.toast-info { background: #3b82f6; }
.toast-error { background: #ef4444; }
.toast-success { background: #10b981; }
.toast-close {
    background: none;
    border: none;
    color: inherit;
    font-size: 18px;
    cursor: pointer;
}
@keyframes slideIn {
    from { transform: translateX(100%); opacity: 0; }
    to { transform: translateX(0); opacity: 1; }
}
"#;

/// Appends `<style id="{id}">` to `<head>` unless an element with that id
/// already exists. Returns whether the stylesheet was added.
pub fn inject_once(page: &mut Page, id: &str, css: &str) -> Result<bool, DomError> {
    if page.element_by_id(id).is_some() {
        return Ok(false);
    }

    let head = page.head()?;
    let style = element("style", &[("id", id)]);
    page.append_child(&head, style.clone());
    page.set_text(&style, css);
    Ok(true)
}
