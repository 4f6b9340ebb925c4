//! Request paths the controller calls and navigation targets it produces.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const CHAT_INITIATE: &str = "/api/chat/initiate";
pub const ANALYTICS_TRACK: &str = "/api/analytics/track";

/// Characters `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

pub fn preview(freelancer_id: &str) -> String {
    format!("/api/freelancer/{}/preview", encode_component(freelancer_id))
}

pub fn chat_location(chat_id: &str) -> String {
    format!("/chat/{}", encode_component(chat_id))
}

pub fn profile_location(freelancer_id: &str) -> String {
    format!("/freelancer/{}", encode_component(freelancer_id))
}

pub fn skill_search_location(skill: &str) -> String {
    format!("/search?skill={}", encode_component(skill))
}
