//! crates/countdown_core/src/identity.rs
//!
//! Guest identities are synthesized locally, without a round trip to the
//! identity provider's backend.

use uuid::Uuid;

use crate::domain::{User, DEFAULT_LEARNER_NAME};

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarStyle {
    /// Initials, used for user profiles.
    Initials,
    /// Illustrated faces, used on the message board.
    Notionists,
}

impl AvatarStyle {
    fn path(&self) -> &'static str {
        match self {
            AvatarStyle::Initials => "initials",
            AvatarStyle::Notionists => "notionists",
        }
    }
}

/// Deterministic avatar URL for a seed.
pub fn avatar_url(style: AvatarStyle, seed: &str) -> String {
    format!(
        "{}/{}/svg?seed={}",
        AVATAR_BASE_URL,
        style.path(),
        urlencoding::encode(seed)
    )
}

/// Creates a guest user from a chosen display name.
pub fn guest_user(display_name: &str) -> User {
    let display_name = match display_name.trim() {
        "" => DEFAULT_LEARNER_NAME.to_string(),
        name => name.to_string(),
    };
    User {
        id: format!("guest-{}", Uuid::new_v4()),
        avatar_url: Some(avatar_url(AvatarStyle::Initials, &display_name)),
        display_name,
        is_guest: true,
    }
}
