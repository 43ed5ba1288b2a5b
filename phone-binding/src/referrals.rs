use std::str::FromStr;
use std::sync::Arc;

use candybot_common::teloxide::prelude::UserId;
use dashmap::DashMap;

/// Referral tokens captured from `/start <token>`, one slot per user.
///
/// Lives only in memory. Cloning shares the same slots.
#[derive(Debug, Clone, Default)]
pub struct ReferralStore {
    slots: Arc<DashMap<UserId, String>>,
}

impl ReferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins. Empty tokens are ignored, returns whether anything was stored.
    pub fn record(&self, user_id: UserId, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        if let Some(previous) = self.slots.insert(user_id, token.to_string()) {
            log::debug!("Referral of {user_id} replaced: {previous} -> {token}");
        }
        true
    }

    pub fn get(&self, user_id: &UserId) -> Option<String> {
        self.slots.get(user_id).map(|token| token.value().clone())
    }

    pub fn clear(&self, user_id: &UserId) -> Option<String> {
        self.slots.remove(user_id).map(|(_, token)| token)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// What happens to a recorded referral once the user is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferralPolicy {
    /// The token stays and is sent again on every later binding attempt
    #[default]
    Reusable,
    /// The token is dropped after the first successful binding
    OneShot,
}

impl FromStr for ReferralPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reusable" => Ok(ReferralPolicy::Reusable),
            "one-shot" | "oneshot" | "one_shot" => Ok(ReferralPolicy::OneShot),
            other => Err(anyhow::anyhow!(
                "Unknown referral policy {other:?}, expected \"reusable\" or \"one-shot\""
            )),
        }
    }
}

/// Deep link that starts the bot with the inviter's id as the `/start` payload.
pub fn build_invite_link(bot_username: &str, user_id: UserId) -> String {
    format!("https://t.me/{bot_username}?start={user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_previous_token() {
        let store = ReferralStore::new();
        assert!(store.record(UserId(1), "111"));
        assert!(store.record(UserId(1), "222"));
        assert_eq!(store.get(&UserId(1)).as_deref(), Some("222"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_token_is_a_noop() {
        let store = ReferralStore::new();
        assert!(!store.record(UserId(1), ""));
        assert!(store.is_empty());

        store.record(UserId(1), "111");
        assert!(!store.record(UserId(1), ""));
        assert_eq!(store.get(&UserId(1)).as_deref(), Some("111"));
    }

    #[test]
    fn slots_are_per_user() {
        let store = ReferralStore::new();
        store.record(UserId(1), "abc");
        assert_eq!(store.get(&UserId(2)), None);
        assert_eq!(store.clear(&UserId(1)).as_deref(), Some("abc"));
        assert_eq!(store.get(&UserId(1)), None);
    }

    #[test]
    fn clones_share_slots() {
        let store = ReferralStore::new();
        let clone = store.clone();
        clone.record(UserId(7), "inviter");
        assert_eq!(store.get(&UserId(7)).as_deref(), Some("inviter"));
    }

    #[test]
    fn invite_link_embeds_user_id() {
        assert_eq!(
            build_invite_link("CandyGameBot", UserId(123456789)),
            "https://t.me/CandyGameBot?start=123456789"
        );
    }

    #[test]
    fn parses_policy() {
        assert_eq!(
            "reusable".parse::<ReferralPolicy>().unwrap(),
            ReferralPolicy::Reusable
        );
        assert_eq!(
            "One-Shot".parse::<ReferralPolicy>().unwrap(),
            ReferralPolicy::OneShot
        );
        assert!("forever".parse::<ReferralPolicy>().is_err());
    }
}
