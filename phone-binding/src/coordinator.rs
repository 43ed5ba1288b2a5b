use std::time::Duration;

use candybot_common::reqwest::{StatusCode, Url};
use candybot_common::teloxide::prelude::{Message, UserId};
use candybot_common::teloxide::types::User;
use candybot_common::utils::requests::{post_json_with_timeout, API_TIMEOUT};
use serde::Serialize;

use crate::referrals::{ReferralPolicy, ReferralStore};

/// Who shared the contact, as reported by Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl SenderProfile {
    /// The `@handle` if the user has one, otherwise first and last name glued together.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(username) if !username.is_empty() => username.to_string(),
            _ => format!(
                "{}{}",
                self.first_name,
                self.last_name.as_deref().unwrap_or_default()
            ),
        }
    }
}

impl From<&User> for SenderProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// An inbound message that may or may not carry a shared phone contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEvent {
    pub sender: SenderProfile,
    pub phone_number: Option<String>,
}

impl ContactEvent {
    /// `None` for messages without a sender (channel posts).
    pub fn from_message(message: &Message) -> Option<Self> {
        let sender = SenderProfile::from(message.from.as_ref()?);
        Some(Self {
            sender,
            phone_number: message
                .contact()
                .map(|contact| contact.phone_number.clone()),
        })
    }
}

/// Body of the account binding call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingRequest {
    pub user_id: u64,
    pub phone: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// The message had no phone contact, the user should press the button again
    MissingContact,
    /// The backend answered with something other than 200
    BindFailed { status_code: u16, body_text: String },
    /// The backend couldn't be reached or didn't answer in time
    BindError { message: String },
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound)
    }

    pub fn user_message(&self) -> String {
        match self {
            BindOutcome::Bound => {
                "✅ Successfully linked! Click the button below to start playing:".to_string()
            }
            BindOutcome::MissingContact => {
                "❌ No phone number received, please click the button again.".to_string()
            }
            BindOutcome::BindFailed {
                status_code,
                body_text,
            } => format!("❌ Link failed [{status_code}]: {body_text}"),
            BindOutcome::BindError { message } => {
                format!("❌ Failed to link, please contact admin.\n{message}")
            }
        }
    }
}

/// Remembers who invited whom and links shared phone numbers to game accounts.
pub struct BindingCoordinator {
    endpoint: Url,
    referrals: ReferralStore,
    policy: ReferralPolicy,
    timeout: Duration,
}

impl BindingCoordinator {
    pub fn new(endpoint: Url, referrals: ReferralStore, policy: ReferralPolicy) -> Self {
        Self {
            endpoint,
            referrals,
            policy,
            timeout: API_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn referrals(&self) -> &ReferralStore {
        &self.referrals
    }

    /// Stores the `/start` argument as the user's referrer. Absent or empty arguments
    /// leave the slot untouched.
    pub fn record_referral(&self, user_id: UserId, argument: &str) {
        if self.referrals.record(user_id, argument) {
            log::info!("Recorded referral {argument:?} for {user_id}");
        }
    }

    /// Builds the request body, or `None` if there is no phone number to bind.
    pub fn prepare_request(&self, event: &ContactEvent) -> Option<BindingRequest> {
        let phone = event
            .phone_number
            .as_deref()
            .filter(|phone| !phone.is_empty())?;
        Some(BindingRequest {
            user_id: event.sender.user_id.0,
            phone: phone.to_string(),
            username: event.sender.display_name(),
            referrer: self.referrals.get(&event.sender.user_id),
        })
    }

    /// Makes exactly one attempt to bind the shared phone number.
    pub async fn bind_phone(&self, event: &ContactEvent) -> BindOutcome {
        let Some(request) = self.prepare_request(event) else {
            return BindOutcome::MissingContact;
        };
        log::debug!("Binding request: {request:?}");

        let response = match post_json_with_timeout(&self.endpoint, &request, self.timeout).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("Binding call for {} failed: {err:?}", request.user_id);
                return BindOutcome::BindError {
                    message: err.to_string(),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            log::info!(
                "User {} bound, referrer: {:?}",
                request.user_id,
                request.referrer
            );
            if self.policy == ReferralPolicy::OneShot {
                self.referrals.clear(&event.sender.user_id);
            }
            return BindOutcome::Bound;
        }

        match response.text().await {
            Ok(body_text) => {
                log::info!(
                    "Binding rejected for {} with {status}: {body_text}",
                    request.user_id
                );
                BindOutcome::BindFailed {
                    status_code: status.as_u16(),
                    body_text,
                }
            }
            Err(err) => {
                log::warn!(
                    "Couldn't read binding response for {}: {err:?}",
                    request.user_id
                );
                BindOutcome::BindError {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: Option<&str>, first_name: &str, last_name: Option<&str>) -> SenderProfile {
        SenderProfile {
            user_id: UserId(42),
            username: username.map(str::to_string),
            first_name: first_name.to_string(),
            last_name: last_name.map(str::to_string),
        }
    }

    fn coordinator() -> BindingCoordinator {
        BindingCoordinator::new(
            "http://127.0.0.1:1/bind".parse().unwrap(),
            ReferralStore::new(),
            ReferralPolicy::Reusable,
        )
    }

    #[test]
    fn display_name_prefers_handle() {
        assert_eq!(
            profile(Some("alice"), "Alice", Some("Smith")).display_name(),
            "alice"
        );
    }

    #[test]
    fn display_name_falls_back_to_names() {
        assert_eq!(profile(None, "Bob", None).display_name(), "Bob");
        assert_eq!(profile(Some(""), "Bob", Some("")).display_name(), "Bob");
        assert_eq!(profile(None, "Bob", Some("Lee")).display_name(), "BobLee");
        assert_eq!(profile(None, "", None).display_name(), "");
    }

    #[test]
    fn request_without_referral_has_no_referrer_key() {
        let coordinator = coordinator();
        let request = coordinator
            .prepare_request(&ContactEvent {
                sender: profile(Some("alice"), "Alice", None),
                phone_number: Some("+15551234567".to_string()),
            })
            .unwrap();
        assert_eq!(request.referrer, None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "user_id": 42,
                "phone": "+15551234567",
                "username": "alice",
            })
        );
    }

    #[test]
    fn request_carries_recorded_referral() {
        let coordinator = coordinator();
        coordinator.record_referral(UserId(42), "987654321");
        let request = coordinator
            .prepare_request(&ContactEvent {
                sender: profile(None, "Bob", Some("Lee")),
                phone_number: Some("+15551234567".to_string()),
            })
            .unwrap();
        assert_eq!(request.referrer.as_deref(), Some("987654321"));
        assert_eq!(request.username, "BobLee");
        assert_eq!(
            serde_json::to_value(&request).unwrap()["referrer"],
            "987654321"
        );
    }

    #[test]
    fn no_request_without_phone() {
        let coordinator = coordinator();
        let mut event = ContactEvent {
            sender: profile(Some("alice"), "Alice", None),
            phone_number: None,
        };
        assert!(coordinator.prepare_request(&event).is_none());
        event.phone_number = Some(String::new());
        assert!(coordinator.prepare_request(&event).is_none());
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            BindOutcome::BindFailed {
                status_code: 409,
                body_text: "{\"detail\":\"phone already bound\"}".to_string()
            }
            .user_message(),
            "❌ Link failed [409]: {\"detail\":\"phone already bound\"}"
        );
        assert!(BindOutcome::BindError {
            message: "timed out".to_string()
        }
        .user_message()
        .ends_with("\ntimed out"));
        assert!(BindOutcome::MissingContact
            .user_message()
            .contains("No phone number received"));
        assert!(BindOutcome::Bound.is_bound());
    }
}
