use serde::Deserialize;

/// Only the top of the list is ever shown
pub const MAX_ENTRIES: usize = 10;

pub const HEADER: &str = "🏆 Today's TOP 10 Leaderboard\n\n";
pub const FOOTER: &str = "\n🔥 Keep challenging and aim for the top!";

/// Shorter numbers are shown as is
pub const MIN_MASKED_LEN: usize = 6;
pub const VISIBLE_PREFIX_LEN: usize = 4;
pub const VISIBLE_SUFFIX_LEN: usize = 2;
/// Replaces the middle of the number no matter how long it is
pub const MASK: &str = "****";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreEntry {
    pub phone: String,
    /// Kept as the raw JSON number so `1200` and `1200.5` both print the way the API sent them
    pub max_score: serde_json::Number,
}

pub fn mask_phone(phone: &str) -> String {
    let chars = phone.chars().collect::<Vec<_>>();
    if chars.len() < MIN_MASKED_LEN {
        return phone.to_string();
    }
    let prefix = chars[..VISIBLE_PREFIX_LEN].iter().collect::<String>();
    let suffix = chars[chars.len() - VISIBLE_SUFFIX_LEN..]
        .iter()
        .collect::<String>();
    format!("{prefix}{MASK}{suffix}")
}

/// Medal for the top 3, keycap digits for the rest.
pub fn rank_decoration(idx: usize) -> String {
    match idx {
        0 => "👑".to_string(),
        1 => "🥈".to_string(),
        2 => "🥉".to_string(),
        9 => "🔟".to_string(),
        _ => format!("{}\u{FE0F}\u{20E3}", idx + 1),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardDigest {
    lines: Vec<String>,
}

impl LeaderboardDigest {
    /// Takes entries in the order given, the API is trusted to have sorted them.
    pub fn from_entries(entries: &[ScoreEntry]) -> Self {
        let lines = entries
            .iter()
            .take(MAX_ENTRIES)
            .enumerate()
            .map(|(idx, entry)| {
                format!(
                    "{} {} — {} pts",
                    rank_decoration(idx),
                    mask_phone(&entry.phone),
                    entry.max_score
                )
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_message(&self) -> String {
        let mut message = HEADER.to_string();
        for line in &self.lines {
            message.push_str(line);
            message.push('\n');
        }
        message.push_str(FOOTER);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(phone: &str, score: i64) -> ScoreEntry {
        ScoreEntry {
            phone: phone.to_string(),
            max_score: score.into(),
        }
    }

    #[test]
    fn short_numbers_are_not_masked() {
        for phone in ["", "1", "12345", "+1234"] {
            assert_eq!(mask_phone(phone), phone);
        }
    }

    #[test]
    fn mask_keeps_prefix_and_suffix() {
        assert_eq!(mask_phone("123456"), "1234****56");
        assert_eq!(mask_phone("+8613800138000"), "+861****00");
        assert_eq!(mask_phone("+15551234567"), "+155****67");
    }

    #[test]
    fn mask_length_does_not_depend_on_input() {
        let lengths = ["1234567", "123456789012", "12345678901234567890"]
            .iter()
            .map(|phone| mask_phone(phone).chars().count())
            .collect::<Vec<_>>();
        assert!(lengths
            .iter()
            .all(|len| *len == VISIBLE_PREFIX_LEN + MASK.len() + VISIBLE_SUFFIX_LEN));
    }

    #[test]
    fn mask_counts_characters_not_bytes() {
        assert_eq!(mask_phone("٠١٢٣٤٥٦٧"), "٠١٢٣****٦٧");
    }

    #[test]
    fn decorations() {
        let expected = [
            "👑",
            "🥈",
            "🥉",
            "4\u{FE0F}\u{20E3}",
            "5\u{FE0F}\u{20E3}",
            "6\u{FE0F}\u{20E3}",
            "7\u{FE0F}\u{20E3}",
            "8\u{FE0F}\u{20E3}",
            "9\u{FE0F}\u{20E3}",
            "🔟",
        ];
        for (idx, decoration) in expected.iter().enumerate() {
            assert_eq!(rank_decoration(idx), *decoration, "position {idx}");
        }
    }

    #[test]
    fn digest_keeps_only_top_ten_in_order() {
        let entries = (0..25)
            .map(|i| entry(&format!("+1555000{i:04}"), 1000 - i))
            .collect::<Vec<_>>();
        let digest = LeaderboardDigest::from_entries(&entries);
        assert_eq!(digest.lines().len(), MAX_ENTRIES);
        assert_eq!(digest.lines()[0], "👑 +155****00 — 1000 pts");
        assert_eq!(digest.lines()[9], "🔟 +155****09 — 991 pts");
    }

    #[test]
    fn message_layout() {
        let digest = LeaderboardDigest::from_entries(&[
            entry("+8613800138000", 98765),
            ScoreEntry {
                phone: "12345".to_string(),
                max_score: serde_json::Number::from_f64(1200.5).unwrap(),
            },
        ]);
        assert_eq!(
            digest.to_message(),
            "🏆 Today's TOP 10 Leaderboard\n\n\
             👑 +861****00 — 98765 pts\n\
             🥈 12345 — 1200.5 pts\n\
             \n🔥 Keep challenging and aim for the top!"
        );
    }

    #[test]
    fn empty_digest_still_has_header_and_footer() {
        let digest = LeaderboardDigest::from_entries(&[]);
        assert!(digest.lines().is_empty());
        assert_eq!(digest.to_message(), format!("{HEADER}{FOOTER}"));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let entries: Vec<ScoreEntry> = serde_json::from_value(serde_json::json!([
            {"phone": "+15551234567", "max_score": 42, "nickname": "bob", "updated_at": 0}
        ]))
        .unwrap();
        assert_eq!(entries, vec![entry("+15551234567", 42)]);
    }
}
