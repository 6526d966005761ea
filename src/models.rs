use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const FREE_PRICE: &str = "Бесплатно";
pub const NO_DESCRIPTION: &str = "Без описания";
pub const PLENTY_AVAILABLE: &str = "Много мест";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub date: String,
    pub time: String,
    pub booking_link: String,
    pub price: String,
    pub description: String,
    pub remaining: String,
}

impl Event {
    /// A listing candidate before enrichment: display fields carry their sentinels.
    pub fn candidate(date: String, time: String, booking_link: String) -> Self {
        Self {
            date,
            time,
            booking_link,
            price: FREE_PRICE.to_string(),
            description: NO_DESCRIPTION.to_string(),
            remaining: PLENTY_AVAILABLE.to_string(),
        }
    }

    /// Identity of a listing candidate: date, listing time and booking link.
    ///
    /// Take it before enrichment. The detail page may rewrite `time` and fills the
    /// display fields, and neither may change which event this is.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.date.as_bytes());
        hasher.update(b"|");
        hasher.update(self.time.as_bytes());
        hasher.update(b"|");
        hasher.update(self.booking_link.as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }
}

/// Opaque digest of an event's identity fields. Only equality is meaningful.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event::candidate(
            "12 марта".to_string(),
            "Большой стендап".to_string(),
            "https://standupstore.ru/events/big-show/".to_string(),
        )
    }

    #[test]
    fn identical_identity_fields_share_a_fingerprint() {
        let first = sample();
        let second = sample();
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().to_string().len(), 64);
    }

    #[test]
    fn any_identity_field_changes_the_fingerprint() {
        let base = sample().fingerprint();

        let mut moved = sample();
        moved.date = "13 марта".to_string();
        assert_ne!(base, moved.fingerprint());

        let mut retitled = sample();
        retitled.time = "Открытый микрофон".to_string();
        assert_ne!(base, retitled.fingerprint());

        let mut relinked = sample();
        relinked.booking_link = "https://standupstore.ru/events/other/".to_string();
        assert_ne!(base, relinked.fingerprint());
    }

    #[test]
    fn detail_fields_are_not_part_of_identity() {
        let base = sample();
        let mut enriched = sample();
        enriched.price = "1500".to_string();
        enriched.description = "Открытый микрофон".to_string();
        enriched.remaining = "_Осталось 3 билета_".to_string();
        assert_eq!(base.fingerprint(), enriched.fingerprint());
    }

    #[test]
    fn field_boundaries_are_separated() {
        let mut left = sample();
        left.date = "1".to_string();
        left.time = "2 марта".to_string();
        let mut right = sample();
        right.date = "12".to_string();
        right.time = " марта".to_string();
        assert_ne!(left.fingerprint(), right.fingerprint());
    }
}
