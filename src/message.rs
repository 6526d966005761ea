use chrono::{DateTime, Utc};

use crate::models::Event;

const RADIX_DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Renders an event as Telegram MarkdownV2 text.
///
/// Fields are expected to be escaped already; `nonce` is appended to the booking
/// link so every message gets a fresh link preview.
pub fn render(event: &Event, nonce: &str) -> String {
    format!(
        "📆 *{date} {time}*\n\n🎤 *{description}*\n💷 *{price}*\n🎟️ {remaining}\n🎫 [*Купить билеты*]({link}?rand={nonce})\n",
        date = event.date,
        time = event.time,
        description = mark_gathering_time(&event.description),
        price = event.price,
        remaining = event.remaining,
        link = event.booking_link,
        nonce = nonce,
    )
}

pub fn cache_buster(now: DateTime<Utc>) -> String {
    base32(now.timestamp())
}

// "Сбор" (doors open) gets its own line with a clock.
fn mark_gathering_time(description: &str) -> String {
    description.replace("Сбор", "\n⏱️ Сбор")
}

fn base32(value: i64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let negative = value < 0;
    let mut rest = value.unsigned_abs();
    let mut digits = Vec::new();
    while rest > 0 {
        digits.push(RADIX_DIGITS[(rest % 32) as usize]);
        rest /= 32;
    }
    if negative {
        digits.push(b'-');
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn event() -> Event {
        Event {
            date: "12 марта".to_string(),
            time: "19:30".to_string(),
            booking_link: "https://standupstore.ru/events/big-standup/".to_string(),
            price: "1500".to_string(),
            description: "Большой стендап. Сбор в 19:00".to_string(),
            remaining: "_Осталось 4 билета_".to_string(),
        }
    }

    #[test]
    fn renders_markdown_message() {
        let text = render(&event(), "abc");
        let expected = "📆 *12 марта 19:30*\n\n🎤 *Большой стендап. \n⏱️ Сбор в 19:00*\n💷 *1500*\n🎟️ _Осталось 4 билета_\n🎫 [*Купить билеты*](https://standupstore.ru/events/big-standup/?rand=abc)\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn cache_buster_is_base32_unix_seconds() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp");
        assert_eq!(cache_buster(now), "1il7s80");
        assert_eq!(base32(0), "0");
        assert_eq!(base32(32), "10");
        assert_eq!(base32(-31), "-v");
    }
}
