use regex::{Captures, Regex};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

/// A wrapper for sensitive data that masks its value in Debug and Display output.
///
/// Serialization still writes the real value: API responses need it, log macros
/// such as `tracing::info!("{:?}", session)` must not.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

const SENSITIVE_KEYS: [&str; 7] = [
    "password",
    "token",
    "secret",
    "authorization",
    "cookie",
    "api_key",
    "apikey",
];

/// E-mail addresses; a sentence-ending dot stays outside the match
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("invalid email pattern")
});

/// A run of digits broken up by spaces, dots, dashes or parentheses, not glued
/// to a preceding word. Group 1 is the boundary, group 2 the number itself.
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\w])(\+?\(?\d(?:[ ().-]{1,3}\d|\d)*)").expect("invalid digit run pattern")
});

const CARD_DIGITS: RangeInclusive<usize> = 13..=19;
const PHONE_DIGITS: RangeInclusive<usize> = 10..=12;

/// Replace e-mail addresses, card-like and phone-like digit runs in free text.
pub fn scrub_text(input: &str) -> String {
    let without_emails = EMAIL.replace_all(input, "[email]");
    DIGIT_RUN
        .replace_all(&without_emails, |caps: &Captures<'_>| {
            let number = &caps[2];
            let digits = number.chars().filter(char::is_ascii_digit).count();
            let replacement = if CARD_DIGITS.contains(&digits) {
                "[card]"
            } else if PHONE_DIGITS.contains(&digits) {
                "[phone]"
            } else {
                number
            };
            format!("{}{}", &caps[1], replacement)
        })
        .into_owned()
}

/// Scrub every string inside a JSON value in place.
///
/// Values stored under credential-looking keys are replaced wholesale.
pub fn scrub_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = scrub_text(s),
        Value::Array(items) => items.iter_mut().for_each(scrub_value),
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                let key = key.to_ascii_lowercase();
                if SENSITIVE_KEYS.iter().any(|k| key.contains(k)) {
                    *inner = Value::String("[redacted]".to_string());
                } else {
                    scrub_value(inner);
                }
            }
        }
        _ => {}
    }
}
