use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const SECONDS_PER_DAY: i64 = 86_400;

/// How long a recipe takes to cook, kept in whole seconds.
///
/// Parses the `[D day[s], ][[HH:]MM:]SS[.ffffff]` forms people type into the
/// recipe form and renders as `H:MM:SS`, with a day prefix past 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CookingTime {
    seconds: i64,
}

impl CookingTime {
    pub const DEFAULT: CookingTime = CookingTime::from_minutes(5);

    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds }
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Self {
            seconds: minutes * 60,
        }
    }

    pub fn as_seconds(&self) -> i64 {
        self.seconds
    }
}

impl Default for CookingTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CookingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.seconds / SECONDS_PER_DAY;
        let rest = self.seconds % SECONDS_PER_DAY;
        if days > 0 {
            write!(f, "{} day{}, ", days, if days == 1 { "" } else { "s" })?;
        }
        write!(
            f,
            "{}:{:02}:{:02}",
            rest / 3600,
            rest % 3600 / 60,
            rest % 60
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Enter a valid duration.")]
pub struct InvalidDuration;

fn parse_digits(text: &str) -> Result<i64, InvalidDuration> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidDuration);
    }
    text.parse().map_err(|_| InvalidDuration)
}

impl FromStr for CookingTime {
    type Err = InvalidDuration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (days, clock) = match s.split_once(' ') {
            Some((days, rest)) => {
                let rest = rest.trim_start();
                let rest = rest
                    .strip_prefix("days,")
                    .or_else(|| rest.strip_prefix("day,"))
                    .map(str::trim_start)
                    .unwrap_or(rest);
                (parse_digits(days)?, rest)
            }
            None => (0, s),
        };

        // Fractions of a second are accepted and dropped.
        let clock = match clock.split_once(['.', ',']) {
            Some((whole, fraction)) => {
                if fraction.len() > 12 || parse_digits(fraction).is_err() {
                    return Err(InvalidDuration);
                }
                whole
            }
            None => clock,
        };

        let parts = clock.split(':').collect::<Vec<_>>();
        if parts.len() > 3 {
            return Err(InvalidDuration);
        }
        let mut seconds = 0i64;
        for (part, unit) in parts.iter().rev().zip([1i64, 60, 3600]) {
            seconds = parse_digits(part)?
                .checked_mul(unit)
                .and_then(|s| s.checked_add(seconds))
                .ok_or(InvalidDuration)?;
        }
        days.checked_mul(SECONDS_PER_DAY)
            .and_then(|d| d.checked_add(seconds))
            .map(Self::from_seconds)
            .ok_or(InvalidDuration)
    }
}

impl Serialize for CookingTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CookingTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Render a price the way it is stored: exactly two fractional digits.
pub fn format_price(price: &Decimal) -> String {
    format!("{:.2}", price)
}

/// The editable columns of an ingredient, as cleaned by the ingredient form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientFields {
    pub name: String,
    pub weight: u32,
    pub weight_ready: u32,
    pub price: Decimal,
}

/// The editable columns of a recipe, plus the ingredients it links to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub cooking_time: CookingTime,
    pub ingredient_ids: Vec<i64>,
}

/// A file that arrived with a multipart form submission.
#[derive(Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content_bytes: Vec<u8>,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("content_bytes", &self.content_bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clock_forms() {
        assert_eq!("00:30:00".parse(), Ok(CookingTime::from_minutes(30)));
        assert_eq!("45:00".parse(), Ok(CookingTime::from_minutes(45)));
        assert_eq!("90".parse(), Ok(CookingTime::from_seconds(90)));
        assert_eq!("0:05:00.250".parse(), Ok(CookingTime::from_minutes(5)));
    }

    #[test]
    fn parses_day_prefix() {
        assert_eq!(
            "1 day, 2:00:00".parse(),
            Ok(CookingTime::from_seconds(86_400 + 7_200))
        );
        assert_eq!("2 00:00:10".parse(), Ok(CookingTime::from_seconds(172_810)));
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "abc", "-5", "1:2:3:4", "10 minutes", "1:xx", "::"] {
            assert_eq!(text.parse::<CookingTime>(), Err(InvalidDuration), "{text:?}");
        }
    }

    #[test]
    fn displays_like_a_clock() {
        assert_eq!(CookingTime::DEFAULT.to_string(), "0:05:00");
        assert_eq!(CookingTime::from_seconds(3_725).to_string(), "1:02:05");
        assert_eq!(
            CookingTime::from_seconds(2 * 86_400 + 61).to_string(),
            "2 days, 0:01:01"
        );
        let shown = CookingTime::from_seconds(86_400 + 59).to_string();
        assert_eq!(shown, "1 day, 0:00:59");
        assert_eq!(shown.parse(), Ok(CookingTime::from_seconds(86_459)));
    }

    #[test]
    fn prices_keep_two_places() {
        assert_eq!(format_price(&Decimal::new(10, 0)), "10.00");
        assert_eq!(format_price(&Decimal::new(250, 2)), "2.50");
    }
}
