//! Lifting tempo notation.
//!
//! A tempo string describes the duration in seconds of each rep phase:
//! eccentric, bottom pause, concentric, top pause. Three spellings are
//! accepted, tried in this order:
//!
//! - `"3010"`: four digits, any trailing text ignored
//! - `"3x1"`: eccentric/concentric only, pauses are 0
//! - `"301"`: three digits, top pause is 0
//!
//! Only a lowercase `x` separates the two-phase form. An uppercase `X`
//! marks an explosive phase, as in `"31X0"`, and is left unparsed.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tempo {
    pub eccentric: Option<u32>,
    pub bottom_pause: Option<u32>,
    pub concentric: Option<u32>,
    pub top_pause: Option<u32>,
    /// Trimmed input exactly as given
    #[serde(default)]
    pub raw: String,
}

impl Tempo {
    pub fn new(eccentric: u32, bottom_pause: u32, concentric: u32, top_pause: u32) -> Self {
        Self {
            eccentric: Some(eccentric),
            bottom_pause: Some(bottom_pause),
            concentric: Some(concentric),
            top_pause: Some(top_pause),
            raw: String::new(),
        }
    }

    /// Parse tempo notation. Unrecognised input keeps `raw` with every
    /// component unset.
    pub fn parse(input: &str) -> Self {
        let raw = input.trim();
        let mut tempo = Tempo {
            raw: raw.to_string(),
            ..Tempo::default()
        };

        let digits = leading_digits(raw);
        if digits.len() >= 4 {
            tempo.eccentric = Some(digits[0]);
            tempo.bottom_pause = Some(digits[1]);
            tempo.concentric = Some(digits[2]);
            tempo.top_pause = Some(digits[3]);
        } else if let Some((eccentric, concentric)) = parse_times_form(raw) {
            tempo.eccentric = Some(eccentric);
            tempo.bottom_pause = Some(0);
            tempo.concentric = Some(concentric);
            tempo.top_pause = Some(0);
        } else if digits.len() == 3 {
            tempo.eccentric = Some(digits[0]);
            tempo.bottom_pause = Some(digits[1]);
            tempo.concentric = Some(digits[2]);
            tempo.top_pause = Some(0);
        }

        tempo
    }

    /// `raw` when present, otherwise the four components with unset as 0
    pub fn format(&self) -> String {
        if !self.raw.is_empty() {
            return self.raw.clone();
        }
        format!(
            "{}{}{}{}",
            self.eccentric.unwrap_or(0),
            self.bottom_pause.unwrap_or(0),
            self.concentric.unwrap_or(0),
            self.top_pause.unwrap_or(0)
        )
    }

    /// Seconds per rep
    pub fn total_seconds(&self) -> u32 {
        self.eccentric.unwrap_or(0)
            + self.bottom_pause.unwrap_or(0)
            + self.concentric.unwrap_or(0)
            + self.top_pause.unwrap_or(0)
    }

    pub fn describe(&self) -> String {
        if self.eccentric.is_none() && self.concentric.is_none() {
            return format!("Unrecognised tempo '{}'", self.raw);
        }
        format!(
            "{}s lowering, {}s pause, {}s lifting, {}s pause",
            self.eccentric.unwrap_or(0),
            self.bottom_pause.unwrap_or(0),
            self.concentric.unwrap_or(0),
            self.top_pause.unwrap_or(0)
        )
    }
}

/// Empty input is valid; anything else must yield eccentric or concentric
pub fn is_valid_tempo(input: &str) -> bool {
    if input.trim().is_empty() {
        return true;
    }
    let tempo = Tempo::parse(input);
    tempo.eccentric.is_some() || tempo.concentric.is_some()
}

/// Up to four single-digit values from the start of the string
fn leading_digits(s: &str) -> Vec<u32> {
    s.chars().take(4).map_while(|c| c.to_digit(10)).collect()
}

/// `"<digits>x<digits>"` with optional trailing text
fn parse_times_form(s: &str) -> Option<(u32, u32)> {
    let split = s.find('x')?;
    let (left, rest) = (&s[..split], &s[split + 1..]);
    if left.is_empty() || !left.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let right: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if right.is_empty() {
        return None;
    }
    Some((left.parse().ok()?, right.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_four_digit_tempo() {
        let tempo = Tempo::parse("3010");
        assert_eq!(tempo.eccentric, Some(3));
        assert_eq!(tempo.bottom_pause, Some(0));
        assert_eq!(tempo.concentric, Some(1));
        assert_eq!(tempo.top_pause, Some(0));
        assert_eq!(tempo.raw, "3010");
    }

    #[test]
    fn test_four_digit_format_roundtrip_without_raw() {
        let mut tempo = Tempo::parse("3010");
        tempo.raw.clear();
        assert_eq!(tempo.format(), "3010");
    }

    #[test]
    fn test_trailing_text_is_ignored() {
        let tempo = Tempo::parse(" 4121 slow ");
        assert_eq!(tempo.total_seconds(), 8);
        assert_eq!(tempo.raw, "4121 slow");
        assert_eq!(tempo.format(), "4121 slow");
    }

    #[test]
    fn test_times_form() {
        let tempo = Tempo::parse("3x1");
        assert_eq!(tempo.eccentric, Some(3));
        assert_eq!(tempo.bottom_pause, Some(0));
        assert_eq!(tempo.concentric, Some(1));
        assert_eq!(tempo.top_pause, Some(0));

        let long = Tempo::parse("10x2 controlled");
        assert_eq!(long.eccentric, Some(10));
        assert_eq!(long.concentric, Some(2));
        assert_eq!(long.total_seconds(), 12);
    }

    #[test]
    fn test_explosive_x_is_not_a_separator() {
        for input in ["31X0", "10X2"] {
            let tempo = Tempo::parse(input);
            assert_eq!(tempo.eccentric, None, "{}", input);
            assert_eq!(tempo.bottom_pause, None, "{}", input);
            assert_eq!(tempo.concentric, None, "{}", input);
            assert_eq!(tempo.top_pause, None, "{}", input);
            assert_eq!(tempo.total_seconds(), 0);
            assert_eq!(tempo.format(), input);
            assert!(!is_valid_tempo(input));
        }
    }

    #[test]
    fn test_three_digit_tempo() {
        let tempo = Tempo::parse("202");
        assert_eq!(tempo.eccentric, Some(2));
        assert_eq!(tempo.bottom_pause, Some(0));
        assert_eq!(tempo.concentric, Some(2));
        assert_eq!(tempo.top_pause, Some(0));
    }

    #[test]
    fn test_unparseable_tempo_keeps_raw() {
        let tempo = Tempo::parse("explosive");
        assert_eq!(tempo.eccentric, None);
        assert_eq!(tempo.concentric, None);
        assert_eq!(tempo.format(), "explosive");
        assert_eq!(tempo.total_seconds(), 0);
        assert!(!is_valid_tempo("explosive"));
        assert!(is_valid_tempo(""));
    }

    #[test]
    fn test_unset_components_format_as_zero() {
        let tempo = Tempo {
            eccentric: Some(2),
            ..Tempo::default()
        };
        assert_eq!(tempo.format(), "2000");
    }
}
