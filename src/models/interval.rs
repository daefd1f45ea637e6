use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling interval for historical price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1-minute samples
    #[serde(rename = "1m")]
    Minute1,
    /// 5-minute samples
    #[serde(rename = "5m")]
    Minute5,
    /// 15-minute samples
    #[serde(rename = "15m")]
    Minute15,
    /// Hourly samples
    #[serde(rename = "1h")]
    Hour1,
    /// 4-hour samples
    #[serde(rename = "4h")]
    Hour4,
    /// Daily samples
    #[serde(rename = "1d")]
    Day1,
}

impl Interval {
    /// Convert to interval string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
        }
    }

    /// Bucket width in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            Interval::Minute1 => 60,
            Interval::Minute5 => 300,
            Interval::Minute15 => 900,
            Interval::Hour1 => 3_600,
            Interval::Hour4 => 14_400,
            Interval::Day1 => 86_400,
        }
    }

    /// Get all available intervals
    pub fn all() -> Vec<Interval> {
        vec![
            Interval::Minute1,
            Interval::Minute5,
            Interval::Minute15,
            Interval::Hour1,
            Interval::Hour4,
            Interval::Day1,
        ]
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "minute" => Ok(Interval::Minute1),
            "5m" => Ok(Interval::Minute5),
            "15m" => Ok(Interval::Minute15),
            "1h" | "hourly" => Ok(Interval::Hour1),
            "4h" => Ok(Interval::Hour4),
            "1d" | "daily" => Ok(Interval::Day1),
            _ => Err(format!(
                "Invalid interval: {}. Valid options: 1m, 5m, 15m, 1h, 4h, 1d",
                s
            )),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Hour1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!("1h".parse::<Interval>().unwrap(), Interval::Hour1);
        assert_eq!("1H".parse::<Interval>().unwrap(), Interval::Hour1);
        assert_eq!("daily".parse::<Interval>().unwrap(), Interval::Day1);
        assert!("2h".parse::<Interval>().is_err());
    }

    #[test]
    fn test_interval_seconds_are_ordered() {
        let secs: Vec<i64> = Interval::all().iter().map(|i| i.seconds()).collect();
        assert!(secs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Interval::Hour4).unwrap();
        assert_eq!(json, "\"4h\"");
        let parsed: Interval = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(parsed, Interval::Minute15);
    }
}
