use crate::config::{HourWindow, MarketStateConfig};
use crate::constants::{ACTIVE_HOURS_FACTOR, OVERNIGHT_HOURS_FACTOR};
use crate::error::{AppError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Time-of-day and day-of-week terms of the market sentiment score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionHours {
    pub timezone: Tz,
    pub active_hours: HourWindow,
    pub overnight_hours: HourWindow,
}

impl Default for SessionHours {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            active_hours: HourWindow::new(13, 21),
            overnight_hours: HourWindow::new(0, 5),
        }
    }
}

impl SessionHours {
    pub fn from_config(config: &MarketStateConfig) -> Result<Self> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|e| AppError::Config(format!("Failed to parse timezone '{}': {}", config.timezone, e)))?;

        Ok(Self {
            timezone,
            active_hours: config.active_hours,
            overnight_hours: config.overnight_hours,
        })
    }

    /// 1.0 on Saturday and Sunday in the configured timezone, else 0.0
    pub fn weekend_flag(&self, now: DateTime<Utc>) -> f64 {
        match now.with_timezone(&self.timezone).weekday() {
            Weekday::Sat | Weekday::Sun => 1.0,
            _ => 0.0,
        }
    }

    /// +1.0 in the active window, −0.5 overnight, 0.0 otherwise
    pub fn hour_factor(&self, now: DateTime<Utc>) -> f64 {
        let hour = now.with_timezone(&self.timezone).hour();
        if self.active_hours.contains(hour) {
            ACTIVE_HOURS_FACTOR
        } else if self.overnight_hours.contains(hour) {
            OVERNIGHT_HOURS_FACTOR
        } else {
            0.0
        }
    }
}
