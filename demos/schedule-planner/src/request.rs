//! Caller-supplied schedule requests.
//!
//! A request names an account, a period length and, per weekday, which
//! posts to plan. Requests are validated before any generation starts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Most posts a single weekday may ask for.
pub const MAX_POSTS_PER_DAY: u8 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("account id must not be empty")]
    EmptyAccount,

    #[error("unsupported period of {0} days, expected 7, 14 or 30")]
    InvalidPeriod(u32),

    #[error("at least one weekday must be planned")]
    NoWeekdays,

    #[error("{0} is planned more than once")]
    DuplicateWeekday(Weekday),

    #[error("{weekday} asks for {count} posts, expected 1 to {max}", max = MAX_POSTS_PER_DAY)]
    InvalidCount { weekday: Weekday, count: u8 },

    #[error("invalid time of day {0:?}, expected \"auto\" or HH:MM")]
    InvalidTime(String),
}

/// Length of the planned period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Period {
    Week,
    Fortnight,
    Month,
}

impl Period {
    /// Number of days, and so the number of records expected.
    pub const fn days(self) -> usize {
        match self {
            Period::Week => 7,
            Period::Fortnight => 14,
            Period::Month => 30,
        }
    }
}

impl TryFrom<u32> for Period {
    type Error = RequestError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(Period::Week),
            14 => Ok(Period::Fortnight),
            30 => Ok(Period::Month),
            other => Err(RequestError::InvalidPeriod(other)),
        }
    }
}

impl From<Period> for u32 {
    fn from(period: Period) -> Self {
        period.days() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Text,
    Image,
    Video,
    Story,
}

impl PostKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            PostKind::Text => "text",
            PostKind::Image => "image",
            PostKind::Video => "video",
            PostKind::Story => "story",
        }
    }
}

/// When a post goes out: a fixed time of day or left to the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeChoice {
    #[default]
    Auto,
    At { hour: u8, minute: u8 },
}

impl FromStr for TimeChoice {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(TimeChoice::Auto);
        }
        let invalid = || RequestError::InvalidTime(s.to_owned());

        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(hour) || !two_digits(minute) {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(TimeChoice::At { hour, minute })
    }
}

impl TryFrom<String> for TimeChoice {
    type Error = RequestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TimeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeChoice::Auto => f.write_str("auto"),
            TimeChoice::At { hour, minute } => write!(f, "{hour:02}:{minute:02}"),
        }
    }
}

impl From<TimeChoice> for String {
    fn from(time: TimeChoice) -> Self {
        time.to_string()
    }
}

/// Posts of one kind to plan on a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlot {
    pub kind: PostKind,
    pub count: u8,
    #[serde(default)]
    pub time: TimeChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayPlan {
    pub weekday: Weekday,
    pub slots: Vec<DaySlot>,
}

impl WeekdayPlan {
    pub fn posts(&self) -> u32 {
        self.slots.iter().map(|slot| u32::from(slot.count)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub account_id: String,
    pub period: Period,
    pub weekdays: Vec<WeekdayPlan>,
}

impl ScheduleRequest {
    /// A request posting one text post at a generated time on every weekday.
    pub fn daily(account_id: impl Into<String>, period: Period) -> Self {
        let weekdays = Weekday::ALL
            .iter()
            .map(|&weekday| WeekdayPlan {
                weekday,
                slots: vec![DaySlot {
                    kind: PostKind::Text,
                    count: 1,
                    time: TimeChoice::Auto,
                }],
            })
            .collect();
        Self {
            account_id: account_id.into(),
            period,
            weekdays,
        }
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, crate::PlannerError> {
        let request: Self = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.account_id.trim().is_empty() {
            return Err(RequestError::EmptyAccount);
        }
        if self.weekdays.is_empty() {
            return Err(RequestError::NoWeekdays);
        }

        let mut seen = [false; 7];
        for plan in &self.weekdays {
            let slot = &mut seen[plan.weekday as usize];
            if *slot {
                return Err(RequestError::DuplicateWeekday(plan.weekday));
            }
            *slot = true;

            let count = plan.posts();
            if plan.slots.iter().any(|slot| slot.count == 0)
                || count == 0
                || count > u32::from(MAX_POSTS_PER_DAY)
            {
                return Err(RequestError::InvalidCount {
                    weekday: plan.weekday,
                    count: u8::try_from(count).unwrap_or(u8::MAX),
                });
            }
        }
        Ok(())
    }

    /// Records the generation is expected to produce.
    pub fn total_hint(&self) -> usize {
        self.period.days()
    }

    /// Echoed back to the consumer in the completion summary.
    pub fn context(&self) -> Value {
        json!({
            "accountId": self.account_id,
            "period": self.period.days(),
        })
    }

    /// The weekday plan for `weekday`, if any.
    pub fn plan_for(&self, weekday: Weekday) -> Option<&WeekdayPlan> {
        self.weekdays.iter().find(|plan| plan.weekday == weekday)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("auto", TimeChoice::Auto ; "auto")]
    #[test_case("AUTO", TimeChoice::Auto ; "auto uppercase")]
    #[test_case("09:30", TimeChoice::At { hour: 9, minute: 30 } ; "morning")]
    #[test_case("23:59", TimeChoice::At { hour: 23, minute: 59 } ; "last minute")]
    fn test_time_choice_parses(input: &str, expected: TimeChoice) {
        assert_eq!(input.parse::<TimeChoice>().unwrap(), expected);
    }

    #[test_case("24:00" ; "hour out of range")]
    #[test_case("9:30" ; "short hour")]
    #[test_case("09:60" ; "minute out of range")]
    #[test_case("+9:30" ; "signed hour")]
    #[test_case("09:+5" ; "signed minute")]
    #[test_case("noon" ; "word")]
    #[test_case("" ; "empty")]
    fn test_time_choice_rejects(input: &str) {
        assert_eq!(
            input.parse::<TimeChoice>(),
            Err(RequestError::InvalidTime(input.to_owned()))
        );
    }

    #[test]
    fn test_time_choice_display() {
        assert_eq!(TimeChoice::At { hour: 7, minute: 5 }.to_string(), "07:05");
        assert_eq!(TimeChoice::Auto.to_string(), "auto");
    }

    #[test_case(7, Some(Period::Week))]
    #[test_case(14, Some(Period::Fortnight))]
    #[test_case(30, Some(Period::Month))]
    #[test_case(31, None)]
    #[test_case(0, None)]
    fn test_period_from_days(days: u32, expected: Option<Period>) {
        assert_eq!(Period::try_from(days).ok(), expected);
    }

    #[test]
    fn test_daily_request_is_valid() {
        let request = ScheduleRequest::daily("acc_1", Period::Fortnight);
        assert_eq!(request.validate(), Ok(()));
        assert_eq!(request.total_hint(), 14);
        assert_eq!(request.weekdays.len(), 7);
    }

    #[test]
    fn test_rejects_duplicate_weekday() {
        let mut request = ScheduleRequest::daily("acc_1", Period::Week);
        let monday = request.weekdays[0].clone();
        request.weekdays.push(monday);
        assert_eq!(
            request.validate(),
            Err(RequestError::DuplicateWeekday(Weekday::Monday))
        );
    }

    #[test]
    fn test_rejects_too_many_posts() {
        let mut request = ScheduleRequest::daily("acc_1", Period::Week);
        request.weekdays[2].slots[0].count = 4;
        request.weekdays[2].slots.push(DaySlot {
            kind: PostKind::Image,
            count: 2,
            time: TimeChoice::Auto,
        });
        assert_eq!(
            request.validate(),
            Err(RequestError::InvalidCount {
                weekday: Weekday::Wednesday,
                count: 6
            })
        );
    }

    #[test]
    fn test_rejects_blank_account() {
        let request = ScheduleRequest::daily("  ", Period::Week);
        assert_eq!(request.validate(), Err(RequestError::EmptyAccount));
    }

    #[test]
    fn test_context_shape() {
        let request = ScheduleRequest::daily("acc_9", Period::Month);
        assert_eq!(
            request.context(),
            json!({ "accountId": "acc_9", "period": 30 })
        );
    }
}
