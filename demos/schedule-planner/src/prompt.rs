//! Prompt construction for schedule generation.

use std::fmt::Write as _;

use crate::request::{ScheduleRequest, Weekday};

/// Build the generation prompt for a validated request.
///
/// The prompt pins the output shape to `{"schedule":[...]}` with one
/// element per day, which is what the extractor anchors on.
pub fn build_prompt(request: &ScheduleRequest) -> String {
    let days = request.period.days();
    let mut prompt = String::with_capacity(512);

    let _ = writeln!(
        prompt,
        "Plan social media posts for account {} over the next {days} days.",
        request.account_id
    );
    prompt.push_str("Posting rules per weekday:\n");

    for weekday in Weekday::ALL {
        match request.plan_for(weekday) {
            Some(plan) => {
                let _ = write!(prompt, "- {weekday}:");
                for (i, slot) in plan.slots.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    let _ = write!(
                        prompt,
                        "{sep}{} x {} at {}",
                        slot.count,
                        slot.kind.as_str(),
                        slot.time
                    );
                }
                prompt.push('\n');
            }
            None => {
                let _ = writeln!(prompt, "- {weekday}: no posts");
            }
        }
    }

    let _ = write!(
        prompt,
        "Reply with a single JSON object of the form \
         {{\"schedule\":[{{\"date\":\"YYYY-MM-DD\",\"posts\":[{{\"kind\":\"text\",\"time\":\"HH:MM\",\"caption\":\"...\"}}]}}]}} \
         containing exactly {days} day entries in date order. \
         Where a time is auto, pick one. Output nothing but the JSON."
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{DaySlot, Period, PostKind, TimeChoice, WeekdayPlan};

    #[test]
    fn test_prompt_lists_every_weekday() {
        let request = ScheduleRequest {
            account_id: "acc_1".into(),
            period: Period::Week,
            weekdays: vec![WeekdayPlan {
                weekday: Weekday::Friday,
                slots: vec![
                    DaySlot {
                        kind: PostKind::Image,
                        count: 2,
                        time: TimeChoice::At { hour: 18, minute: 0 },
                    },
                    DaySlot {
                        kind: PostKind::Story,
                        count: 1,
                        time: TimeChoice::Auto,
                    },
                ],
            }],
        };

        let prompt = build_prompt(&request);
        assert!(prompt.starts_with("Plan social media posts for account acc_1 over the next 7 days."));
        assert!(prompt.contains("- friday: 2 x image at 18:00, 1 x story at auto\n"));
        assert!(prompt.contains("- monday: no posts\n"));
        assert!(prompt.contains("{\"schedule\":[{\"date\":\"YYYY-MM-DD\""));
        assert!(prompt.contains("exactly 7 day entries"));
    }
}
