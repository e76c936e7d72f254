//! Trigger schedules for policy violation reports and campaign activations.

use serde::{Deserialize, Serialize};

use crate::config::ConnectorConfig;

/// A campaign schedule fires at most this many hours per day.
const MAX_CAMPAIGN_SCHEDULE_HOURS: usize = 1;
/// A WEEKLY campaign schedule fires on at most this many days.
const MAX_CAMPAIGN_WEEKLY_DAYS: usize = 1;
/// A MONTHLY campaign schedule fires on at most this many days.
const MAX_CAMPAIGN_MONTHLY_DAYS: usize = 4;

/// Cadence keywords accepted in schedule attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleType {
    /// Parses a raw schedule keyword. Anything unrecognized is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// What a schedule triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Recurring violation report on a policy.
    Policy,
    /// Recurring activation of a campaign template.
    Campaign,
}

/// Value list encoding used by schedule hours and days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleValueType {
    List,
}

/// Hours or days a schedule fires on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleValues {
    #[serde(rename = "type")]
    pub value_type: ScheduleValueType,
    pub values: Vec<String>,
}

impl ScheduleValues {
    fn list(values: Vec<String>) -> Self {
        Self {
            value_type: ScheduleValueType::List,
            values,
        }
    }
}

/// A recurring trigger definition.
///
/// DAILY schedules carry hours only; WEEKLY and MONTHLY add the days the
/// trigger fires on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,
    pub hours: ScheduleValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<ScheduleValues>,
}

/// Builds a schedule from a raw keyword, or `None` when the keyword is
/// unrecognized or unsupported for the kind.
///
/// Policy schedules take the configured hour and day lists as-is. Campaign
/// schedules accept WEEKLY and MONTHLY only and truncate the lists to what
/// the campaign API allows.
pub fn build_schedule(
    kind: ScheduleKind,
    keyword: &str,
    config: &ConnectorConfig,
) -> Option<Schedule> {
    let schedule_type = ScheduleType::parse(keyword)?;
    let schedule = match (kind, schedule_type) {
        (ScheduleKind::Policy, ScheduleType::Daily) => Schedule {
            schedule_type,
            hours: ScheduleValues::list(config.hourly_schedule_day.clone()),
            days: None,
        },
        (ScheduleKind::Policy, ScheduleType::Weekly) => Schedule {
            schedule_type,
            hours: ScheduleValues::list(config.hourly_schedule_day.clone()),
            days: Some(ScheduleValues::list(config.weekly_schedule_day.clone())),
        },
        (ScheduleKind::Policy, ScheduleType::Monthly) => Schedule {
            schedule_type,
            hours: ScheduleValues::list(config.hourly_schedule_day.clone()),
            days: Some(ScheduleValues::list(config.monthly_schedule_day.clone())),
        },
        (ScheduleKind::Campaign, ScheduleType::Daily) => return None,
        (ScheduleKind::Campaign, ScheduleType::Weekly) => Schedule {
            schedule_type,
            hours: ScheduleValues::list(truncated(
                &config.hourly_schedule_day,
                MAX_CAMPAIGN_SCHEDULE_HOURS,
            )),
            days: Some(ScheduleValues::list(truncated(
                &config.weekly_schedule_day,
                MAX_CAMPAIGN_WEEKLY_DAYS,
            ))),
        },
        (ScheduleKind::Campaign, ScheduleType::Monthly) => Schedule {
            schedule_type,
            hours: ScheduleValues::list(truncated(
                &config.hourly_schedule_day,
                MAX_CAMPAIGN_SCHEDULE_HOURS,
            )),
            days: Some(ScheduleValues::list(truncated(
                &config.monthly_schedule_day,
                MAX_CAMPAIGN_MONTHLY_DAYS,
            ))),
        },
    };
    Some(schedule)
}

fn truncated(values: &[String], max: usize) -> Vec<String> {
    values.iter().take(max).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_days(
        hours: Vec<&str>,
        weekly: Vec<&str>,
        monthly: Vec<&str>,
    ) -> ConnectorConfig {
        serde_json::from_value(json!({
            "apiUrl": "https://tenant.api.identitysoon.com",
            "clientId": "client-123",
            "clientSecret": "s3cret",
            "policyConfigSourceName": "SOD Policy Configuration",
            "hourlyScheduleDay": hours,
            "weeklyScheduleDay": weekly,
            "monthlyScheduleDay": monthly
        }))
        .unwrap()
    }

    #[test]
    fn test_policy_daily_schedule_has_no_days() {
        let config = config_with_days(vec!["9"], vec!["MON"], vec!["1"]);
        let schedule = build_schedule(ScheduleKind::Policy, "DAILY", &config).unwrap();

        assert_eq!(schedule.schedule_type, ScheduleType::Daily);
        assert_eq!(schedule.hours.values, vec!["9"]);
        assert!(schedule.days.is_none());
    }

    #[test]
    fn test_policy_weekly_schedule_carries_week_days() {
        let config = config_with_days(vec!["9", "17"], vec!["MON", "FRI"], vec!["1"]);
        let schedule = build_schedule(ScheduleKind::Policy, "WEEKLY", &config).unwrap();

        assert_eq!(schedule.schedule_type, ScheduleType::Weekly);
        assert_eq!(schedule.hours.values, vec!["9", "17"]);
        assert_eq!(schedule.days.unwrap().values, vec!["MON", "FRI"]);
    }

    #[test]
    fn test_policy_monthly_schedule_carries_month_days() {
        let config = config_with_days(vec!["9"], vec!["MON"], vec!["1", "15"]);
        let schedule = build_schedule(ScheduleKind::Policy, "MONTHLY", &config).unwrap();

        assert_eq!(schedule.schedule_type, ScheduleType::Monthly);
        assert_eq!(schedule.days.unwrap().values, vec!["1", "15"]);
    }

    #[test]
    fn test_campaign_schedule_rejects_daily() {
        let config = config_with_days(vec!["9"], vec!["MON"], vec!["1"]);
        assert!(build_schedule(ScheduleKind::Campaign, "DAILY", &config).is_none());
    }

    #[test]
    fn test_campaign_schedule_truncates_to_api_limits() {
        let config = config_with_days(
            vec!["9", "12", "17"],
            vec!["MON", "WED", "FRI"],
            vec!["1", "8", "15", "22", "28"],
        );

        let weekly = build_schedule(ScheduleKind::Campaign, "WEEKLY", &config).unwrap();
        assert_eq!(weekly.hours.values, vec!["9"]);
        assert_eq!(weekly.days.unwrap().values, vec!["MON"]);

        let monthly = build_schedule(ScheduleKind::Campaign, "MONTHLY", &config).unwrap();
        assert_eq!(monthly.hours.values, vec!["9"]);
        assert_eq!(monthly.days.unwrap().values, vec!["1", "8", "15", "22"]);
    }

    #[test]
    fn test_unknown_keyword_builds_nothing() {
        let config = config_with_days(vec!["9"], vec!["MON"], vec!["1"]);
        assert!(build_schedule(ScheduleKind::Policy, "FORTNIGHTLY", &config).is_none());
        assert!(build_schedule(ScheduleKind::Policy, "weekly", &config).is_none());
        assert!(build_schedule(ScheduleKind::Policy, "", &config).is_none());
    }

    #[test]
    fn test_schedule_serializes_expected_shape() {
        let config = config_with_days(vec!["9"], vec!["MON"], vec!["1"]);
        let schedule = build_schedule(ScheduleKind::Policy, "WEEKLY", &config).unwrap();

        assert_eq!(
            serde_json::to_value(&schedule).unwrap(),
            json!({
                "type": "WEEKLY",
                "hours": {"type": "LIST", "values": ["9"]},
                "days": {"type": "LIST", "values": ["MON"]}
            })
        );
    }
}
