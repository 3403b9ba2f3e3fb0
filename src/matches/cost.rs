//! Cost allocation of a single match.
//!
//! A match costs its base price (the sport center rate for the booked sections,
//! or a manual override) plus every additional cost. The total is split over
//! the players paid for by the active registrations of the match.

use chrono::{DateTime, Utc};

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCost {
    pub base_cost: f64,
    pub additional_cost: f64,
    pub total_cost: f64,
    pub player_count: i64,
    pub individual_cost: f64,
}

impl MatchCost {
    /// `paid_for` holds the paid-for count of every active registration
    pub fn calculate(base_cost: f64, additional_costs: &[f64], paid_for: &[i32]) -> MatchCost {
        let additional_cost: f64 = additional_costs.iter().fold(0.0, |sum, cost| sum + *cost);
        let player_count: i64 = paid_for.iter().map(|count| i64::from(*count)).sum();
        let total_cost = base_cost + additional_cost;

        MatchCost {
            base_cost,
            additional_cost,
            total_cost,
            player_count,
            individual_cost: individual_cost(total_cost, player_count),
        }
    }

    /// what a registration covering `paid_for` players owes
    pub fn amount_owed(&self, paid_for: i32) -> f64 {
        self.individual_cost * f64::from(paid_for)
    }
}

/// share of a single player, nobody pays when nobody is registered
pub fn individual_cost(total_cost: f64, player_count: i64) -> f64 {
    if player_count <= 0 {
        return 0.0;
    }

    total_cost / player_count as f64
}

/// amount of sections booked between start and end
pub fn section_count(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    minute_per_section: i32,
    custom_section: Option<f64>,
) -> Result<f64, ServiceError> {
    if end_time <= start_time {
        bad_request!("the end time must be after the start time");
    }

    if let Some(sections) = custom_section {
        if !sections.is_finite() || sections <= 0.0 {
            bad_request!("the custom section must be greater than zero");
        }
        return Ok(sections);
    }

    if minute_per_section <= 0 {
        bad_request!("minutes per section must be greater than zero");
    }

    let minutes = (end_time - start_time).num_minutes() as f64;

    Ok(minutes / f64::from(minute_per_section))
}

/// base cost of a match priced at the sport center rate
pub fn section_cost(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    minute_per_section: i32,
    cost_per_section: f64,
    custom_section: Option<f64>,
) -> Result<f64, ServiceError> {
    let sections = section_count(start_time, end_time, minute_per_section, custom_section)?;

    Ok(sections * cost_per_section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.ymd(2024, 3, 1).and_hms(19, 0, 0)
    }

    #[test]
    fn split_over_registered_players() {
        let cost = MatchCost::calculate(100.0, &[20.0], &[1, 1]);

        assert_eq!(cost.additional_cost, 20.0);
        assert_eq!(cost.total_cost, 120.0);
        assert_eq!(cost.player_count, 2);
        assert_eq!(cost.individual_cost, 60.0);
    }

    #[test]
    fn registrations_can_pay_for_several_players() {
        let cost = MatchCost::calculate(90.0, &[], &[2, 1]);

        assert_eq!(cost.player_count, 3);
        assert_eq!(cost.individual_cost, 30.0);
        assert_eq!(cost.amount_owed(2), 60.0);
    }

    #[test]
    fn nobody_registered_costs_nothing() {
        let cost = MatchCost::calculate(100.0, &[5.0, 5.0], &[]);

        assert_eq!(cost.total_cost, 110.0);
        assert_eq!(cost.player_count, 0);
        assert_eq!(cost.individual_cost, 0.0);
        assert_eq!(individual_cost(50.0, -1), 0.0);
    }

    #[test]
    fn no_additional_costs_is_positive_zero() {
        let cost = MatchCost::calculate(100.0, &[], &[1]);

        assert_eq!(cost.additional_cost, 0.0);
        assert!(cost.additional_cost.is_sign_positive());
        assert_eq!(cost.total_cost, 100.0);
    }

    #[test]
    fn sections_from_duration() {
        let sections = section_count(start(), start() + Duration::minutes(90), 30, None).unwrap();

        assert_eq!(sections, 3.0);
        assert_eq!(
            section_cost(start(), start() + Duration::minutes(90), 30, 12.5, None).unwrap(),
            37.5
        );
    }

    #[test]
    fn custom_sections_win() {
        let cost = section_cost(start(), start() + Duration::minutes(90), 30, 10.0, Some(2.0));

        assert_eq!(cost.unwrap(), 20.0);
    }

    #[test]
    fn invalid_sections() {
        assert!(section_count(start(), start(), 30, None).is_err());
        assert!(section_count(start(), start() + Duration::hours(1), 0, None).is_err());
        assert!(section_count(start(), start() + Duration::hours(1), 30, Some(0.0)).is_err());
        assert!(section_count(start(), start() + Duration::hours(1), 30, Some(f64::NAN)).is_err());
    }
}
