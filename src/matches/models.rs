use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use crate::activities::{ActivityType, NewActivity};
use crate::db;
use crate::errors::ServiceError;
use crate::matches::cost::{self, MatchCost};
use crate::players::Player;
use crate::schema::{additional_costs, matches, registrations, sport_centers};
use crate::sport_centers::SportCenter;
use crate::validator::{self, Validate};

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
#[table_name = "matches"]
pub struct Match {
    pub id: i64,
    pub sport_center_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub court: String,
    pub cost: f64,
    pub cost_per_section: f64,
    pub minute_per_section: i32,
    pub custom_section: Option<f64>,
    pub cost_overridden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where and when a match takes place, used to describe it in activities
#[derive(Debug, Clone, Serialize, Queryable)]
pub struct MatchSummary {
    pub match_id: i64,
    pub start_time: DateTime<Utc>,
    pub sport_center_name: String,
}

/// MatchMessage is used to create a match or to reschedule one
#[derive(Debug, Deserialize)]
pub struct MatchMessage {
    pub sport_center_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub court: String,
    pub custom_section: Option<f64>,
}

/// A manually agreed price replacing the sport center rate
#[derive(Debug, Deserialize)]
pub struct CostOverride {
    pub cost: f64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[table_name = "matches"]
#[changeset_options(treat_none_as_null = "true")]
pub struct NewMatch {
    pub sport_center_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub court: String,
    pub cost: f64,
    pub cost_per_section: f64,
    pub minute_per_section: i32,
    pub custom_section: Option<f64>,
    pub cost_overridden: bool,
}

#[derive(Debug, Clone, Serialize, Queryable, Identifiable, Associations)]
#[belongs_to(Match)]
pub struct AdditionalCost {
    pub id: i64,
    pub match_id: i64,
    pub description: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AdditionalCostMessage {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Insertable)]
#[table_name = "additional_costs"]
struct NewAdditionalCost<'a> {
    match_id: i64,
    description: &'a str,
    amount: f64,
}

/// A match as listed by the client, with its cost split over the
/// currently registered players.
///
/// **GET /api/matches/upcoming**
///
/// ``` shell
/// curl --location --request GET 'http://localhost:8080/api/matches/upcoming' \
///   --header 'X-User-Id: auth0|1234'
/// [
///     {
///         "match_id": 12,
///         "start_time": "2024-03-01T19:00:00Z",
///         "end_time": "2024-03-01T21:00:00Z",
///         "sport_center_id": 1,
///         "sport_center_name": "Sports Hall",
///         "cost_per_section": 25.0,
///         "minute_per_section": 60,
///         "court": "3",
///         "custom_section": null,
///         "cost": 50.0,
///         "cost_overridden": false,
///         "additional_cost": 10.0,
///         "player_count": 4,
///         "individual_cost": 15.0,
///         "registration_ids": [31, 32, 35, 36],
///         "is_registered": true
///     }
/// ]
/// ```
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub match_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sport_center_id: i64,
    pub sport_center_name: String,
    pub cost_per_section: f64,
    pub minute_per_section: i32,
    pub court: String,
    pub custom_section: Option<f64>,
    pub cost: f64,
    pub cost_overridden: bool,
    pub additional_cost: f64,
    pub player_count: i64,
    pub individual_cost: f64,
    pub registration_ids: Vec<i64>,
    pub is_registered: bool,
}

#[derive(Debug, Serialize)]
pub struct CostBreakdown {
    pub match_id: i64,
    pub cost_overridden: bool,
    #[serde(flatten)]
    pub cost: MatchCost,
}

/// The active registrations of a match as needed to split its cost
#[derive(Debug, Queryable)]
pub struct Attendance {
    pub registration_id: i64,
    pub match_id: i64,
    pub player_id: i64,
    pub paid_for: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    All,
    Upcoming,
    Today,
    Future,
    Archived,
}

const MAX_COURT_LENGTH: usize = 40;
const MAX_DESCRIPTION_LENGTH: usize = 100;
/// a match can not last longer than a day
const MAX_MATCH_SECONDS: i64 = 60 * 60 * 24;
/// a cloned match takes place one week after the original
const CLONE_OFFSET_DAYS: i64 = 7;

impl Validate<MatchMessage> for MatchMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.end_time <= self.start_time {
            bad_request!("the end time must be after the start time");
        }

        if (self.end_time - self.start_time).num_seconds() > MAX_MATCH_SECONDS {
            bad_request!("a match can not last longer than 24 hours");
        }

        if self.court.chars().count() > MAX_COURT_LENGTH {
            bad_request!(format!(
                "court is too long, maximum {} characters",
                MAX_COURT_LENGTH
            ));
        }

        if let Some(sections) = self.custom_section {
            if !sections.is_finite() || sections <= 0.0 {
                bad_request!("the custom section must be greater than zero");
            }
        }

        Ok(())
    }
}

impl Validate<CostOverride> for CostOverride {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::amount("cost", self.cost)
    }
}

impl Validate<AdditionalCostMessage> for AdditionalCostMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validator::amount("amount", self.amount)
    }
}

impl Validate<Vec<AdditionalCostMessage>> for Vec<AdditionalCostMessage> {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.is_empty() {
            bad_request!("at least one additional cost is required");
        }

        self.iter().try_for_each(|cost| cost.validate())
    }
}

impl NewMatch {
    /// prices the match at the current rate of the sport center
    pub fn priced(message: MatchMessage, center: &SportCenter) -> Result<NewMatch, ServiceError> {
        let cost = cost::section_cost(
            message.start_time,
            message.end_time,
            center.minute_per_section,
            center.cost_per_section,
            message.custom_section,
        )?;

        Ok(NewMatch {
            sport_center_id: center.id,
            start_time: message.start_time,
            end_time: message.end_time,
            court: message.court,
            cost,
            cost_per_section: center.cost_per_section,
            minute_per_section: center.minute_per_section,
            custom_section: message.custom_section,
            cost_overridden: false,
        })
    }

    /// the same match, shifted by the given amount of days
    pub fn rescheduled(original: &Match, days: i64) -> NewMatch {
        NewMatch {
            sport_center_id: original.sport_center_id,
            start_time: original.start_time + Duration::days(days),
            end_time: original.end_time + Duration::days(days),
            court: original.court.clone(),
            cost: original.cost,
            cost_per_section: original.cost_per_section,
            minute_per_section: original.minute_per_section,
            custom_section: original.custom_section,
            cost_overridden: original.cost_overridden,
        }
    }
}

impl Match {
    pub fn find(id: i64, conn: &db::Conn) -> Result<Match, ServiceError> {
        let found = matches::table.find(id).first::<Match>(conn).optional()?;

        match found {
            Some(found) => Ok(found),
            None => {
                not_found!("match not found");
            }
        }
    }

    pub fn summary(id: i64, conn: &db::Conn) -> Result<MatchSummary, ServiceError> {
        let summary = matches::table
            .inner_join(sport_centers::table)
            .filter(matches::id.eq(id))
            .select((matches::id, matches::start_time, sport_centers::name))
            .first::<MatchSummary>(conn)
            .optional()?;

        match summary {
            Some(summary) => Ok(summary),
            None => {
                not_found!("match not found");
            }
        }
    }

    pub fn create(message: MatchMessage, conn: &db::Conn) -> Result<Match, ServiceError> {
        conn.transaction::<Match, ServiceError, _>(|| {
            let center = SportCenter::find(message.sport_center_id, conn)?;
            let new_match = NewMatch::priced(message, &center)?;

            let created = diesel::insert_into(matches::table)
                .values(&new_match)
                .get_result::<Match>(conn)?;

            NewActivity::match_event(ActivityType::MatchCreated, &Match::summary(created.id, conn)?)?
                .save(conn)?;

            Ok(created)
        })
    }

    /// Reschedules the match. The cost is recalculated from the sport center
    /// rate, which drops a manual override.
    pub fn update(id: i64, message: MatchMessage, conn: &db::Conn) -> Result<Match, ServiceError> {
        conn.transaction::<Match, ServiceError, _>(|| {
            Match::find(id, conn)?;
            let center = SportCenter::find(message.sport_center_id, conn)?;
            let changes = NewMatch::priced(message, &center)?;

            let updated = diesel::update(matches::table.find(id))
                .set(&changes)
                .get_result::<Match>(conn)?;

            NewActivity::match_event(ActivityType::MatchUpdated, &Match::summary(id, conn)?)?
                .save(conn)?;

            Ok(updated)
        })
    }

    pub fn override_cost(
        id: i64,
        cost: CostOverride,
        conn: &db::Conn,
    ) -> Result<Match, ServiceError> {
        conn.transaction::<Match, ServiceError, _>(|| {
            Match::find(id, conn)?;

            let updated = diesel::update(matches::table.find(id))
                .set((
                    matches::cost.eq(cost.cost),
                    matches::cost_overridden.eq(true),
                ))
                .get_result::<Match>(conn)?;

            NewActivity::match_event(ActivityType::MatchUpdated, &Match::summary(id, conn)?)?
                .save(conn)?;

            Ok(updated)
        })
    }

    /// Creates the same match one week later, without registrations
    pub fn clone_match(id: i64, conn: &db::Conn) -> Result<Match, ServiceError> {
        conn.transaction::<Match, ServiceError, _>(|| {
            let original = Match::find(id, conn)?;

            let cloned = diesel::insert_into(matches::table)
                .values(&NewMatch::rescheduled(&original, CLONE_OFFSET_DAYS))
                .get_result::<Match>(conn)?;

            NewActivity::match_event(ActivityType::MatchCreated, &Match::summary(cloned.id, conn)?)?
                .save(conn)?;

            Ok(cloned)
        })
    }

    /// Deletes the match with its additional costs and registrations
    pub fn delete(id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        conn.transaction::<(), ServiceError, _>(|| {
            let summary = Match::summary(id, conn)?;

            diesel::delete(additional_costs::table.filter(additional_costs::match_id.eq(id)))
                .execute(conn)?;
            diesel::delete(registrations::table.filter(registrations::match_id.eq(id)))
                .execute(conn)?;
            diesel::delete(matches::table.find(id)).execute(conn)?;

            NewActivity::match_event(ActivityType::MatchDeleted, &summary)?.save(conn)?;

            Ok(())
        })?;

        info!("deleted match {}", id);

        Ok(())
    }

    /// Lists the matches of a view. When a player is given, every match
    /// tells whether that player is registered for it.
    #[tracing::instrument(name = "Match::find_view", skip(player, conn))]
    pub fn find_view(
        view: View,
        player: Option<&Player>,
        conn: &db::Conn,
    ) -> Result<Vec<MatchResponse>, ServiceError> {
        let (today, tomorrow) = day_bounds(Utc::now());

        let mut query = matches::table
            .inner_join(sport_centers::table)
            .select((matches::all_columns, sport_centers::name))
            .into_boxed();

        query = match view {
            View::All => query.order(matches::start_time.desc()),
            View::Upcoming => query
                .filter(matches::start_time.ge(today))
                .order(matches::start_time.asc()),
            View::Today => query
                .filter(matches::start_time.ge(today))
                .filter(matches::start_time.lt(tomorrow))
                .order(matches::start_time.asc()),
            View::Future => query
                .filter(matches::start_time.ge(tomorrow))
                .order(matches::start_time.asc()),
            View::Archived => query
                .filter(matches::start_time.lt(today))
                .order(matches::start_time.desc()),
        };

        let rows = query.load::<(Match, String)>(conn)?;

        let ids: Vec<i64> = rows.iter().map(|(m, _)| m.id).collect();
        let costs = additional_costs::table
            .filter(additional_costs::match_id.eq_any(&ids))
            .select((additional_costs::match_id, additional_costs::amount))
            .load::<(i64, f64)>(conn)?;
        let attendance = Attendance::for_matches(&ids, conn)?;

        Ok(assemble(rows, costs, attendance, player.map(|p| p.id)))
    }

    /// amount of matches from today on
    pub fn upcoming_count(conn: &db::Conn) -> Result<i64, ServiceError> {
        let (today, _) = day_bounds(Utc::now());

        let count = matches::table
            .filter(matches::start_time.ge(today))
            .count()
            .get_result::<i64>(conn)?;

        Ok(count)
    }

    pub fn cost_breakdown(id: i64, conn: &db::Conn) -> Result<CostBreakdown, ServiceError> {
        let found = Match::find(id, conn)?;

        let additional = additional_costs::table
            .filter(additional_costs::match_id.eq(id))
            .select(additional_costs::amount)
            .load::<f64>(conn)?;
        let paid_for: Vec<i32> = Attendance::for_matches(&[id], conn)?
            .iter()
            .map(|attendance| attendance.paid_for)
            .collect();

        Ok(CostBreakdown {
            match_id: found.id,
            cost_overridden: found.cost_overridden,
            cost: MatchCost::calculate(found.cost, &additional, &paid_for),
        })
    }

    pub fn additional_costs(id: i64, conn: &db::Conn) -> Result<Vec<AdditionalCost>, ServiceError> {
        let found = Match::find(id, conn)?;

        let costs = AdditionalCost::belonging_to(&found)
            .order(additional_costs::id.asc())
            .load::<AdditionalCost>(conn)?;

        Ok(costs)
    }

    pub fn add_costs(
        id: i64,
        costs: Vec<AdditionalCostMessage>,
        conn: &db::Conn,
    ) -> Result<Vec<AdditionalCost>, ServiceError> {
        conn.transaction::<Vec<AdditionalCost>, ServiceError, _>(|| {
            Match::find(id, conn)?;

            let new_costs: Vec<NewAdditionalCost<'_>> = costs
                .iter()
                .map(|cost| NewAdditionalCost {
                    match_id: id,
                    description: cost.description.trim(),
                    amount: cost.amount,
                })
                .collect();

            let created = diesel::insert_into(additional_costs::table)
                .values(&new_costs)
                .get_results::<AdditionalCost>(conn)?;

            Ok(created)
        })
    }
}

impl Attendance {
    pub fn for_matches(ids: &[i64], conn: &db::Conn) -> Result<Vec<Attendance>, ServiceError> {
        let attendance = registrations::table
            .filter(registrations::match_id.eq_any(ids))
            .filter(registrations::deleted_at.is_null())
            .select((
                registrations::id,
                registrations::match_id,
                registrations::player_id,
                registrations::total_player_paid_for,
            ))
            .order(registrations::id.asc())
            .load::<Attendance>(conn)?;

        Ok(attendance)
    }
}

/// start of the current day and of the next one
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date().and_hms(0, 0, 0);

    (today, today + Duration::days(1))
}

/// joins the matches with their additional costs and active registrations
fn assemble(
    rows: Vec<(Match, String)>,
    costs: Vec<(i64, f64)>,
    attendance: Vec<Attendance>,
    player_id: Option<i64>,
) -> Vec<MatchResponse> {
    let mut costs_by_match: HashMap<i64, Vec<f64>> = HashMap::new();
    for (match_id, amount) in costs {
        costs_by_match.entry(match_id).or_default().push(amount);
    }

    let mut attendance_by_match: HashMap<i64, Vec<Attendance>> = HashMap::new();
    for registration in attendance {
        attendance_by_match
            .entry(registration.match_id)
            .or_default()
            .push(registration);
    }

    rows.into_iter()
        .map(|(m, sport_center_name)| {
            let additional = costs_by_match.remove(&m.id).unwrap_or_default();
            let active = attendance_by_match.remove(&m.id).unwrap_or_default();
            let paid_for: Vec<i32> = active.iter().map(|r| r.paid_for).collect();
            let cost = MatchCost::calculate(m.cost, &additional, &paid_for);

            MatchResponse {
                match_id: m.id,
                start_time: m.start_time,
                end_time: m.end_time,
                sport_center_id: m.sport_center_id,
                sport_center_name,
                cost_per_section: m.cost_per_section,
                minute_per_section: m.minute_per_section,
                court: m.court,
                custom_section: m.custom_section,
                cost: m.cost,
                cost_overridden: m.cost_overridden,
                additional_cost: cost.additional_cost,
                player_count: cost.player_count,
                individual_cost: cost.individual_cost,
                registration_ids: active.iter().map(|r| r.registration_id).collect(),
                is_registered: player_id
                    .map(|id| active.iter().any(|r| r.player_id == id))
                    .unwrap_or(false),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.ymd(2024, 3, 1).and_hms(19, 0, 0)
    }

    fn new_match(id: i64) -> Match {
        Match {
            id,
            sport_center_id: 1,
            start_time: start(),
            end_time: start() + Duration::hours(2),
            court: String::from("3"),
            cost: 100.0,
            cost_per_section: 25.0,
            minute_per_section: 30,
            custom_section: None,
            cost_overridden: false,
            created_at: start(),
            updated_at: start(),
        }
    }

    fn center() -> SportCenter {
        SportCenter {
            id: 1,
            name: String::from("Sports Hall"),
            location: String::new(),
            cost_per_section: 25.0,
            minute_per_section: 30,
            created_at: start(),
            updated_at: start(),
        }
    }

    fn attendance(registration_id: i64, match_id: i64, player_id: i64, paid_for: i32) -> Attendance {
        Attendance {
            registration_id,
            match_id,
            player_id,
            paid_for,
        }
    }

    fn message(hours: i64) -> MatchMessage {
        MatchMessage {
            sport_center_id: 1,
            start_time: start(),
            end_time: start() + Duration::hours(hours),
            court: String::new(),
            custom_section: None,
        }
    }

    #[test]
    fn match_duration_is_validated() {
        assert!(Validator::new(message(2)).validate().is_ok());
        assert!(Validator::new(message(0)).validate().is_err());
        assert!(Validator::new(message(-1)).validate().is_err());
        assert!(Validator::new(message(25)).validate().is_err());
    }

    #[test]
    fn matches_are_priced_at_the_center_rate() {
        let priced = NewMatch::priced(message(2), &center()).unwrap();

        assert_eq!(priced.cost, 100.0);
        assert_eq!(priced.cost_per_section, 25.0);
        assert!(!priced.cost_overridden);
    }

    #[test]
    fn clones_are_one_week_later() {
        let original = new_match(1);
        let cloned = NewMatch::rescheduled(&original, CLONE_OFFSET_DAYS);

        assert_eq!(cloned.start_time, Utc.ymd(2024, 3, 8).and_hms(19, 0, 0));
        assert_eq!(cloned.end_time - cloned.start_time, Duration::hours(2));
        assert_eq!(cloned.cost, original.cost);
    }

    #[test]
    fn empty_additional_costs_are_rejected() {
        let costs: Vec<AdditionalCostMessage> = Vec::new();
        assert!(Validator::new(costs).validate().is_err());

        let costs = vec![AdditionalCostMessage {
            description: String::from("shuttlecocks"),
            amount: -2.0,
        }];
        assert!(Validator::new(costs).validate().is_err());
    }

    #[test]
    fn day_bounds_start_at_midnight() {
        let (today, tomorrow) = day_bounds(Utc.ymd(2024, 3, 1).and_hms(13, 45, 12));

        assert_eq!(today, Utc.ymd(2024, 3, 1).and_hms(0, 0, 0));
        assert_eq!(tomorrow, Utc.ymd(2024, 3, 2).and_hms(0, 0, 0));
    }

    #[test]
    fn responses_split_the_cost_per_match() {
        let rows = vec![
            (new_match(1), String::from("Sports Hall")),
            (new_match(2), String::from("Arena")),
        ];
        let costs = vec![(1, 20.0)];
        let attendance = vec![attendance(10, 1, 7, 1), attendance(11, 1, 8, 1)];

        let responses = assemble(rows, costs, attendance, Some(8));

        assert_eq!(responses[0].individual_cost, 60.0);
        assert_eq!(responses[0].player_count, 2);
        assert_eq!(responses[0].registration_ids, vec![10, 11]);
        assert!(responses[0].is_registered);

        assert_eq!(responses[1].sport_center_name, "Arena");
        assert_eq!(responses[1].individual_cost, 0.0);
        assert!(!responses[1].is_registered);
    }
}
