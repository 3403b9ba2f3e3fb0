use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::matches::MatchSummary;
use crate::players::PlayerSummary;
use crate::schema::activities;
use crate::sport_centers::SportCenter;

/// amount of entries returned by the activity log
const LOG_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ActivityType {
    MatchRegistered = 1,
    MatchUnregistered = 2,
    MatchCreated = 3,
    MatchUpdated = 4,
    MatchDeleted = 5,
    SportCenterCreated = 6,
    SportCenterUpdated = 7,
    SportCenterPriceChanged = 8,
}

impl ActivityType {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<ActivityType> {
        use ActivityType::*;

        [
            MatchRegistered,
            MatchUnregistered,
            MatchCreated,
            MatchUpdated,
            MatchDeleted,
            SportCenterCreated,
            SportCenterUpdated,
            SportCenterPriceChanged,
        ]
        .iter()
        .copied()
        .find(|kind| kind.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            ActivityType::MatchRegistered => "Match Registered",
            ActivityType::MatchUnregistered => "Match Unregistered",
            ActivityType::MatchCreated => "Match Created",
            ActivityType::MatchUpdated => "Match Updated",
            ActivityType::MatchDeleted => "Match Deleted",
            ActivityType::SportCenterCreated => "Sport Center Created",
            ActivityType::SportCenterUpdated => "Sport Center Updated",
            ActivityType::SportCenterPriceChanged => "Sport Center Price Changed",
        }
    }
}

#[derive(Debug, Queryable)]
pub struct Activity {
    pub id: i64,
    pub type_id: i32,
    pub description: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// An entry of the activity log as shown to the client.
///
/// **GET /api/activities**
///
/// ``` shell
/// curl --location --request GET 'http://localhost:8080/api/activities'
/// [
///     {
///         "type_id": 1,
///         "type_name": "Match Registered",
///         "description": "John Doe registered Sports Hall on 01/03/2024",
///         "payload": { "player_id": 1, "player": "John Doe", "sport_center": "Sports Hall" },
///         "created_at": "2024-02-28T19:53:33.977263Z"
///     }
/// ]
/// ```
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub type_id: i32,
    pub type_name: &'static str,
    pub description: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[table_name = "activities"]
pub struct NewActivity {
    pub type_id: i32,
    pub description: String,
    pub payload: String,
}

#[derive(Serialize)]
struct RegistrationPayload<'a> {
    player_id: i64,
    player: &'a str,
    match_id: i64,
    sport_center: &'a str,
}

#[derive(Serialize)]
struct MatchPayload<'a> {
    match_id: i64,
    sport_center: &'a str,
    start_time: DateTime<Utc>,
}

#[derive(Serialize)]
struct SportCenterPayload<'a> {
    sport_center_id: i64,
    name: &'a str,
    cost_per_section: f64,
    minute_per_section: i32,
}

impl NewActivity {
    pub fn new<T: serde::Serialize>(
        kind: ActivityType,
        description: String,
        payload: &T,
    ) -> Result<NewActivity, ServiceError> {
        let payload = serde_json::to_string(payload)?;

        Ok(NewActivity {
            type_id: kind.id(),
            description,
            payload,
        })
    }

    pub fn registered(
        player: &PlayerSummary,
        summary: &MatchSummary,
    ) -> Result<NewActivity, ServiceError> {
        NewActivity::registration(ActivityType::MatchRegistered, "registered", player, summary)
    }

    pub fn unregistered(
        player: &PlayerSummary,
        summary: &MatchSummary,
    ) -> Result<NewActivity, ServiceError> {
        NewActivity::registration(
            ActivityType::MatchUnregistered,
            "unregistered",
            player,
            summary,
        )
    }

    fn registration(
        kind: ActivityType,
        verb: &str,
        player: &PlayerSummary,
        summary: &MatchSummary,
    ) -> Result<NewActivity, ServiceError> {
        let description = format!(
            "{} {} {} on {}",
            player.name,
            verb,
            summary.sport_center_name,
            summary.start_time.format("%d/%m/%Y")
        );

        NewActivity::new(
            kind,
            description,
            &RegistrationPayload {
                player_id: player.player_id,
                player: &player.name,
                match_id: summary.match_id,
                sport_center: &summary.sport_center_name,
            },
        )
    }

    pub fn match_event(
        kind: ActivityType,
        summary: &MatchSummary,
    ) -> Result<NewActivity, ServiceError> {
        let verb = match kind {
            ActivityType::MatchCreated => "created",
            ActivityType::MatchDeleted => "deleted",
            _ => "updated",
        };

        let description = format!(
            "match at {} on {} {}",
            summary.sport_center_name,
            summary.start_time.format("%d/%m/%Y"),
            verb
        );

        NewActivity::new(
            kind,
            description,
            &MatchPayload {
                match_id: summary.match_id,
                sport_center: &summary.sport_center_name,
                start_time: summary.start_time,
            },
        )
    }

    pub fn sport_center_event(
        kind: ActivityType,
        center: &SportCenter,
    ) -> Result<NewActivity, ServiceError> {
        let description = match kind {
            ActivityType::SportCenterCreated => format!("sport center {} created", center.name),
            ActivityType::SportCenterPriceChanged => format!(
                "sport center {} now costs {:.2} per {} minutes",
                center.name, center.cost_per_section, center.minute_per_section
            ),
            _ => format!("sport center {} updated", center.name),
        };

        NewActivity::new(
            kind,
            description,
            &SportCenterPayload {
                sport_center_id: center.id,
                name: &center.name,
                cost_per_section: center.cost_per_section,
                minute_per_section: center.minute_per_section,
            },
        )
    }

    /// Store the activity, meant to be called inside the transaction
    /// of the change it describes
    pub fn save(&self, conn: &db::Conn) -> Result<Activity, ServiceError> {
        let activity = diesel::insert_into(activities::table)
            .values(self)
            .get_result::<Activity>(conn)?;

        Ok(activity)
    }
}

impl Activity {
    /// returns the most recent activities, newest first
    pub fn latest(conn: &db::Conn) -> Result<Vec<ActivityResponse>, ServiceError> {
        let activities = activities::table
            .order(activities::created_at.desc())
            .limit(LOG_SIZE)
            .load::<Activity>(conn)?;

        Ok(activities.into_iter().map(ActivityResponse::from).collect())
    }
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> ActivityResponse {
        let type_name = ActivityType::from_id(activity.type_id)
            .map(ActivityType::name)
            .unwrap_or("Unknown");

        let payload = serde_json::from_str(&activity.payload)
            .unwrap_or(serde_json::Value::String(activity.payload));

        ActivityResponse {
            type_id: activity.type_id,
            type_name,
            description: activity.description,
            payload,
            created_at: activity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary() -> MatchSummary {
        MatchSummary {
            match_id: 7,
            start_time: Utc.ymd(2024, 3, 1).and_hms(19, 0, 0),
            sport_center_name: String::from("Sports Hall"),
        }
    }

    #[test]
    fn activity_type_ids_round_trip() {
        assert_eq!(
            ActivityType::from_id(ActivityType::SportCenterPriceChanged.id()),
            Some(ActivityType::SportCenterPriceChanged)
        );
        assert_eq!(ActivityType::from_id(0), None);
    }

    #[test]
    fn registration_activity_description() {
        let player = PlayerSummary {
            player_id: 3,
            name: String::from("John Doe"),
        };

        let activity = NewActivity::registered(&player, &summary()).unwrap();

        assert_eq!(activity.type_id, ActivityType::MatchRegistered.id());
        assert_eq!(
            activity.description,
            "John Doe registered Sports Hall on 01/03/2024"
        );

        let payload: serde_json::Value = serde_json::from_str(&activity.payload).unwrap();
        assert_eq!(payload["player_id"], 3);
        assert_eq!(payload["match_id"], 7);
    }

    #[test]
    fn unknown_payloads_are_kept_as_text() {
        let response = ActivityResponse::from(Activity {
            id: 1,
            type_id: 42,
            description: String::from("legacy"),
            payload: String::from("not json"),
            created_at: Utc::now(),
        });

        assert_eq!(response.type_name, "Unknown");
        assert_eq!(response.payload, serde_json::json!("not json"));
    }
}
