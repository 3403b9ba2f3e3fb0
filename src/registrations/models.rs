use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer, Nullable, Text, Timestamptz};

use crate::activities::NewActivity;
use crate::db;
use crate::errors::ServiceError;
use crate::matches::Match;
use crate::players::{NewPlayer, Player};
use crate::schema::{matches, players, registrations};
use crate::validator::{self, Validate};

/// A player taking part in a match.
/// Withdrawn registrations keep their row with `deleted_at` set,
/// only registrations where it is null are active.
#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Registration {
    pub id: i64,
    pub player_id: i64,
    pub match_id: i64,
    pub total_player_paid_for: i32,
    pub is_paid: bool,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[table_name = "registrations"]
struct NewRegistration {
    player_id: i64,
    match_id: i64,
    total_player_paid_for: i32,
}

/// RegisterMessage is sent by an organiser to register any player
#[derive(Debug, Deserialize)]
pub struct RegisterMessage {
    pub player_id: i64,
    pub match_id: i64,
}

/// MatchRegisterMessage is sent by a player registering themself
#[derive(Debug, Deserialize)]
pub struct MatchRegisterMessage {
    pub match_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaidForMessage {
    pub count: i32,
}

#[derive(Debug, Deserialize)]
pub struct CommentMessage {
    #[serde(default)]
    pub comment: String,
}

/// Toggles the attendance of an external user for a match.
/// The name and email are only used when the user has no player yet.
///
/// **POST /api/registrations/attendant-requests**
///
/// ``` shell
/// curl --location --request POST 'http://localhost:8080/api/registrations/attendant-requests' \
/// --header 'Content-Type: application/json' \
/// --data-raw '{
///     "external_user_id": "auth0|1234",
///     "first_name": "John",
///     "last_name": "Doe",
///     "email": "john@example.com",
///     "match_id": 12
/// }'
/// ```
#[derive(Debug, Deserialize)]
pub struct AttendantRequestMessage {
    pub external_user_id: String,
    pub match_id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AttendanceToggle {
    pub registered: bool,
    pub registration: Registration,
}

/// An active registration with the player and match it links
#[derive(Debug, Serialize)]
pub struct RegistrationOverview {
    pub registration_id: i64,
    pub match_id: i64,
    pub match_date: DateTime<Utc>,
    pub player_id: i64,
    pub player_name: String,
    pub email: String,
    pub total_player_paid_for: i32,
    pub is_paid: bool,
    pub comment: String,
}

/// Every player with their registration for a single match, if any
#[derive(Debug, Serialize, QueryableByName)]
pub struct RosterEntry {
    #[sql_type = "BigInt"]
    pub player_id: i64,
    #[sql_type = "Text"]
    pub player_name: String,
    #[sql_type = "Text"]
    pub email: String,
    #[sql_type = "Nullable<BigInt>"]
    pub registration_id: Option<i64>,
    #[sql_type = "Nullable<Integer>"]
    pub total_player_paid_for: Option<i32>,
    #[sql_type = "Nullable<Bool>"]
    pub is_paid: Option<bool>,
    #[sql_type = "Nullable<Text>"]
    pub comment: Option<String>,
    #[sql_type = "Nullable<Timestamptz>"]
    pub registered_at: Option<DateTime<Utc>>,
}

const MAX_COMMENT_LENGTH: usize = 255;

impl Validate<CommentMessage> for CommentMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.comment.chars().count() > MAX_COMMENT_LENGTH {
            bad_request!(format!(
                "comment is too long, maximum {} characters",
                MAX_COMMENT_LENGTH
            ));
        }

        Ok(())
    }
}

impl Validate<AttendantRequestMessage> for AttendantRequestMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.external_user_id.trim().is_empty() {
            bad_request!("external user id is missing");
        }

        validator::email(&self.email)
    }
}

/// one registration always covers at least its own player
pub fn paid_for_count(count: i32) -> i32 {
    count.max(1)
}

/// a player can only hold one active registration per match
fn ensure_not_registered(active: Option<&Registration>) -> Result<(), ServiceError> {
    if active.is_some() {
        conflict!("player already registered this match");
    }

    Ok(())
}

impl Registration {
    pub fn find_active(id: i64, conn: &db::Conn) -> Result<Registration, ServiceError> {
        let registration = registrations::table
            .find(id)
            .filter(registrations::deleted_at.is_null())
            .first::<Registration>(conn)
            .optional()?;

        match registration {
            Some(registration) => Ok(registration),
            None => {
                not_found!("registration not found");
            }
        }
    }

    fn find_active_for(
        player_id: i64,
        match_id: i64,
        conn: &db::Conn,
    ) -> Result<Option<Registration>, ServiceError> {
        let registration = registrations::table
            .filter(registrations::player_id.eq(player_id))
            .filter(registrations::match_id.eq(match_id))
            .filter(registrations::deleted_at.is_null())
            .first::<Registration>(conn)
            .optional()?;

        Ok(registration)
    }

    /// Registers the player for the match and logs the activity.
    /// A player can only hold one active registration per match.
    #[tracing::instrument(name = "Registration::register", skip(conn))]
    pub fn register(
        player_id: i64,
        match_id: i64,
        conn: &db::Conn,
    ) -> Result<Registration, ServiceError> {
        conn.transaction::<Registration, ServiceError, _>(|| {
            let player = Player::find(player_id, conn)?;
            Registration::insert(&player, match_id, conn)
        })
    }

    /// registers the player linked to the external user
    pub fn register_external(
        external_user_id: &str,
        match_id: i64,
        conn: &db::Conn,
    ) -> Result<Registration, ServiceError> {
        conn.transaction::<Registration, ServiceError, _>(|| {
            let player = match Player::find_by_external_id(external_user_id, conn)? {
                Some(player) => player,
                None => {
                    not_found!("no player profile linked to this user");
                }
            };
            Registration::insert(&player, match_id, conn)
        })
    }

    fn insert(player: &Player, match_id: i64, conn: &db::Conn) -> Result<Registration, ServiceError> {
        let summary = Match::summary(match_id, conn)?;

        let active = Registration::find_active_for(player.id, match_id, conn)?;
        ensure_not_registered(active.as_ref())?;

        let registration = diesel::insert_into(registrations::table)
            .values(&NewRegistration {
                player_id: player.id,
                match_id,
                total_player_paid_for: 1,
            })
            .get_result::<Registration>(conn)?;

        NewActivity::registered(&player.summary(), &summary)?.save(conn)?;

        debug!("player {} registered match {}", player.id, match_id);

        Ok(registration)
    }

    /// Withdraws the registration, the row is kept as history
    pub fn unregister(id: i64, conn: &db::Conn) -> Result<Registration, ServiceError> {
        conn.transaction::<Registration, ServiceError, _>(|| {
            let registration = Registration::find_active(id, conn)?;
            Registration::withdraw(registration, conn)
        })
    }

    fn withdraw(registration: Registration, conn: &db::Conn) -> Result<Registration, ServiceError> {
        let player = Player::find(registration.player_id, conn)?;
        let summary = Match::summary(registration.match_id, conn)?;

        let registration = diesel::update(&registration)
            .set(registrations::deleted_at.eq(Utc::now()))
            .get_result::<Registration>(conn)?;

        NewActivity::unregistered(&player.summary(), &summary)?.save(conn)?;

        debug!(
            "player {} unregistered match {}",
            player.id, registration.match_id
        );

        Ok(registration)
    }

    pub fn set_paid(id: i64, is_paid: bool, conn: &db::Conn) -> Result<Registration, ServiceError> {
        let registration = Registration::find_active(id, conn)?;

        let registration = diesel::update(&registration)
            .set(registrations::is_paid.eq(is_paid))
            .get_result::<Registration>(conn)?;

        Ok(registration)
    }

    pub fn set_paid_for(id: i64, count: i32, conn: &db::Conn) -> Result<Registration, ServiceError> {
        let registration = Registration::find_active(id, conn)?;

        let registration = diesel::update(&registration)
            .set(registrations::total_player_paid_for.eq(paid_for_count(count)))
            .get_result::<Registration>(conn)?;

        Ok(registration)
    }

    pub fn set_comment(
        id: i64,
        comment: CommentMessage,
        conn: &db::Conn,
    ) -> Result<Registration, ServiceError> {
        let registration = Registration::find_active(id, conn)?;

        let registration = diesel::update(&registration)
            .set(registrations::comment.eq(comment.comment.trim()))
            .get_result::<Registration>(conn)?;

        Ok(registration)
    }

    /// Registers the external user when they are not registered yet,
    /// otherwise withdraws their registration.
    /// Unknown users get a player first.
    #[tracing::instrument(name = "Registration::toggle_attendance", skip(conn))]
    pub fn toggle_attendance(
        request: AttendantRequestMessage,
        conn: &db::Conn,
    ) -> Result<AttendanceToggle, ServiceError> {
        conn.transaction::<AttendanceToggle, ServiceError, _>(|| {
            let player = match Player::find_by_external_id(&request.external_user_id, conn)? {
                Some(player) => player,
                None => {
                    validator::name("first name", &request.first_name, 60)?;

                    let player = NewPlayer {
                        first_name: request.first_name.trim().to_string(),
                        last_name: request.last_name.trim().to_string(),
                        email: request.email.clone(),
                        external_user_id: Some(request.external_user_id.clone()),
                    }
                    .save(conn)?;

                    info!("created player {} for an attendant request", player.id);

                    player
                }
            };

            match Registration::find_active_for(player.id, request.match_id, conn)? {
                Some(registration) => Ok(AttendanceToggle {
                    registered: false,
                    registration: Registration::withdraw(registration, conn)?,
                }),
                None => Ok(AttendanceToggle {
                    registered: true,
                    registration: Registration::insert(&player, request.match_id, conn)?,
                }),
            }
        })
    }

    /// every active registration, most recent match first
    pub fn overview(conn: &db::Conn) -> Result<Vec<RegistrationOverview>, ServiceError> {
        let rows = registrations::table
            .inner_join(players::table)
            .inner_join(matches::table)
            .filter(registrations::deleted_at.is_null())
            .select((
                registrations::all_columns,
                players::all_columns,
                matches::start_time,
            ))
            .order((matches::start_time.desc(), players::first_name.asc()))
            .load::<(Registration, Player, DateTime<Utc>)>(conn)?;

        let overview = rows
            .into_iter()
            .map(|(registration, player, match_date)| RegistrationOverview {
                registration_id: registration.id,
                match_id: registration.match_id,
                match_date,
                player_id: player.id,
                player_name: player.full_name(),
                email: player.email,
                total_player_paid_for: registration.total_player_paid_for,
                is_paid: registration.is_paid,
                comment: registration.comment,
            })
            .collect();

        Ok(overview)
    }

    /// every player, with their active registration for the match when they have one
    pub fn roster(match_id: i64, conn: &db::Conn) -> Result<Vec<RosterEntry>, ServiceError> {
        Match::find(match_id, conn)?;

        let roster = diesel::sql_query(
            "SELECT p.id AS player_id,
                    TRIM(p.first_name || ' ' || p.last_name) AS player_name,
                    p.email,
                    r.id AS registration_id,
                    r.total_player_paid_for,
                    r.is_paid,
                    r.comment,
                    r.created_at AS registered_at
             FROM players p
             LEFT JOIN registrations r
                ON r.player_id = p.id
               AND r.match_id = $1
               AND r.deleted_at IS NULL
             ORDER BY p.first_name, p.id",
        )
        .bind::<BigInt, _>(match_id)
        .load::<RosterEntry>(conn)?;

        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::MatchMessage;
    use crate::players::PlayerMessage;
    use crate::sport_centers::{SportCenter, SportCenterMessage};
    use crate::validator::Validator;
    use chrono::Duration;

    fn registration(deleted_at: Option<DateTime<Utc>>) -> Registration {
        Registration {
            id: 1,
            player_id: 2,
            match_id: 3,
            total_player_paid_for: 1,
            is_paid: false,
            comment: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at,
        }
    }

    /// a player and a match one week from now
    fn player_and_match(conn: &db::Conn) -> (Player, Match) {
        let center = SportCenter::create(
            SportCenterMessage {
                name: String::from("Sports Hall"),
                location: String::new(),
                cost_per_section: 10.0,
                minute_per_section: 30,
            },
            conn,
        )
        .unwrap();

        let start_time = Utc::now() + Duration::days(7);
        let game = Match::create(
            MatchMessage {
                sport_center_id: center.id,
                start_time,
                end_time: start_time + Duration::minutes(60),
                court: String::from("1"),
                custom_section: None,
            },
            conn,
        )
        .unwrap();

        let player = Player::create(
            PlayerMessage {
                first_name: String::from("John"),
                last_name: String::from("Doe"),
                email: String::new(),
                rank: 0,
            },
            conn,
        )
        .unwrap();

        (player, game)
    }

    #[test]
    fn active_registration_is_a_conflict() {
        assert_eq!(
            ensure_not_registered(Some(&registration(None))).unwrap_err(),
            ServiceError::Conflict(String::from("player already registered this match"))
        );
        assert!(ensure_not_registered(None).is_ok());
    }

    #[test]
    fn registering_twice_is_rejected() {
        let conn = match db::test_connection() {
            Some(conn) => conn,
            None => return,
        };
        let (player, game) = player_and_match(&conn);

        Registration::register(player.id, game.id, &conn).unwrap();

        assert_eq!(
            Registration::register(player.id, game.id, &conn).unwrap_err(),
            ServiceError::Conflict(String::from("player already registered this match"))
        );
    }

    #[test]
    fn registering_again_after_unregistering_creates_a_new_record() {
        let conn = match db::test_connection() {
            Some(conn) => conn,
            None => return,
        };
        let (player, game) = player_and_match(&conn);

        let first = Registration::register(player.id, game.id, &conn).unwrap();
        let withdrawn = Registration::unregister(first.id, &conn).unwrap();
        assert!(withdrawn.deleted_at.is_some());

        let second = Registration::register(player.id, game.id, &conn).unwrap();

        assert_ne!(second.id, first.id);
        assert!(second.deleted_at.is_none());
    }

    #[test]
    fn paid_for_count_is_at_least_one() {
        assert_eq!(paid_for_count(0), 1);
        assert_eq!(paid_for_count(-3), 1);
        assert_eq!(paid_for_count(1), 1);
        assert_eq!(paid_for_count(4), 4);
    }

    #[test]
    fn long_comments_are_rejected() {
        let comment = CommentMessage {
            comment: "x".repeat(MAX_COMMENT_LENGTH + 1),
        };

        assert!(Validator::new(comment).validate().is_err());
    }

    #[test]
    fn attendant_requests_need_an_external_user() {
        let request = AttendantRequestMessage {
            external_user_id: String::from(" "),
            match_id: 1,
            first_name: String::from("John"),
            last_name: String::new(),
            email: String::new(),
        };

        assert!(Validator::new(request).validate().is_err());
    }
}
