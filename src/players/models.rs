use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::schema::{players, registrations, team_members};
use crate::validator::{self, Validate};

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Player {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub external_user_id: Option<String>,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The name of a player as it shows up in activities and reports
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub player_id: i64,
    pub name: String,
}

/// PlayerMessage is what the client sends to create or update a player
#[derive(Debug, Deserialize, Insertable, AsChangeset)]
#[table_name = "players"]
pub struct PlayerMessage {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rank: i32,
}

#[derive(Debug, Insertable)]
#[table_name = "players"]
pub struct NewPlayer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub external_user_id: Option<String>,
}

/// A match the external user is registered for
#[derive(Debug, Serialize, Queryable)]
pub struct AttendantRequest {
    pub match_id: i64,
    pub player_id: i64,
}

const MAX_NAME_LENGTH: usize = 60;

impl Validate<PlayerMessage> for PlayerMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name("first name", &self.first_name, MAX_NAME_LENGTH)?;

        if self.last_name.chars().count() > MAX_NAME_LENGTH {
            bad_request!(format!(
                "last name is too long, maximum {} characters",
                MAX_NAME_LENGTH
            ));
        }

        validator::email(&self.email)?;

        if self.rank < 0 {
            bad_request!("rank cannot be negative");
        }

        Ok(())
    }
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            player_id: self.id,
            name: self.full_name(),
        }
    }

    pub fn find_all(conn: &db::Conn) -> Result<Vec<Player>, ServiceError> {
        let players = players::table
            .order((players::first_name.asc(), players::id.asc()))
            .load::<Player>(conn)?;

        Ok(players)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<Player, ServiceError> {
        let player = players::table.find(id).first::<Player>(conn).optional()?;

        match player {
            Some(player) => Ok(player),
            None => {
                not_found!("player not found");
            }
        }
    }

    pub fn find_by_external_id(
        external_user_id: &str,
        conn: &db::Conn,
    ) -> Result<Option<Player>, ServiceError> {
        let player = players::table
            .filter(players::external_user_id.eq(external_user_id))
            .first::<Player>(conn)
            .optional()?;

        Ok(player)
    }

    pub fn create(player: PlayerMessage, conn: &db::Conn) -> Result<Player, ServiceError> {
        let player = diesel::insert_into(players::table)
            .values(&player)
            .get_result::<Player>(conn)?;

        info!("created player {}", player.id);

        Ok(player)
    }

    pub fn update(id: i64, player: PlayerMessage, conn: &db::Conn) -> Result<Player, ServiceError> {
        Player::find(id, conn)?;

        let player = diesel::update(players::table.find(id))
            .set(&player)
            .get_result::<Player>(conn)?;

        Ok(player)
    }

    /// Removes a player together with its registrations and team memberships.
    /// The wallet is removed by the database cascade.
    pub fn delete(id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        conn.transaction::<(), ServiceError, _>(|| {
            Player::find(id, conn)?;

            diesel::delete(registrations::table.filter(registrations::player_id.eq(id)))
                .execute(conn)?;
            diesel::delete(team_members::table.filter(team_members::player_id.eq(id)))
                .execute(conn)?;
            diesel::delete(players::table.find(id)).execute(conn)?;

            Ok(())
        })?;

        info!("deleted player {}", id);

        Ok(())
    }

    /// Marks every active unpaid registration of the player as paid,
    /// returns the amount of registrations that changed
    pub fn mark_outstanding_paid(id: i64, conn: &db::Conn) -> Result<usize, ServiceError> {
        Player::find(id, conn)?;

        let updated = diesel::update(
            registrations::table
                .filter(registrations::player_id.eq(id))
                .filter(registrations::deleted_at.is_null())
                .filter(registrations::is_paid.eq(false)),
        )
        .set(registrations::is_paid.eq(true))
        .execute(conn)?;

        Ok(updated)
    }

    /// The matches an external user currently holds an active registration for
    pub fn attendant_requests(
        external_user_id: &str,
        conn: &db::Conn,
    ) -> Result<Vec<AttendantRequest>, ServiceError> {
        let requests = registrations::table
            .inner_join(players::table)
            .filter(players::external_user_id.eq(external_user_id))
            .filter(registrations::deleted_at.is_null())
            .select((registrations::match_id, registrations::player_id))
            .order(registrations::match_id.asc())
            .load::<AttendantRequest>(conn)?;

        Ok(requests)
    }
}

impl NewPlayer {
    pub fn save(&self, conn: &db::Conn) -> Result<Player, ServiceError> {
        let player = diesel::insert_into(players::table)
            .values(self)
            .get_result::<Player>(conn)?;

        Ok(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    fn message(first_name: &str) -> PlayerMessage {
        PlayerMessage {
            first_name: first_name.to_string(),
            last_name: String::from("Doe"),
            email: String::from("john@example.com"),
            rank: 3,
        }
    }

    #[test]
    fn valid_player() {
        assert!(Validator::new(message("John")).validate().is_ok());
    }

    #[test]
    fn first_name_is_required() {
        assert!(Validator::new(message(" ")).validate().is_err());
    }

    #[test]
    fn negative_rank_is_rejected() {
        let mut player = message("John");
        player.rank = -1;

        assert!(Validator::new(player).validate().is_err());
    }

    #[test]
    fn full_name_without_last_name() {
        let player = Player {
            id: 1,
            first_name: String::from("John"),
            last_name: String::new(),
            email: String::new(),
            external_user_id: None,
            rank: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(player.full_name(), "John");
        assert_eq!(player.summary().player_id, 1);
    }
}
