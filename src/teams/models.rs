use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::players::Player;
use crate::schema::{players, team_members, teams};
use crate::validator::{self, Validate};

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TeamMessage {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Insertable)]
#[table_name = "teams"]
struct NewTeam<'a> {
    name: &'a str,
    description: &'a str,
    owner_id: &'a str,
}

/// Fields left out are kept as they are
#[derive(Debug, Deserialize, AsChangeset)]
#[table_name = "teams"]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[table_name = "team_members"]
pub struct TeamMember {
    pub team_id: i64,
    pub player_id: i64,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberMessage {
    pub player_id: i64,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    String::from("member")
}

#[derive(Debug, Serialize, Queryable)]
pub struct MemberResponse {
    pub player_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<MemberResponse>,
}

const MAX_NAME_LENGTH: usize = 60;
const MAX_DESCRIPTION_LENGTH: usize = 255;
const MAX_ROLE_LENGTH: usize = 30;

fn description(value: &str) -> Result<(), ServiceError> {
    if value.chars().count() > MAX_DESCRIPTION_LENGTH {
        bad_request!(format!(
            "description is too long, maximum {} characters",
            MAX_DESCRIPTION_LENGTH
        ));
    }

    Ok(())
}

impl Validate<TeamMessage> for TeamMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name("name", &self.name, MAX_NAME_LENGTH)?;
        description(&self.description)
    }
}

impl Validate<TeamUpdate> for TeamUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.name.is_none() && self.description.is_none() {
            bad_request!("nothing to update");
        }

        if let Some(name) = &self.name {
            validator::name("name", name, MAX_NAME_LENGTH)?;
        }

        if let Some(value) = &self.description {
            description(value)?;
        }

        Ok(())
    }
}

impl Validate<MemberMessage> for MemberMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name("role", &self.role, MAX_ROLE_LENGTH)
    }
}

impl Team {
    pub fn is_owned_by(&self, external_user_id: &str) -> bool {
        self.owner_id == external_user_id
    }

    fn find(id: i64, conn: &db::Conn) -> Result<Team, ServiceError> {
        let team = teams::table.find(id).first::<Team>(conn).optional()?;

        match team {
            Some(team) => Ok(team),
            None => {
                not_found!("team not found");
            }
        }
    }

    fn find_owned(id: i64, owner_id: &str, conn: &db::Conn) -> Result<Team, ServiceError> {
        let team = Team::find(id, conn)?;

        if !team.is_owned_by(owner_id) {
            forbidden!("you are not the owner of this team");
        }

        Ok(team)
    }

    pub fn create(
        team: TeamMessage,
        owner_id: &str,
        conn: &db::Conn,
    ) -> Result<Team, ServiceError> {
        let team = diesel::insert_into(teams::table)
            .values(&NewTeam {
                name: team.name.trim(),
                description: team.description.trim(),
                owner_id,
            })
            .get_result::<Team>(conn)?;

        Ok(team)
    }

    /// the teams the user owns or plays in
    pub fn find_for_user(external_user_id: &str, conn: &db::Conn) -> Result<Vec<Team>, ServiceError> {
        let member_of = team_members::table
            .inner_join(players::table)
            .filter(players::external_user_id.eq(external_user_id))
            .select(team_members::team_id);

        let teams = teams::table
            .filter(
                teams::owner_id
                    .eq(external_user_id)
                    .or(teams::id.eq_any(member_of)),
            )
            .order(teams::name.asc())
            .load::<Team>(conn)?;

        Ok(teams)
    }

    pub fn find_with_members(id: i64, conn: &db::Conn) -> Result<TeamResponse, ServiceError> {
        let team = Team::find(id, conn)?;

        let members = team_members::table
            .inner_join(players::table)
            .filter(team_members::team_id.eq(id))
            .select((
                players::id,
                players::first_name,
                players::last_name,
                team_members::role,
            ))
            .order(players::first_name.asc())
            .load::<MemberResponse>(conn)?;

        Ok(TeamResponse { team, members })
    }

    pub fn update(
        id: i64,
        changes: TeamUpdate,
        owner_id: &str,
        conn: &db::Conn,
    ) -> Result<Team, ServiceError> {
        let team = Team::find_owned(id, owner_id, conn)?;

        let team = diesel::update(&team)
            .set(&changes)
            .get_result::<Team>(conn)?;

        Ok(team)
    }

    pub fn delete(id: i64, owner_id: &str, conn: &db::Conn) -> Result<(), ServiceError> {
        conn.transaction::<(), ServiceError, _>(|| {
            let team = Team::find_owned(id, owner_id, conn)?;

            diesel::delete(team_members::table.filter(team_members::team_id.eq(team.id)))
                .execute(conn)?;
            diesel::delete(&team).execute(conn)?;

            Ok(())
        })
    }

    pub fn add_member(
        id: i64,
        member: MemberMessage,
        owner_id: &str,
        conn: &db::Conn,
    ) -> Result<TeamMember, ServiceError> {
        conn.transaction::<TeamMember, ServiceError, _>(|| {
            let team = Team::find_owned(id, owner_id, conn)?;
            let player = Player::find(member.player_id, conn)?;

            let existing = team_members::table
                .find((team.id, player.id))
                .first::<TeamMember>(conn)
                .optional()?;

            if existing.is_some() {
                conflict!("player is already a member of this team");
            }

            let member = diesel::insert_into(team_members::table)
                .values(&TeamMember {
                    team_id: team.id,
                    player_id: player.id,
                    role: member.role.trim().to_string(),
                })
                .get_result::<TeamMember>(conn)?;

            Ok(member)
        })
    }

    pub fn remove_member(
        id: i64,
        player_id: i64,
        owner_id: &str,
        conn: &db::Conn,
    ) -> Result<(), ServiceError> {
        conn.transaction::<(), ServiceError, _>(|| {
            let team = Team::find_owned(id, owner_id, conn)?;

            let removed = diesel::delete(team_members::table.find((team.id, player_id)))
                .execute(conn)?;

            if removed == 0 {
                not_found!("player is not a member of this team");
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    fn team() -> Team {
        Team {
            id: 1,
            name: String::from("Tuesday club"),
            description: String::new(),
            owner_id: String::from("auth0|1234"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ownership() {
        assert!(team().is_owned_by("auth0|1234"));
        assert!(!team().is_owned_by("auth0|5678"));
    }

    #[test]
    fn empty_updates_are_rejected() {
        let update = TeamUpdate {
            name: None,
            description: None,
        };

        assert!(Validator::new(update).validate().is_err());
    }

    #[test]
    fn members_need_a_role() {
        let member: MemberMessage = serde_json::from_str(r#"{ "player_id": 4 }"#).unwrap();
        assert_eq!(member.role, "member");
        assert!(Validator::new(member).validate().is_ok());

        let member = MemberMessage {
            player_id: 4,
            role: String::new(),
        };
        assert!(Validator::new(member).validate().is_err());
    }
}
