use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::players::{NewPlayer, Player};
use crate::schema::{players, users};
use crate::validator::{self, Validate};

/// A local copy of an identity managed by the external identity provider
#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct User {
    pub id: i64,
    pub external_user_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An identity as delivered by the identity provider.
///
/// **POST /api/users/sync**
///
/// ``` shell
/// curl --location --request POST 'http://localhost:8080/api/users/sync' \
/// --header 'Content-Type: application/json' \
/// --data-raw '[{
///     "user_id": "auth0|1234",
///     "email": "john@example.com",
///     "given_name": "John",
///     "family_name": "Doe",
///     "picture": "https://example.com/john.png"
/// }]'
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalIdentity {
    #[serde(alias = "user_id")]
    pub external_user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "given_name")]
    pub first_name: String,
    #[serde(default, alias = "family_name")]
    pub last_name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[table_name = "users"]
struct NewUser<'a> {
    external_user_id: &'a str,
    email: &'a str,
    name: String,
    picture: Option<&'a str>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
}

impl Validate<ExternalIdentity> for ExternalIdentity {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.external_user_id.trim().is_empty() {
            bad_request!("external user id is missing");
        }

        let fields = [
            &self.external_user_id,
            &self.email,
            &self.first_name,
            &self.last_name,
        ];
        if fields.iter().any(|field| field.contains('\0')) {
            bad_request!("identity fields cannot contain null characters");
        }

        validator::email(&self.email)
    }
}

impl Validate<Vec<ExternalIdentity>> for Vec<ExternalIdentity> {
    fn validate(&self) -> Result<(), ServiceError> {
        self.iter().try_for_each(|identity| identity.validate())
    }
}

impl ExternalIdentity {
    /// the full name, or the email when the provider knows no name
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());

        match name.trim() {
            "" => self.email.clone(),
            name => name.to_string(),
        }
    }

    /// Mirrors the identity and links it to a player, creating the player
    /// when the identity is new. Returns true when a player was created.
    fn sync(&self, conn: &db::Conn) -> Result<bool, ServiceError> {
        conn.transaction::<bool, ServiceError, _>(|| {
            let user = NewUser {
                external_user_id: &self.external_user_id,
                email: &self.email,
                name: self.display_name(),
                picture: self.picture.as_deref(),
            };

            diesel::insert_into(users::table)
                .values(&user)
                .on_conflict(users::external_user_id)
                .do_update()
                .set(&user)
                .execute(conn)?;

            match Player::find_by_external_id(&self.external_user_id, conn)? {
                Some(player) => {
                    self.update_player(&player, conn)?;
                    Ok(false)
                }
                None => {
                    let first_name = match self.first_name.trim() {
                        "" => self.display_name(),
                        name => name.to_string(),
                    };

                    NewPlayer {
                        first_name,
                        last_name: self.last_name.trim().to_string(),
                        email: self.email.clone(),
                        external_user_id: Some(self.external_user_id.clone()),
                    }
                    .save(conn)?;

                    Ok(true)
                }
            }
        })
    }

    /// names and email set by hand are only replaced by non empty values
    fn update_player(&self, player: &Player, conn: &db::Conn) -> Result<(), ServiceError> {
        let first_name = non_empty(&self.first_name).unwrap_or(&player.first_name);
        let last_name = non_empty(&self.last_name).unwrap_or(&player.last_name);
        let email = non_empty(&self.email).unwrap_or(&player.email);

        diesel::update(player)
            .set((
                players::first_name.eq(first_name),
                players::last_name.eq(last_name),
                players::email.eq(email),
            ))
            .execute(conn)?;

        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    match value.trim() {
        "" => None,
        value => Some(value),
    }
}

impl User {
    pub fn find_all(conn: &db::Conn) -> Result<Vec<User>, ServiceError> {
        let users = users::table
            .order(users::name.asc())
            .load::<User>(conn)?;

        Ok(users)
    }

    /// Upserts the identities, a failing identity rolls back the whole batch
    #[tracing::instrument(name = "User::sync", skip(identities, conn))]
    pub fn sync(
        identities: Vec<ExternalIdentity>,
        conn: &db::Conn,
    ) -> Result<SyncSummary, ServiceError> {
        let summary = conn.transaction::<SyncSummary, ServiceError, _>(|| {
            let mut summary = SyncSummary::default();

            for identity in &identities {
                if identity.sync(conn)? {
                    summary.created += 1;
                } else {
                    summary.updated += 1;
                }
            }

            Ok(summary)
        })?;

        info!(
            "synced identities, {} players created, {} updated",
            summary.created, summary.updated
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    fn identity(first_name: &str, last_name: &str) -> ExternalIdentity {
        ExternalIdentity {
            external_user_id: String::from("auth0|1234"),
            email: String::from("john@example.com"),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            picture: None,
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(identity("John", "Doe").display_name(), "John Doe");
        assert_eq!(identity("John", "").display_name(), "John");
        assert_eq!(identity("", "").display_name(), "john@example.com");
    }

    #[test]
    fn provider_field_names_are_accepted() {
        let identity: ExternalIdentity = serde_json::from_str(
            r#"{
                "user_id": "auth0|1234",
                "email": "john@example.com",
                "given_name": "John",
                "family_name": "Doe"
            }"#,
        )
        .unwrap();

        assert_eq!(identity.external_user_id, "auth0|1234");
        assert_eq!(identity.first_name, "John");
        assert_eq!(identity.last_name, "Doe");
        assert!(identity.picture.is_none());
    }

    #[test]
    fn identities_need_an_id() {
        let mut invalid = identity("John", "Doe");
        invalid.external_user_id = String::new();

        assert!(Validator::new(vec![identity("Jane", "Doe"), invalid])
            .validate()
            .is_err());
    }

    #[test]
    fn null_characters_are_rejected() {
        let invalid = identity("Ja\u{0}ne", "Doe");

        assert_eq!(
            Validator::new(invalid).validate().unwrap_err(),
            ServiceError::BadRequest(String::from(
                "identity fields cannot contain null characters"
            ))
        );
    }

    #[test]
    fn failing_identity_rolls_back_the_batch() {
        let conn = match db::test_connection() {
            Some(conn) => conn,
            None => return,
        };

        let mut first = identity("John", "Doe");
        first.external_user_id = String::from("auth0|batch-first");
        let mut broken = identity("Ja\u{0}ne", "Doe");
        broken.external_user_id = String::from("auth0|batch-broken");

        assert!(User::sync(vec![first, broken], &conn).is_err());

        let users = users::table
            .filter(users::external_user_id.eq("auth0|batch-first"))
            .count()
            .get_result::<i64>(&conn)
            .unwrap();
        let players = players::table
            .filter(players::external_user_id.eq("auth0|batch-first"))
            .count()
            .get_result::<i64>(&conn)
            .unwrap();

        assert_eq!(users, 0);
        assert_eq!(players, 0);
    }

    #[test]
    fn sync_creates_then_updates() {
        let conn = match db::test_connection() {
            Some(conn) => conn,
            None => return,
        };

        let mut john = identity("John", "Doe");
        john.external_user_id = String::from("auth0|sync-twice");

        let created = User::sync(vec![john.clone()], &conn).unwrap();
        assert_eq!(created, SyncSummary { created: 1, updated: 0 });

        let updated = User::sync(vec![john], &conn).unwrap();
        assert_eq!(updated, SyncSummary { created: 0, updated: 1 });
    }

    #[test]
    fn blank_values_are_ignored() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" John "), Some("John"));
    }
}
