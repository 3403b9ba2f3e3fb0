use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::activities::{ActivityType, NewActivity};
use crate::db;
use crate::errors::ServiceError;
use crate::schema::sport_centers;
use crate::validator::{self, Validate};

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct SportCenter {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub cost_per_section: f64,
    pub minute_per_section: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Insertable, AsChangeset)]
#[table_name = "sport_centers"]
pub struct SportCenterMessage {
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub cost_per_section: f64,
    pub minute_per_section: i32,
}

/// value/label pair used to fill a select box
#[derive(Debug, Serialize, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

const MAX_NAME_LENGTH: usize = 60;
const MAX_LOCATION_LENGTH: usize = 200;
/// a section can not last longer than a day
const MAX_MINUTES_PER_SECTION: i32 = 60 * 24;

impl Validate<SportCenterMessage> for SportCenterMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name("name", &self.name, MAX_NAME_LENGTH)?;

        if self.location.chars().count() > MAX_LOCATION_LENGTH {
            bad_request!(format!(
                "location is too long, maximum {} characters",
                MAX_LOCATION_LENGTH
            ));
        }

        validator::amount("cost per section", self.cost_per_section)?;

        if self.minute_per_section < 1 || self.minute_per_section > MAX_MINUTES_PER_SECTION {
            bad_request!(format!(
                "minutes per section must be between 1 and {}",
                MAX_MINUTES_PER_SECTION
            ));
        }

        Ok(())
    }
}

impl SportCenter {
    pub fn find_all(conn: &db::Conn) -> Result<Vec<SportCenter>, ServiceError> {
        let centers = sport_centers::table
            .order(sport_centers::name.asc())
            .load::<SportCenter>(conn)?;

        Ok(centers)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<SportCenter, ServiceError> {
        let center = sport_centers::table
            .find(id)
            .first::<SportCenter>(conn)
            .optional()?;

        match center {
            Some(center) => Ok(center),
            None => {
                not_found!("sport center not found");
            }
        }
    }

    pub fn create(
        center: SportCenterMessage,
        conn: &db::Conn,
    ) -> Result<SportCenter, ServiceError> {
        conn.transaction::<SportCenter, ServiceError, _>(|| {
            let center = diesel::insert_into(sport_centers::table)
                .values(&center)
                .get_result::<SportCenter>(conn)?;

            NewActivity::sport_center_event(ActivityType::SportCenterCreated, &center)?
                .save(conn)?;

            Ok(center)
        })
    }

    /// Updates the sport center, a change of rate is logged separately.
    /// Existing matches keep the rate they were priced with.
    pub fn update(
        id: i64,
        center: SportCenterMessage,
        conn: &db::Conn,
    ) -> Result<SportCenter, ServiceError> {
        conn.transaction::<SportCenter, ServiceError, _>(|| {
            let previous = SportCenter::find(id, conn)?;

            let updated = diesel::update(sport_centers::table.find(id))
                .set(&center)
                .get_result::<SportCenter>(conn)?;

            let kind = if previous.price_changed(&updated) {
                ActivityType::SportCenterPriceChanged
            } else {
                ActivityType::SportCenterUpdated
            };

            NewActivity::sport_center_event(kind, &updated)?.save(conn)?;

            Ok(updated)
        })
    }

    pub fn options(conn: &db::Conn) -> Result<Vec<SelectOption>, ServiceError> {
        let options = SportCenter::find_all(conn)?
            .iter()
            .map(SportCenter::option)
            .collect();

        Ok(options)
    }

    fn option(&self) -> SelectOption {
        SelectOption {
            value: self.id.to_string(),
            label: self.name.clone(),
        }
    }

    fn price_changed(&self, other: &SportCenter) -> bool {
        (self.cost_per_section - other.cost_per_section).abs() > f64::EPSILON
            || self.minute_per_section != other.minute_per_section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    fn center(cost_per_section: f64, minute_per_section: i32) -> SportCenter {
        SportCenter {
            id: 4,
            name: String::from("Sports Hall"),
            location: String::new(),
            cost_per_section,
            minute_per_section,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn message(minute_per_section: i32) -> SportCenterMessage {
        SportCenterMessage {
            name: String::from("Sports Hall"),
            location: String::from("Main street 1"),
            cost_per_section: 25.0,
            minute_per_section,
        }
    }

    #[test]
    fn section_length_is_bounded() {
        assert!(Validator::new(message(0)).validate().is_err());
        assert!(Validator::new(message(1441)).validate().is_err());
        assert!(Validator::new(message(60)).validate().is_ok());
    }

    #[test]
    fn negative_rates_are_rejected() {
        let mut center = message(60);
        center.cost_per_section = -5.0;

        assert!(Validator::new(center).validate().is_err());
    }

    #[test]
    fn price_changes() {
        assert!(!center(25.0, 60).price_changed(&center(25.0, 60)));
        assert!(center(25.0, 60).price_changed(&center(30.0, 60)));
        assert!(center(25.0, 60).price_changed(&center(25.0, 30)));
    }

    #[test]
    fn options_use_the_id_as_value() {
        assert_eq!(
            center(25.0, 60).option(),
            SelectOption {
                value: String::from("4"),
                label: String::from("Sports Hall"),
            }
        );
    }
}
