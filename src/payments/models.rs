use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Text, Timestamptz};

use crate::db;
use crate::errors::ServiceError;
use crate::matches::cost;

/// An active, unpaid registration with the cost figures of its match
#[derive(Debug, Clone, QueryableByName)]
pub struct UnpaidRegistration {
    #[sql_type = "BigInt"]
    pub player_id: i64,
    #[sql_type = "Text"]
    pub player_name: String,
    #[sql_type = "Text"]
    pub email: String,
    #[sql_type = "Integer"]
    pub total_player_paid_for: i32,
    #[sql_type = "BigInt"]
    pub match_id: i64,
    #[sql_type = "Timestamptz"]
    pub match_date: DateTime<Utc>,
    #[sql_type = "Double"]
    pub match_cost: f64,
    #[sql_type = "Double"]
    pub match_additional_cost: f64,
    #[sql_type = "BigInt"]
    pub match_player_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingMatch {
    pub match_id: i64,
    pub date: DateTime<Utc>,
    pub match_cost: f64,
    pub additional_cost: f64,
    pub total_cost: f64,
    pub player_count: i64,
    pub individual_cost: f64,
    pub paid_for: i32,
    pub amount: f64,
}

/// What a single player still owes.
///
/// **GET /api/reports/outstanding-payments**
///
/// ``` shell
/// curl --location --request GET 'http://localhost:8080/api/reports/outstanding-payments'
/// [
///     {
///         "player_id": 3,
///         "player_name": "John Doe",
///         "email": "john@example.com",
///         "match_count": 2,
///         "unpaid_amount": 50.0,
///         "registration_summary": "01.Mar.2024:£25.00,15.Feb.2024:£25.00",
///         "matches": [...]
///     }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingPayment {
    pub player_id: i64,
    pub player_name: String,
    pub email: String,
    pub match_count: usize,
    pub unpaid_amount: f64,
    pub registration_summary: String,
    pub matches: Vec<OutstandingMatch>,
}

#[derive(Debug, Deserialize)]
pub struct ShareCodeQuery {
    pub share_code: Option<String>,
}

const UNPAID_REGISTRATIONS: &str = "
    WITH match_costs AS (
        SELECT m.id,
               m.start_time,
               m.cost,
               COALESCE((SELECT SUM(a.amount)
                         FROM additional_costs a
                         WHERE a.match_id = m.id), 0)::float8 AS additional_cost,
               COALESCE((SELECT SUM(r.total_player_paid_for)
                         FROM registrations r
                         WHERE r.match_id = m.id
                           AND r.deleted_at IS NULL), 0)::int8 AS player_count
        FROM matches m
    )
    SELECT p.id AS player_id,
           TRIM(p.first_name || ' ' || p.last_name) AS player_name,
           p.email,
           r.total_player_paid_for,
           mc.id AS match_id,
           mc.start_time AS match_date,
           mc.cost AS match_cost,
           mc.additional_cost AS match_additional_cost,
           mc.player_count AS match_player_count
    FROM registrations r
    INNER JOIN players p ON p.id = r.player_id
    INNER JOIN match_costs mc ON mc.id = r.match_id
    WHERE r.deleted_at IS NULL
      AND r.is_paid = false
    ORDER BY p.id, mc.start_time DESC";

impl OutstandingPayment {
    #[tracing::instrument(name = "OutstandingPayment::report", skip(conn))]
    pub fn report(conn: &db::Conn) -> Result<Vec<OutstandingPayment>, ServiceError> {
        let rows = diesel::sql_query(UNPAID_REGISTRATIONS).load::<UnpaidRegistration>(conn)?;

        Ok(aggregate(rows))
    }

    /// the report as shown to anyone holding a share code
    pub fn public_report(conn: &db::Conn) -> Result<Vec<OutstandingPayment>, ServiceError> {
        let report = OutstandingPayment::report(conn)?
            .into_iter()
            .map(|mut payment| {
                payment.email = mask_email(&payment.email);
                payment
            })
            .collect();

        Ok(report)
    }
}

impl From<&UnpaidRegistration> for OutstandingMatch {
    fn from(row: &UnpaidRegistration) -> OutstandingMatch {
        let total_cost = row.match_cost + row.match_additional_cost;
        let individual_cost = cost::individual_cost(total_cost, row.match_player_count);

        OutstandingMatch {
            match_id: row.match_id,
            date: row.match_date,
            match_cost: row.match_cost,
            additional_cost: row.match_additional_cost,
            total_cost,
            player_count: row.match_player_count,
            individual_cost,
            paid_for: row.total_player_paid_for,
            amount: individual_cost * f64::from(row.total_player_paid_for),
        }
    }
}

/// Groups the unpaid registrations per player, ordered by name ignoring case
pub fn aggregate(rows: Vec<UnpaidRegistration>) -> Vec<OutstandingPayment> {
    let mut by_player: BTreeMap<i64, OutstandingPayment> = BTreeMap::new();

    for row in &rows {
        let payment = by_player
            .entry(row.player_id)
            .or_insert_with(|| OutstandingPayment {
                player_id: row.player_id,
                player_name: row.player_name.clone(),
                email: row.email.clone(),
                match_count: 0,
                unpaid_amount: 0.0,
                registration_summary: String::new(),
                matches: Vec::new(),
            });

        payment.matches.push(OutstandingMatch::from(row));
    }

    let mut payments: Vec<OutstandingPayment> = by_player
        .into_iter()
        .map(|(_, mut payment)| {
            payment.matches.sort_by(|a, b| b.date.cmp(&a.date));
            payment.match_count = payment.matches.len();
            payment.unpaid_amount = payment.matches.iter().fold(0.0, |sum, m| sum + m.amount);
            payment.registration_summary = summary(&payment.matches);
            payment
        })
        .collect();

    payments.sort_by(|a, b| {
        a.player_name
            .to_lowercase()
            .cmp(&b.player_name.to_lowercase())
            .then(a.player_id.cmp(&b.player_id))
    });

    payments
}

/// `DD.Mon.YYYY:£x.yy` for every match, joined by a comma
fn summary(matches: &[OutstandingMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("{}:£{:.2}", m.date.format("%d.%b.%Y"), m.amount))
        .collect::<Vec<String>>()
        .join(",")
}

/// Hides most of the local part of an email address,
/// `john@example.com` becomes `jo***n@example.com`
pub fn mask_email(email: &str) -> String {
    let (local, domain) = match email.find('@') {
        Some(at) => email.split_at(at),
        None => (email, ""),
    };

    let chars: Vec<char> = local.chars().collect();

    let masked = match chars.len() {
        0 => String::new(),
        1..=3 => format!("{}***", chars[0]),
        n => format!("{}{}***{}", chars[0], chars[1], chars[n - 1]),
    };

    format!("{}{}", masked, domain)
}
