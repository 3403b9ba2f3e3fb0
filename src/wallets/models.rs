use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::players::Player;
use crate::schema::{players, wallet_transactions, wallets};
use crate::validator::{self, Validate};
use crate::wallets::ledger::{self, Entry};

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Wallet {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Queryable, Identifiable, Associations)]
#[belongs_to(Wallet)]
pub struct WalletTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub amount: f64,
    pub transaction_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[table_name = "wallet_transactions"]
struct NewWalletTransaction<'a> {
    wallet_id: i64,
    amount: f64,
    transaction_type: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize, Insertable)]
#[table_name = "wallets"]
pub struct WalletMessage {
    pub owner_id: i64,
    pub name: String,
}

/// Money moving in or out of a wallet
///
/// **POST /api/wallets/{id}/credit**
///
/// ``` shell
/// curl --location --request POST 'http://localhost:8080/api/wallets/1/credit' \
/// --header 'Content-Type: application/json' \
/// --data-raw '{ "amount": 20.0, "description": "cash" }'
/// ```
#[derive(Debug, Deserialize)]
pub struct AmountMessage {
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Queryable)]
pub struct WalletResponse {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

#[derive(Debug, Serialize)]
pub struct WalletDetails {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub wallet: Wallet,
    pub transaction: WalletTransaction,
}

const MAX_NAME_LENGTH: usize = 60;
const MAX_DESCRIPTION_LENGTH: usize = 255;

impl Validate<WalletMessage> for WalletMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name("name", &self.name, MAX_NAME_LENGTH)
    }
}

impl Validate<AmountMessage> for AmountMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            bad_request!("the amount must be greater than zero");
        }

        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            bad_request!(format!(
                "description is too long, maximum {} characters",
                MAX_DESCRIPTION_LENGTH
            ));
        }

        Ok(())
    }
}

impl Wallet {
    /// Opens a wallet for a player, every player has at most one
    pub fn create(wallet: WalletMessage, conn: &db::Conn) -> Result<Wallet, ServiceError> {
        conn.transaction::<Wallet, ServiceError, _>(|| {
            Player::find(wallet.owner_id, conn)?;

            let existing = wallets::table
                .filter(wallets::owner_id.eq(wallet.owner_id))
                .select(wallets::id)
                .first::<i64>(conn)
                .optional()?;

            if existing.is_some() {
                conflict!("this player already has a wallet");
            }

            let wallet = diesel::insert_into(wallets::table)
                .values(&wallet)
                .get_result::<Wallet>(conn)?;

            info!("opened wallet {} for player {}", wallet.id, wallet.owner_id);

            Ok(wallet)
        })
    }

    pub fn find_all(conn: &db::Conn) -> Result<Vec<WalletResponse>, ServiceError> {
        let wallets = wallets::table
            .inner_join(players::table)
            .select((
                wallets::id,
                wallets::owner_id,
                wallets::name,
                wallets::balance,
                wallets::created_at,
                wallets::updated_at,
                players::first_name,
                players::last_name,
            ))
            .order(players::first_name.asc())
            .load::<WalletResponse>(conn)?;

        Ok(wallets)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<WalletDetails, ServiceError> {
        let wallet = wallets::table.find(id).first::<Wallet>(conn).optional()?;

        match wallet {
            Some(wallet) => wallet.with_transactions(conn),
            None => {
                not_found!("wallet not found");
            }
        }
    }

    pub fn find_by_owner(player_id: i64, conn: &db::Conn) -> Result<WalletDetails, ServiceError> {
        let wallet = wallets::table
            .filter(wallets::owner_id.eq(player_id))
            .first::<Wallet>(conn)
            .optional()?;

        match wallet {
            Some(wallet) => wallet.with_transactions(conn),
            None => {
                not_found!("wallet not found");
            }
        }
    }

    fn with_transactions(self, conn: &db::Conn) -> Result<WalletDetails, ServiceError> {
        let transactions = WalletTransaction::belonging_to(&self)
            .order(wallet_transactions::created_at.desc())
            .load::<WalletTransaction>(conn)?;

        Ok(WalletDetails {
            wallet: self,
            transactions,
        })
    }

    pub fn credit(
        id: i64,
        message: AmountMessage,
        conn: &db::Conn,
    ) -> Result<LedgerResponse, ServiceError> {
        Wallet::apply(id, &message.description, conn, |balance| {
            ledger::credit(balance, message.amount)
        })
    }

    pub fn debit(
        id: i64,
        message: AmountMessage,
        conn: &db::Conn,
    ) -> Result<LedgerResponse, ServiceError> {
        Wallet::apply(id, &message.description, conn, |balance| {
            ledger::debit(balance, message.amount)
        })
    }

    /// Locks the wallet row and stores the balance together with its transaction
    #[tracing::instrument(name = "Wallet::apply", skip(conn, change))]
    fn apply<F>(
        id: i64,
        description: &str,
        conn: &db::Conn,
        change: F,
    ) -> Result<LedgerResponse, ServiceError>
    where
        F: FnOnce(f64) -> Result<Entry, ServiceError>,
    {
        conn.transaction::<LedgerResponse, ServiceError, _>(|| {
            let wallet = wallets::table
                .find(id)
                .for_update()
                .first::<Wallet>(conn)
                .optional()?;

            let wallet = match wallet {
                Some(wallet) => wallet,
                None => {
                    not_found!("wallet not found");
                }
            };

            let entry = change(wallet.balance)?;

            let wallet = diesel::update(&wallet)
                .set(wallets::balance.eq(entry.balance))
                .get_result::<Wallet>(conn)?;

            let transaction = diesel::insert_into(wallet_transactions::table)
                .values(&NewWalletTransaction {
                    wallet_id: wallet.id,
                    amount: entry.amount,
                    transaction_type: entry.transaction_type.as_str(),
                    description: description.trim(),
                })
                .get_result::<WalletTransaction>(conn)?;

            debug!(
                "wallet {} {} {}, balance {}",
                wallet.id, entry.transaction_type, entry.amount, wallet.balance
            );

            Ok(LedgerResponse {
                wallet,
                transaction,
            })
        })
    }
}
