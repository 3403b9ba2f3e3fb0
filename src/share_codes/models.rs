use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use url::Url;

use crate::db;
use crate::errors::ServiceError;
use crate::schema::share_codes;
use crate::validator::Validate;

/// length of a generated share code
const CODE_LENGTH: usize = 12;
/// query parameter carrying the code in a share url
const CODE_PARAMETER: &str = "share_code";

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct ShareCode {
    pub id: i64,
    pub code: String,
    pub full_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[table_name = "share_codes"]
pub struct NewShareCode {
    pub code: String,
    pub full_url: String,
}

/// ShareUrlMessage holds the page that should become shareable
///
/// **POST /api/share-codes**
///
/// ``` shell
/// curl --location --request POST 'http://localhost:8080/api/share-codes' \
/// --header 'Content-Type: application/json' \
/// --data-raw '{ "url": "https://racket.example.com/outstanding-payments" }'
/// {
///     "id": 1,
///     "code": "q3Xk9PzLm2Ab",
///     "full_url": "https://racket.example.com/outstanding-payments?share_code=q3Xk9PzLm2Ab",
///     "created_at": "2024-02-28T19:53:33.977263Z"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ShareUrlMessage {
    pub url: String,
}

pub trait CodeGenerator {
    fn generate(&self) -> String;
}

/// random alphanumeric codes
#[derive(Debug, Default)]
pub struct DefaultGenerator;

impl CodeGenerator for DefaultGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LENGTH)
            .collect()
    }
}

impl Validate<ShareUrlMessage> for ShareUrlMessage {
    fn validate(&self) -> Result<(), ServiceError> {
        match Url::parse(&self.url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
            _ => {
                bad_request!("the url is not a valid http url");
            }
        }
    }
}

impl NewShareCode {
    /// generates a code and appends it to the url
    pub fn new<G: CodeGenerator>(url: &str, generator: &G) -> Result<NewShareCode, ServiceError> {
        let mut full_url = match Url::parse(url) {
            Ok(url) => url,
            Err(_) => {
                bad_request!("the url is not a valid url");
            }
        };

        let code = generator.generate();
        full_url
            .query_pairs_mut()
            .append_pair(CODE_PARAMETER, &code);

        Ok(NewShareCode {
            code,
            full_url: full_url.to_string(),
        })
    }

    pub fn save(&self, conn: &db::Conn) -> Result<ShareCode, ServiceError> {
        let share_code = diesel::insert_into(share_codes::table)
            .values(self)
            .get_result::<ShareCode>(conn)?;

        Ok(share_code)
    }
}

impl ShareCode {
    pub fn create(message: ShareUrlMessage, conn: &db::Conn) -> Result<ShareCode, ServiceError> {
        let share_code = NewShareCode::new(&message.url, &DefaultGenerator)?.save(conn)?;

        info!("created share code {}", share_code.id);

        Ok(share_code)
    }

    pub fn find_all(conn: &db::Conn) -> Result<Vec<ShareCode>, ServiceError> {
        let codes = share_codes::table
            .order(share_codes::created_at.desc())
            .load::<ShareCode>(conn)?;

        Ok(codes)
    }

    pub fn delete(id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        let deleted = diesel::delete(share_codes::table.find(id)).execute(conn)?;

        if deleted == 0 {
            not_found!("share code not found");
        }

        Ok(())
    }

    pub fn exists(code: &str, conn: &db::Conn) -> Result<bool, ServiceError> {
        let found = share_codes::table
            .filter(share_codes::code.eq(code))
            .select(share_codes::id)
            .first::<i64>(conn)
            .optional()?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    struct FixedGenerator;

    impl CodeGenerator for FixedGenerator {
        fn generate(&self) -> String {
            String::from("abc123")
        }
    }

    #[test]
    fn generated_codes_are_alphanumeric() {
        let code = DefaultGenerator.generate();

        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn code_is_appended_to_the_url() {
        let share_code = NewShareCode::new("https://racket.example.com/report", &FixedGenerator).unwrap();

        assert_eq!(share_code.code, "abc123");
        assert_eq!(
            share_code.full_url,
            "https://racket.example.com/report?share_code=abc123"
        );
    }

    #[test]
    fn existing_query_parameters_are_kept() {
        let share_code =
            NewShareCode::new("https://racket.example.com/report?tab=v2", &FixedGenerator).unwrap();

        assert_eq!(
            share_code.full_url,
            "https://racket.example.com/report?tab=v2&share_code=abc123"
        );
    }

    #[test]
    fn only_http_urls_can_be_shared() {
        let message = ShareUrlMessage {
            url: String::from("ftp://racket.example.com"),
        };
        assert!(Validator::new(message).validate().is_err());

        let message = ShareUrlMessage {
            url: String::from("not a url"),
        };
        assert!(Validator::new(message).validate().is_err());
    }

    #[test]
    fn unparsable_urls_are_bad_requests() {
        let error = NewShareCode::new("racket", &FixedGenerator).unwrap_err();

        assert_eq!(
            error,
            ServiceError::BadRequest(String::from("the url is not a valid url"))
        );
    }
}
