use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Card lifecycle. Block/activate move between ACTIVE and BLOCKED;
/// OUTDATED is terminal and only ever set at creation (derived from the
/// expiry date by whoever issues the card, not by this service).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    Blocked,
    Outdated,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Outdated => "OUTDATED",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CardStatus::Active),
            "BLOCKED" => Ok(CardStatus::Blocked),
            "OUTDATED" => Ok(CardStatus::Outdated),
            other => Err(format!("Unknown card status: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Card {
    pub id: i64,
    pub final_date: NaiveDate,
    pub status: CardStatus,
    /// Minor currency units; never negative after a committed operation.
    pub balance: i64,
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    pub final_date: NaiveDate,
    pub status: Option<CardStatus>,
    #[validate(range(min = 0, message = "balance cannot be negative"))]
    pub balance: i64,
    pub user_id: i64,
}

/// Row to insert, with the status default already resolved.
#[derive(Debug)]
pub struct NewCard {
    pub final_date: NaiveDate,
    pub status: CardStatus,
    pub balance: i64,
    pub user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CardSearchQuery {
    pub user_id: Option<i64>,
    pub status: Option<CardStatus>,
    pub final_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CardPage {
    pub items: Vec<Card>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}
