use crate::domain::account::{AccountId, UserId};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A payment card linked to an account. The core only needs the link and the
/// active flag; PAN encryption and integrity tagging live outside this crate,
/// so all that is stored here is the masked form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub masked_number: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Issues an active card with a freshly generated number. The clear PAN
    /// never leaves the generation site; only the masked form is kept.
    pub fn issue(account_id: AccountId, user_id: UserId) -> Self {
        Self {
            id: CardId::new(),
            account_id,
            user_id,
            masked_number: generate_masked_number(),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Outbound projection of a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSummary {
    pub id: CardId,
    pub account_id: AccountId,
    pub masked_number: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            account_id: card.account_id,
            masked_number: card.masked_number.clone(),
            active: card.active,
            created_at: card.created_at,
        }
    }
}

fn generate_masked_number() -> String {
    let mut rng = rand::thread_rng();
    let mut last_four = String::new();
    for _ in 0..4 {
        last_four.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    format!("**** **** **** {last_four}")
}
