use crate::util::format_rupiah;
use serde::{Deserialize, Serialize};

/// A cake as returned by the backend.
///
/// `id` is assigned by the server and never changes; `name`/`price` change
/// only through an edit round-trip.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Cake {
    pub id: String,
    pub name: String,
    pub price: u64,
}

impl Cake {
    /// Price rendered as Indonesian Rupiah, e.g. `Rp 20.000,00`.
    pub fn price_in_rupiah(&self) -> String {
        format_rupiah(self.price)
    }
}

/// Body of `POST /cakes` and `PUT /cakes/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CakeForm {
    pub name: String,
    pub price: u64,
}

impl From<&Cake> for CakeForm {
    fn from(cake: &Cake) -> Self {
        Self {
            name: cake.name.clone(),
            price: cake.price,
        }
    }
}

/// One page of `GET /cakes`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CakePage {
    pub cakes: Vec<Cake>,
    pub total_pages: u32,
}

/// Server-side sort order for the cake list.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum CakeSort {
    #[default]
    #[serde(rename = "NameASC")]
    #[strum(serialize = "NameASC")]
    NameAscending,
    #[serde(rename = "NameDESC")]
    #[strum(serialize = "NameDESC")]
    NameDescending,
    #[serde(rename = "PriceASC")]
    #[strum(serialize = "PriceASC")]
    PriceAscending,
    #[serde(rename = "PriceDESC")]
    #[strum(serialize = "PriceDESC")]
    PriceDescending,
}

impl CakeSort {
    /// Label shown in the filter sheet.
    pub fn label(self) -> &'static str {
        match self {
            Self::NameAscending => "Nama (A-Z)",
            Self::NameDescending => "Nama (Z-A)",
            Self::PriceAscending => "Harga (Terendah)",
            Self::PriceDescending => "Harga (Tertinggi)",
        }
    }
}

/// Authorization class carried in the access token's `role` claim.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Employee,
}

/// Access/refresh pair returned by login and refresh.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// Tokens stay out of logs and panic messages.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}
