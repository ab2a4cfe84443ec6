//! Transport-independent results of handling an action

use crate::currency::{Currency, CurrencyPair};
use crate::store::{Favorite, PopularPair, UserRecord};
use rust_decimal::Decimal;

/// What the user should see next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    MainMenu {
        is_admin: bool,
    },
    Help,
    BasePicker {
        currencies: Vec<Currency>,
    },
    TargetPicker {
        base: Currency,
        currencies: Vec<Currency>,
    },
    AmountPrompt {
        pair: CurrencyPair,
    },
    Conversion {
        pair: CurrencyPair,
        amount: Decimal,
        result: Decimal,
        rate: Option<Decimal>,
    },
    /// The rate provider could not be reached; the session was reset anyway
    ConversionFailed {
        pair: CurrencyPair,
        amount: Decimal,
    },
    Favorites {
        favorites: Vec<Favorite>,
    },
    FavoriteAdded {
        pair: CurrencyPair,
        favorites: Vec<Favorite>,
    },
    FavoriteRemoved {
        favorites: Vec<Favorite>,
    },
    FavoriteDetail {
        favorite: Favorite,
        rate: Option<Decimal>,
    },
    Explanation {
        pair: CurrencyPair,
        rate: Option<Decimal>,
        text: Option<String>,
    },
    AdminPanel,
    AdminUsers {
        users: Vec<UserRecord>,
        page: u32,
        total_pages: u32,
    },
    AdminStats {
        total_users: u64,
        popular: Vec<PopularPair>,
    },
}
