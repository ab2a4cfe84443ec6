//! Decoding of commands and menu callbacks into actions
//!
//! Menu buttons carry short `prefix:arg[:arg]` payloads. Slash commands and
//! callbacks are decoded once here; everything else a user types is treated
//! as an amount.

use crate::currency::{Currency, CurrencyPair};
use crate::error::{BotError, Result};
use crate::user::{Role, UserId};
use std::fmt;

/// One user intent, as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `/start` or `/menu`
    Start,
    Help,
    MainMenu,
    /// Open the base currency picker
    ChooseBase,
    SelectBase(Currency),
    SelectTarget(Currency),
    AddFavorite(CurrencyPair),
    ListFavorites,
    ShowFavorite(i64),
    RemoveFavorite(i64),
    ConvertFavorite(CurrencyPair),
    Explain(CurrencyPair),
    AdminPanel,
    AdminUsers { page: u32 },
    AdminSetRole { user: UserId, role: Role, page: u32 },
    AdminStats,
    /// Free text, expected to be an amount
    SubmitAmount(String),
}

impl Action {
    /// Parse user input or a callback payload
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(BotError::UnknownAction("empty input".to_string()));
        }

        if let Some(command) = input.strip_prefix('/') {
            return Self::parse_command(command);
        }

        match input {
            "main_menu" => return Ok(Action::MainMenu),
            "list_fav_menu" => return Ok(Action::ListFavorites),
            "admin_panel" => return Ok(Action::AdminPanel),
            "admin_stats" => return Ok(Action::AdminStats),
            "base:select_base" => return Ok(Action::ChooseBase),
            _ => {}
        }

        let mut parts = input.split(':');
        let prefix = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let action = match (prefix, args.as_slice()) {
            ("base", [code]) => Action::SelectBase(Currency::parse(code)?),
            ("target", [code]) => Action::SelectTarget(Currency::parse(code)?),
            ("addfav", [base, target]) => Action::AddFavorite(pair(base, target)?),
            ("convfav", [base, target]) => Action::ConvertFavorite(pair(base, target)?),
            ("explain", [base, target]) => Action::Explain(pair(base, target)?),
            ("showfav", [id]) => Action::ShowFavorite(number(input, id)?),
            ("delfav", [id]) => Action::RemoveFavorite(number(input, id)?),
            ("admusers", [page]) => Action::AdminUsers {
                page: number(input, page)?,
            },
            ("setrole", [user, role, page]) => Action::AdminSetRole {
                user: UserId(number(input, user)?),
                role: role
                    .parse()
                    .map_err(|_| BotError::UnknownAction(input.to_string()))?,
                page: number(input, page)?,
            },
            (
                "base" | "target" | "addfav" | "convfav" | "explain" | "showfav" | "delfav"
                | "admusers" | "setrole",
                _,
            ) => return Err(BotError::UnknownAction(input.to_string())),
            _ => Action::SubmitAmount(input.to_string()),
        };

        Ok(action)
    }

    fn parse_command(command: &str) -> Result<Self> {
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match name.as_str() {
            "start" | "menu" => Ok(Action::Start),
            "help" | "h" | "?" => Ok(Action::Help),
            _ => Err(BotError::UnknownAction(format!("/{name}"))),
        }
    }

    /// Payload that [`Action::parse`] decodes back into this action
    pub fn callback_data(&self) -> String {
        self.to_string()
    }

    /// Get help text for all commands
    pub fn help_text() -> &'static str {
        r"
Currency Converter Bot
======================

Commands:
  /start, /menu          Main menu
  /help                  This help

Menu payloads (type them in a plain-text client):
  base:select_base       Choose a base currency
  base:USD               Set the base currency
  target:UAH             Set the target currency, then type an amount
  addfav:USD:UAH         Save a pair to favorites
  list_fav_menu          List favorites
  showfav:<id>           Favorite details and current rate
  delfav:<id>            Remove a favorite
  convfav:USD:UAH        Convert with a saved pair
  explain:USD:UAH        Explain the current rate
  admin_panel            Admin panel (admins only)
  admusers:<page>        List users
  setrole:<id>:<role>:<page>
                         Set a user's role (admin or user)
  admin_stats            Usage statistics

Amounts:
  100, 1 234,56, 1,234.56 and 1.234,56 are all accepted.
"
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => f.write_str("/start"),
            Action::Help => f.write_str("/help"),
            Action::MainMenu => f.write_str("main_menu"),
            Action::ChooseBase => f.write_str("base:select_base"),
            Action::SelectBase(code) => write!(f, "base:{code}"),
            Action::SelectTarget(code) => write!(f, "target:{code}"),
            Action::AddFavorite(p) => write!(f, "addfav:{}:{}", p.base, p.target),
            Action::ListFavorites => f.write_str("list_fav_menu"),
            Action::ShowFavorite(id) => write!(f, "showfav:{id}"),
            Action::RemoveFavorite(id) => write!(f, "delfav:{id}"),
            Action::ConvertFavorite(p) => write!(f, "convfav:{}:{}", p.base, p.target),
            Action::Explain(p) => write!(f, "explain:{}:{}", p.base, p.target),
            Action::AdminPanel => f.write_str("admin_panel"),
            Action::AdminUsers { page } => write!(f, "admusers:{page}"),
            Action::AdminSetRole { user, role, page } => write!(f, "setrole:{user}:{role}:{page}"),
            Action::AdminStats => f.write_str("admin_stats"),
            Action::SubmitAmount(text) => f.write_str(text),
        }
    }
}

fn pair(base: &str, target: &str) -> Result<CurrencyPair> {
    Ok(CurrencyPair::new(Currency::parse(base)?, Currency::parse(target)?))
}

fn number<T: std::str::FromStr>(input: &str, text: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| BotError::UnknownAction(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> Currency {
        Currency::parse(s).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Action::parse("/start").unwrap(), Action::Start);
        assert_eq!(Action::parse("/MENU").unwrap(), Action::Start);
        assert_eq!(Action::parse(" /help ").unwrap(), Action::Help);
        assert!(matches!(
            Action::parse("/convert USD"),
            Err(BotError::UnknownAction(ref c)) if c == "/convert"
        ));
        assert!(Action::parse("   ").is_err());
    }

    #[test]
    fn test_parse_menu_callbacks() {
        assert_eq!(Action::parse("main_menu").unwrap(), Action::MainMenu);
        assert_eq!(Action::parse("base:select_base").unwrap(), Action::ChooseBase);
        assert_eq!(Action::parse("base:usd").unwrap(), Action::SelectBase(code("USD")));
        assert_eq!(Action::parse("target:UAH").unwrap(), Action::SelectTarget(code("UAH")));
        assert_eq!(Action::parse("list_fav_menu").unwrap(), Action::ListFavorites);
        assert_eq!(Action::parse("showfav:12").unwrap(), Action::ShowFavorite(12));
        assert_eq!(Action::parse("delfav:3").unwrap(), Action::RemoveFavorite(3));
        assert_eq!(
            Action::parse("addfav:USD:UAH").unwrap(),
            Action::AddFavorite(CurrencyPair::new(code("USD"), code("UAH")))
        );
        assert_eq!(
            Action::parse("explain:EUR:PLN").unwrap(),
            Action::Explain(CurrencyPair::new(code("EUR"), code("PLN")))
        );
    }

    #[test]
    fn test_parse_admin_callbacks() {
        assert_eq!(Action::parse("admin_panel").unwrap(), Action::AdminPanel);
        assert_eq!(Action::parse("admin_stats").unwrap(), Action::AdminStats);
        assert_eq!(Action::parse("admusers:2").unwrap(), Action::AdminUsers { page: 2 });
        assert_eq!(
            Action::parse("setrole:777:admin:3").unwrap(),
            Action::AdminSetRole {
                user: UserId(777),
                role: Role::Admin,
                page: 3
            }
        );
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(Action::parse("base:US"), Err(BotError::InvalidCurrency(_))));
        assert!(matches!(Action::parse("showfav:abc"), Err(BotError::UnknownAction(_))));
        assert!(matches!(Action::parse("addfav:USD"), Err(BotError::UnknownAction(_))));
        assert!(matches!(
            Action::parse("setrole:1:root:1"),
            Err(BotError::UnknownAction(_))
        ));
        assert!(matches!(Action::parse("admusers:-1"), Err(BotError::UnknownAction(_))));
    }

    #[test]
    fn test_other_text_is_an_amount() {
        assert_eq!(
            Action::parse(" 1 234,56 ").unwrap(),
            Action::SubmitAmount("1 234,56".to_string())
        );
        assert_eq!(
            Action::parse("hello").unwrap(),
            Action::SubmitAmount("hello".to_string())
        );
        assert_eq!(
            Action::parse("ratio:5").unwrap(),
            Action::SubmitAmount("ratio:5".to_string())
        );
    }

    #[test]
    fn test_callback_data_is_parseable() {
        let actions = [
            Action::ChooseBase,
            Action::ConvertFavorite(CurrencyPair::new(code("GBP"), code("JPY"))),
            Action::AdminSetRole {
                user: UserId(5),
                role: Role::User,
                page: 1,
            },
        ];
        for action in actions {
            assert_eq!(Action::parse(&action.callback_data()).unwrap(), action);
        }
    }
}
