//! Plain-text rendering of views

use super::action::Action;
use super::view::View;
use crate::amount::quantize;
use crate::currency::CurrencyPair;
use crate::error::{BotError, ErrorKind};
use crate::store::Favorite;
use crate::user::Role;
use std::fmt::Write as _;

/// A menu button: label shown to the user, payload sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub data: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, action: &Action) -> Self {
        Self {
            label: label.into(),
            data: action.callback_data(),
        }
    }
}

/// Rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Render {
    pub text: String,
    pub choices: Vec<Choice>,
}

impl Render {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    fn choice(mut self, label: impl Into<String>, action: &Action) -> Self {
        self.choices.push(Choice::new(label, action));
        self
    }

    fn main_menu(self) -> Self {
        self.choice("🏠 Main menu", &Action::MainMenu)
    }
}

/// Turn a view into text plus menu choices
pub fn render(view: &View) -> Render {
    match view {
        View::MainMenu { is_admin } => {
            let mut out = Render::new("Choose an action 👇")
                .choice("💱 Convert", &Action::ChooseBase)
                .choice("⭐ Favorites", &Action::ListFavorites)
                .choice("❓ Help", &Action::Help);
            if *is_admin {
                out = out.choice("🛠 Admin panel", &Action::AdminPanel);
            }
            out
        }
        View::Help => Render::new(Action::help_text().trim()).main_menu(),
        View::BasePicker { currencies } => currencies
            .iter()
            .fold(Render::new("Choose the currency to convert from 👇"), |out, code| {
                out.choice(code.as_str(), &Action::SelectBase(*code))
            })
            .main_menu(),
        View::TargetPicker { base, currencies } => currencies
            .iter()
            .filter(|code| *code != base)
            .fold(
                Render::new(format!("Converting from {base}. Choose the target currency 👇")),
                |out, code| out.choice(code.as_str(), &Action::SelectTarget(*code)),
            )
            .choice("↩ Change base", &Action::ChooseBase)
            .main_menu(),
        View::AmountPrompt { pair } => Render::new(format!(
            "Enter the amount in {} to convert to {}:",
            pair.base, pair.target
        ))
        .choice("⭐ Add to favorites", &Action::AddFavorite(*pair))
        .choice("🤖 Explain rate", &Action::Explain(*pair))
        .main_menu(),
        View::Conversion {
            pair,
            amount,
            result,
            rate,
        } => {
            let mut text = format!("{amount} {} = {result} {}", pair.base, pair.target);
            if let Some(rate) = rate {
                let _ = write!(text, "\nRate: 1 {} = {} {}", pair.base, quantize(*rate), pair.target);
            }
            pair_actions(Render::new(text), *pair)
        }
        View::ConversionFailed { pair, amount } => Render::new(format!(
            "Could not convert {amount} {} to {} right now. Please try again later.",
            pair.base, pair.target
        ))
        .choice("🔁 Try again", &Action::ConvertFavorite(*pair))
        .main_menu(),
        View::Favorites { favorites } => favorite_list(String::new(), favorites),
        View::FavoriteAdded { pair, favorites } => {
            favorite_list(format!("Saved {pair} to favorites.\n\n"), favorites)
        }
        View::FavoriteRemoved { favorites } => {
            favorite_list("Favorite removed.\n\n".to_string(), favorites)
        }
        View::FavoriteDetail { favorite, rate } => {
            let rate_line = match rate {
                Some(rate) => format!("1 {} = {} {}", favorite.pair.base, quantize(*rate), favorite.pair.target),
                None => "Rate is unavailable right now.".to_string(),
            };
            Render::new(format!("⭐ {}\n{rate_line}", favorite.pair))
                .choice("💱 Convert", &Action::ConvertFavorite(favorite.pair))
                .choice("🤖 Explain rate", &Action::Explain(favorite.pair))
                .choice("🗑 Remove", &Action::RemoveFavorite(favorite.id))
                .choice("⭐ Favorites", &Action::ListFavorites)
        }
        View::Explanation { pair, rate, text } => {
            let mut out = format!("🤖 {pair}");
            if let Some(rate) = rate {
                let _ = write!(out, "\n1 {} = {} {}", pair.base, quantize(*rate), pair.target);
            }
            match text {
                Some(text) => {
                    let _ = write!(out, "\n\n{text}");
                }
                None => out.push_str("\n\nCould not get an explanation right now."),
            }
            Render::new(out)
                .choice("💱 Convert", &Action::ConvertFavorite(*pair))
                .main_menu()
        }
        View::AdminPanel => Render::new("🛠 Admin panel")
            .choice("👥 Users", &Action::AdminUsers { page: 1 })
            .choice("📊 Statistics", &Action::AdminStats)
            .main_menu(),
        View::AdminUsers {
            users,
            page,
            total_pages,
        } => {
            if users.is_empty() {
                return Render::new("No users yet.").choice("🛠 Admin panel", &Action::AdminPanel);
            }

            let mut text = format!("👥 Users (page {page}/{total_pages})\n");
            let mut out = Render::new(String::new());
            for user in users {
                let name = user.display_name();
                let _ = write!(text, "\n{name} — role: {}", user.role);
                for role in [Role::Admin, Role::User] {
                    out = out.choice(
                        format!("{name} → {role}"),
                        &Action::AdminSetRole {
                            user: user.id,
                            role,
                            page: *page,
                        },
                    );
                }
            }
            out.text = text;

            if *page > 1 {
                out = out.choice("⬅ Previous", &Action::AdminUsers { page: page - 1 });
            }
            if page < total_pages {
                out = out.choice("Next ➡", &Action::AdminUsers { page: page + 1 });
            }
            out.choice("🛠 Admin panel", &Action::AdminPanel)
        }
        View::AdminStats {
            total_users,
            popular,
        } => {
            let mut text = format!("📊 Statistics\n\nUsers: {total_users}\n\nPopular pairs:");
            if popular.is_empty() {
                text.push_str("\nnone yet");
            }
            for entry in popular {
                let _ = write!(text, "\n{} ({})", entry.pair, entry.count);
            }
            Render::new(text).choice("🛠 Admin panel", &Action::AdminPanel)
        }
    }
}

/// Short user-facing message for a failed action
pub fn render_error(error: &BotError) -> Render {
    let text = match error.kind() {
        ErrorKind::Input => format!("⚠️ {error}"),
        ErrorKind::Upstream => "⚠️ The service is temporarily unavailable. Please try again later.".to_string(),
        ErrorKind::Persistence => "⚠️ Could not save your data right now. Please try again later.".to_string(),
        ErrorKind::Config => "⚠️ The bot is misconfigured.".to_string(),
    };
    Render::new(text).main_menu()
}

fn pair_actions(out: Render, pair: CurrencyPair) -> Render {
    out.choice("🔁 Convert again", &Action::ConvertFavorite(pair))
        .choice("⭐ Add to favorites", &Action::AddFavorite(pair))
        .choice("🤖 Explain rate", &Action::Explain(pair))
        .main_menu()
}

fn favorite_list(mut text: String, favorites: &[Favorite]) -> Render {
    if favorites.is_empty() {
        text.push_str("You have no favorite pairs yet.");
        return Render::new(text)
            .choice("💱 Convert", &Action::ChooseBase)
            .main_menu();
    }

    text.push_str("⭐ Your favorites:");
    favorites
        .iter()
        .fold(Render::new(text), |out, favorite| {
            out.choice(favorite.pair.to_string(), &Action::ShowFavorite(favorite.id))
        })
        .main_menu()
}
