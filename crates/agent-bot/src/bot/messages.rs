//! Message catalogue
//!
//! Every text the bot sends, per language.

use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    /// Pick a language from a Telegram `language_code` such as `en-US`
    pub fn from_code(code: Option<&str>) -> Self {
        code.and_then(|c| c.split(['-', '_']).next())
            .and_then(|c| c.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" => Ok(Self::Ru),
            "en" => Ok(Self::En),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Msg {
    CommandStart,
    CommandHelp,
    ButtonFaq,
    ButtonConfirm,
    ButtonCancel,
    ButtonBack,
    ProcessingRequest,
    RequestConfirmed,
    RequestCancelled,
    ErrorGeneral,
    ErrorNotUnderstood,
}

impl Msg {
    fn translations(self) -> &'static [(Language, &'static str)] {
        use Language::{En, Ru};

        match self {
            Self::CommandStart => &[
                (Ru, "Привет! Я твой персональный помощник. Чем могу помочь?"),
                (En, "Hello! I'm your personal assistant. How can I help you?"),
            ],
            Self::CommandHelp => &[
                (
                    Ru,
                    "Доступные команды:\n\
                     /start - Начать работу с ботом\n\
                     /help - Показать это сообщение\n\
                     /faq - Часто задаваемые вопросы",
                ),
                (
                    En,
                    "Available commands:\n\
                     /start - Start working with the bot\n\
                     /help - Show this message\n\
                     /faq - Frequently asked questions",
                ),
            ],
            Self::ButtonFaq => &[(Ru, "FAQ"), (En, "FAQ")],
            Self::ButtonConfirm => &[(Ru, "Подтвердить"), (En, "Confirm")],
            Self::ButtonCancel => &[(Ru, "Отменить"), (En, "Cancel")],
            Self::ButtonBack => &[(Ru, "Назад"), (En, "Back")],
            Self::ProcessingRequest => &[
                (Ru, "Обрабатываю ваш запрос..."),
                (En, "Processing your request..."),
            ],
            Self::RequestConfirmed => &[(Ru, "Запрос подтвержден!"), (En, "Request confirmed!")],
            Self::RequestCancelled => &[(Ru, "Запрос отменен."), (En, "Request cancelled.")],
            Self::ErrorGeneral => &[
                (Ru, "Произошла ошибка. Пожалуйста, попробуйте еще раз позже."),
                (En, "An error occurred. Please try again later."),
            ],
            Self::ErrorNotUnderstood => &[
                (Ru, "Извините, я не понял ваш запрос. Можете уточнить?"),
                (En, "Sorry, I didn't understand your request. Can you clarify?"),
            ],
        }
    }
}

pub const MESSAGE_NOT_FOUND: &str = "Message not found";

/// Text for `key` in `lang`, falling back to the default language
pub fn get(key: Msg, lang: Language) -> &'static str {
    lookup(key.translations(), lang)
}

fn lookup(table: &[(Language, &'static str)], lang: Language) -> &'static str {
    let find = |wanted: Language| table.iter().find(|(l, _)| *l == wanted).map(|(_, t)| *t);

    find(lang)
        .or_else(|| find(Language::default()))
        .unwrap_or(MESSAGE_NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language_is_russian() {
        assert_eq!(
            get(Msg::CommandStart, Language::default()),
            "Привет! Я твой персональный помощник. Чем могу помочь?"
        );
        assert_eq!(get(Msg::ButtonCancel, Language::En), "Cancel");
    }

    #[test]
    fn test_help_lists_commands() {
        let help = get(Msg::CommandHelp, Language::En);
        assert!(help.starts_with("Available commands:\n/start - "));
        assert!(help.ends_with("/faq - Frequently asked questions"));
    }

    #[test]
    fn test_fallbacks() {
        let ru_only = [(Language::Ru, "только ru")];
        assert_eq!(lookup(&ru_only, Language::En), "только ru");

        let en_only = [(Language::En, "english")];
        assert_eq!(lookup(&en_only, Language::Ru), MESSAGE_NOT_FOUND);
    }

    #[test]
    fn test_language_from_code() {
        assert_eq!(Language::from_code(Some("en-US")), Language::En);
        assert_eq!(Language::from_code(Some("ru")), Language::Ru);
        assert_eq!(Language::from_code(Some("de")), Language::Ru);
        assert_eq!(Language::from_code(None), Language::Ru);
    }
}
