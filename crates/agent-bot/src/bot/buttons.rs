//! Reply keyboard buttons

use super::messages::{Language, Msg, get};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Faq,
    Confirm,
    Cancel,
    Back,
}

impl Button {
    pub const ALL: [Self; 4] = [Self::Faq, Self::Confirm, Self::Cancel, Self::Back];

    const fn message(self) -> Msg {
        match self {
            Self::Faq => Msg::ButtonFaq,
            Self::Confirm => Msg::ButtonConfirm,
            Self::Cancel => Msg::ButtonCancel,
            Self::Back => Msg::ButtonBack,
        }
    }

    pub fn label(self, lang: Language) -> &'static str {
        get(self.message(), lang)
    }

    /// Match a pressed button by its label in any language
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|button| {
            [Language::Ru, Language::En]
                .into_iter()
                .any(|lang| button.label(lang).eq_ignore_ascii_case(text))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_any_language() {
        assert_eq!(Button::from_text("FAQ"), Some(Button::Faq));
        assert_eq!(Button::from_text("faq"), Some(Button::Faq));
        assert_eq!(Button::from_text("Подтвердить"), Some(Button::Confirm));
        assert_eq!(Button::from_text("Cancel"), Some(Button::Cancel));
        assert_eq!(Button::from_text(" Назад "), Some(Button::Back));
        assert_eq!(Button::from_text("buy BTC"), None);
    }
}
