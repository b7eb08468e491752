//! Reply keyboards, built once per language and cached

use std::collections::HashMap;

use teloxide::types::{KeyboardButton, KeyboardMarkup};
use tokio::sync::Mutex;

use super::buttons::Button;
use super::messages::Language;

#[derive(Default)]
pub struct Menu {
    cache: Mutex<HashMap<(Language, bool), KeyboardMarkup>>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    /// FAQ row, then Confirm and Cancel. `only_faq` keeps the first row.
    pub async fn keyboard(&self, lang: Language, only_faq: bool) -> KeyboardMarkup {
        self.cache
            .lock()
            .await
            .entry((lang, only_faq))
            .or_insert_with(|| build(lang, only_faq))
            .clone()
    }
}

fn build(lang: Language, only_faq: bool) -> KeyboardMarkup {
    let button = |b: Button| KeyboardButton::new(b.label(lang));

    let mut rows = vec![vec![button(Button::Faq)]];
    if !only_faq {
        rows.push(vec![button(Button::Confirm), button(Button::Cancel)]);
    }

    KeyboardMarkup::new(rows).resize_keyboard()
}
