//! UI strings and plural rules.
//!
//! The player was written for a Russian-speaking audience, so `Ru` is the
//! default. Every user-visible string goes through [`Strings`] so the
//! render and chat code never hard-codes text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

/// Grammatical number category selected by a locale's plural rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralForm {
    One,
    Few,
    Many,
}

#[derive(Debug, Clone, Copy)]
pub struct Strings {
    pub unknown_track: &'static str,
    pub unknown_artist: &'static str,
    pub no_data: &'static str,
    pub connecting: &'static str,
    pub ready: &'static str,
    pub reconnecting: &'static str,
    pub all_streams_unavailable: &'static str,
    pub online: &'static str,
    pub paused: &'static str,
    /// Listener noun in one/few/many forms.
    pub listener: [&'static str; 3],
    pub chat_system_user: &'static str,
    pub chat_welcome: &'static str,
    pub chat_guest: &'static str,
    pub chat_empty_message: &'static str,
    pub chat_invalid_request: &'static str,
}

const RU: Strings = Strings {
    unknown_track: "Неизвестный трек",
    unknown_artist: "Неизвестный исполнитель",
    no_data: "Нет данных",
    connecting: "Подключение...",
    ready: "Готов к воспроизведению",
    reconnecting: "Переподключение...",
    all_streams_unavailable: "Все потоки недоступны",
    online: "Онлайн",
    paused: "Пауза",
    listener: ["слушатель", "слушателя", "слушателей"],
    chat_system_user: "Система",
    chat_welcome: "Добро пожаловать в чат!",
    chat_guest: "Гость",
    chat_empty_message: "Пустое сообщение",
    chat_invalid_request: "Неверный запрос",
};

const EN: Strings = Strings {
    unknown_track: "Unknown track",
    unknown_artist: "Unknown artist",
    no_data: "No data",
    connecting: "Connecting...",
    ready: "Ready to play",
    reconnecting: "Reconnecting...",
    all_streams_unavailable: "All streams unavailable",
    online: "Online",
    paused: "Paused",
    listener: ["listener", "listeners", "listeners"],
    chat_system_user: "System",
    chat_welcome: "Welcome to the chat!",
    chat_guest: "Guest",
    chat_empty_message: "Empty message",
    chat_invalid_request: "Invalid request",
};

impl Locale {
    pub fn strings(self) -> &'static Strings {
        match self {
            Locale::Ru => &RU,
            Locale::En => &EN,
        }
    }

    pub fn plural_form(self, n: u64) -> PluralForm {
        match self {
            Locale::Ru => {
                let tens = n % 100;
                let ones = n % 10;
                if (11..=14).contains(&tens) {
                    PluralForm::Many
                } else if ones == 1 {
                    PluralForm::One
                } else if (2..=4).contains(&ones) {
                    PluralForm::Few
                } else {
                    PluralForm::Many
                }
            }
            Locale::En => {
                if n == 1 {
                    PluralForm::One
                } else {
                    PluralForm::Many
                }
            }
        }
    }

    /// `"<n> <noun>"` with the noun in the form the plural rule picks.
    pub fn listeners(self, n: u64) -> String {
        let words = self.strings().listener;
        let word = match self.plural_form(n) {
            PluralForm::One => words[0],
            PluralForm::Few => words[1],
            PluralForm::Many => words[2],
        };
        format!("{} {}", n, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ru_listener_forms() {
        let ru = Locale::Ru;
        assert_eq!(ru.listeners(1), "1 слушатель");
        assert_eq!(ru.listeners(2), "2 слушателя");
        assert_eq!(ru.listeners(5), "5 слушателей");
        assert_eq!(ru.listeners(11), "11 слушателей");
        assert_eq!(ru.listeners(21), "21 слушатель");
        assert_eq!(ru.listeners(0), "0 слушателей");
        assert_eq!(ru.listeners(104), "104 слушателя");
        assert_eq!(ru.listeners(112), "112 слушателей");
    }

    #[test]
    fn test_ru_plural_categories() {
        let forms: Vec<_> = [1, 2, 5, 11, 21]
            .iter()
            .map(|&n| Locale::Ru.plural_form(n))
            .collect();
        assert_eq!(
            forms,
            vec![
                PluralForm::One,
                PluralForm::Few,
                PluralForm::Many,
                PluralForm::Many,
                PluralForm::One
            ]
        );
    }

    #[test]
    fn test_en_listener_forms() {
        assert_eq!(Locale::En.listeners(1), "1 listener");
        assert_eq!(Locale::En.listeners(2), "2 listeners");
        assert_eq!(Locale::En.listeners(21), "21 listeners");
    }
}
