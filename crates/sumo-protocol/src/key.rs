//! 按键事件定义

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 操作按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Back,
    Quit,
}

impl Key {
    /// 是否为终止运行的按键（`Quit` 或 `Back`）
    #[inline]
    pub fn is_abort(self) -> bool {
        matches!(self, Key::Quit | Key::Back)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::Enter => "enter",
            Key::Back => "back",
            Key::Quit => "quit",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Key {
    type Err = ProtocolError;

    /// 解析按键名
    ///
    /// 同时接受全名和终端常用的单字母别名（w/a/s/d、q、b），
    /// 空字符串视为 `Enter`。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Key::Up),
            "down" | "s" => Ok(Key::Down),
            "left" | "a" => Ok(Key::Left),
            "right" | "d" => Ok(Key::Right),
            "enter" | "" => Ok(Key::Enter),
            "back" | "b" => Ok(Key::Back),
            "quit" | "q" | "exit" => Ok(Key::Quit),
            other => Err(ProtocolError::UnknownKey(other.to_string())),
        }
    }
}

/// 按键事件
///
/// `millis` 与传感器快照的 `elapsed_millis` 使用同一时间基准。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyEvent {
    /// 按键时间（自运行开始的毫秒数）
    pub millis: i64,
    /// 按键
    pub key: Key,
}

impl KeyEvent {
    pub fn new(millis: i64, key: Key) -> Self {
        Self { millis, key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_keys() {
        assert!(Key::Quit.is_abort());
        assert!(Key::Back.is_abort());
        for key in [Key::Up, Key::Down, Key::Left, Key::Right, Key::Enter] {
            assert!(!key.is_abort(), "{} should not abort", key);
        }
    }

    #[test]
    fn test_parse_key_names_and_aliases() {
        assert_eq!("up".parse::<Key>(), Ok(Key::Up));
        assert_eq!("W".parse::<Key>(), Ok(Key::Up));
        assert_eq!("a".parse::<Key>(), Ok(Key::Left));
        assert_eq!("d".parse::<Key>(), Ok(Key::Right));
        assert_eq!("s".parse::<Key>(), Ok(Key::Down));
        assert_eq!("".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("  \n".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("q".parse::<Key>(), Ok(Key::Quit));
        assert_eq!("back".parse::<Key>(), Ok(Key::Back));
    }

    #[test]
    fn test_parse_unknown_key() {
        let err = "space".parse::<Key>().unwrap_err();
        assert_eq!(err, ProtocolError::UnknownKey("space".to_string()));
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for key in [
            Key::Up,
            Key::Down,
            Key::Left,
            Key::Right,
            Key::Enter,
            Key::Back,
            Key::Quit,
        ] {
            assert_eq!(key.to_string().parse::<Key>(), Ok(key));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_key_event_json_shape() {
        let event = KeyEvent::new(1500, Key::Enter);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"millis":1500,"key":"enter"}"#);
    }
}
