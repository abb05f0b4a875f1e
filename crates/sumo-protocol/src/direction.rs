//! 转向方向

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 转向方向
///
/// 决定所有速度/转向常量的镜像。`Right` 表示顺时针（俯视）转向，
/// `Left` 表示逆时针。`None` 表示"方向不明确"（例如两个角落同时越界），
/// 由各阶段按退化的直线后退处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Left,
    #[default]
    Right,
    None,
}

impl Direction {
    /// 反转方向（`None` 保持不变）
    pub fn flipped(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }

    /// 原地转向时左轮的符号
    ///
    /// 顺时针转向：左轮前进、右轮后退。
    pub fn left_turn_versor(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::None => 0,
        }
    }

    /// 原地转向时右轮的符号
    pub fn right_turn_versor(self) -> i32 {
        -self.left_turn_versor()
    }

    /// 按方向排列 (外侧, 内侧) 速度对，返回 (左轮, 右轮)
    ///
    /// 向右转时左轮在外侧；向左转时右轮在外侧。`None` 按向右处理。
    pub fn outer_inner(self, outer: i32, inner: i32) -> (i32, i32) {
        match self {
            Direction::Left => (inner, outer),
            Direction::Right | Direction::None => (outer, inner),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Direction::Left),
            "right" | "r" => Ok(Direction::Right),
            "none" => Ok(Direction::None),
            other => Err(ProtocolError::UnknownDirection(other.to_string())),
        }
    }
}
