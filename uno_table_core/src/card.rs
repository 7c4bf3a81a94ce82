use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// --- 核心数据结构定义 ---

/// 一副牌的总张数
pub const DECK_SIZE: usize = 108;

/// 颜色 (Color)
/// 黑色只属于万能牌，出万能牌时玩家会另选一个真正的颜色
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
}

impl Color {
    /// 四种可以作为当前颜色的颜色
    pub const PLAYABLE: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];
}

/// 牌面 (Face)
/// 在线协议上以字符串表示: "0".."9", "skip", "reverse", "draw2", "wild", "wild_draw4"
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Face {
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

/// 牌的类别
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Number,
    Action,
    Wild,
}

/// 单张牌 (Card)，创建后不可变
///
/// 在线协议上是 `{color, value, type}`；`type` 由牌面推出，反序列化时忽略。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Deserialize)]
pub struct Card {
    pub color: Color,
    #[serde(rename = "value")]
    pub face: Face,
}

impl Card {
    pub fn new(color: Color, face: Face) -> Card {
        Card { color, face }
    }

    pub fn wild() -> Card {
        Card { color: Color::Black, face: Face::Wild }
    }

    pub fn wild_draw_four() -> Card {
        Card { color: Color::Black, face: Face::WildDrawFour }
    }

    pub fn category(&self) -> Category {
        match self.face {
            Face::Number(_) => Category::Number,
            Face::Skip | Face::Reverse | Face::DrawTwo => Category::Action,
            Face::Wild | Face::WildDrawFour => Category::Wild,
        }
    }

    pub fn is_wild(&self) -> bool {
        self.category() == Category::Wild
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Black => "black",
        })
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(Color::Red),
            "blue" | "b" => Ok(Color::Blue),
            "green" | "g" => Ok(Color::Green),
            "yellow" | "y" => Ok(Color::Yellow),
            "black" => Ok(Color::Black),
            other => Err(format!("未知颜色: {}", other)),
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Face::Number(n) => write!(f, "{}", n),
            Face::Skip => write!(f, "skip"),
            Face::Reverse => write!(f, "reverse"),
            Face::DrawTwo => write!(f, "draw2"),
            Face::Wild => write!(f, "wild"),
            Face::WildDrawFour => write!(f, "wild_draw4"),
        }
    }
}

impl FromStr for Face {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Face::Skip),
            "reverse" => Ok(Face::Reverse),
            "draw2" => Ok(Face::DrawTwo),
            "wild" => Ok(Face::Wild),
            "wild_draw4" => Ok(Face::WildDrawFour),
            digit => match digit.parse::<u8>() {
                Ok(n) if n <= 9 => Ok(Face::Number(n)),
                _ => Err(format!("未知牌面: {}", digit)),
            },
        }
    }
}

impl From<Face> for String {
    fn from(face: Face) -> String {
        face.to_string()
    }
}

impl TryFrom<String> for Face {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Card", 3)?;
        state.serialize_field("color", &self.color)?;
        state.serialize_field("value", &self.face)?;
        state.serialize_field("type", &self.category())?;
        state.end()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_wild() {
            write!(f, "{}", self.face)
        } else {
            write!(f, "{} {}", self.color, self.face)
        }
    }
}

// --- 牌组生成 ---

/// 按规则创建一副完整的 108 张牌 (未洗牌)
///
/// 每种颜色: 一张 0，1-9 各两张，skip/reverse/draw2 各两张；
/// 另有 4 张 wild 和 4 张 wild_draw4。
pub fn standard_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for &color in &Color::PLAYABLE {
        deck.push(Card::new(color, Face::Number(0)));
        for n in 1..=9 {
            deck.push(Card::new(color, Face::Number(n)));
            deck.push(Card::new(color, Face::Number(n)));
        }
        for face in [Face::Skip, Face::Reverse, Face::DrawTwo] {
            deck.push(Card::new(color, face));
            deck.push(Card::new(color, face));
        }
    }
    for _ in 0..4 {
        deck.push(Card::wild());
        deck.push(Card::wild_draw_four());
    }
    deck
}

// --- 出牌合法性 ---

/// 判断一张牌能否打在当前弃牌堆顶上
///
/// 万能牌总是可以打出 (是否违规由质疑机制处理)。
/// 其他牌需要颜色与当前颜色相同，或牌面与堆顶相同。
/// 没有当前颜色时以堆顶牌的颜色为准。
pub fn is_legal(card: &Card, top: &Card, active_color: Option<Color>) -> bool {
    if card.is_wild() {
        return true;
    }
    let color = active_color.unwrap_or(top.color);
    card.color == color || card.face == top.face
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use Color::*;
    use std::collections::HashMap;

    #[test]
    fn test_deck_composition() {
        let deck = standard_deck();
        assert_eq!(deck.len(), DECK_SIZE);

        let mut by_category: HashMap<Category, usize> = HashMap::new();
        for card in &deck {
            *by_category.entry(card.category()).or_insert(0) += 1;
        }
        assert_eq!(by_category[&Category::Number], 76);
        assert_eq!(by_category[&Category::Action], 24);
        assert_eq!(by_category[&Category::Wild], 8);

        for color in Color::PLAYABLE {
            let zeros = deck.iter().filter(|c| **c == Card::new(color, Face::Number(0))).count();
            let sevens = deck.iter().filter(|c| **c == Card::new(color, Face::Number(7))).count();
            let reverses = deck.iter().filter(|c| **c == Card::new(color, Face::Reverse)).count();
            assert_eq!((zeros, sevens, reverses), (1, 2, 2));
        }
        assert_eq!(deck.iter().filter(|c| c.face == Face::WildDrawFour).count(), 4);
        assert!(deck.iter().filter(|c| c.is_wild()).all(|c| c.color == Black));
    }

    #[test]
    fn test_legal_by_color_or_face() {
        let top = Card::new(Red, Face::Number(5));
        assert!(is_legal(&Card::new(Red, Face::Number(2)), &top, Some(Red)));
        assert!(is_legal(&Card::new(Blue, Face::Number(5)), &top, Some(Red)));
        assert!(!is_legal(&Card::new(Blue, Face::Number(3)), &top, Some(Red)));
        assert!(!is_legal(&Card::new(Green, Face::Skip), &top, Some(Red)));
    }

    #[test]
    fn test_active_color_overrides_top_color() {
        // 堆顶是 wild，已选蓝色
        let top = Card::wild();
        assert!(is_legal(&Card::new(Blue, Face::Number(1)), &top, Some(Blue)));
        assert!(!is_legal(&Card::new(Red, Face::Number(1)), &top, Some(Blue)));
    }

    #[test]
    fn test_wilds_always_legal() {
        let top = Card::new(Yellow, Face::DrawTwo);
        assert!(is_legal(&Card::wild(), &top, Some(Yellow)));
        assert!(is_legal(&Card::wild_draw_four(), &top, Some(Green)));
    }

    #[test]
    fn test_falls_back_to_top_color() {
        let top = Card::new(Green, Face::Number(8));
        assert!(is_legal(&Card::new(Green, Face::Reverse), &top, None));
        assert!(!is_legal(&Card::new(Red, Face::Reverse), &top, None));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&Card::new(Red, Face::DrawTwo)).unwrap();
        assert_eq!(json, r#"{"color":"red","value":"draw2","type":"action"}"#);
        let json = serde_json::to_string(&Card::wild_draw_four()).unwrap();
        assert_eq!(json, r#"{"color":"black","value":"wild_draw4","type":"wild"}"#);
        let json = serde_json::to_string(&Card::new(Blue, Face::Number(0))).unwrap();
        assert_eq!(json, r#"{"color":"blue","value":"0","type":"number"}"#);

        let card: Card = serde_json::from_str(r#"{"color":"red","value":"skip","type":"action"}"#).unwrap();
        assert_eq!(card, Card::new(Red, Face::Skip));

        let card: Card = serde_json::from_str(r#"{"color":"yellow","value":"7"}"#).unwrap();
        assert_eq!(card, Card::new(Yellow, Face::Number(7)));
        assert!(serde_json::from_str::<Card>(r#"{"color":"yellow","value":"12"}"#).is_err());
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("Blue".parse::<Color>(), Ok(Blue));
        assert_eq!("g".parse::<Color>(), Ok(Green));
        assert!("purple".parse::<Color>().is_err());
    }
}
