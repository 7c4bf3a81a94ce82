use crate::card::{Card, standard_deck};
use crate::rng::GameRng;

/// 牌堆管理：摸牌堆 + 弃牌堆
///
/// 两个牌堆的末尾都是“顶”。摸牌堆为空时自动把弃牌堆 (除顶牌外) 洗回摸牌堆。
#[derive(Debug, Clone)]
pub struct Deck {
    draw_pile: Vec<Card>,
    discard_pile: Vec<Card>,
    rng: GameRng,
}

impl Deck {
    /// 创建空牌堆，开局时调用 `reset` 才会真正建牌
    pub fn new(rng: GameRng) -> Self {
        Self { draw_pile: Vec::new(), discard_pile: Vec::new(), rng }
    }

    /// 重新建一副 108 张的牌并洗匀，清空弃牌堆
    pub fn reset(&mut self) {
        let mut cards = standard_deck();
        self.rng.shuffle(&mut cards);
        self.draw_pile = cards;
        self.discard_pile.clear();
    }

    /// 摸牌堆为空时，把弃牌堆除顶牌以外的牌洗匀作为新的摸牌堆
    ///
    /// 返回是否真的补充了牌。弃牌堆不足两张时什么也不做。
    pub fn refill(&mut self) -> bool {
        if !self.draw_pile.is_empty() || self.discard_pile.len() <= 1 {
            return false;
        }
        let top = self.discard_pile.pop();
        let mut recycled = std::mem::take(&mut self.discard_pile);
        self.rng.shuffle(&mut recycled);
        self.draw_pile = recycled;
        self.discard_pile.extend(top);
        true
    }

    /// 摸一张牌，必要时先补充摸牌堆
    pub fn draw_one(&mut self) -> Option<Card> {
        if self.draw_pile.is_empty() {
            self.refill();
        }
        self.draw_pile.pop()
    }

    /// 摸至多 `n` 张牌；牌已全部在玩家手中时返回的张数可能少于 `n`
    pub fn draw(&mut self, n: usize) -> Vec<Card> {
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            match self.draw_one() {
                Some(card) => drawn.push(card),
                None => break,
            }
        }
        drawn
    }

    /// 把一张牌放回摸牌堆并重新洗牌 (开局翻到 wild_draw4 时使用)
    pub fn return_and_shuffle(&mut self, card: Card) {
        self.draw_pile.push(card);
        self.rng.shuffle(&mut self.draw_pile);
    }

    /// 把一批牌 (离开玩家的手牌) 放回摸牌堆并重新洗牌
    pub fn return_cards(&mut self, cards: Vec<Card>) {
        if cards.is_empty() {
            return;
        }
        self.draw_pile.extend(cards);
        self.rng.shuffle(&mut self.draw_pile);
    }

    pub fn discard(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    pub fn top(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn discard_pile_len(&self) -> usize {
        self.discard_pile.len()
    }

    /// 测试中需要精确摆放牌堆时使用
    #[cfg(test)]
    pub(crate) fn set_piles(&mut self, draw_pile: Vec<Card>, discard_pile: Vec<Card>) {
        self.draw_pile = draw_pile;
        self.discard_pile = discard_pile;
    }
}
