//! 可注入的随机数源
//!
//! 洗牌和房间号生成都经过 `GameRng`，测试和调试时可以用固定种子复现整局游戏。

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 确定性的随机数生成器 (ChaCha8)
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    /// 使用固定种子创建
    pub fn new(seed: u64) -> Self {
        Self { inner: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// 使用操作系统熵源播种的线程随机数创建，生产环境使用
    pub fn from_entropy() -> Self {
        Self { inner: ChaCha8Rng::from_rng(&mut rand::rng()) }
    }

    /// 派生一个独立的子生成器
    ///
    /// 子生成器的种子取自父生成器的输出，因此父生成器种子固定时结果也是确定的。
    pub fn fork(&mut self) -> Self {
        Self { inner: ChaCha8Rng::from_rng(&mut self.inner) }
    }

    /// 返回 `[0, upper)` 内的均匀随机数
    ///
    /// # Panics
    /// `upper` 为 0 时 panic。
    pub fn below(&mut self, upper: usize) -> usize {
        self.inner.random_range(0..upper)
    }

    /// Fisher–Yates 洗牌：从最后一个位置往前，每一步与 `[0, i]` 内的随机位置交换
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.inner.random_range(0..=i);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_shuffle() {
        let mut a: Vec<u32> = (0..52).collect();
        let mut b = a.clone();
        GameRng::new(7).shuffle(&mut a);
        GameRng::new(7).shuffle(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = GameRng::new(42);
        let mut data: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut data);
        assert_ne!(data, (0..20).collect::<Vec<_>>());
        data.sort();
        assert_eq!(data, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_short_slices() {
        let mut rng = GameRng::new(1);
        let mut empty: Vec<u8> = vec![];
        rng.shuffle(&mut empty);
        let mut one = vec![9];
        rng.shuffle(&mut one);
        assert_eq!(one, vec![9]);
    }

    #[test]
    fn test_fork_is_deterministic() {
        let mut parent1 = GameRng::new(3);
        let mut parent2 = GameRng::new(3);
        let mut child1 = parent1.fork();
        let mut child2 = parent2.fork();
        let seq1: Vec<_> = (0..8).map(|_| child1.below(1000)).collect();
        let seq2: Vec<_> = (0..8).map(|_| child2.below(1000)).collect();
        assert_eq!(seq1, seq2);

        // 父生成器自身的后续序列与子生成器不同
        let parent_seq: Vec<_> = (0..8).map(|_| parent1.below(1000)).collect();
        assert_ne!(parent_seq, seq1);
    }

    #[test]
    fn test_below_bounds() {
        let mut rng = GameRng::new(11);
        for _ in 0..200 {
            assert!(rng.below(6) < 6);
        }
    }
}
