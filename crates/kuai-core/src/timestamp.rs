//! 时间戳工具.
//!
//! 包含基于 `time_base` 的重缩放, 以及把线上截断的 32 位时间戳
//! 还原为 64 位单调时间线的重建器.

use crate::rational::Rational;
use std::fmt;

/// 表示"未定义"的时间戳值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 线上时间戳回绕判定阈值 (2^31 - 1)
const WRAP_THRESHOLD: i64 = (1 << 31) - 1;

/// 把 `value` 从时间基 `from` 重缩放到时间基 `to`, 四舍五入 (远离零)
///
/// 任一时间基无效或 `value` 为 `NOPTS_VALUE` 时返回 `NOPTS_VALUE`.
/// 使用 i128 交叉乘法避免溢出和浮点误差:
/// `value * from.num * to.den / (from.den * to.num)`.
pub fn rescale_q(value: i64, from: Rational, to: Rational) -> i64 {
    if value == NOPTS_VALUE || !from.is_valid() || !to.is_valid() {
        return NOPTS_VALUE;
    }
    let num = i128::from(value) * i128::from(from.num) * i128::from(to.den);
    let den = i128::from(from.den) * i128::from(to.num);
    if den == 0 {
        return NOPTS_VALUE;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let half = den / 2;
    let rounded = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    rounded as i64
}

/// 时间戳
///
/// 包含一个整数值和对应的时间基.
/// 实际时间 (秒) = pts * time_base.num / time_base.den.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// 时间戳值, `NOPTS_VALUE` 表示未定义
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
}

impl Timestamp {
    /// 创建新的时间戳
    pub const fn new(pts: i64, time_base: Rational) -> Self {
        Self { pts, time_base }
    }

    /// 判断时间戳是否有效 (非 NOPTS_VALUE)
    pub const fn is_valid(&self) -> bool {
        self.pts != NOPTS_VALUE && self.time_base.is_valid()
    }

    /// 转换为秒 (f64)
    ///
    /// 无效时间戳返回 `f64::NAN`.
    pub fn to_seconds(&self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        self.pts as f64 * self.time_base.to_f64()
    }

    /// 将时间戳重缩放到新的时间基
    pub fn rescale(&self, new_time_base: Rational) -> Self {
        Self {
            pts: rescale_q(self.pts, self.time_base, new_time_base),
            time_base: new_time_base,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "NOPTS")
        } else {
            write!(f, "{:.6}s", self.to_seconds())
        }
    }
}

/// 截断时间戳重建器
///
/// 线上只携带时间戳的低 32 位. 重建器记住上一次重建出的 64 位值 `prev`,
/// 对新到达的低位值 `v`:
/// - `v < low32(prev) - (2^31 - 1)` 视为低位回绕, 高位取 `(prev >> 32) + 1`
/// - 否则高位取 `prev >> 32`
///
/// 结果为 `(high << 32) | v`, 并作为新的 `prev`.
/// 前提: 相邻两个真实时间戳的差不超过 2^31 - 1.
///
/// `prev` 为负时规则同样成立: `prev = -2` 的高位为 -1, 之后的 `0xFFFF_FFFF`
/// 还原为 -1, `0` 进位还原为 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampReconstructor {
    prev: i64,
}

impl TimestampReconstructor {
    /// 以 0 为起点创建重建器
    pub const fn new() -> Self {
        Self { prev: 0 }
    }

    /// 以给定的 64 位值为起点创建重建器
    pub const fn starting_at(prev: i64) -> Self {
        Self { prev }
    }

    /// 上一次重建出的值
    pub const fn prev(&self) -> i64 {
        self.prev
    }

    /// 把 32 位截断值扩展为 64 位时间戳
    pub fn extend(&mut self, v: u32) -> i64 {
        let low = i64::from(v);
        let high = if low < (self.prev & 0xFFFF_FFFF) - WRAP_THRESHOLD {
            (self.prev >> 32) + 1
        } else {
            self.prev >> 32
        };
        self.prev = (high << 32) | low;
        self.prev
    }

    /// 回到初始状态
    pub fn reset(&mut self) {
        self.prev = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_转换为秒() {
        let ts = Timestamp::new(90000, Rational::new(1, 90000));
        assert!((ts.to_seconds() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timestamp_重缩放() {
        let ts = Timestamp::new(90000, Rational::new(1, 90000));
        assert_eq!(ts.rescale(Rational::new(1, 1000)).pts, 1000);
    }

    #[test]
    fn test_rescale_四舍五入() {
        // 33ms 在 1/30 时间基下约为 0.99 帧
        assert_eq!(rescale_q(33, Rational::new(1, 1000), Rational::new(1, 30)), 1);
        assert_eq!(rescale_q(66, Rational::new(1, 1000), Rational::new(1, 30)), 2);
        assert_eq!(rescale_q(-33, Rational::new(1, 1000), Rational::new(1, 30)), -1);
        assert_eq!(
            rescale_q(NOPTS_VALUE, Rational::new(1, 1000), Rational::new(1, 30)),
            NOPTS_VALUE
        );
        assert_eq!(rescale_q(5, Rational::UNDEFINED, Rational::MICRO), NOPTS_VALUE);
    }

    #[test]
    fn test_重建_无回绕() {
        let mut r = TimestampReconstructor::new();
        assert_eq!(r.extend(0), 0);
        assert_eq!(r.extend(3000), 3000);
        assert_eq!(r.extend(0xFFFF_FF00), 0xFFFF_FF00);
    }

    #[test]
    fn test_重建_低位回绕() {
        let mut r = TimestampReconstructor::new();
        r.extend(0xFFFF_FFF0);
        let next = r.extend(0x0000_0010);
        assert!(next > 0xFFFF_FFF0);
        assert_eq!(next >> 32, 1);
        assert_eq!(next, 0x1_0000_0010);
    }

    #[test]
    fn test_重建_回绕后继续递增() {
        let mut r = TimestampReconstructor::new();
        r.extend(0xFFFF_FFF0);
        r.extend(0x10);
        // 回绕之后的普通递增不能再次进位
        assert_eq!(r.extend(0x20), 0x1_0000_0020);
        assert_eq!(r.extend(0x8000_0010), 0x1_8000_0010);
        assert_eq!(r.extend(0x5), 0x2_0000_0005);
    }

    #[test]
    fn test_重建_负起点() {
        let mut r = TimestampReconstructor::starting_at(-2);
        assert_eq!(r.extend(0xFFFF_FFFF), -1);
        assert_eq!(r.extend(0), 0);
        assert_eq!(r.extend(1), 1);
        assert_eq!(r.extend(0x7FFF_FFFF), 0x7FFF_FFFF);
    }

    #[test]
    fn test_重建_重置() {
        let mut r = TimestampReconstructor::new();
        r.extend(0xFFFF_FFF0);
        r.reset();
        assert_eq!(r.prev(), 0);
    }
}
