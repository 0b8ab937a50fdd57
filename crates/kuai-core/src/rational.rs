//! 有理数类型, 用于时间基 (time_base) 和帧率.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 视频的线上时间基是帧率的倒数, 音频的线上时间基是 `frame_size / sample_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 微秒时间基 (1/1_000_000), 块时间戳和 `base_ts` 使用此时间基
    pub const MICRO: Self = Self {
        num: 1,
        den: 1_000_000,
    };

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 分子分母都为正数
    ///
    /// 时间基与帧率只有在此条件下才有意义.
    pub const fn is_positive(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// 转换为 f64 浮点数
    ///
    /// 如果分母为 0, 返回 `f64::NAN`.
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 求倒数
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_正数判断() {
        assert!(Rational::new(1, 25).is_positive());
        assert!(!Rational::new(-1, 25).is_positive());
        assert!(Rational::new(-1, 25).is_valid());
        assert!((Rational::MICRO.to_f64() - 1e-6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rational_invalid_value() {
        let r = Rational::UNDEFINED;
        assert!(!r.is_valid());
        assert!(!r.is_positive());
        assert!(r.to_f64().is_nan());
    }

    #[test]
    fn test_rational_帧率倒数() {
        let rate = Rational::new(30000, 1001);
        assert_eq!(rate.invert(), Rational::new(1001, 30000));
        assert_eq!(format!("{rate}"), "30000/1001");
    }
}
