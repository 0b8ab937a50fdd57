//! 配置解析.
//!
//! 配置字符串由逗号分隔的 `name=value` 组成, 例如 `media=av,vframes=3,loop=1`.
//! 同名键出现多次时以第一次为准.

use kuai_core::{KuaiError, KuaiResult, MediaSelection, MediaType};
use log::warn;
use serde::{Deserialize, Serialize};

/// 键值配置表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTags {
    pairs: Vec<(String, String)>,
}

impl ConfigTags {
    /// 解析配置字符串
    ///
    /// 不含 `=` 的片段被忽略; 键和值两侧的空白被去除.
    pub fn parse(cfg: &str) -> Self {
        let pairs = cfg
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .filter_map(|item| match item.split_once('=') {
                Some((name, value)) => Some((name.trim().to_string(), value.trim().to_string())),
                None => {
                    warn!("忽略无法识别的配置项: {}", item.trim());
                    None
                }
            })
            .collect();
        Self { pairs }
    }

    /// 是否没有任何配置项
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 读取字符串值
    pub fn value_str(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 读取字符串值, 不存在时返回默认值
    pub fn value_str_default<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.value_str(name).unwrap_or(default)
    }

    /// 读取整数值
    ///
    /// 值无法解析为整数时返回 `InvalidArgument`.
    pub fn value_int(&self, name: &str) -> KuaiResult<Option<i64>> {
        self.value_str(name)
            .map(|v| {
                v.parse::<i64>().map_err(|_| {
                    KuaiError::InvalidArgument(format!("配置项 {name} 不是整数: {v}"))
                })
            })
            .transpose()
    }

    /// 读取整数值, 不存在时返回默认值
    pub fn value_int_default(&self, name: &str, default: i64) -> KuaiResult<i64> {
        Ok(self.value_int(name)?.unwrap_or(default))
    }

    /// 读取浮点值
    pub fn value_double(&self, name: &str) -> KuaiResult<Option<f64>> {
        self.value_str(name)
            .map(|v| {
                v.parse::<f64>().map_err(|_| {
                    KuaiError::InvalidArgument(format!("配置项 {name} 不是浮点数: {v}"))
                })
            })
            .transpose()
    }

    /// 读取浮点值, 不存在时返回默认值
    pub fn value_double_default(&self, name: &str, default: f64) -> KuaiResult<f64> {
        Ok(self.value_double(name)?.unwrap_or(default))
    }
}

/// 读取 `media` 项; 无法识别时保留默认值
fn media_from_tags(tags: &ConfigTags, default: MediaSelection) -> MediaSelection {
    match tags.value_str("media") {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!("无法识别的 media={}, 使用默认值 {}", value, default);
            default
        }),
        None => default,
    }
}

/// 读取每块帧数上限 (1..=255)
fn frames_from_tags(tags: &ConfigTags, name: &str) -> KuaiResult<u8> {
    let value = tags.value_int_default(name, i64::from(DEFAULT_FRAMES_PER_CHUNK))?;
    u8::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| KuaiError::InvalidArgument(format!("{name} = {value} 超出 1..=255")))
}

/// 默认每块帧数
pub const DEFAULT_FRAMES_PER_CHUNK: u8 = 1;

fn default_frames() -> u8 {
    DEFAULT_FRAMES_PER_CHUNK
}

fn default_producer_media() -> MediaSelection {
    MediaSelection::AV
}

fn default_consumer_media() -> MediaSelection {
    MediaSelection::VIDEO
}

/// 分块端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkiserConfig {
    /// 到达输入末尾后回到开头继续
    #[serde(rename = "loop", default)]
    pub looping: bool,
    /// 参与分块的媒体类型
    #[serde(default = "default_producer_media", with = "media_serde")]
    pub media: MediaSelection,
    /// 每个视频块的帧数上限
    #[serde(default = "default_frames")]
    pub vframes: u8,
    /// 每个音频块的帧数上限
    #[serde(default = "default_frames")]
    pub aframes: u8,
}

impl Default for ChunkiserConfig {
    fn default() -> Self {
        Self {
            looping: false,
            media: default_producer_media(),
            vframes: DEFAULT_FRAMES_PER_CHUNK,
            aframes: DEFAULT_FRAMES_PER_CHUNK,
        }
    }
}

impl ChunkiserConfig {
    /// 从配置字符串解析
    pub fn parse(cfg: &str) -> KuaiResult<Self> {
        Self::from_tags(&ConfigTags::parse(cfg))
    }

    /// 从键值表读取 `loop`, `media`, `vframes`, `aframes`
    pub fn from_tags(tags: &ConfigTags) -> KuaiResult<Self> {
        Ok(Self {
            looping: tags.value_int_default("loop", 0)? != 0,
            media: media_from_tags(tags, default_producer_media()),
            vframes: frames_from_tags(tags, "vframes")?,
            aframes: frames_from_tags(tags, "aframes")?,
        })
    }

    /// 指定媒体类型的每块帧数上限
    pub fn frames_max(&self, media_type: MediaType) -> u8 {
        match media_type {
            MediaType::Video => self.vframes,
            MediaType::Audio => self.aframes,
            MediaType::Data => 0,
        }
    }
}

/// 解块端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DechunkiserConfig {
    /// 接受解码的媒体类型
    #[serde(default = "default_consumer_media", with = "media_serde")]
    pub media: MediaSelection,
}

impl Default for DechunkiserConfig {
    fn default() -> Self {
        Self {
            media: default_consumer_media(),
        }
    }
}

impl DechunkiserConfig {
    /// 从配置字符串解析
    pub fn parse(cfg: &str) -> Self {
        Self::from_tags(&ConfigTags::parse(cfg))
    }

    /// 从键值表读取 `media`
    pub fn from_tags(tags: &ConfigTags) -> Self {
        Self {
            media: media_from_tags(tags, default_consumer_media()),
        }
    }
}

/// `MediaSelection` 以 `audio` / `video` / `av` 字符串序列化
mod media_serde {
    use kuai_core::MediaSelection;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(media: &MediaSelection, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(media.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<MediaSelection, D::Error> {
        let value = String::deserialize(d)?;
        value.parse().map_err(D::Error::custom)
    }
}
