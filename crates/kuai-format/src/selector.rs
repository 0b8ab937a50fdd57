//! 流选择器.
//!
//! 数据源可能包含多条视频/音频流, 块流中每种媒体类型默认只承载第一条.
//! 选择结果保存为按流索引的位掩码.

use kuai_core::{MediaSelection, MediaType};
use log::debug;

use crate::stream::Stream;

/// 可参与选择的最大流数量
pub const MAX_STREAMS: usize = 64;

/// 流选择器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSelector {
    /// 第 i 位表示流 #i 被选中
    mask: u64,
}

impl StreamSelector {
    /// 按媒体选择从流列表中选出第一条视频流和第一条音频流
    ///
    /// `media` 中未包含的媒体类型不选择任何流.
    pub fn select(streams: &[Stream], media: MediaSelection) -> Self {
        let mut mask = 0u64;
        let mut taken = MediaSelection::empty();
        for stream in streams {
            let bit = stream.media_type.selection();
            if bit.is_empty() || !media.contains(bit) || taken.contains(bit) {
                continue;
            }
            if stream.index >= MAX_STREAMS {
                debug!("流 #{} 超出可选范围, 忽略", stream.index);
                continue;
            }
            mask |= 1u64 << stream.index;
            taken |= bit;
            debug!(
                "选择{}流 #{} ({})",
                stream.media_type, stream.index, stream.codec_id
            );
        }
        Self { mask }
    }

    /// 直接由位掩码创建
    pub const fn from_mask(mask: u64) -> Self {
        Self { mask }
    }

    /// 流是否被选中
    pub fn is_selected(&self, index: usize) -> bool {
        index < MAX_STREAMS && self.mask & (1u64 << index) != 0
    }

    /// 选择位掩码
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// 被选中的流数量
    pub const fn count(&self) -> u32 {
        self.mask.count_ones()
    }

    /// 是否没有选中任何流
    pub const fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// 指定媒体类型被选中的流
    pub fn selected<'a>(
        &'a self,
        streams: &'a [Stream],
        media_type: MediaType,
    ) -> impl Iterator<Item = &'a Stream> + 'a {
        streams
            .iter()
            .filter(move |s| s.media_type == media_type && self.is_selected(s.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuai_codec::CodecId;
    use kuai_core::Rational;

    fn sample_streams() -> Vec<Stream> {
        vec![
            Stream::video(0, CodecId::H264, Rational::new(1, 90000), 640, 480, Rational::new(25, 1)),
            Stream::video(1, CodecId::Mpeg4, Rational::new(1, 90000), 320, 240, Rational::new(25, 1)),
            Stream::audio(2, CodecId::Aac, Rational::new(1, 48000), 48000, 2, 1024),
        ]
    }

    #[test]
    fn test_默认选择每种媒体第一条() {
        let streams = sample_streams();
        let sel = StreamSelector::select(&streams, MediaSelection::AV);
        assert!(sel.is_selected(0));
        assert!(!sel.is_selected(1));
        assert!(sel.is_selected(2));
        assert_eq!(sel.count(), 2);
        assert_eq!(sel.mask(), 0b101);
        assert_eq!(sel.selected(&streams, MediaType::Video).count(), 1);
    }

    #[test]
    fn test_仅视频或仅音频() {
        let streams = sample_streams();
        assert_eq!(StreamSelector::select(&streams, MediaSelection::VIDEO).mask(), 0b001);
        assert_eq!(StreamSelector::select(&streams, MediaSelection::AUDIO).mask(), 0b100);
        assert!(StreamSelector::select(&streams, MediaSelection::empty()).is_empty());
    }

    #[test]
    fn test_越界索引() {
        let sel = StreamSelector::from_mask(u64::MAX);
        assert!(sel.is_selected(63));
        assert!(!sel.is_selected(64));
    }
}
