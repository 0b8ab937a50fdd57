//! 端到端集成测试: 生产端 → 转储/传输 → 消费端.
//!
//! 测试流程: 分块 → (可选) 写入转储文件 → 解块 → 检查交付的帧与时间戳

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use bytes::Bytes;
use kuai::codec::{CodecId, Packet};
use kuai::core::timestamp::NOPTS_VALUE;
use kuai::core::{KuaiError, MediaType, Rational};
use kuai::format::{
    Chunk, ChunkAssembler, ChunkReader, ChunkWriter, ChunkiserConfig, CollectingSink, Dechunkiser,
    DechunkiserConfig, Stream, StreamHeader,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 辅助: 25fps 视频 (时间基与线上一致) + MP3 音频
fn make_streams() -> Vec<Stream> {
    vec![
        Stream::video(0, CodecId::H264, Rational::new(1, 25), 352, 288, Rational::new(25, 1)),
        Stream::audio(1, CodecId::Mp3, Rational::new(1152, 44100), 44100, 2, 1152),
    ]
}

fn open_consumer(cfg: &str) -> (Dechunkiser, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let dechunkiser = Dechunkiser::open(&DechunkiserConfig::parse(cfg), sink.clone()).unwrap();
    (dechunkiser, sink)
}

/// 辅助: 交替产生视频/音频帧, 每帧负载内容可追溯
fn produce(asm: &mut ChunkAssembler, frames: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for i in 0..frames {
        for index in 0..2 {
            let payload = vec![(index * 100 + i) as u8; 10 + i];
            let dts = i as i64;
            if let Some(chunk) = asm.push_frame(index, &payload, dts, Some(dts + 1)).unwrap() {
                chunks.push(chunk);
            }
        }
    }
    chunks.extend(asm.flush());
    chunks
}

#[test]
fn test_音视频往返() {
    init_logger();
    let config = ChunkiserConfig::parse("vframes=3,aframes=2").unwrap();
    let mut asm = ChunkAssembler::new(make_streams(), &config);
    let chunks = produce(&mut asm, 7);

    let (mut dechunkiser, sink) = open_consumer("media=av");
    for chunk in &chunks {
        assert_eq!(dechunkiser.write_chunk(chunk.data.clone()).unwrap(), chunk.len());
    }
    dechunkiser.drain();

    for (media_type, index) in [(MediaType::Video, 0usize), (MediaType::Audio, 1)] {
        let frames = sink.frames(media_type);
        assert_eq!(frames.len(), 7);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.data.len(), 10 + i);
            assert!(frame.data.iter().all(|&b| b == (index * 100 + i) as u8));
            assert_eq!(frame.dts, i as i64);
            assert_eq!(frame.pts, i as i64 + 1);
            assert_eq!(frame.stream_index, index);
        }
    }
    let headers = sink.headers();
    assert_eq!(headers.len(), 2);
    assert_eq!(
        dechunkiser.header(MediaType::Audio).map(|h| h.time_base()),
        Some(Rational::new(1152, 44100))
    );
    dechunkiser.close();
}

#[test]
fn test_仅视频消费端丢弃音频块() {
    let mut asm = ChunkAssembler::new(make_streams(), &ChunkiserConfig::default());
    let audio = asm.push_frame(1, &[5; 20], 0, None).unwrap().unwrap();
    assert_eq!(audio.media_type, MediaType::Audio);

    let (mut dechunkiser, sink) = open_consumer("");
    assert_eq!(dechunkiser.write_chunk(audio.data).unwrap(), 0);
    dechunkiser.drain();
    assert!(sink.is_empty());
    assert!(sink.headers().is_empty());
    assert!(dechunkiser.header(MediaType::Audio).is_none());
}

#[test]
fn test_格式错误的块被丢弃_会话继续() {
    let mut asm = ChunkAssembler::new(make_streams(), &ChunkiserConfig::default());
    let first = asm.push_frame(0, &[1; 8], 0, None).unwrap().unwrap();
    let second = asm.push_frame(0, &[2; 8], 1, None).unwrap().unwrap();

    let (mut dechunkiser, sink) = open_consumer("media=video");
    dechunkiser.write_chunk(first.data).unwrap();

    let mut broken = second.data.to_vec();
    broken.pop();
    let err = dechunkiser.write(&broken).unwrap_err();
    assert!(matches!(err, KuaiError::MalformedChunk(_)));
    assert!(err.is_recoverable());

    dechunkiser.write_chunk(second.data).unwrap();
    dechunkiser.drain();
    let frames = sink.frames(MediaType::Video);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].dts, 1);
    assert_eq!(frames[1].pts, NOPTS_VALUE);
}

#[test]
fn test_跨越32位回绕() {
    let mut asm = ChunkAssembler::new(make_streams(), &ChunkiserConfig::default());
    let base = 0xFFFF_FFFDi64;
    // 会话第一个 dts 按有符号解释, 先用一个位于 2^31 以下的值建立起点
    let mut expected = vec![0x7FFF_FFF0i64];
    expected.extend((0..6).map(|i| base + i));
    let (mut dechunkiser, sink) = open_consumer("media=video");
    for &dts in &expected {
        let chunk = asm.push_frame(0, &[0; 4], dts, Some(dts + 2)).unwrap().unwrap();
        dechunkiser.write_chunk(chunk.data).unwrap();
    }
    dechunkiser.drain();
    let frames = sink.frames(MediaType::Video);
    let dts: Vec<i64> = frames.iter().map(|f| f.dts).collect();
    let pts: Vec<i64> = frames.iter().map(|f| f.pts).collect();
    assert_eq!(dts, expected);
    assert_eq!(pts, expected.iter().map(|d| d + 2).collect::<Vec<_>>());
    assert!(dts.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_会话起始的负dts() {
    init_logger();
    let config = ChunkiserConfig::parse("vframes=2").unwrap();
    let mut asm = ChunkAssembler::new(make_streams(), &config);
    let mut chunks = Vec::new();
    for dts in -2..2i64 {
        chunks.extend(asm.push_frame(0, &[dts as u8; 6], dts, Some(dts + 2)).unwrap());
    }
    chunks.extend(asm.flush());
    assert_eq!(chunks.len(), 2);

    let (mut dechunkiser, sink) = open_consumer("media=video");
    for chunk in chunks {
        dechunkiser.write_chunk(chunk.data).unwrap();
    }
    dechunkiser.drain();
    let frames = sink.frames(MediaType::Video);
    let dts: Vec<i64> = frames.iter().map(|f| f.dts).collect();
    assert_eq!(dts, [-2, -1, 0, 1]);
    for frame in &frames {
        assert_eq!(frame.pts - frame.dts, 2);
    }
}

#[test]
fn test_转储文件往返() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.kuai");

    let config = ChunkiserConfig::parse("vframes=4").unwrap();
    let mut asm = ChunkAssembler::new(make_streams(), &config);
    let chunks = produce(&mut asm, 9);
    let mut writer = ChunkWriter::new(File::create(&path).unwrap());
    for chunk in &chunks {
        writer.write_chunk(&chunk.data).unwrap();
    }
    assert_eq!(writer.count(), chunks.len());
    writer.finish().unwrap();

    let reader = ChunkReader::new(BufReader::new(File::open(&path).unwrap()));
    let read: Vec<Bytes> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(read.len(), chunks.len());
    assert!(read.iter().zip(&chunks).all(|(r, c)| *r == c.data));

    let (mut dechunkiser, sink) = open_consumer("media=audio");
    for data in read {
        dechunkiser.write_chunk(data).unwrap();
    }
    dechunkiser.drain();
    let audio = sink.frames(MediaType::Audio);
    assert_eq!(audio.len(), 9);
    // 只消费音频时音频流索引为 0
    assert!(audio.iter().all(|f| f.stream_index == 0));
    assert!(sink.frames(MediaType::Video).is_empty());
    assert!(matches!(sink.headers()[0], StreamHeader::Audio(_)));
}

#[test]
fn test_关闭可重复调用() {
    let (mut dechunkiser, _sink) = open_consumer("media=av");
    dechunkiser.close();
    dechunkiser.close();
    drop(dechunkiser);

    // 直接丢弃也会关闭投递线程
    let (dechunkiser, _sink) = open_consumer("media=av");
    drop(dechunkiser);
}

#[test]
fn test_交付的数据包() {
    let mut asm = ChunkAssembler::new(make_streams(), &ChunkiserConfig::default());
    let mut pkt = Packet::from_data(vec![9u8; 3]);
    pkt.stream_index = 0;
    pkt.dts = 2;
    let chunk = asm.push_packet(&pkt).unwrap().unwrap();

    let (mut dechunkiser, sink) = open_consumer("media=video");
    dechunkiser.write_chunk(chunk.data).unwrap();
    dechunkiser.drain();
    let frames = sink.frames(MediaType::Video);
    assert_eq!(frames[0].dts(), Some(2));
    assert_eq!(frames[0].pts(), None);
    assert_eq!(frames[0].time_base, Rational::new(1, 25));
}
