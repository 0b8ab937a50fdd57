//! kuai-probe - 块转储文件探测工具
//!
//! 读取 `[长度][块数据]` 格式的转储文件, 通过解块器还原帧序列,
//! 输出流头部与帧信息.

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};

use kuai_codec::{Packet, wire};
use kuai_core::timestamp::Timestamp;
use kuai_core::{KuaiError, MediaSelection, MediaType};
use kuai_format::stream_header::StreamHeader;
use kuai_format::{ChunkReader, Dechunkiser, DechunkiserConfig, FrameSink};

/// Kuai 块转储文件探测工具
#[derive(Parser, Debug)]
#[command(name = "kuai-probe", version, about = "Kuai 块转储文件探测工具")]
struct Cli {
    /// 转储文件路径
    input: Option<PathBuf>,

    /// 接受的媒体类型 (audio / video / av)
    #[arg(long, default_value = "av")]
    media: MediaSelection,

    /// 显示每一帧的信息
    #[arg(long)]
    show_frames: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,

    /// 日志详细程度 (-v / -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    filename: String,
    chunks: ChunkSummary,
    streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Vec<FrameInfo>>,
}

/// 块统计
#[derive(Serialize, Default, Debug, PartialEq, Eq)]
struct ChunkSummary {
    total: u64,
    accepted: u64,
    skipped: u64,
    dropped: u64,
    total_bytes: u64,
}

/// 流头部信息
#[derive(Serialize)]
struct StreamInfo {
    codec_type: String,
    wire_codec: u8,
    codec_name: String,
    time_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_size: Option<u16>,
    nb_frames: usize,
}

/// 单帧信息
#[derive(Serialize, Clone, Debug)]
struct FrameInfo {
    codec_type: String,
    size: usize,
    dts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pts: Option<i64>,
    dts_time: f64,
}

/// 记录交付帧的接收端
#[derive(Default)]
struct ProbeSink {
    frames: Mutex<Vec<FrameInfo>>,
}

impl FrameSink for ProbeSink {
    fn deliver(&self, media_type: MediaType, packet: Packet) {
        let info = FrameInfo {
            codec_type: codec_type(media_type).to_string(),
            size: packet.size(),
            dts: packet.dts,
            pts: packet.pts(),
            dts_time: Timestamp::new(packet.dts, packet.time_base).to_seconds(),
        };
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(info);
    }
}

fn codec_type(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Video => "video",
        MediaType::Audio => "audio",
        MediaType::Data => "data",
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();

    let Some(input_path) = cli.input.as_deref() else {
        print_banner();
        return;
    };

    if let Err(e) = logging::init("kuai-probe", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if !cli.quiet {
        eprintln!(
            "kuai-probe 版本 {} -- 块转储文件探测工具",
            kuai::version()
        );
        eprintln!("输入文件: {}", input_path.display());
    }

    let output = match probe(input_path, cli.media) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    };

    if cli.json {
        let output = ProbeOutput {
            frames: output.frames.filter(|_| cli.show_frames),
            ..output
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_chunks_text(&output.chunks);
        print_streams_text(&output.streams);
        if cli.show_frames {
            if let Some(ref frames) = output.frames {
                print_frames_text(frames);
            }
        }
    }
}

/// 读取转储文件并解块
fn probe(path: &Path, media: MediaSelection) -> Result<ProbeOutput> {
    let file = File::open(path).with_context(|| format!("无法打开文件 '{}'", path.display()))?;
    let mut reader = ChunkReader::new(BufReader::new(file));

    let sink = Arc::new(ProbeSink::default());
    let config = DechunkiserConfig { media };
    let mut dechunkiser = Dechunkiser::open(&config, sink.clone()).context("无法创建解块器")?;

    let mut summary = ChunkSummary::default();
    while let Some(chunk) = reader.read_chunk().context("读取转储记录失败")? {
        summary.total += 1;
        summary.total_bytes += chunk.len() as u64;
        match dechunkiser.write_chunk(chunk) {
            Ok(0) => summary.skipped += 1,
            Ok(_) => summary.accepted += 1,
            Err(e) if e.is_recoverable() => {
                log::debug!("丢弃第 {} 个块: {e}", summary.total);
                summary.dropped += 1;
            }
            Err(KuaiError::OutOfMemory(msg)) => anyhow::bail!("内存不足: {msg}"),
            Err(e) => return Err(e).context("解块失败"),
        }
    }
    dechunkiser.drain();

    let mut frames = sink
        .frames
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    // 两个投递线程并发交付, 按媒体类型分组, 组内保持交付顺序
    frames.sort_by_key(|f| f.codec_type != "video");

    let streams = [MediaType::Video, MediaType::Audio]
        .into_iter()
        .filter_map(|m| dechunkiser.header(m))
        .map(|header| {
            let name = codec_type(header.media_type());
            build_stream_info(&header, frames.iter().filter(|f| f.codec_type == name).count())
        })
        .collect();
    dechunkiser.close();

    Ok(ProbeOutput {
        filename: path.display().to_string(),
        chunks: summary,
        streams,
        frames: Some(frames),
    })
}

/// 从流头部构建 StreamInfo
fn build_stream_info(header: &StreamHeader, nb_frames: usize) -> StreamInfo {
    let tb = header.time_base();
    let mut info = StreamInfo {
        codec_type: codec_type(header.media_type()).to_string(),
        wire_codec: header.codec().0,
        codec_name: wire::from_wire(header.codec())
            .map_or_else(|| "unknown".to_string(), |id| id.to_string()),
        time_base: format!("{}/{}", tb.num, tb.den),
        width: None,
        height: None,
        frame_rate: None,
        sample_rate: None,
        channels: None,
        frame_size: None,
        nb_frames,
    };
    match header {
        StreamHeader::Video(v) => {
            info.width = Some(v.width);
            info.height = Some(v.height);
            info.frame_rate = Some(format!("{}/{}", v.frame_rate_num, v.frame_rate_den));
        }
        StreamHeader::Audio(a) => {
            info.sample_rate = Some(a.sample_rate);
            info.channels = Some(a.channels);
            info.frame_size = Some(a.frame_size);
        }
    }
    info
}

/// 文本输出: 块统计
fn print_chunks_text(summary: &ChunkSummary) {
    println!("[CHUNKS]");
    println!("  块总数       : {}", summary.total);
    println!("  已接受       : {}", summary.accepted);
    println!("  未选择       : {}", summary.skipped);
    println!("  已丢弃       : {}", summary.dropped);
    println!(
        "  数据总量     : {} 字节 ({:.2} KB)",
        summary.total_bytes,
        summary.total_bytes as f64 / 1024.0
    );
    println!("[/CHUNKS]");
    println!();
}

/// 文本输出: 流头部
fn print_streams_text(streams: &[StreamInfo]) {
    for stream in streams {
        println!("[STREAM {}]", stream.codec_type);
        println!("  编解码器     : {} (线上编号 {})", stream.codec_name, stream.wire_codec);
        println!("  时间基       : {}", stream.time_base);
        if let (Some(w), Some(h)) = (stream.width, stream.height) {
            println!("  分辨率       : {w}x{h}");
        }
        if let Some(ref fr) = stream.frame_rate {
            println!("  帧率         : {fr}");
        }
        if let Some(sr) = stream.sample_rate {
            println!("  采样率       : {sr} Hz");
        }
        if let Some(ch) = stream.channels {
            println!("  声道数       : {ch}");
        }
        if let Some(fs) = stream.frame_size {
            println!("  帧长         : {fs}");
        }
        println!("  帧数         : {}", stream.nb_frames);
        println!("[/STREAM]");
        println!();
    }
}

/// 文本输出: 帧列表
fn print_frames_text(frames: &[FrameInfo]) {
    println!("[FRAMES]");
    for frame in frames {
        let pts = frame
            .pts
            .map_or_else(|| "N/A".to_string(), |pts| pts.to_string());
        println!(
            "  {:5} size={:<8} dts={:<12} pts={:<12} t={:.3}s",
            frame.codec_type, frame.size, frame.dts, pts, frame.dts_time
        );
    }
    println!("[/FRAMES]");
    println!();
}

/// 打印版本横幅
fn print_banner() {
    println!(
        "kuai-probe 版本 {} -- 块转储文件探测工具",
        kuai::version()
    );
    println!();
    println!("用法: kuai-probe [选项] <转储文件>");
    println!();
    println!("选项:");
    println!("  --media <av|video|audio>  接受的媒体类型 (默认 av)");
    println!("  --show-frames             显示每一帧的信息");
    println!("  --json                    以 JSON 格式输出");
    println!("  -q, --quiet               静默模式");
    println!("  -v, -vv                   提高日志详细程度");
    println!();
    println!("使用 --help 查看完整用法.");
}
