//! 块转储文件.
//!
//! 把块按顺序存储为 `[长度: u32 大端][块数据]` 记录, 用于离线检查和测试.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::Bytes;
use kuai_core::{KuaiError, KuaiResult};

/// 块转储写入器
pub struct ChunkWriter<W: Write> {
    inner: W,
    count: usize,
}

impl<W: Write> ChunkWriter<W> {
    /// 创建写入器
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// 追加一个块
    pub fn write_chunk(&mut self, chunk: &[u8]) -> KuaiResult<()> {
        let len = u32::try_from(chunk.len())
            .map_err(|_| KuaiError::InvalidArgument(format!("块长度 {} 超出 32 位", chunk.len())))?;
        self.inner.write_u32::<BigEndian>(len)?;
        self.inner.write_all(chunk)?;
        self.count += 1;
        Ok(())
    }

    /// 已写入的块数
    pub fn count(&self) -> usize {
        self.count
    }

    /// 刷新并取回底层写入器
    pub fn finish(mut self) -> KuaiResult<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// 块转储读取器
pub struct ChunkReader<R: Read> {
    inner: R,
}

impl<R: Read> ChunkReader<R> {
    /// 创建读取器
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// 读取下一个块, 文件正常结束时返回 `None`
    ///
    /// 记录不完整时返回 `InvalidData`.
    pub fn read_chunk(&mut self) -> KuaiResult<Option<Bytes>> {
        let mut len_buf = [0u8; 4];
        let got = read_full(&mut self.inner, &mut len_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < len_buf.len() {
            return Err(KuaiError::InvalidData(format!("记录长度字段不完整: {got} 字节")));
        }
        let len = BigEndian::read_u32(&len_buf);
        // 缓冲区随实际读到的数据增长, 不按长度字段预分配
        let mut data = Vec::new();
        let got = (&mut self.inner).take(u64::from(len)).read_to_end(&mut data)?;
        if got < len as usize {
            return Err(KuaiError::InvalidData(format!(
                "记录不完整: 需要 {len} 字节, 实际 {got}"
            )));
        }
        Ok(Some(Bytes::from(data)))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = KuaiResult<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_chunk().transpose()
    }
}

/// 尽量读满 `buf`, 返回实际读取的字节数 (小于 `buf.len()` 表示到达末尾)
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_转储读写() {
        let mut writer = ChunkWriter::new(Vec::new());
        writer.write_chunk(&[1, 2, 3]).unwrap();
        writer.write_chunk(&[]).unwrap();
        assert_eq!(writer.count(), 2);
        let data = writer.finish().unwrap();
        assert_eq!(&data[..7], &[0, 0, 0, 3, 1, 2, 3]);

        let chunks: Vec<Bytes> = ChunkReader::new(Cursor::new(data))
            .collect::<KuaiResult<_>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref(), &[1, 2, 3]);
        assert!(chunks[1].is_empty());
    }

    #[test]
    fn test_记录不完整() {
        let mut reader = ChunkReader::new(Cursor::new(vec![0u8, 0]));
        assert!(matches!(reader.read_chunk(), Err(KuaiError::InvalidData(_))));
        let mut reader = ChunkReader::new(Cursor::new(vec![0u8, 0, 0, 5, 1, 2]));
        assert!(matches!(reader.read_chunk(), Err(KuaiError::InvalidData(_))));
        let mut reader = ChunkReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_chunk().unwrap().is_none());
    }

    #[test]
    fn test_长度字段损坏() {
        let mut reader = ChunkReader::new(Cursor::new(vec![0xFFu8, 0xFF, 0xFF, 0xFF, 1, 2, 3]));
        assert!(matches!(reader.read_chunk(), Err(KuaiError::InvalidData(_))));
    }
}
