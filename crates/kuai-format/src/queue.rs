//! 投递队列.
//!
//! 解块器为视频和音频各维护一个队列和一个长期运行的投递线程.
//! 队列为空时投递线程在条件变量上阻塞; 关闭标志由两个队列共享,
//! 置位后投递线程丢弃剩余帧并退出, 正在进行的交付会完成.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use kuai_codec::Packet;
use kuai_core::{KuaiResult, MediaType};
use log::{debug, trace};

use crate::sink::FrameSink;

struct QueueState {
    frames: VecDeque<Packet>,
    /// 投递线程正在交付一帧
    busy: bool,
}

/// 单一媒体类型的投递队列
pub struct DeliveryQueue {
    state: Mutex<QueueState>,
    /// 有新帧或需要退出
    ready: Condvar,
    /// 队列已排空且没有正在交付的帧
    idle: Condvar,
    shutdown: Arc<AtomicBool>,
}

impl DeliveryQueue {
    /// 创建队列, `shutdown` 为共享的关闭标志
    pub fn new(shutdown: Arc<AtomicBool>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                frames: VecDeque::new(),
                busy: false,
            }),
            ready: Condvar::new(),
            idle: Condvar::new(),
            shutdown,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// 按顺序追加一批帧
    ///
    /// 先预留空间, 分配失败时一帧也不入队.
    pub fn push(&self, frames: Vec<Packet>) -> KuaiResult<()> {
        let mut state = self.lock();
        state.frames.try_reserve(frames.len())?;
        state.frames.extend(frames);
        self.ready.notify_one();
        Ok(())
    }

    /// 取出下一帧, 队列为空时阻塞
    ///
    /// 关闭后丢弃剩余帧并返回 `None`.
    pub fn pop(&self) -> Option<Packet> {
        let mut state = self.lock();
        loop {
            if self.is_shutdown() {
                if !state.frames.is_empty() {
                    debug!("关闭投递队列, 丢弃 {} 帧", state.frames.len());
                    state.frames.clear();
                }
                state.busy = false;
                self.idle.notify_all();
                return None;
            }
            if let Some(packet) = state.frames.pop_front() {
                state.busy = true;
                return Some(packet);
            }
            state = self.ready.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// 投递线程交付完一帧后调用
    pub fn done(&self) {
        let mut state = self.lock();
        state.busy = false;
        if state.frames.is_empty() {
            self.idle.notify_all();
        }
    }

    /// 阻塞直到队列排空且没有正在交付的帧 (或已关闭)
    pub fn wait_idle(&self) {
        let mut state = self.lock();
        while (state.busy || !state.frames.is_empty()) && !self.is_shutdown() {
            state = self.idle.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// 唤醒所有等待者
    ///
    /// 先持有锁再通知, 避免投递线程检查标志后、进入等待前错过唤醒.
    pub fn wake_all(&self) {
        let _state = self.lock();
        self.ready.notify_all();
        self.idle.notify_all();
    }

    /// 队列中待交付的帧数
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 启动投递线程
///
/// 线程循环从队列取帧交给接收端, 队列关闭后退出.
pub fn spawn_worker(
    media_type: MediaType,
    queue: Arc<DeliveryQueue>,
    sink: Arc<dyn FrameSink>,
) -> KuaiResult<JoinHandle<()>> {
    let name = match media_type {
        MediaType::Video => "kuai-video",
        MediaType::Audio => "kuai-audio",
        MediaType::Data => "kuai-data",
    };
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            debug!("{name} 投递线程启动");
            while let Some(packet) = queue.pop() {
                trace!("{name} 交付 {} 字节, dts={}", packet.size(), packet.dts);
                sink.deliver(media_type, packet);
                queue.done();
            }
            debug!("{name} 投递线程退出");
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;

    fn packet(tag: u8) -> Packet {
        Packet::from_data(vec![tag])
    }

    #[test]
    fn test_队列先进先出() {
        let queue = DeliveryQueue::new(Arc::new(AtomicBool::new(false)));
        queue.push(vec![packet(1), packet(2)]).unwrap();
        queue.push(vec![packet(3)]).unwrap();
        assert_eq!(queue.len(), 3);
        let order: Vec<u8> = (0..3).map(|_| queue.pop().unwrap().data[0]).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_关闭后丢弃剩余帧() {
        let flag = Arc::new(AtomicBool::new(false));
        let queue = DeliveryQueue::new(Arc::clone(&flag));
        queue.push(vec![packet(1)]).unwrap();
        flag.store(true, Ordering::Release);
        queue.wake_all();
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_投递线程() {
        let flag = Arc::new(AtomicBool::new(false));
        let queue = Arc::new(DeliveryQueue::new(Arc::clone(&flag)));
        let sink = Arc::new(CollectingSink::new());
        let handle = spawn_worker(MediaType::Audio, Arc::clone(&queue), sink.clone()).unwrap();
        queue.push((0..10).map(packet).collect()).unwrap();
        queue.wait_idle();
        let got: Vec<u8> = sink.frames(MediaType::Audio).iter().map(|p| p.data[0]).collect();
        assert_eq!(got, (0..10).collect::<Vec<u8>>());

        flag.store(true, Ordering::Release);
        queue.wake_all();
        handle.join().unwrap();
    }
}
