//! 有界等待原语
//!
//! 把"轮询页面直到条件满足"收拢成一个带超时的异步原语，
//! 返回 Option 而不是错误：出现与否都是正常结果，由调用方决定后续。

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 反复探测直到得到 Some 或超时
///
/// - `probe`: 一次探测，Some(T) 表示条件满足
/// - `timeout`: 总等待上限
/// - `interval`: 两次探测的间隔
pub async fn wait_for<T, F, Fut>(mut probe: F, timeout: Duration, interval: Duration) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() + interval > deadline {
            return None;
        }
        sleep(interval).await;
    }
}
