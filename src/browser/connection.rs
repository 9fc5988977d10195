use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到浏览器并获取页面
///
/// 附着到调试端口上的已有浏览器；如果给了目标 URL 就优先复用
/// 已打开的匹配页面，否则新建页面导航过去。
pub async fn connect_to_browser_and_page(
    port: u16,
    target_url: Option<&str>,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    // 优先复用已经打开目标页面的标签页
    if let Some(url) = target_url {
        for p in pages.iter() {
            if let Ok(Some(page_url)) = p.url().await {
                if page_url.starts_with(url) {
                    info!("✓ 复用已打开的页面: {}", page_url);
                    return Ok((browser, p.clone()));
                }
            }
        }
        debug!("未找到匹配的页面，将创建新页面");
    }

    // 没有匹配页面时新建
    let new_page = if let Some(url) = target_url {
        debug!("创建新页面并导航到: {}", url);
        let page = browser.new_page("about:blank").await.map_err(|e| {
            error!("创建新页面失败: {}", e);
            e
        })?;
        page.goto(url).await.map_err(|e| {
            error!("导航到 {} 失败: {}", url, e);
            e
        })?;
        info!("已导航到: {}", url);
        page
    } else {
        // 未指定 URL 时附着到当前活动页面
        match pages.into_iter().next() {
            Some(page) => {
                info!("✓ 附着到当前页面");
                page
            }
            None => {
                debug!("浏览器没有打开的页面，创建空白页面");
                browser.new_page("about:blank").await.map_err(|e| {
                    error!("创建空白页面失败: {}", e);
                    e
                })?
            }
        }
    };

    Ok((browser, new_page))
}
