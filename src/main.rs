// ==========================================
// 冷链仓储入库收货系统 - 终端模拟入口
// ==========================================
// 从标准输入逐行读取扫码内容，经分发器处理后打印应答，
// 模拟 RF 手持终端的逐字段交互; 结算队列后台消费
// ==========================================

use std::io::{BufRead, Write};

use cold_chain_receiving::api::ScanRequest;
use cold_chain_receiving::app::{get_default_db_path, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    cold_chain_receiving::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", cold_chain_receiving::APP_NAME);
    tracing::info!("系统版本: {}", cold_chain_receiving::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(&db_path)?;
    let worker = state.close_queue.spawn_worker();

    let operator = std::env::var("RF_OPERATOR").unwrap_or_else(|_| "OP01".to_string());
    let terminal = std::env::var("RF_TERMINAL").unwrap_or_default();
    println!("操作员: {} (F5=退出 F4=跳过批号 F2=跳过日期)", operator);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\r', '\n']).to_string();

        let dispatcher = state.dispatcher.clone();
        let op = operator.clone();
        let term = terminal.clone();
        let response = tokio::task::spawn_blocking(move || {
            dispatcher.handle(&op, &term, &ScanRequest::new(input))
        })
        .await?;

        match response {
            Ok(resp) => {
                if let Some(err) = &resp.error {
                    println!("!! {}", err);
                }
                if let Some(info) = &resp.info {
                    println!("-- {}", info);
                }
                if let Some(payload) = &resp.payload {
                    println!("   {}", payload);
                }
                let keys: Vec<String> = resp
                    .function_keys
                    .iter()
                    .map(|k| k.label())
                    .collect();
                println!("[{}] {}", resp.step, keys.join("~"));
            }
            Err(e) => {
                tracing::error!(error = %e, "扫码处理失败");
                println!("!! {}", e);
            }
        }
    }

    state.close_queue.request_shutdown();
    let _ = worker.await;
    Ok(())
}
