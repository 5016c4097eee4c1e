//! txcore 主入口
//!
//! 用法:
//!   txcore <request.json>   构建交易（`-` 表示从标准输入读取），结果以 JSON 输出
//!   txcore chains           列出已注册的链参数

use std::io::Read;

use anyhow::{Context, Result};
use txcore::{
    config::Config,
    domain::{registry, BuildRequestSpec},
    infrastructure::logging,
    service::AsyncTaskRunner,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置（CONFIG_PATH 指向的文件优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 3. 初始化日志
    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // 4. 初始化链参数注册表
    let registry = registry::initialize(config.chains.clone())
        .context("Failed to initialize parameter registry")?;
    if let Err(problems) = registry.validate() {
        for problem in &problems {
            tracing::warn!(problem = %problem, "chain parameter check");
        }
    }

    let arg = std::env::args()
        .nth(1)
        .context("usage: txcore <request.json | -> | txcore chains")?;

    if arg == "chains" {
        let chains: Vec<_> = registry.list().iter().map(|p| p.as_ref().clone()).collect();
        println!("{}", serde_json::to_string_pretty(&chains)?);
        return Ok(());
    }

    let input = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&arg)
            .with_context(|| format!("Failed to read request file: {}", arg))?
    };

    let spec: BuildRequestSpec =
        serde_json::from_str(&input).context("Failed to parse build request JSON")?;
    let request = spec
        .into_request(registry)
        .context("Failed to resolve chain for build request")?;

    // 5. 提交并等待结果
    let runner = AsyncTaskRunner::from_config(&config);
    let request_id = request.request_id;
    tracing::info!(%request_id, "submitting build request");

    match runner.submit_and_wait(request).await {
        Ok(tx) => {
            println!("{}", serde_json::to_string_pretty(&tx)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_body())?);
            tracing::error!(%request_id, code = e.code().as_str(), "build failed");
            std::process::exit(1);
        }
    }
}
