//! 进程级注册表初始化
//!
//! 全局注册表每个进程只能初始化一次，因此单独放在一个测试二进制中

use txcore::{
    domain::{registry, ChainParameters},
    error::RegistryError,
};

#[test]
fn test_initialize_once_then_reject() {
    let custom = ChainParameters::new(
        "custom-main",
        "Custom Signed Message:\n",
        vec![0x3f],
        ["timestamped-tx"],
        30,
    )
    .unwrap();

    let global = registry::initialize(vec![custom]).unwrap();
    assert!(global.contains("btc-main"));
    assert!(global.contains("custom-main"));
    assert!(registry::resolve("CUSTOM-MAIN")
        .unwrap()
        .uses_timestamped_transactions());

    // 之后的初始化一律拒绝，已安装的表保持不变
    assert_eq!(
        registry::initialize(Vec::new()).unwrap_err(),
        RegistryError::AlreadyInitialized
    );
    assert!(std::ptr::eq(registry::global(), global));
    assert_eq!(
        registry::resolve("unknown-chain").unwrap_err(),
        RegistryError::UnknownChain("unknown-chain".to_string())
    );
}
