//! 刷新退避曲线测试

use std::time::Duration;

use srv_discovery::RefreshBackoff;

/// 测试：成功路径保持固定间隔
#[test]
fn test_fixed_interval_on_success() {
    let mut backoff = RefreshBackoff::new(Duration::from_secs(30), Duration::from_secs(300));
    assert_eq!(backoff.next_delay(), Duration::from_secs(30));

    backoff.succeed();
    assert_eq!(backoff.next_delay(), Duration::from_secs(30));
}

/// 测试：连续失败时倍增并封顶
#[test]
fn test_doubles_and_caps_on_failure() {
    let mut backoff = RefreshBackoff::new(Duration::from_secs(30), Duration::from_secs(300));

    backoff.fail();
    assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    backoff.fail();
    assert_eq!(backoff.next_delay(), Duration::from_secs(120));
    backoff.fail();
    assert_eq!(backoff.next_delay(), Duration::from_secs(240));
    backoff.fail();
    assert_eq!(backoff.next_delay(), Duration::from_secs(300), "capped");

    // 继续失败不会溢出，也不会超过上限
    for _ in 0..100 {
        backoff.fail();
    }
    assert_eq!(backoff.next_delay(), Duration::from_secs(300));
    assert_eq!(backoff.failures(), 104);
}

/// 测试：成功立即复位
#[test]
fn test_success_resets() {
    let mut backoff = RefreshBackoff::new(Duration::from_secs(30), Duration::from_secs(300));
    backoff.fail();
    backoff.fail();
    assert_eq!(backoff.next_delay(), Duration::from_secs(120));

    backoff.succeed();
    assert_eq!(backoff.failures(), 0);
    assert_eq!(backoff.next_delay(), Duration::from_secs(30));
}

/// 测试：上限不低于基础间隔
#[test]
fn test_default_max_not_below_base() {
    let mut backoff = RefreshBackoff::with_default_max(Duration::from_secs(600));
    backoff.fail();
    assert_eq!(backoff.next_delay(), Duration::from_secs(600));
}
