//! 描述符数量上限。
//!
//! # 模块定位（Why）
//! - 内核对单次 vectored IO 可接受的描述符数量有硬上限（Linux 为 `UIO_MAXIOV`，即 1024），
//!   超出时 `writev` 直接返回 `EINVAL`；构建器必须在组装阶段就遵守该上限。
//! - 上限是进程级常量而非实例参数，因此以类型（[`IovLimit`]）而非字段表达，
//!   同一构建器类型的所有实例共享同一上限。
//!
//! # 设计要点（How）
//! - [`HostIovLimit`]：首次访问时通过 `sysconf(_SC_IOV_MAX)` 查询主机，结果缓存在 `OnceLock` 中；
//!   查询失败或主机未声明上限时退化为 [`UIO_MAXIOV`]，随后应用 [`IovecConfig`] 的覆盖值。
//! - [`FixedIovLimit`]：编译期常量上限，`N == 0` 在编译期拒绝。

use std::sync::OnceLock;

use crate::{config::IovecConfig, error::ConfigError};

/// Linux 内核的 vectored IO 描述符上限，亦作为无法查询主机时的退化值。
pub const UIO_MAXIOV: usize = 1024;

/// 类型级的描述符数量上限。
///
/// # 契约（Contract）
/// - 返回值必须不小于 1，且在进程生命周期内保持不变。
pub trait IovLimit {
    /// 单张描述符表允许的最大描述符数量。
    fn max_iovs() -> usize;
}

/// 主机上限，进程内解析一次。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostIovLimit;

impl IovLimit for HostIovLimit {
    fn max_iovs() -> usize {
        max_iovs()
    }
}

/// 编译期固定上限。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedIovLimit<const N: usize>;

impl<const N: usize> IovLimit for FixedIovLimit<N> {
    fn max_iovs() -> usize {
        const { assert!(N > 0, "描述符上限必须至少为 1") };
        N
    }
}

static MAX_IOVS: OnceLock<usize> = OnceLock::new();

/// 返回当前进程生效的描述符上限。
pub fn max_iovs() -> usize {
    *MAX_IOVS.get_or_init(resolve_max_iovs)
}

fn resolve_max_iovs() -> usize {
    resolve_with(query_host_limit(), IovecConfig::from_env())
}

/// 合并主机查询结果与覆盖配置：主机未声明上限时退化为 [`UIO_MAXIOV`]，
/// 非法覆盖值记录告警后忽略，合法覆盖值只能调低上限。
fn resolve_with(host: Option<usize>, config: Result<IovecConfig, ConfigError>) -> usize {
    let (host, source) = match host {
        Some(host) => (host, "sysconf"),
        None => (UIO_MAXIOV, "fallback"),
    };
    let config = match config {
        Ok(config) => config,
        Err(error) => {
            tracing::warn!(%error, "忽略非法的描述符上限覆盖值");
            IovecConfig::default()
        }
    };
    let effective = config.apply(host);
    tracing::debug!(host, effective, source, "已解析 vectored IO 描述符上限");
    effective
}

#[cfg(unix)]
fn query_host_limit() -> Option<usize> {
    use nix::unistd::{SysconfVar, sysconf};

    match sysconf(SysconfVar::IOV_MAX) {
        Ok(Some(limit)) => usize::try_from(limit).ok().filter(|limit| *limit > 0),
        Ok(None) => None,
        Err(errno) => {
            tracing::debug!(%errno, "sysconf(_SC_IOV_MAX) 查询失败");
            None
        }
    }
}

#[cfg(not(unix))]
fn query_host_limit() -> Option<usize> {
    None
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn fixed_limit_reports_its_parameter() {
        assert_eq!(FixedIovLimit::<1>::max_iovs(), 1);
        assert_eq!(FixedIovLimit::<8>::max_iovs(), 8);
    }

    #[test]
    fn host_limit_is_positive_stable_and_shared() {
        let first = HostIovLimit::max_iovs();
        assert!(first >= 1);
        assert_eq!(first, max_iovs());
        assert_eq!(first, HostIovLimit::max_iovs());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_host_query_matches_kernel_constant() {
        assert_eq!(query_host_limit(), Some(UIO_MAXIOV));
    }

    #[traced_test]
    #[test]
    fn invalid_override_is_logged_and_ignored() {
        let config = IovecConfig::from_lookup(|_| Some("lots".to_owned()));
        assert!(config.is_err());
        assert_eq!(resolve_with(Some(512), config), 512);
        assert!(logs_contain("忽略非法的描述符上限覆盖值"));
        assert!(logs_contain("lots"));
    }

    #[test]
    fn valid_override_lowers_but_never_raises_host_limit() {
        let sixteen = NonZeroUsize::new(16).expect("非零");
        let config = IovecConfig::with_override(sixteen);
        assert_eq!(resolve_with(Some(1024), Ok(config)), 16);
        assert_eq!(resolve_with(Some(8), Ok(config)), 8);
    }

    #[traced_test]
    #[test]
    fn missing_host_limit_falls_back_to_uio_maxiov() {
        assert_eq!(resolve_with(None, Ok(IovecConfig::default())), UIO_MAXIOV);
        assert!(logs_contain("fallback"));

        let four = NonZeroUsize::new(4).expect("非零");
        assert_eq!(resolve_with(None, Ok(IovecConfig::with_override(four))), 4);
    }
}
