use std::num::NonZeroUsize;

use crate::error::ConfigError;

/// 覆盖主机描述符上限的环境变量名。
pub const MAX_IOVS_ENV: &str = "SPARK_IOVEC_MAX";

/// 进程级描述符上限配置。
///
/// # 设计初衷（Why）
/// - 主机上限由内核决定，但压测或排障时常需要人为调低上限，
///   以便在常规流量下也能走到溢出合并路径。
/// - 覆盖值只能调低、不能调高：超过内核上限的描述符表会被 `writev` 直接拒绝。
///
/// # 契约定义（What）
/// - `max_iovs_override` 为 `None` 时不做任何调整。
/// - [`IovecConfig::apply`] 返回 `min(host, override)`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IovecConfig {
    max_iovs_override: Option<NonZeroUsize>,
}

impl IovecConfig {
    /// 构造带覆盖值的配置。
    pub fn with_override(max_iovs: NonZeroUsize) -> Self {
        Self {
            max_iovs_override: Some(max_iovs),
        }
    }

    /// 读取 [`MAX_IOVS_ENV`]。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值查找函数解析配置，便于在测试中替换环境变量来源。
    ///
    /// # 契约说明
    /// - 变量缺失或仅含空白：返回默认配置；
    /// - 非整数：[`ConfigError::InvalidOverride`]；
    /// - 为 0：[`ConfigError::ZeroOverride`]。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let Some(raw) = lookup(MAX_IOVS_ENV) else {
            return Ok(Self::default());
        };
        let value = raw.trim();
        if value.is_empty() {
            return Ok(Self::default());
        }
        let parsed = value
            .parse::<usize>()
            .map_err(|source| ConfigError::InvalidOverride {
                value: value.to_owned(),
                source,
            })?;
        let max_iovs = NonZeroUsize::new(parsed).ok_or(ConfigError::ZeroOverride)?;
        Ok(Self::with_override(max_iovs))
    }

    /// 返回覆盖值（若存在）。
    pub fn max_iovs_override(&self) -> Option<NonZeroUsize> {
        self.max_iovs_override
    }

    /// 将覆盖值作用于主机上限。
    pub fn apply(&self, host: usize) -> usize {
        match self.max_iovs_override {
            Some(limit) => host.min(limit.get()),
            None => host,
        }
    }
}
