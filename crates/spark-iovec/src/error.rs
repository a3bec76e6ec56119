use std::num::ParseIntError;

use thiserror::Error;

/// 描述符上限配置层的错误类型。
///
/// # Why
/// - 构建器本身没有可恢复的错误路径，唯一需要类型化表达的是环境变量覆盖值非法的情况，
///   便于调用方在启动期决定是直接失败还是忽略覆盖。
///
/// # What
/// - `InvalidOverride`：覆盖值不是无符号整数，保留原始 `ParseIntError`。
/// - `ZeroOverride`：覆盖值为 0，任何 vectored IO 都至少需要一个描述符。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 覆盖值无法解析为无符号整数。
    #[error("描述符上限覆盖值 `{value}` 非法: {source}")]
    InvalidOverride {
        value: String,
        source: ParseIntError,
    },
    /// 覆盖值为 0。
    #[error("描述符上限覆盖值不能为 0")]
    ZeroOverride,
}
