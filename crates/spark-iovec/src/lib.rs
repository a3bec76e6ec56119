#![doc = r#"
# spark-iovec

## 设计动机（Why）
- **定位**：为一次 `readv`/`writev` 类 vectored IO 组装有界的 `(base, len)` 描述符表，
  在主机上限（`IOV_MAX`）约束下保证调用方传入的缓冲永远不会被改写。
- **架构角色**：位于传输实现层之下的纯内存步骤；本 crate 不执行任何 IO，
  构建结果原样交给 `Write::write_vectored` 或 `nix::sys::uio::writev` 等原语。
- **核心性质**：描述符数量超过上限时，多出的缓冲被透明合并进末尾描述符，
  字节序列与调用顺序完全一致，溢出只体现在描述符数量上。

## 核心契约（What）
- [`IovecBuilder::add`]：零长度缓冲为空操作；未饱和时按调用顺序追加借用描述符，
  饱和后将字节拷贝进构建器自有的溢出缓冲。
- [`IovecBuilder::build`]：返回 [`IovecTable`] 视图，描述符数量不超过 [`IovLimit::max_iovs`]。
- [`max_iovs`]：进程级只读上限，首次访问时从主机解析，可被 `SPARK_IOVEC_MAX` 调低。

## 实现策略（How）
- **两态显式化**：`Filling`/`Saturated` 以枚举承载，避免在每次 `add` 时反复比较长度推断模式。
- **写时复制**：溢出缓冲以 `Cow<'a, [u8]>` 持有，首次合并时才分配新内存，
  因此增长永远不可能写入调用方仍持有的内存。
- **内联存储**：描述符以 `SmallVec` 内联保存前 [`INLINE_IOVS`] 个，常见的小表组装与构建均不触碰堆。
- **借用即契约**：缓冲以 `&'a [u8]` 传入，调用方在构建器存活期间无法取得可变引用。

## 风险与考量（Trade-offs）
- 溢出路径需要一次拷贝；上限通常为 1024，常规场景不会触发。
- 分配失败沿用全局分配器的终止语义，不向调用方返回类型化错误。
"#]

mod builder;
mod config;
mod error;
mod limit;
mod table;

pub use builder::IovecBuilder;
pub use config::{IovecConfig, MAX_IOVS_ENV};
pub use error::ConfigError;
pub use limit::{FixedIovLimit, HostIovLimit, IovLimit, UIO_MAXIOV, max_iovs};
pub use table::{INLINE_IOVS, IovecTable};
