use std::{borrow::Cow, io::IoSlice, marker::PhantomData};

use smallvec::SmallVec;

use crate::{
    limit::{HostIovLimit, IovLimit},
    table::{INLINE_IOVS, IoSliceVec, IovecTable},
};

/// 构建器的填充状态。
///
/// - `Filling`：描述符数量尚未到达上限，每个缓冲独占一个借用描述符；
/// - `Saturated`：最后一个槽位由 `overflow` 承载，后续缓冲全部合并进来。
///   `overflow` 初始借用触发饱和的缓冲，首次合并时复制为自有内存。
#[derive(Debug)]
enum FillState<'a> {
    Filling,
    Saturated { overflow: Cow<'a, [u8]> },
}

/// 为单次 vectored IO 组装有界描述符表。
///
/// # 设计初衷（Why）
/// - 内核限制单次 `writev` 的描述符数量，而上层一次写出的分片数不受控；
///   超出上限的分片必须被合并，且合并过程不得触碰调用方仍持有的内存。
///
/// # 行为描述（How）
/// - 未饱和时，[`add`](Self::add) 按调用顺序追加借用描述符；
/// - 描述符数量恰好到达上限时，最后一个缓冲转入溢出槽；
/// - 饱和后，新缓冲的字节被拷贝进溢出槽，溢出槽首次增长时分配新内存，
///   因此不会在调用方缓冲之后原地写入；
/// - [`build`](Self::build) 每次都从溢出槽的当前状态重建末尾描述符，不会暴露过期基址。
///
/// # 契约（Contract）
/// - **前置条件**：缓冲以 `&'a [u8]` 借入，调用方在构建器存活期间无法修改它们。
/// - **后置条件**：描述符表按顺序拼接的字节，等于所有非空输入按调用顺序拼接的字节。
/// - `build` 之后仍可继续 `add`（需先释放返回的视图），表会像未调用过 `build` 一样继续增长。
/// - 构建器不支持跨系统调用复用，每次 IO 应使用新实例。
///
/// # 示例
/// ```
/// use spark_iovec::{FixedIovLimit, IovecBuilder};
///
/// let mut builder = IovecBuilder::<FixedIovLimit<2>>::with_limit();
/// builder.add(&[1, 2]);
/// builder.add(&[3]);
/// builder.add(&[]);
/// builder.add(&[4, 5]);
///
/// let table = builder.build();
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.copy_to_vec(), [1, 2, 3, 4, 5]);
/// ```
///
/// 构建器存活期间，调用方无法改写已登记的缓冲：
/// ```compile_fail
/// use spark_iovec::IovecBuilder;
///
/// let mut payload = vec![1u8, 2, 3];
/// let mut builder = IovecBuilder::new();
/// builder.add(&payload);
/// payload.push(4);
/// let _ = builder.build();
/// ```
#[derive(Debug)]
pub struct IovecBuilder<'a, L = HostIovLimit> {
    direct: SmallVec<[&'a [u8]; INLINE_IOVS]>,
    state: FillState<'a>,
    limit: PhantomData<fn() -> L>,
}

impl<'a> IovecBuilder<'a, HostIovLimit> {
    /// 创建使用主机上限的空构建器。
    pub fn new() -> Self {
        Self::with_limit()
    }
}

impl<'a> Default for IovecBuilder<'a, HostIovLimit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, L: IovLimit> IovecBuilder<'a, L> {
    /// 创建使用类型 `L` 所声明上限的空构建器。
    pub fn with_limit() -> Self {
        Self {
            direct: SmallVec::new(),
            state: FillState::Filling,
            limit: PhantomData,
        }
    }

    /// 当前生效的描述符上限。
    pub fn max_iovs(&self) -> usize {
        L::max_iovs()
    }

    /// 登记一个待写出的缓冲。零长度缓冲不会产生描述符。
    pub fn add(&mut self, buf: &'a [u8]) {
        if buf.is_empty() {
            return;
        }

        if let FillState::Saturated { overflow } = &mut self.state {
            match *overflow {
                Cow::Owned(ref mut bytes) => bytes.extend_from_slice(buf),
                Cow::Borrowed(seed) => {
                    let mut bytes = Vec::with_capacity(seed.len() + buf.len());
                    bytes.extend_from_slice(seed);
                    bytes.extend_from_slice(buf);
                    tracing::trace!(len = bytes.len(), "溢出槽首次增长，已复制为自有内存");
                    *overflow = Cow::Owned(bytes);
                }
            }
            return;
        }

        let max_iovs = L::max_iovs();
        if self.direct.len() + 1 < max_iovs {
            self.direct.push(buf);
            return;
        }

        // 该缓冲填满最后一个槽位，直接作为溢出槽的种子。
        self.state = FillState::Saturated {
            overflow: Cow::Borrowed(buf),
        };
        tracing::trace!(max_iovs, "描述符表已饱和，后续缓冲将合并进末尾描述符");
    }

    /// 返回当前描述符表视图。
    ///
    /// 无副作用；在下一次 `add` 之前重复调用得到相同的表。
    pub fn build(&self) -> IovecTable<'_> {
        let mut slices = IoSliceVec::new();
        slices.extend(self.direct.iter().map(|buf| IoSlice::new(buf)));
        if let FillState::Saturated { overflow } = &self.state {
            slices.push(IoSlice::new(overflow));
        }
        IovecTable::new(slices)
    }

    /// 当前描述符数量。
    pub fn len(&self) -> usize {
        self.direct.len() + usize::from(self.is_saturated())
    }

    /// 尚未登记任何非空缓冲。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 描述符数量是否已到达上限。
    pub fn is_saturated(&self) -> bool {
        matches!(self.state, FillState::Saturated { .. })
    }

    /// 描述符表引用的字节总数，供下层判断 vectored 写入是否被截短。
    pub fn total_len(&self) -> usize {
        let direct: usize = self.direct.iter().map(|buf| buf.len()).sum();
        match &self.state {
            FillState::Filling => direct,
            FillState::Saturated { overflow } => direct + overflow.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::limit::FixedIovLimit;

    #[test]
    fn saturation_moves_last_buffer_into_borrowed_seed() {
        let a = [1u8];
        let b = [2u8, 3];
        let mut builder = IovecBuilder::<FixedIovLimit<2>>::with_limit();
        builder.add(&a);
        assert!(!builder.is_saturated());
        builder.add(&b);

        assert!(builder.is_saturated());
        assert_eq!(builder.direct.as_slice(), [&a[..]]);
        match &builder.state {
            FillState::Saturated {
                overflow: Cow::Borrowed(seed),
            } => assert_eq!(seed.as_ptr(), b.as_ptr()),
            other => panic!("饱和后应借用触发缓冲，实际为 {other:?}"),
        }
    }

    #[test]
    fn first_merge_promotes_seed_to_owned_storage() {
        let seed = [7u8; 4];
        let tail = [8u8; 3];
        let mut builder = IovecBuilder::<FixedIovLimit<1>>::with_limit();
        builder.add(&seed);
        builder.add(&tail);

        match &builder.state {
            FillState::Saturated {
                overflow: Cow::Owned(bytes),
            } => {
                assert_eq!(bytes.as_slice(), [7, 7, 7, 7, 8, 8, 8]);
                assert_ne!(bytes.as_ptr(), seed.as_ptr());
            }
            other => panic!("合并后溢出槽应为自有内存，实际为 {other:?}"),
        }
        assert_eq!(builder.total_len(), 7);
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn empty_buffers_do_not_touch_saturated_state() {
        let seed = [1u8, 2];
        let mut builder = IovecBuilder::<FixedIovLimit<1>>::with_limit();
        builder.add(&seed);
        builder.add(&[]);
        assert!(matches!(
            builder.state,
            FillState::Saturated {
                overflow: Cow::Borrowed(_)
            }
        ));
    }

    #[traced_test]
    #[test]
    fn saturation_and_promotion_are_traced() {
        let mut builder = IovecBuilder::<FixedIovLimit<1>>::with_limit();
        builder.add(b"head");
        assert!(logs_contain("描述符表已饱和"));
        builder.add(b"tail");
        assert!(logs_contain("溢出槽首次增长"));
    }
}
