use std::{io::IoSlice, ops::Deref};

use smallvec::SmallVec;

/// 描述符内联容量：不超过该数量的描述符表完全存放在栈上，构建时无需堆分配。
pub const INLINE_IOVS: usize = 8;

pub(crate) type IoSliceVec<'b> = SmallVec<[IoSlice<'b>; INLINE_IOVS]>;

/// [`IovecBuilder::build`](crate::IovecBuilder::build) 返回的描述符表视图。
///
/// # What
/// - 按调用顺序排列的 `IoSlice`，数量不超过构建器的上限；
/// - 末尾描述符要么是单个借用缓冲，要么是合并后的溢出缓冲。
///
/// # 契约说明
/// - 视图借用构建器，存活期间构建器不可再 `add`，因此溢出缓冲的基址不会在使用中失效。
/// - 在 Unix 上 `IoSlice` 与 `struct iovec` ABI 兼容，可原样交给 `writev`。
/// - 描述符不超过 [`INLINE_IOVS`] 个时视图不触发堆分配。
#[derive(Debug)]
pub struct IovecTable<'b> {
    slices: IoSliceVec<'b>,
}

impl<'b> IovecTable<'b> {
    pub(crate) fn new(slices: IoSliceVec<'b>) -> Self {
        Self { slices }
    }

    /// 以切片形式访问描述符。
    pub fn as_slices(&self) -> &[IoSlice<'b>] {
        &self.slices
    }

    /// 所有描述符引用的字节总数。
    pub fn total_len(&self) -> usize {
        self.slices.iter().map(|slice| slice.len()).sum()
    }

    /// 原始 `iovec` 数组指针，供直接发起系统调用的下层使用。
    ///
    /// 指针在视图存活期间有效，元素个数等于 `self.len()`。
    #[cfg(unix)]
    pub fn as_raw_iovecs(&self) -> *const nix::libc::iovec {
        // `IoSlice` 在 Unix 上是 `iovec` 的透明包装。
        self.slices.as_ptr().cast()
    }

    /// 按表顺序拼接所有引用的字节。
    pub fn copy_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        for slice in &self.slices {
            out.extend_from_slice(slice);
        }
        out
    }
}

impl<'b> Deref for IovecTable<'b> {
    type Target = [IoSlice<'b>];

    fn deref(&self) -> &Self::Target {
        &self.slices
    }
}
