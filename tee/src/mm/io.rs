//! The I/O mapping table: device register windows mapped into a dedicated virtual window.
use crate::{
    debug_ex,
    error::MappingError,
    mm::{
        IoMapper, MappedRegion, MemAreaType, PhysAddr, VirtAddr,
        config::{IO_VA_BASE, IO_VA_SIZE, PAGE_SIZE},
    },
};
use alloc::vec::Vec;
use core::{
    ops::Range,
    sync::atomic::{AtomicBool, Ordering},
};
use spin::RwLock;
use utils::num::{AlignableTo, CheckedAlign};

#[derive(Debug, Clone, Copy)]
struct IoRegion {
    pa: usize,
    va: usize,
    size: usize,
    mtype: MemAreaType,
}

impl IoRegion {
    fn pa_range(&self) -> Range<usize> {
        self.pa..self.pa + self.size
    }
}

struct IoMapInner {
    regions: Vec<IoRegion>,
    next_va: usize,
}

/// Page-granular I/O mappings, allocated bottom-up from a fixed virtual window.
///
/// Mappings are never removed. A request covered by an existing mapping of the same class
/// reuses it; a request overlapping a mapping of the other class is refused.
pub struct IoMapTable {
    enabled: AtomicBool,
    va_window: Range<usize>,
    page_size: usize,
    inner: RwLock<IoMapInner>,
}

impl IoMapTable {
    /// `page_size` must be a power of two; `va_base` must be aligned to it.
    pub const fn new(va_base: usize, va_size: usize, page_size: usize) -> IoMapTable {
        IoMapTable {
            enabled: AtomicBool::new(false),
            va_window: va_base..va_base + va_size,
            page_size,
            inner: RwLock::new(IoMapInner {
                regions: Vec::new(),
                next_va: va_base,
            }),
        }
    }

    /// A table covering the platform I/O window.
    pub const fn with_platform_window() -> IoMapTable {
        IoMapTable::new(IO_VA_BASE, IO_VA_SIZE, PAGE_SIZE)
    }

    /// Mark the MMU as enabled. Mapping requests are accepted from now on.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Number of established mappings.
    pub fn len(&self) -> usize {
        self.inner.read().regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The mapping containing `pa`, whatever its class.
    pub fn find(&self, pa: PhysAddr) -> Option<MappedRegion> {
        let pa = *pa;
        self.inner
            .read()
            .regions
            .iter()
            .find(|r| r.pa_range().contains(&pa))
            .map(|r| MappedRegion {
                va: VirtAddr::from(r.va),
                size: r.size,
                mtype: r.mtype,
            })
    }
}

impl IoMapper for IoMapTable {
    fn mmu_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn add_mapping(
        &self,
        mtype: MemAreaType,
        pa: PhysAddr,
        size: usize,
    ) -> Result<(), MappingError> {
        if size == 0 {
            return Err(MappingError::EmptyRange);
        }
        let pa = *pa;
        let start = pa.align_down(self.page_size);
        let end = pa
            .checked_add(size)
            .and_then(|end| end.checked_align_up(self.page_size))
            .ok_or(MappingError::Overflow)?;

        let mut inner = self.inner.write();
        let mut contained = false;
        for r in inner
            .regions
            .iter()
            .filter(|r| r.pa < end && start < r.pa + r.size)
        {
            if r.mtype != mtype {
                return Err(MappingError::ConflictMapping { existing: r.mtype });
            }
            contained |= r.pa <= start && end <= r.pa + r.size;
        }
        if contained {
            return Ok(());
        }
        if inner
            .regions
            .iter()
            .any(|r| r.pa < end && start < r.pa + r.size)
        {
            return Err(MappingError::PartialOverlap);
        }

        let size = end - start;
        let va = inner.next_va;
        let va_end = va
            .checked_add(size)
            .filter(|va_end| *va_end <= self.va_window.end)
            .ok_or(MappingError::OutOfSpace)?;
        inner.regions.push(IoRegion {
            pa: start,
            va,
            size,
            mtype,
        });
        inner.next_va = va_end;
        debug_ex!(
            "\tMapped {:#x}..{:#x} as {} at VA {:#x}.",
            start,
            end,
            mtype,
            va
        );
        Ok(())
    }

    fn phys_to_virt(&self, pa: PhysAddr, mtype: MemAreaType) -> Option<VirtAddr> {
        let pa = *pa;
        self.inner
            .read()
            .regions
            .iter()
            .find(|r| r.mtype == mtype && r.pa_range().contains(&pa))
            .map(|r| VirtAddr::from(r.va + (pa - r.pa)))
    }
}
