use core::cell::Cell;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator, Global, Layout};

/// Forwards to the global allocator until its budget of allocations runs out.
///
/// Growing a block counts against the budget too. Used as `&LimitedAllocator` so the
/// containers can clone it.
pub(crate) struct LimitedAllocator {
    budget: Cell<usize>,
    live: Cell<isize>,
}

impl LimitedAllocator {
    pub fn new(budget: usize) -> Self {
        LimitedAllocator {
            budget: Cell::new(budget),
            live: Cell::new(0),
        }
    }

    /// Number of blocks allocated and not yet freed.
    pub fn live_allocations(&self) -> isize {
        self.live.get()
    }

    fn spend(&self, layout: Layout) -> Result<(), AllocError> {
        let budget = self.budget.get();
        if budget == 0 {
            log::debug!("LimitedAllocator: refusing {} bytes", layout.size());
            return Err(AllocError);
        }
        self.budget.set(budget - 1);

        Ok(())
    }
}

unsafe impl Allocator for LimitedAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.spend(layout)?;
        let block = Global.allocate(layout)?;
        self.live.set(self.live.get() + 1);

        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        Global.deallocate(ptr, layout)
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        self.spend(new_layout)?;
        Global.grow(ptr, old_layout, new_layout)
    }
}
