//! Shared, unsynchronized mutable access for HOGWILD style optimization.  Threads read and write
//! the wrapped value concurrently with no locking; updates are sparse so collisions are rare and
//! tolerated.  Callers must not hand out overlapping mutable slices within a single thread.
use std::cell::UnsafeCell;
use std::ops::Deref;

pub struct Hogwild<T>(UnsafeCell<T>);

impl<T> Hogwild<T> {
    pub fn new(target: T) -> Hogwild<T> {
        Hogwild(UnsafeCell::new(target))
    }

    #[allow(clippy::mut_from_ref)]
    pub fn get(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }
}

impl<T> Deref for Hogwild<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.0.get() }
    }
}

unsafe impl<T: Send> Send for Hogwild<T> {}
unsafe impl<T: Send> Sync for Hogwild<T> {}
