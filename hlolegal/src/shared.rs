use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use std::sync::Arc;

/// A convenience type alias for [Arc<RwLock<T>>].
///
/// IR nodes such as operations, blocks, regions, and values are shared via
/// this type. Operands point to the [Value](crate::ir::Value) that defines
/// them, so identity (see [Arc::ptr_eq]) is what makes two operands refer to
/// the same SSA value.
///
/// # Example
///
/// ```
/// use hlolegal::shared::Shared;
/// use hlolegal::shared::SharedExt;
///
/// let lock: Shared<i32> = Shared::new(42.into());
/// assert_eq!(*lock.rd(), 42);
/// ```
pub type Shared<T> = Arc<RwLock<T>>;

/// A convenience trait around [RwLock].
///
/// The legalization runs single-threaded, so a lock that cannot be taken
/// immediately means that the same node is already borrowed further up the
/// stack. That is a bug in the caller, hence these methods panic instead of
/// blocking forever.
pub trait SharedExt<T: ?Sized> {
    /// Convenience method for reading.
    fn rd(&self) -> RwLockReadGuard<'_, T>;
    /// Convenience method for writing.
    fn wr(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T: ?Sized> SharedExt<T> for Shared<T> {
    fn rd(&self) -> RwLockReadGuard<'_, T> {
        match self.try_read() {
            Some(guard) => guard,
            None => panic!("IR node is already locked for writing"),
        }
    }
    fn wr(&self) -> RwLockWriteGuard<'_, T> {
        match self.try_write() {
            Some(guard) => guard,
            None => panic!("IR node is already locked"),
        }
    }
}

#[test]
fn test_shared() {
    let lock: Shared<i32> = Shared::new(42.into());
    assert_eq!(*lock.rd(), 42);
    *lock.wr() = 43;
    assert_eq!(*lock.rd(), 43);
}
