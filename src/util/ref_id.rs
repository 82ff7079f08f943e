use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Reference whose identity (for equality and hashing) is the address it points to, not the
/// contents behind it.
///
/// Two instructions with the same opcode and operand are still different branch targets.
pub struct RefId<'a, T: ?Sized>(pub &'a T);

impl<'a, T: ?Sized> Clone for RefId<'a, T> {
    fn clone(&self) -> Self {
        RefId(self.0)
    }
}

impl<'a, T: ?Sized> Copy for RefId<'a, T> {}

impl<'a, T: ?Sized> Hash for RefId<'a, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state)
    }
}

impl<'a, 'b, T: ?Sized> PartialEq<RefId<'b, T>> for RefId<'a, T> {
    fn eq(&self, other: &RefId<'b, T>) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'a, T: ?Sized> Eq for RefId<'a, T> {}

impl<'a, T: ?Sized> Deref for RefId<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

impl<'a, T: ?Sized> fmt::Debug for RefId<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefId({:p})", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_is_by_address() {
        let a = 1u32;
        let b = 1u32;
        assert_eq!(RefId(&a), RefId(&a));
        assert_ne!(RefId(&a), RefId(&b));
        assert_eq!(*RefId(&b), 1);
    }
}
