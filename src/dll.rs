//! Arena-backed doubly linked list.
//!
//! Backing store for the worker-pool queues. Nodes live in a `Vec` of slots and link
//! to each other by index, so every operation is safe code and O(1) apart from the
//! predicate-driven ones, which walk the list once.

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked list with O(1) push/pop at both ends.
///
/// Freed slots are recycled through a free list, so a long-lived queue that
/// pushes and shifts continuously does not grow its arena.
#[derive(Debug)]
pub(crate) struct Dll<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for Dll<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Dll<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn alloc(&mut self, value: T) -> usize {
        let slot = Slot {
            value: Some(value),
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Append at the tail.
    pub(crate) fn push(&mut self, value: T) {
        let idx = self.alloc(value);
        self.slots[idx].prev = self.tail;
        match self.tail {
            Some(tail) => self.slots[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    /// Prepend at the head.
    pub(crate) fn unshift(&mut self, value: T) {
        let idx = self.alloc(value);
        self.slots[idx].next = self.head;
        match self.head {
            Some(head) => self.slots[head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
    }

    /// Remove and return the head.
    pub(crate) fn shift(&mut self) -> Option<T> {
        let head = self.head?;
        Some(self.unlink(head))
    }

    /// Remove and return the tail.
    #[cfg(test)]
    pub(crate) fn pop(&mut self) -> Option<T> {
        let tail = self.tail?;
        Some(self.unlink(tail))
    }

    /// Insert `value` before the first node matching `pred`, or at the tail if none does.
    ///
    /// Nodes that do not match keep their relative order, which is what makes
    /// priority insertion stable among equal priorities.
    pub(crate) fn insert_before<P>(&mut self, value: T, mut pred: P)
    where
        P: FnMut(&T) -> bool,
    {
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let slot = &self.slots[idx];
            if slot.value.as_ref().is_some_and(&mut pred) {
                let prev = slot.prev;
                let new = self.alloc(value);
                self.slots[new].prev = prev;
                self.slots[new].next = Some(idx);
                self.slots[idx].prev = Some(new);
                match prev {
                    Some(p) => self.slots[p].next = Some(new),
                    None => self.head = Some(new),
                }
                self.len += 1;
                return;
            }
            cursor = slot.next;
        }
        self.push(value);
    }

    /// Unlink every node matching `pred`, returning the removed values in list order.
    pub(crate) fn remove<P>(&mut self, mut pred: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            cursor = self.slots[idx].next;
            if self.slots[idx].value.as_ref().is_some_and(&mut pred) {
                removed.push(self.unlink(idx));
            }
        }
        removed
    }

    /// Drop every node.
    pub(crate) fn clear(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.len);
        while let Some(value) = self.shift() {
            drained.push(value);
        }
        self.slots.clear();
        self.free.clear();
        drained
    }

    #[cfg(test)]
    pub(crate) fn front(&self) -> Option<&T> {
        self.head.and_then(|idx| self.slots[idx].value.as_ref())
    }

    /// Values in list order.
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn unlink(&mut self, idx: usize) -> T {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        let slot = &mut self.slots[idx];
        slot.prev = None;
        slot.next = None;
        self.free.push(idx);
        self.len -= 1;
        // Linked slots always hold a value.
        match slot.value.take() {
            Some(value) => value,
            None => unreachable!("linked slot {idx} is empty"),
        }
    }
}

pub(crate) struct Iter<'a, T> {
    list: &'a Dll<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let slot = &self.list.slots[idx];
        self.cursor = slot.next;
        slot.value.as_ref()
    }
}
