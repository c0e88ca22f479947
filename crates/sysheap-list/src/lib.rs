#![cfg_attr(not(test), no_std)]

//! Circular doubly-linked lists whose links live inside a store.
//!
//! Items are named by a copyable id instead of a pointer, so the store can be
//! a raw byte arena that keeps the links in place.

use getset::CopyGetters;

pub trait HasLink {
  type Id: Copy + Eq;

  fn next(&self, item: Self::Id) -> Self::Id;
  fn prev(&self, item: Self::Id) -> Self::Id;
  fn set_next(&mut self, item: Self::Id, next: Self::Id);
  fn set_prev(&mut self, item: Self::Id, prev: Self::Id);

  fn link(&self, item: Self::Id) -> Link<Self::Id> {
    Link::new(self.next(item), self.prev(item))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
pub struct Link<Id>
where
  Id: Copy,
{
  #[getset(get_copy = "pub")]
  next: Id,
  #[getset(get_copy = "pub")]
  prev: Id,
}

impl<Id> Link<Id>
where
  Id: Copy,
{
  pub const fn new(next: Id, prev: Id) -> Self {
    Self { next, prev }
  }
}

pub struct List {}

impl List {
  /// Turns `item` into a one-element ring.
  pub fn ring<S>(store: &mut S, item: S::Id)
  where
    S: HasLink,
  {
    store.set_next(item, item);
    store.set_prev(item, item);
  }

  pub fn insert_before<S>(store: &mut S, item: S::Id, at: S::Id)
  where
    S: HasLink,
  {
    let prev = store.prev(at);

    store.set_prev(item, prev);
    store.set_next(item, at);
    store.set_next(prev, item);
    store.set_prev(at, item);
  }

  /// Unlinks `item` and returns its former successor, or `None` when `item`
  /// was the only element. The links stored in `item` are left stale.
  pub fn remove<S>(store: &mut S, item: S::Id) -> Option<S::Id>
  where
    S: HasLink,
  {
    let next = store.next(item);
    if next == item {
      return None;
    }

    let prev = store.prev(item);
    store.set_next(prev, next);
    store.set_prev(next, prev);
    Some(next)
  }

  pub fn is_consistent<S>(store: &S, item: S::Id) -> bool
  where
    S: HasLink,
  {
    let link = store.link(item);
    store.prev(link.next()) == item && store.next(link.prev()) == item
  }
}

/// Walks a ring once, starting at `head`.
pub struct ListIter<'store, S>
where
  S: HasLink,
{
  store: &'store S,
  head: Option<S::Id>,
  next: Option<S::Id>,
}

impl<'store, S> ListIter<'store, S>
where
  S: HasLink,
{
  pub fn new(store: &'store S, head: Option<S::Id>) -> Self {
    Self {
      store,
      head,
      next: head,
    }
  }
}

impl<'store, S> Iterator for ListIter<'store, S>
where
  S: HasLink,
{
  type Item = S::Id;

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.next?;
    let following = self.store.next(current);
    self.next = Some(following).filter(|id| Some(*id) != self.head);
    Some(current)
  }
}

#[cfg(test)]
mod tests;
