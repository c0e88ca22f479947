use super::*;

struct TestStore {
  links: Vec<Link<usize>>,
}

impl TestStore {
  fn new(len: usize) -> Self {
    Self {
      links: (0..len).map(|i| Link::new(i, i)).collect(),
    }
  }

  fn walk(&self, head: usize) -> Vec<usize> {
    ListIter::new(self, Some(head)).collect()
  }
}

impl HasLink for TestStore {
  type Id = usize;

  fn next(&self, item: usize) -> usize {
    self.links[item].next()
  }

  fn prev(&self, item: usize) -> usize {
    self.links[item].prev()
  }

  fn set_next(&mut self, item: usize, next: usize) {
    let prev = self.links[item].prev();
    self.links[item] = Link::new(next, prev);
  }

  fn set_prev(&mut self, item: usize, prev: usize) {
    let next = self.links[item].next();
    self.links[item] = Link::new(next, prev);
  }
}

#[test]
fn test_ring() {
  let mut store = TestStore::new(4);
  store.set_next(2, 0);
  store.set_prev(2, 3);

  List::ring(&mut store, 2);

  assert_eq!(store.link(2), Link::new(2, 2));
  assert_eq!(store.walk(2), vec![2]);
  assert!(List::is_consistent(&store, 2));
}

#[test]
fn test_insert_before() {
  let mut store = TestStore::new(4);
  List::ring(&mut store, 0);
  List::insert_before(&mut store, 1, 0);
  List::insert_before(&mut store, 2, 0);

  assert_eq!(store.walk(0), vec![0, 1, 2]);
  assert_eq!(store.prev(0), 2);
  for id in 0..3 {
    assert!(List::is_consistent(&store, id));
  }
}

#[test]
fn test_remove() {
  let mut store = TestStore::new(4);
  List::ring(&mut store, 0);
  List::insert_before(&mut store, 1, 0);
  List::insert_before(&mut store, 2, 0);

  assert_eq!(List::remove(&mut store, 1), Some(2));
  assert_eq!(store.walk(0), vec![0, 2]);
  assert!(List::is_consistent(&store, 0));
  assert!(List::is_consistent(&store, 2));

  assert_eq!(List::remove(&mut store, 0), Some(2));
  assert_eq!(store.walk(2), vec![2]);

  assert_eq!(List::remove(&mut store, 2), None);
}

#[test]
fn test_iter_empty() {
  let store = TestStore::new(1);
  assert_eq!(ListIter::new(&store, None).count(), 0);
}

#[test]
fn test_iter_from_any_member() {
  let mut store = TestStore::new(5);
  List::ring(&mut store, 3);
  List::insert_before(&mut store, 1, 3);
  List::insert_before(&mut store, 4, 3);

  assert_eq!(store.walk(1), vec![1, 4, 3]);
  assert_eq!(store.walk(4), vec![4, 3, 1]);
}
