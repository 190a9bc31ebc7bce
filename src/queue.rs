/*!
Priority queue of mesh elements, keyed by cost.

The queue is a binary min-heap that also remembers where every element sits
in the heap. That makes it possible to change the cost of an element, or to
remove it, in logarithmic time, which is what the simplifier needs after
every collapse invalidates the costs of the surrounding edges.
*/

use std::cmp::Ordering;

use crate::element::Handle;

pub struct Queue<H, Cost>
where
    H: Handle,
    Cost: PartialOrd,
{
    items: Vec<(H, Cost)>,
    /// Position of each element in `items`, indexed by the element's index.
    pos: Vec<Option<usize>>,
}

const fn parent(index: usize) -> Option<usize> {
    if index > 0 {
        Some((index - 1) / 2)
    } else {
        None
    }
}

impl<H, Cost> Queue<H, Cost>
where
    H: Handle,
    Cost: PartialOrd,
{
    /// Create a queue sized for elements with indices below `num_items`. The
    /// queue grows if larger indices are inserted.
    pub fn new(num_items: usize) -> Self {
        Queue {
            items: Vec::with_capacity(num_items),
            pos: vec![None; num_items],
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.pos.fill(None);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, val: H) -> Option<usize> {
        self.pos.get(val.index() as usize).copied().flatten()
    }

    fn set_position(&mut self, val: H, index: Option<usize>) {
        let vi = val.index() as usize;
        if vi >= self.pos.len() {
            self.pos.resize(vi + 1, None);
        }
        self.pos[vi] = index;
    }

    pub fn contains(&self, val: H) -> bool {
        self.position(val).is_some()
    }

    /// The cost of `val`, if it is queued.
    pub fn cost(&self, val: H) -> Option<&Cost> {
        self.position(val).map(|i| &self.items[i].1)
    }

    /// The element with the lowest cost, without removing it.
    pub fn peek(&self) -> Option<&(H, Cost)> {
        self.items.first()
    }

    fn less(&self, i: usize, j: usize) -> bool {
        matches!(
            self.items[i].1.partial_cmp(&self.items[j].1),
            Some(Ordering::Less)
        )
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.items.swap(i, j);
        self.set_position(self.items[i].0, Some(i));
        self.set_position(self.items[j].0, Some(j));
    }

    fn sift_up(&mut self, mut index: usize) {
        while let Some(pi) = parent(index) {
            if !self.less(index, pi) {
                break;
            }
            self.swap(index, pi);
            index = pi;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let (left, right) = (2 * index + 1, 2 * index + 2);
            let mut smallest = index;
            if left < self.len() && self.less(left, smallest) {
                smallest = left;
            }
            if right < self.len() && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }

    /// Insert `val` with `cost`. If `val` is already queued, its cost is
    /// updated instead.
    pub fn insert(&mut self, val: H, cost: Cost) {
        match self.position(val) {
            Some(index) => {
                self.items[index].1 = cost;
                self.sift_down(index);
                self.sift_up(index);
            }
            None => {
                let index = self.items.len();
                self.set_position(val, Some(index));
                self.items.push((val, cost));
                self.sift_up(index);
            }
        }
    }

    /// Change the cost of `val`. Returns false, and does nothing, if `val` is
    /// not queued.
    pub fn update_key(&mut self, val: H, cost: Cost) -> bool {
        match self.position(val) {
            Some(index) => {
                self.items[index].1 = cost;
                self.sift_down(index);
                self.sift_up(index);
                true
            }
            None => false,
        }
    }

    /// Remove `val` from the queue, if present.
    pub fn remove(&mut self, val: H) -> Option<Cost> {
        let index = self.position(val)?;
        let last = self.items.len() - 1;
        if index != last {
            self.swap(index, last);
        }
        let (removed, cost) = self.items.pop()?;
        self.set_position(removed, None);
        if index < self.items.len() {
            self.sift_down(index);
            self.sift_up(index);
        }
        Some(cost)
    }

    /// Remove and return the element with the lowest cost.
    pub fn pop(&mut self) -> Option<(H, Cost)> {
        let last = self.items.len().checked_sub(1)?;
        if last > 0 {
            self.swap(0, last);
        }
        let out = self.items.pop()?;
        self.set_position(out.0, None);
        self.sift_down(0);
        Some(out)
    }
}

#[cfg(test)]
mod test {
    use super::Queue;
    use crate::element::{EH, Handle, VH};

    fn drain<H: Handle>(mut queue: Queue<H, f64>) -> Vec<u32> {
        let mut out = Vec::with_capacity(queue.len());
        while let Some((val, _)) = queue.pop() {
            out.push(val.index());
        }
        out
    }

    fn filled(order: &[u32]) -> Queue<VH, f64> {
        let mut queue = Queue::new(order.len());
        for &i in order {
            queue.insert(i.into(), i as f64);
        }
        queue
    }

    #[test]
    fn t_queue_push_two() {
        let mut queue: Queue<VH, f64> = Queue::new(2);
        queue.insert(0.into(), 5.0);
        queue.insert(1.into(), 2.0);
        assert_eq!(Some(1), queue.peek().map(|(v, _)| v.index()));
        assert_eq!(vec![1, 0], drain(queue));
    }

    #[test]
    fn t_queue_push_many() {
        let queue = filled(&[8, 1, 5, 3, 9, 2, 6, 4, 0, 7]);
        assert_eq!(10, queue.len());
        assert_eq!((0..10).collect::<Vec<_>>(), drain(queue));
    }

    #[test]
    fn t_queue_remove() {
        let mut queue = filled(&[4, 3, 5, 8, 2, 9, 1, 7, 0, 6]);
        assert_eq!(Some(3.0), queue.remove(3.into()));
        assert_eq!(Some(6.0), queue.remove(6.into()));
        assert_eq!(None, queue.remove(6.into()));
        assert!(!queue.contains(3.into()));
        assert!(queue.contains(4.into()));
        assert_eq!(vec![0, 1, 2, 4, 5, 7, 8, 9], drain(queue));
    }

    #[test]
    fn t_queue_remove_last_and_only() {
        let mut queue = filled(&[0, 1]);
        queue.remove(1.into());
        queue.remove(0.into());
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn t_queue_update() {
        let mut queue = filled(&[4, 3, 5, 8, 2, 9, 1, 7, 0, 6]);
        queue.insert(4.into(), -1.0);
        assert!(queue.update_key(2.into(), 13.0));
        assert!(!queue.update_key(42.into(), 0.0));
        assert_eq!(10, queue.len());
        assert_eq!(Some(&13.0), queue.cost(2.into()));
        assert_eq!(vec![4, 0, 1, 3, 5, 6, 7, 8, 9, 2], drain(queue));
    }

    #[test]
    fn t_queue_owned_costs() {
        let mut queue: Queue<VH, String> = Queue::new(3);
        queue.insert(0.into(), String::from("m"));
        queue.insert(1.into(), String::from("c"));
        queue.insert(2.into(), String::from("x"));
        // Reinserting updates in place.
        queue.insert(2.into(), String::from("a"));
        queue.insert(1.into(), String::from("z"));
        assert_eq!(3, queue.len());
        assert_eq!(Some(&String::from("a")), queue.cost(2.into()));
        let mut order = Vec::new();
        while let Some((v, cost)) = queue.pop() {
            order.push((v.index(), cost));
        }
        assert_eq!(
            vec![
                (2, String::from("a")),
                (0, String::from("m")),
                (1, String::from("z"))
            ],
            order
        );
    }

    #[test]
    fn t_queue_grows() {
        let mut queue: Queue<EH, f64> = Queue::new(0);
        queue.insert(100.into(), 1.0);
        queue.insert(7.into(), 0.5);
        assert!(queue.contains(100.into()));
        assert_eq!(vec![7, 100], drain(queue));
    }

    #[test]
    fn t_queue_clear() {
        let mut queue = filled(&[3, 1, 2]);
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.contains(1.into()));
        queue.insert(1.into(), 1.0);
        assert_eq!(vec![1], drain(queue));
    }
}
