//! `ClientList`: an ordered doubly-linked collection of clients with O(1)
//! head/tail access, O(n) search, plus an auxiliary `FocusStack` — a
//! singly-linked MRU list of references to the same clients.
//!
//! The doubly-linked list is expressed as an arena of `Client`s keyed by
//! stable indices (`ClientId`) rather than raw pointers or `Rc`/`Weak`:
//! this sidesteps the lifetime question entirely.

use crate::client::{Client, WindowKind};

/// A stable handle into a `ClientList`'s arena. Not reused across a
/// `remove`/`insert` round trip: relocating a client to another list or
/// back to the head of the same one always yields a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(usize);

struct Node {
    client: Client,
    next: Option<ClientId>,
    prev: Option<ClientId>,
}

#[derive(Default)]
pub struct ClientList {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<ClientId>,
    tail: Option<ClientId>,
    length: usize,
    /// Most-recently-focused first.
    focus_stack: Vec<ClientId>,
}

impl ClientList {
    pub fn new() -> Self {
        ClientList::default()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn head(&self) -> Option<ClientId> {
        self.head
    }

    pub fn tail(&self) -> Option<ClientId> {
        self.tail
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.slots.get(id.0)?.as_ref().map(|n| &n.client)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.slots.get_mut(id.0)?.as_mut().map(|n| &mut n.client)
    }

    pub fn next(&self, id: ClientId) -> Option<ClientId> {
        self.slots[id.0].as_ref().and_then(|n| n.next)
    }

    pub fn prev(&self, id: ClientId) -> Option<ClientId> {
        self.slots[id.0].as_ref().and_then(|n| n.prev)
    }

    /// Prepend `client` at head; update tail if the list was empty.
    pub fn insert(&mut self, client: Client) -> ClientId {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        let id = ClientId(index);

        self.slots[index] = Some(Node {
            client,
            next: self.head,
            prev: None,
        });

        if let Some(old_head) = self.head {
            self.slots[old_head.0].as_mut().unwrap().prev = Some(id);
        } else {
            self.tail = Some(id);
        }
        self.head = Some(id);
        self.length += 1;
        id
    }

    /// Unlink `id`, free its slot, and hand back the owned `Client` so it
    /// may be re-inserted elsewhere.
    pub fn remove(&mut self, id: ClientId) -> Client {
        let node = self.slots[id.0].take().expect("remove of absent client");
        let (next, prev) = (node.next, node.prev);

        match prev {
            Some(p) => self.slots[p.0].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n.0].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }

        self.free.push(id.0);
        self.length -= 1;
        node.client
    }

    /// `remove(c)`, then `focus_remove(c)`, then release.
    pub fn destroy(&mut self, id: ClientId) -> Client {
        self.focus_remove(id);
        self.remove(id)
    }

    /// Linear scan; `kind` selects which field of `Client` to compare.
    /// EnterNotify looks clients up by `Frame`, ButtonPress by `Window` —
    /// the asymmetry is intentional and this is the one place it is
    /// expressed.
    pub fn find_by_window(&self, window: u64, kind: WindowKind) -> Option<ClientId> {
        let mut cur = self.head;
        while let Some(id) = cur {
            let node = self.slots[id.0].as_ref().unwrap();
            if node.client.id_for(kind) == window {
                return Some(id);
            }
            cur = node.next;
        }
        None
    }

    /// Remove any existing FocusStack entry for `id`, then push to top.
    pub fn focus_push(&mut self, id: ClientId) {
        self.focus_stack.retain(|&c| c != id);
        self.focus_stack.insert(0, id);
    }

    /// Unlink and release the FocusStack entry for `id`, if present.
    pub fn focus_remove(&mut self, id: ClientId) {
        self.focus_stack.retain(|&c| c != id);
    }

    /// Top of the FocusStack, or none.
    pub fn focused(&self) -> Option<ClientId> {
        self.focus_stack.first().copied()
    }

    /// Iterate clients in main list order (head to tail) — the order
    /// the tiler walks.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        ClientListIter {
            list: self,
            cur: self.head,
        }
    }
}

struct ClientListIter<'a> {
    list: &'a ClientList,
    cur: Option<ClientId>,
}

impl<'a> Iterator for ClientListIter<'a> {
    type Item = (ClientId, &'a Client);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = self.list.slots[id.0].as_ref().unwrap();
        self.cur = node.next;
        Some((id, &node.client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SizeHints;
    use crate::geometry::Rect;

    fn client(window: u64) -> Client {
        Client::new(window, window + 1000, SizeHints::default(), Rect::default())
    }

    fn check_invariants(list: &ClientList) {
        if let Some(h) = list.head() {
            assert!(list.prev(h).is_none(), "head.prev must be none");
        }
        if let Some(t) = list.tail() {
            assert!(list.next(t).is_none(), "tail.next must be none");
        }
        let mut count = 0;
        let mut cur = list.head();
        let mut last = None;
        while let Some(id) = cur {
            if let Some(p) = list.prev(id) {
                assert_eq!(list.next(p), Some(id));
            }
            last = Some(id);
            cur = list.next(id);
            count += 1;
        }
        assert_eq!(count, list.len());
        assert_eq!(last, list.tail());
    }

    #[test]
    fn doubly_linked_invariants_hold_under_churn() {
        let mut list = ClientList::new();
        let a = list.insert(client(1));
        check_invariants(&list);
        let b = list.insert(client(2));
        check_invariants(&list);
        let c = list.insert(client(3));
        check_invariants(&list);

        assert_eq!(list.head(), Some(c));
        assert_eq!(list.tail(), Some(a));

        list.remove(b);
        check_invariants(&list);
        assert_eq!(list.len(), 2);

        list.destroy(a);
        check_invariants(&list);
        assert_eq!(list.len(), 1);
        assert_eq!(list.head(), Some(c));
        assert_eq!(list.tail(), Some(c));
    }

    #[test]
    fn focus_stack_is_mru_and_unique() {
        let mut list = ClientList::new();
        let a = list.insert(client(1));
        let b = list.insert(client(2));
        let c = list.insert(client(3));

        list.focus_push(a);
        list.focus_push(b);
        list.focus_push(c);
        assert_eq!(list.focused(), Some(c));

        // Re-pushing an already-present client promotes it, not duplicates it.
        list.focus_push(a);
        assert_eq!(list.focused(), Some(a));
        assert_eq!(list.focus_stack.len(), 3);

        list.destroy(a);
        assert_eq!(list.focused(), Some(c));
        assert_eq!(list.focus_stack.len(), 2);
    }

    #[test]
    fn find_by_window_respects_kind() {
        let mut list = ClientList::new();
        let id = list.insert(client(42));
        assert_eq!(list.find_by_window(42, WindowKind::Window), Some(id));
        assert_eq!(list.find_by_window(1042, WindowKind::Frame), Some(id));
        assert_eq!(list.find_by_window(42, WindowKind::Frame), None);
    }

    #[test]
    fn remove_allows_reinsertion_elsewhere() {
        let mut list_a = ClientList::new();
        let mut list_b = ClientList::new();
        let id = list_a.insert(client(7));
        let c = list_a.remove(id);
        check_invariants(&list_a);
        assert!(list_a.is_empty());
        let id2 = list_b.insert(c);
        assert_eq!(list_b.get(id2).unwrap().window, 7);
    }
}
